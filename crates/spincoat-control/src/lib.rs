//! # Spincoat Control
//!
//! 旋涂机控制算法层（无硬件、无运行时依赖）：
//!
//! - `pid`: 转速闭环 PID 控制器（钳位抗积分饱和）
//! - `process`: 涂布流程状态机（Idle → Depositing → Coating → Idle）
//! - `debounce`: 确认按键去抖
//! - `config`: 工艺配置记录与持久化边界
//!
//! 状态机的定时器是显式的截止时间字段，由调用方协作式轮询，
//! 不存在捕获可变状态的游离回调。

pub mod config;
pub mod debounce;
pub mod pid;
pub mod process;

pub use config::{CoaterConfig, ConfigStore, PidGains};
pub use debounce::Debouncer;
pub use pid::SpeedController;
pub use process::{CoatingProcess, ProcessStage};
