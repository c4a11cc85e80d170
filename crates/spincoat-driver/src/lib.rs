//! # Spincoat Driver
//!
//! 旋涂机运行时层，提供：
//!
//! - ESC 链路管理（解锁序列、遥测开启、油门帧发送）
//! - 后台控制线程（1 kHz 锚点循环：事件 → 流程 → 遥测 → PID → 脉冲输出）
//! - 状态同步（ArcSwap 无锁快照读取，供显示侧 ~30 Hz 刷新消费）
//! - 事件通道（确认/停止/配置更新，单生产者写入流程状态）
//!
//! # 并发模型
//!
//! 控制线程独占持有 [`SpeedController`](spincoat_control::SpeedController)、
//! [`CoatingProcess`](spincoat_control::CoatingProcess) 与 ESC 链路；
//! 其余线程只通过 [`Coater`] 句柄投递事件、通过 [`Observer`] 读取快照。
//! 每个字段只有一个写者，跨线程交接全部经由通道或 ArcSwap。

mod builder;
mod error;
mod esc;
mod event;
pub mod mock;
mod pipeline;
mod state;

pub use builder::{Coater, CoaterBuilder};
pub use error::DriverError;
pub use esc::{EscError, EscLink, EscLinkConfig, PulseOutput, TelemetrySource};
pub use event::CoaterEvent;
pub use pipeline::PipelineConfig;
pub use state::{CoaterSnapshot, Observer};
