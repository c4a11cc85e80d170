//! 工艺配置记录
//!
//! 核心只消费配置值；加载与持久化是外部协作方的职责，
//! 通过 [`ConfigStore`] 边界触发，核心自身不做文件 I/O。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// PID 增益
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        // 原固件 config.json 中的出厂增益
        Self {
            kp: 0.00005,
            ki: 0.0002,
            kd: 0.0,
        }
    }
}

/// 旋涂工艺配置
///
/// 流程运行期间对核心只读；编辑流程结束后整体替换并触发持久化。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoaterConfig {
    /// 滴注阶段转速（RPM），低速定值
    pub deposit_rpm: f64,
    /// 涂布阶段转速（RPM），闭环目标
    pub coating_rpm: f64,
    /// 涂布时长（秒）
    pub coating_time_s: u32,
    /// 转速环增益
    pub pid: PidGains,
}

impl Default for CoaterConfig {
    fn default() -> Self {
        Self {
            deposit_rpm: 500.0,
            coating_rpm: 6000.0,
            coating_time_s: 120,
            pid: PidGains::default(),
        }
    }
}

/// 配置持久化错误（外部实现上抛的统一类型）
#[derive(Error, Debug)]
#[error("Config store error: {0}")]
pub struct ConfigStoreError(pub String);

/// 配置持久化边界
///
/// 外部协作方（文件、NVS 等）实现；编辑流程完成后，
/// 核心用当前配置值调用 `save`。
pub trait ConfigStore: Send {
    fn load(&self) -> Result<CoaterConfig, ConfigStoreError>;
    fn save(&self, config: &CoaterConfig) -> Result<(), ConfigStoreError>;
}
