//! # Spincoat Protocol
//!
//! ESC 数字协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议时序与命令常量定义
//! - `dshot`: DShot 命令帧构建（11 位载荷 + 遥测位 + 4 位校验）
//! - `pulse`: 命令帧到硬件脉冲序列的转换
//! - `telemetry`: KISS 格式 ESC 遥测帧解析
//!
//! ## 字节序
//!
//! 遥测帧使用高位在前（大端字节序）的 16 位字段。

pub mod constants;
pub mod dshot;
pub mod pulse;
pub mod telemetry;

// 重新导出常用类型
pub use constants::*;
pub use dshot::{DshotCommand, DshotFrame};
pub use pulse::{PulsePair, PulseTrain};
pub use telemetry::{Telemetry, crc8};

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// 遥测帧长度不足（不足 10 字节）
    #[error("Telemetry frame too short: expected {expected}, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// 遥测帧校验失败
    #[error("Telemetry CRC mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    CrcMismatch { expected: u8, actual: u8 },
}
