//! KISS 格式 ESC 遥测帧解析
//!
//! 帧格式（10 字节，多字节字段大端）：
//!
//! ```text
//! [0]    温度（°C）
//! [1..3] 电压（×0.01 V）
//! [3..5] 电流（×0.01 A）
//! [5..7] 累计消耗（mAh）
//! [7..9] 电气转速（×100 eRPM）
//! [9]    CRC8（多项式 0x07，覆盖前 9 字节）
//! ```

use crate::ProtocolError;
use crate::constants::TELEMETRY_FRAME_LEN;

/// CRC8（多项式 0x07，初值 0），KISS 遥测约定
pub fn crc8(bytes: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in bytes {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x07
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// 一帧已验证的 ESC 遥测数据（物理单位）
///
/// 每次串口读取批次构建一帧，字段提取后即丢弃，不保留历史。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    /// 温度（°C）
    pub temperature: u8,
    /// 电压（V）
    pub voltage: f64,
    /// 电流（A），仅带电流计的 ESC 有效
    pub current: f64,
    /// 累计消耗（mAh），仅带电流计的 ESC 有效
    pub consumption: u16,
    /// 电气转速（eRPM）
    pub erpm: u32,
}

impl Telemetry {
    /// 解析缓冲区中最新的一帧遥测
    ///
    /// 不足 10 字节或校验失败时返回 `None`（丢弃，不重试）。
    /// 超过 10 字节时只消费最新的 10 字节，积压的旧数据直接丢弃，
    /// 反馈环路始终作用于最新样本。
    pub fn decode(buf: &[u8]) -> Option<Self> {
        Self::try_decode(buf).ok()
    }

    /// 同 [`decode`](Self::decode)，但保留失败原因（日志用）
    pub fn try_decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < TELEMETRY_FRAME_LEN {
            return Err(ProtocolError::ShortRead {
                expected: TELEMETRY_FRAME_LEN,
                actual: buf.len(),
            });
        }
        // 只取最新 10 字节
        let data = &buf[buf.len() - TELEMETRY_FRAME_LEN..];

        let expected = crc8(&data[..9]);
        if data[9] != expected {
            return Err(ProtocolError::CrcMismatch {
                expected,
                actual: data[9],
            });
        }

        Ok(Self {
            temperature: data[0],
            voltage: u16::from_be_bytes([data[1], data[2]]) as f64 * 0.01,
            current: u16::from_be_bytes([data[3], data[4]]) as f64 * 0.01,
            consumption: u16::from_be_bytes([data[5], data[6]]),
            erpm: u16::from_be_bytes([data[7], data[8]]) as u32 * 100,
        })
    }

    /// 机械转速（RPM）：电气转速除以极对数
    pub fn rpm(&self, motor_poles: u32) -> f64 {
        self.erpm as f64 / (motor_poles as f64 / 2.0)
    }

    /// 编码为 10 字节线上格式（模拟 ESC / 测试用）
    pub fn encode(&self) -> [u8; TELEMETRY_FRAME_LEN] {
        let mut out = [0u8; TELEMETRY_FRAME_LEN];
        out[0] = self.temperature;
        out[1..3].copy_from_slice(&(((self.voltage / 0.01).round() as u16).to_be_bytes()));
        out[3..5].copy_from_slice(&(((self.current / 0.01).round() as u16).to_be_bytes()));
        out[5..7].copy_from_slice(&self.consumption.to_be_bytes());
        out[7..9].copy_from_slice(&(((self.erpm / 100) as u16).to_be_bytes()));
        out[9] = crc8(&out[..9]);
        out
    }
}
