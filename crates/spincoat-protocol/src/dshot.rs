//! DShot 命令帧构建
//!
//! 帧格式（16 位）：
//!
//! ```text
//! | 11 位载荷 | 1 位遥测请求 | 4 位校验 |
//! ```
//!
//! 载荷 0 表示 disarmed，1..=47 保留给特殊命令，48..=2047 为油门值。
//! 校验值为高 12 位的 4 位 XOR 折叠。

use crate::constants::*;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// ESC 特殊命令码（载荷 0..=47）
///
/// 遥测开关命令码为 ESC 厂商约定的魔数，语义未经协议文档验证，
/// 调用方只应发送已知可用的命令。
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum DshotCommand {
    /// 电机停止（与 disarmed 载荷相同）
    MotorStop = 0,
    /// 蜂鸣 1
    Beep1 = 1,
    /// 请求 ESC 信息
    EscInfo = 6,
    /// 关闭信号线遥测
    SignalLineTelemetryDisable = 32,
    /// 开启信号线连续 eRPM 遥测
    SignalLineContinuousErpmTelemetry = 33,
}

/// 开启串口连续遥测所需的命令序列（按顺序逐条发送）
pub const TELEMETRY_ENABLE_SEQUENCE: &[DshotCommand] =
    &[DshotCommand::SignalLineContinuousErpmTelemetry];

/// 单个 16 位 DShot 命令帧
///
/// 帧是一次性的值类型：构建后立即转换为脉冲序列发送，不保留身份。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DshotFrame(u16);

impl DshotFrame {
    /// 由油门值构建命令帧
    ///
    /// `value` 被钳制到 [0, 1]；0 映射到 disarmed 载荷，
    /// 其余映射到 48..=2047（1..=47 保留给命令，此路径永不产生）。
    pub fn throttle(value: f64, telemetry: bool) -> Self {
        let value = value.clamp(0.0, 1.0);
        let payload = if value == 0.0 {
            PAYLOAD_DISARMED
        } else {
            // 近零油门向上取到 48，1..=47 保留给命令，此路径永不进入
            ((value * THROTTLE_STEPS).round() as u16 + PAYLOAD_COMMAND_MAX)
                .max(PAYLOAD_THROTTLE_MIN)
        };
        Self::from_payload(payload, telemetry)
    }

    /// 由特殊命令码构建命令帧
    pub fn command(code: DshotCommand, telemetry: bool) -> Self {
        Self::from_payload(code.into(), telemetry)
    }

    /// disarmed 帧（解锁序列使用）
    pub fn disarmed() -> Self {
        Self::from_payload(PAYLOAD_DISARMED, false)
    }

    fn from_payload(payload: u16, telemetry: bool) -> Self {
        let value = (payload << 1) | telemetry as u16;
        let crc = Self::checksum_of(value);
        Self((value << 4) | crc)
    }

    /// 高 12 位的 4 位 XOR 折叠
    fn checksum_of(value: u16) -> u16 {
        (value ^ (value >> 4) ^ (value >> 8)) & 0x0F
    }

    /// 由线上 16 位值重建帧（接收端 / 回环测试用），不校验
    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// 完整 16 位帧值
    pub fn bits(&self) -> u16 {
        self.0
    }

    /// 11 位载荷
    pub fn payload(&self) -> u16 {
        self.0 >> 5
    }

    /// 遥测请求位
    pub fn telemetry_requested(&self) -> bool {
        (self.0 >> 4) & 1 == 1
    }

    /// 4 位校验值
    pub fn checksum(&self) -> u16 {
        self.0 & 0x0F
    }

    /// 重新计算校验值并与帧内校验位比较
    pub fn verify_checksum(&self) -> bool {
        Self::checksum_of(self.0 >> 4) == self.checksum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_throttle_is_disarmed() {
        let frame = DshotFrame::throttle(0.0, false);
        assert_eq!(frame.payload(), PAYLOAD_DISARMED);
        assert!(!frame.telemetry_requested());
        assert!(frame.verify_checksum());
    }

    #[test]
    fn test_full_throttle_hits_payload_max() {
        let frame = DshotFrame::throttle(1.0, true);
        assert_eq!(frame.payload(), PAYLOAD_THROTTLE_MAX);
        assert!(frame.telemetry_requested());
    }

    #[test]
    fn test_out_of_range_throttle_is_clamped() {
        assert_eq!(
            DshotFrame::throttle(1.7, false).payload(),
            PAYLOAD_THROTTLE_MAX
        );
        assert_eq!(DshotFrame::throttle(-0.3, false).payload(), PAYLOAD_DISARMED);
    }

    #[test]
    fn test_command_payload() {
        let frame = DshotFrame::command(DshotCommand::SignalLineContinuousErpmTelemetry, false);
        assert_eq!(frame.payload(), 33);
        assert!(frame.verify_checksum());
    }

    /// 已知参考向量：载荷 1046 + 遥测位 => 0x82D7
    /// （brushlesswhoop.com DShot 文档示例）
    #[test]
    fn test_reference_vector() {
        // 油门值使 round(v * 2000) + 47 == 1046
        let frame = DshotFrame::throttle(999.0 / 2000.0, true);
        assert_eq!(frame.payload(), 1046);
        assert_eq!(frame.bits(), 0x82D7);
    }

    proptest! {
        /// 任意油门值的载荷都落在 {0} ∪ [48, 2047]，且校验自洽
        #[test]
        fn prop_throttle_payload_in_range(v in 0.0f64..=1.0, telemetry: bool) {
            let frame = DshotFrame::throttle(v, telemetry);
            let payload = frame.payload();
            prop_assert!(
                payload == PAYLOAD_DISARMED
                    || (PAYLOAD_THROTTLE_MIN..=PAYLOAD_THROTTLE_MAX).contains(&payload)
            );
            prop_assert!(frame.verify_checksum());
        }

        /// 校验 nibble 的任意单比特翻转都会导致校验失败
        #[test]
        fn prop_checksum_bit_flip_detected(v in 0.0f64..=1.0, telemetry: bool, bit in 0u16..4) {
            let frame = DshotFrame::throttle(v, telemetry);
            let corrupted = DshotFrame::from_bits(frame.bits() ^ (1 << bit));
            prop_assert!(!corrupted.verify_checksum());
        }
    }
}
