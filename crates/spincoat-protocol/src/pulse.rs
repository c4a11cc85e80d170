//! 命令帧到硬件脉冲序列的转换
//!
//! 每个比特编码为一对（高电平时长, 低电平时长），高位在前。
//! 逻辑 1 的高电平段为 [`T1H_TICKS`]，逻辑 0 为 [`T0H_TICKS`]，
//! 比特总时长恒为 [`BIT_TICKS`]。最后一个比特的低电平段额外附加
//! [`FRAME_GAP_TICKS`] 作为帧间隔。

use crate::constants::*;
use crate::dshot::DshotFrame;

/// 单个比特的脉冲对（单位：RMT tick）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulsePair {
    /// 高电平时长
    pub high: u16,
    /// 低电平时长
    pub low: u16,
}

/// 一帧的完整脉冲序列（16 个脉冲对，高位在前）
///
/// 脉冲发生器边界接收该类型；序列是一次性的，发送后即丢弃。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTrain {
    pairs: [PulsePair; FRAME_BITS],
}

impl PulseTrain {
    /// 脉冲对切片
    pub fn pairs(&self) -> &[PulsePair; FRAME_BITS] {
        &self.pairs
    }

    /// 展平为 32 个交替的高/低时长，与 RMT 写入格式一致
    pub fn durations(&self) -> impl Iterator<Item = u16> + '_ {
        self.pairs.iter().flat_map(|p| [p.high, p.low])
    }

    /// 整帧传输时长（tick），含帧间隔
    ///
    /// 控制循环周期必须大于该时长，发送才是安全的阻塞操作。
    pub fn total_ticks(&self) -> u32 {
        self.pairs.iter().map(|p| (p.high + p.low) as u32).sum()
    }
}

impl From<DshotFrame> for PulseTrain {
    fn from(frame: DshotFrame) -> Self {
        let bits = frame.bits();
        let mut pairs = [PulsePair { high: 0, low: 0 }; FRAME_BITS];

        for (i, pair) in pairs.iter_mut().enumerate() {
            // 高位在前
            let bit = (bits >> (FRAME_BITS - 1 - i)) & 1;
            let high = if bit == 1 { T1H_TICKS } else { T0H_TICKS };
            *pair = PulsePair {
                high,
                low: BIT_TICKS - high,
            };
        }
        pairs[FRAME_BITS - 1].low += FRAME_GAP_TICKS;

        Self { pairs }
    }
}
