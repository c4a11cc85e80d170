//! 模拟 ESC（一阶电机模型）
//!
//! 在两个硬件边界后面模拟一台带遥测的 ESC：
//! 脉冲输入按协议解码回命令帧，油门驱动一阶转速模型；
//! 遥测端按 KISS 格式吐出当前状态的有效帧。
//! 供集成测试与 CLI 演示模式使用，无真实硬件依赖。

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::trace;

use spincoat_protocol::constants::{DEFAULT_MOTOR_POLES, T1H_TICKS};
use spincoat_protocol::{DshotCommand, DshotFrame, PulseTrain, Telemetry};

use crate::esc::{EscError, PulseOutput, TelemetrySource};

/// 模拟电机与 ESC 的内部状态
#[derive(Debug)]
struct MockState {
    /// 当前机械转速（RPM）
    rpm: f64,
    /// 最近一次有效油门
    throttle: f64,
    /// 上一次模型推进时刻
    last_step: Instant,
    /// 满油门稳态转速
    max_rpm: f64,
    /// 一阶时间常数（秒）
    tau_s: f64,
    /// 连续遥测是否已开启
    telemetry_enabled: bool,
    /// 收到的特殊命令载荷（测试断言用）
    commands: Vec<u16>,
    /// 收到的 disarmed 帧数（解锁序列验证用）
    disarmed_frames: u64,
}

impl MockState {
    /// 按经过的墙钟时间推进一阶模型
    fn step(&mut self, now: Instant) {
        let dt = now.duration_since(self.last_step).as_secs_f64();
        self.last_step = now;
        let steady = self.throttle * self.max_rpm;
        let alpha = 1.0 - (-dt / self.tau_s).exp();
        self.rpm += (steady - self.rpm) * alpha;
    }
}

/// 模拟 ESC
///
/// `split()` 产出实现两个边界 trait 的半部，可分别注入
/// [`CoaterBuilder`](crate::CoaterBuilder)；本体保留共享句柄供断言。
#[derive(Clone)]
pub struct MockEsc {
    inner: Arc<Mutex<MockState>>,
}

impl MockEsc {
    pub fn new(max_rpm: f64, tau_s: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState {
                rpm: 0.0,
                throttle: 0.0,
                last_step: Instant::now(),
                max_rpm,
                tau_s,
                telemetry_enabled: false,
                commands: Vec::new(),
                disarmed_frames: 0,
            })),
        }
    }

    /// 拆成脉冲输出半部与遥测输入半部
    pub fn split(&self) -> (Box<dyn PulseOutput>, Box<dyn TelemetrySource>) {
        (
            Box::new(MockPulseOutput {
                inner: self.inner.clone(),
            }),
            Box::new(MockTelemetrySource {
                inner: self.inner.clone(),
            }),
        )
    }

    /// 当前模型转速（RPM）
    pub fn rpm(&self) -> f64 {
        let mut state = self.inner.lock();
        state.step(Instant::now());
        state.rpm
    }

    /// 最近一次有效油门
    pub fn throttle(&self) -> f64 {
        self.inner.lock().throttle
    }

    pub fn telemetry_enabled(&self) -> bool {
        self.inner.lock().telemetry_enabled
    }

    /// 收到的特殊命令载荷（按到达顺序）
    pub fn commands(&self) -> Vec<u16> {
        self.inner.lock().commands.clone()
    }

    /// 收到的 disarmed 帧数
    pub fn disarmed_frames(&self) -> u64 {
        self.inner.lock().disarmed_frames
    }
}

struct MockPulseOutput {
    inner: Arc<Mutex<MockState>>,
}

impl PulseOutput for MockPulseOutput {
    fn write_pulses(&mut self, train: &PulseTrain) -> Result<(), EscError> {
        // 脉冲序列解码回 16 位帧：高电平段等于 T1H 即为逻辑 1
        let mut bits = 0u16;
        for pair in train.pairs() {
            bits = (bits << 1) | (pair.high == T1H_TICKS) as u16;
        }
        let frame = DshotFrame::from_bits(bits);

        // 真实 ESC 行为：校验失败的帧静默忽略
        if !frame.verify_checksum() {
            trace!("mock ESC: dropping frame with bad checksum (0x{bits:04X})");
            return Ok(());
        }

        let mut state = self.inner.lock();
        state.step(Instant::now());

        let payload = frame.payload();
        match payload {
            0 => {
                state.throttle = 0.0;
                state.disarmed_frames += 1;
            }
            1..=47 => {
                state.commands.push(payload);
                if payload == u16::from(DshotCommand::SignalLineContinuousErpmTelemetry) {
                    state.telemetry_enabled = true;
                } else if payload == u16::from(DshotCommand::SignalLineTelemetryDisable) {
                    state.telemetry_enabled = false;
                }
            }
            throttle => state.throttle = (throttle - 47) as f64 / 2000.0,
        }
        Ok(())
    }
}

struct MockTelemetrySource {
    inner: Arc<Mutex<MockState>>,
}

impl TelemetrySource for MockTelemetrySource {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, EscError> {
        let mut state = self.inner.lock();
        if !state.telemetry_enabled {
            return Ok(0);
        }
        state.step(Instant::now());

        let pole_pairs = DEFAULT_MOTOR_POLES as f64 / 2.0;
        let frame = Telemetry {
            temperature: 32,
            voltage: 11.1,
            current: state.throttle * 20.0,
            consumption: 0,
            // eRPM 以 ×100 量化，与真实遥测一致
            erpm: ((state.rpm * pole_pairs / 100.0).round() as u32) * 100,
        };
        let bytes = frame.encode();
        buf.extend_from_slice(&bytes);
        Ok(bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_throttle_frame_drives_model() {
        let esc = MockEsc::new(10_000.0, 0.02);
        let (mut output, _) = esc.split();

        output
            .write_pulses(&PulseTrain::from(DshotFrame::throttle(0.5, true)))
            .unwrap();
        thread::sleep(Duration::from_millis(120));

        assert!((esc.throttle() - 0.5).abs() < 0.001);
        // 6 个时间常数后基本到达稳态 5000 RPM
        assert!((esc.rpm() - 5000.0).abs() < 100.0, "rpm: {}", esc.rpm());
    }

    #[test]
    fn test_telemetry_gated_by_enable_command() {
        let esc = MockEsc::new(10_000.0, 0.02);
        let (mut output, mut telemetry) = esc.split();

        let mut buf = Vec::new();
        assert_eq!(telemetry.read_available(&mut buf).unwrap(), 0);

        output
            .write_pulses(&PulseTrain::from(DshotFrame::command(
                DshotCommand::SignalLineContinuousErpmTelemetry,
                true,
            )))
            .unwrap();
        assert!(esc.telemetry_enabled());

        assert_eq!(telemetry.read_available(&mut buf).unwrap(), 10);
        let frame = Telemetry::decode(&buf).unwrap();
        assert_eq!(frame.temperature, 32);
    }

    #[test]
    fn test_disarmed_frames_counted() {
        let esc = MockEsc::new(10_000.0, 0.02);
        let (mut output, _) = esc.split();
        for _ in 0..10 {
            output
                .write_pulses(&PulseTrain::from(DshotFrame::disarmed()))
                .unwrap();
        }
        assert_eq!(esc.disarmed_frames(), 10);
    }
}
