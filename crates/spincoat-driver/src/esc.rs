//! ESC 链路：边界抽象与启动序列
//!
//! 核心不持有硬件：脉冲发生器与串口接收器都以 trait 形式注入。
//! [`EscLink`] 在其上实现解锁序列、遥测开启命令序列和单帧发送。

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, trace};

use spincoat_protocol::constants::{
    ARMING_DURATION, ARMING_FRAME_INTERVAL, COMMAND_REPEAT, COMMAND_SETTLE, DEFAULT_MOTOR_POLES,
};
use spincoat_protocol::dshot::TELEMETRY_ENABLE_SEQUENCE;
use spincoat_protocol::{DshotCommand, DshotFrame, PulseTrain, Telemetry};

/// ESC 链路错误
#[derive(Error, Debug)]
pub enum EscError {
    /// 底层 I/O 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 脉冲输出后端错误
    #[error("Pulse output error: {0}")]
    Output(String),
}

/// 脉冲输出边界
///
/// 接收一帧的完整脉冲序列；发送是有界阻塞操作
/// （时长 = 16 × 比特周期 + 帧间隔），由实现方保证。
/// 时钟分频等底层配置是实现方的职责。
pub trait PulseOutput: Send {
    fn write_pulses(&mut self, train: &PulseTrain) -> Result<(), EscError>;
}

/// 遥测输入边界
///
/// 把当前可用的原始串口字节追加到 `buf`，返回追加的字节数。
/// 缓冲管理归外部接收器；核心只消费解码时刻可用的字节。
pub trait TelemetrySource: Send {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, EscError>;
}

/// ESC 链路配置
///
/// 时长与命令序列默认取协议常量；测试用模拟 ESC 时可缩短。
#[derive(Debug, Clone)]
pub struct EscLinkConfig {
    /// 电机极数（机械转速换算用）
    pub motor_poles: u32,
    /// 解锁序列时长
    pub arming_duration: Duration,
    /// 解锁期间 disarmed 帧发送间隔
    pub arming_frame_interval: Duration,
    /// 每个特殊命令的重复发送次数
    pub command_repeat: usize,
    /// 命令序列后的稳定等待
    pub command_settle: Duration,
    /// 开启连续遥测的命令序列（厂商魔数，按序发送）
    pub telemetry_sequence: Vec<DshotCommand>,
}

impl Default for EscLinkConfig {
    fn default() -> Self {
        Self {
            motor_poles: DEFAULT_MOTOR_POLES,
            arming_duration: ARMING_DURATION,
            arming_frame_interval: ARMING_FRAME_INTERVAL,
            command_repeat: COMMAND_REPEAT,
            command_settle: COMMAND_SETTLE,
            telemetry_sequence: TELEMETRY_ENABLE_SEQUENCE.to_vec(),
        }
    }
}

/// ESC 链路
///
/// 控制线程独占持有。帧与脉冲序列按次构建按次消费，不保留身份。
pub struct EscLink {
    output: Box<dyn PulseOutput>,
    telemetry: Box<dyn TelemetrySource>,
    config: EscLinkConfig,
    rx_buf: Vec<u8>,
}

impl EscLink {
    pub fn new(
        output: Box<dyn PulseOutput>,
        telemetry: Box<dyn TelemetrySource>,
        config: EscLinkConfig,
    ) -> Self {
        Self {
            output,
            telemetry,
            config,
            rx_buf: Vec::with_capacity(64),
        }
    }

    pub fn motor_poles(&self) -> u32 {
        self.config.motor_poles
    }

    /// 发送单帧
    pub fn send_frame(&mut self, frame: DshotFrame) -> Result<(), EscError> {
        self.output.write_pulses(&PulseTrain::from(frame))
    }

    /// 发送油门帧（越界值在编码层钳制，不拒绝）
    pub fn send_throttle(&mut self, value: f64, telemetry: bool) -> Result<(), EscError> {
        self.send_frame(DshotFrame::throttle(value, telemetry))
    }

    /// 发送特殊命令帧
    pub fn send_command(&mut self, code: DshotCommand, telemetry: bool) -> Result<(), EscError> {
        self.send_frame(DshotFrame::command(code, telemetry))
    }

    /// 解锁序列：持续发送 disarmed 帧直到满足最小时长
    ///
    /// ESC 只有在连续收到该时长的 disarmed 帧后才接受油门，
    /// 任何非零油门都必须在此之后发送。
    pub fn arm(&mut self) -> Result<(), EscError> {
        info!(duration = ?self.config.arming_duration, "arming ESC");
        let start = Instant::now();
        while start.elapsed() < self.config.arming_duration {
            self.send_frame(DshotFrame::disarmed())?;
            spin_sleep::sleep(self.config.arming_frame_interval);
        }
        debug!("arming sequence complete");
        Ok(())
    }

    /// 开启连续遥测：按序逐帧重复发送命令序列，结束后等待稳定
    ///
    /// 必须在解锁完成、ESC 已接受链路之后调用。
    pub fn enable_telemetry(&mut self) -> Result<(), EscError> {
        let sequence = self.config.telemetry_sequence.clone();
        for cmd in sequence {
            debug!(?cmd, repeat = self.config.command_repeat, "sending telemetry command");
            for _ in 0..self.config.command_repeat {
                self.send_command(cmd, true)?;
                spin_sleep::sleep(self.config.arming_frame_interval);
            }
        }
        spin_sleep::sleep(self.config.command_settle);
        Ok(())
    }

    /// 读取并解码最新遥测帧
    ///
    /// 短读或校验失败的批次静默丢弃（trace 级日志），
    /// 控制环继续使用上一次接受的测量值。
    pub fn poll_telemetry(&mut self) -> Result<Option<Telemetry>, EscError> {
        self.rx_buf.clear();
        let n = self.telemetry.read_available(&mut self.rx_buf)?;
        if n == 0 {
            return Ok(None);
        }

        match Telemetry::try_decode(&self.rx_buf) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) => {
                trace!(error = %e, bytes = n, "dropping malformed telemetry");
                Ok(None)
            }
        }
    }
}
