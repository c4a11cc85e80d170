//! 控制循环
//!
//! 电机控制活动：以固定短周期（默认 1 ms）运行的锚点循环，
//! 每个周期依次处理事件、轮询流程定时器、读取遥测、计算 PID、
//! 发送脉冲序列、发布状态快照。
//!
//! 使用绝对时间锚点消除累积漂移；任务超时（overrun）时告警并
//! 重置锚点追赶，不睡眠。脉冲发送是有界阻塞操作，周期大于
//! 帧传输时长即安全。

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, error, info, warn};

use spincoat_control::{CoatingProcess, ConfigStore, Debouncer, SpeedController};

use crate::error::DriverError;
use crate::esc::{EscError, EscLink};
use crate::event::CoaterEvent;
use crate::state::{CoaterSnapshot, Observer};

/// 控制循环配置
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 控制周期（必须大于单帧传输时长）
    pub control_period: Duration,
    /// 停机复位阈值：setpoint 为 0 且测量转速低于该值时，
    /// 强制零油门并复位控制器，消除停机积分残留
    pub windup_reset_rpm: f64,
    /// 连续发送失败容忍上限，超过后控制循环退出
    pub max_consecutive_failures: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            control_period: Duration::from_millis(1),
            windup_reset_rpm: 1000.0,
            max_consecutive_failures: 50,
        }
    }
}

/// 控制循环主体（控制线程入口）
///
/// 退出条件：收到 [`CoaterEvent::Shutdown`]、事件通道断开、
/// 或连续发送失败超过容忍上限。正常退出前发送一帧零油门。
pub(crate) fn control_loop(
    mut esc: EscLink,
    mut process: CoatingProcess,
    mut pid: SpeedController,
    events: Receiver<CoaterEvent>,
    observer: Observer,
    store: Option<Box<dyn ConfigStore>>,
    config: PipelineConfig,
) -> Result<(), DriverError> {
    let mut debouncer = Debouncer::default();
    let mut measured_rpm = 0.0f64;
    let mut last_voltage = 0.0f64;
    let mut last_temperature = 0u8;
    let mut failures = 0u32;
    let mut last_update = Instant::now();
    let mut next_tick = Instant::now();

    info!(period = ?config.control_period, "control loop started");

    loop {
        next_tick += config.control_period;
        let now = Instant::now();

        // 1. 事件（去抖后的确认边沿才会触碰流程状态）
        loop {
            match events.try_recv() {
                Ok(CoaterEvent::Confirm { at }) => {
                    if debouncer.accept(at) {
                        process.confirm(now);
                    }
                }
                Ok(CoaterEvent::Stop) => process.stop(),
                Ok(CoaterEvent::UpdateConfig(new_config)) => {
                    process.set_config(new_config);
                    pid.set_gains(new_config.pid);
                    // 编辑流程完成 => 触发外部持久化；失败不致命
                    if let Some(store) = &store {
                        if let Err(e) = store.save(&new_config) {
                            warn!(error = %e, "config persist failed");
                        }
                    }
                }
                Ok(CoaterEvent::Shutdown) => {
                    info!("shutdown requested");
                    let _ = esc.send_throttle(0.0, false);
                    return Ok(());
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("event channel disconnected, stopping control loop");
                    let _ = esc.send_throttle(0.0, false);
                    return Ok(());
                }
            }
        }

        // 2. 流程定时器（到期与倒数同源轮询，取消是原子的）
        process.tick(now);
        pid.set_setpoint(process.target_rpm());

        // 3. 遥测：无新样本时保持上一次测量值继续计算，不停转
        match esc.poll_telemetry() {
            Ok(Some(frame)) => {
                measured_rpm = frame.rpm(esc.motor_poles());
                last_voltage = frame.voltage;
                last_temperature = frame.temperature;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "telemetry read failed"),
        }

        // 4. PID（实际经过时长为 dt，与锚点周期解耦）
        let dt = now.duration_since(last_update);
        last_update = now;
        let mut throttle = pid.update(measured_rpm, dt);

        // 停机且转速衰减至近零后，从干净状态迎接下一个周期
        if pid.setpoint() == 0.0 && measured_rpm < config.windup_reset_rpm {
            throttle = 0.0;
            pid.reset();
        }

        // 5. 发送（瞬时失败容忍，连续失败退出）
        match esc.send_throttle(throttle, true) {
            Ok(()) => failures = 0,
            Err(e) => {
                failures += 1;
                if failures > config.max_consecutive_failures {
                    error!(count = failures, error = %e, "aborting control loop");
                    return Err(DriverError::ConsecutiveFailures {
                        count: failures,
                        last_error: e,
                    });
                }
                warn!(count = failures, error = %e, "transient ESC write failure");
            }
        }

        // 6. 快照发布（显示侧无锁读取）
        observer.publish(CoaterSnapshot {
            stage: process.stage(),
            measured_rpm,
            target_rpm: process.target_rpm(),
            throttle,
            remaining_s: process.remaining_seconds(),
            voltage: last_voltage,
            temperature_c: last_temperature,
        });

        // 7. 睡眠到下一个锚点；overrun 时重置锚点追赶
        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
        } else {
            warn!(
                late = ?now.duration_since(next_tick),
                "control loop overrun, resetting anchor"
            );
            next_tick = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use spincoat_control::{CoaterConfig, PidGains};
    use spincoat_protocol::PulseTrain;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::esc::{EscLinkConfig, PulseOutput, TelemetrySource};

    /// 总是失败的脉冲输出：验证连续失败退出路径
    struct FailingOutput;
    impl PulseOutput for FailingOutput {
        fn write_pulses(&mut self, _train: &PulseTrain) -> Result<(), EscError> {
            Err(EscError::Output("simulated failure".into()))
        }
    }

    struct SilentTelemetry;
    impl TelemetrySource for SilentTelemetry {
        fn read_available(&mut self, _buf: &mut Vec<u8>) -> Result<usize, EscError> {
            Ok(0)
        }
    }

    /// 计数脉冲输出：验证正常退出路径发送了最后一帧零油门
    struct CountingOutput(Arc<AtomicU32>);
    impl PulseOutput for CountingOutput {
        fn write_pulses(&mut self, _train: &PulseTrain) -> Result<(), EscError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn test_pipeline_config() -> PipelineConfig {
        PipelineConfig {
            control_period: Duration::from_millis(1),
            windup_reset_rpm: 1000.0,
            max_consecutive_failures: 5,
        }
    }

    #[test]
    fn test_consecutive_write_failures_abort_loop() {
        let esc = EscLink::new(
            Box::new(FailingOutput),
            Box::new(SilentTelemetry),
            EscLinkConfig::default(),
        );
        let (_tx, rx) = bounded(4);
        let result = control_loop(
            esc,
            CoatingProcess::new(CoaterConfig::default()),
            SpeedController::new(PidGains::default()),
            rx,
            Observer::new(),
            None,
            test_pipeline_config(),
        );
        assert!(matches!(
            result,
            Err(DriverError::ConsecutiveFailures { count: 6, .. })
        ));
    }

    #[test]
    fn test_shutdown_sends_final_zero_throttle() {
        let writes = Arc::new(AtomicU32::new(0));
        let esc = EscLink::new(
            Box::new(CountingOutput(writes.clone())),
            Box::new(SilentTelemetry),
            EscLinkConfig::default(),
        );
        let (tx, rx) = bounded(4);
        tx.send(CoaterEvent::Shutdown).unwrap();

        let result = control_loop(
            esc,
            CoatingProcess::new(CoaterConfig::default()),
            SpeedController::new(PidGains::default()),
            rx,
            Observer::new(),
            None,
            test_pipeline_config(),
        );
        assert!(result.is_ok());
        assert_eq!(writes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_channel_disconnect_stops_loop() {
        let esc = EscLink::new(
            Box::new(CountingOutput(Arc::new(AtomicU32::new(0)))),
            Box::new(SilentTelemetry),
            EscLinkConfig::default(),
        );
        let (tx, rx) = bounded::<CoaterEvent>(4);
        drop(tx);

        let result = control_loop(
            esc,
            CoatingProcess::new(CoaterConfig::default()),
            SpeedController::new(PidGains::default()),
            rx,
            Observer::new(),
            None,
            test_pipeline_config(),
        );
        assert!(result.is_ok());
    }
}
