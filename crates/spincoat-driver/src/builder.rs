//! Coater 句柄与构建器
//!
//! [`CoaterBuilder`] 注入两个硬件边界与配置后 `spawn()`：
//! 控制线程先执行解锁序列与遥测开启命令，再进入 1 kHz 控制循环。
//! [`Coater`] 是 UI 侧句柄：投递事件、读取快照、关停并回收线程。

use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::error;

use spincoat_control::{CoaterConfig, CoatingProcess, ConfigStore, SpeedController};

use crate::error::DriverError;
use crate::esc::{EscLink, EscLinkConfig, PulseOutput, TelemetrySource};
use crate::event::CoaterEvent;
use crate::pipeline::{PipelineConfig, control_loop};
use crate::state::Observer;

/// 事件通道容量
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Coater 构建器
pub struct CoaterBuilder {
    config: CoaterConfig,
    esc_config: EscLinkConfig,
    pipeline: PipelineConfig,
    store: Option<Box<dyn ConfigStore>>,
}

impl CoaterBuilder {
    pub fn new() -> Self {
        Self {
            config: CoaterConfig::default(),
            esc_config: EscLinkConfig::default(),
            pipeline: PipelineConfig::default(),
            store: None,
        }
    }

    /// 工艺配置（通常来自外部加载的持久化记录）
    pub fn with_config(mut self, config: CoaterConfig) -> Self {
        self.config = config;
        self
    }

    /// ESC 链路参数（极数、解锁时长、命令序列）
    pub fn with_esc_config(mut self, esc_config: EscLinkConfig) -> Self {
        self.esc_config = esc_config;
        self
    }

    /// 控制循环参数
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// 配置持久化边界（编辑流程完成后由控制线程触发 `save`）
    pub fn with_store(mut self, store: Box<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 启动控制线程
    ///
    /// 解锁与遥测开启在控制线程内完成（解锁约 3 秒），
    /// `spawn` 本身立即返回。
    pub fn spawn(
        self,
        output: Box<dyn PulseOutput>,
        telemetry: Box<dyn TelemetrySource>,
    ) -> Result<Coater, DriverError> {
        let (tx, rx) = bounded(EVENT_CHANNEL_CAPACITY);
        let observer = Observer::new();

        let thread_observer = observer.clone();
        let handle = thread::Builder::new()
            .name("spincoat-control".into())
            .spawn(move || {
                let result = run_control(
                    output,
                    telemetry,
                    self.esc_config,
                    self.config,
                    rx,
                    thread_observer,
                    self.store,
                    self.pipeline,
                );
                if let Err(e) = &result {
                    error!(error = %e, "control thread exited with error");
                }
                result
            })
            .map_err(|e| DriverError::Esc(crate::esc::EscError::Io(e)))?;

        Ok(Coater {
            events: tx,
            observer,
            handle: Some(handle),
        })
    }
}

impl Default for CoaterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 控制线程主体：启动序列（解锁 + 遥测开启）失败与控制循环
/// 错误走同一条返回路径，由线程闭包统一记录日志
#[allow(clippy::too_many_arguments)]
fn run_control(
    output: Box<dyn PulseOutput>,
    telemetry: Box<dyn TelemetrySource>,
    esc_config: EscLinkConfig,
    config: CoaterConfig,
    events: Receiver<CoaterEvent>,
    observer: Observer,
    store: Option<Box<dyn ConfigStore>>,
    pipeline: PipelineConfig,
) -> Result<(), DriverError> {
    let mut esc = EscLink::new(output, telemetry, esc_config);
    esc.arm()?;
    esc.enable_telemetry()?;

    let process = CoatingProcess::new(config);
    let pid = SpeedController::new(config.pid);
    control_loop(esc, process, pid, events, observer, store, pipeline)
}

/// 运行中的旋涂机句柄（UI 边界）
pub struct Coater {
    events: Sender<CoaterEvent>,
    observer: Observer,
    handle: Option<JoinHandle<Result<(), DriverError>>>,
}

impl Coater {
    /// 确认按键的原始边沿（去抖由控制线程完成）
    pub fn confirm(&self) -> Result<(), DriverError> {
        self.send(CoaterEvent::Confirm { at: Instant::now() })
    }

    /// 手动停止当前流程
    pub fn stop(&self) -> Result<(), DriverError> {
        self.send(CoaterEvent::Stop)
    }

    /// 应用新工艺配置并触发外部持久化
    pub fn update_config(&self, config: CoaterConfig) -> Result<(), DriverError> {
        self.send(CoaterEvent::UpdateConfig(config))
    }

    /// 状态读取句柄（可自由 Clone 给显示侧）
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// 停机并回收控制线程
    pub fn shutdown(mut self) -> Result<(), DriverError> {
        let _ = self.send(CoaterEvent::Shutdown);
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| DriverError::ThreadPanicked)?,
            None => Ok(()),
        }
    }

    fn send(&self, event: CoaterEvent) -> Result<(), DriverError> {
        self.events.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => DriverError::ChannelFull {
                capacity: EVENT_CHANNEL_CAPACITY,
            },
            TrySendError::Disconnected(_) => DriverError::ChannelClosed,
        })
    }
}

impl Drop for Coater {
    fn drop(&mut self) {
        // 尽力而为：未显式 shutdown 时也让控制线程收到退出信号
        let _ = self.events.try_send(CoaterEvent::Shutdown);
    }
}
