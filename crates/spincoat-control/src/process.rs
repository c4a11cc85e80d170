//! 涂布流程状态机
//!
//! ```text
//! Idle --confirm--> Depositing --confirm--> Coating --到时/手动停止--> Idle
//! ```
//!
//! 原设计中的两个定时器（一次性到期 + 周期性倒数）在这里是
//! [`CoatingTimers`] 中的两个显式截止时间字段，由 `tick(now)` 协作式轮询。
//! 两者同属一个 `Option` 字段，停止流程即单次赋值同时取消，
//! 不存在变更阶段之后仍然触发的游离倒数回调。

use std::time::{Duration, Instant};

use tracing::info;

use crate::config::CoaterConfig;

/// 流程阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessStage {
    /// 电机停止，目标转速 0
    #[default]
    Idle,
    /// 滴注：低速定值旋转，等待用户确认
    Depositing,
    /// 涂布：闭环目标为配置转速，倒计时运行中
    Coating,
}

/// 涂布阶段的两个截止时间（到期 + 下一次倒数）
///
/// 必须作为整体创建和销毁。
#[derive(Debug, Clone, Copy)]
struct CoatingTimers {
    /// 一次性到期时刻
    expires_at: Instant,
    /// 下一次 1 秒倒数时刻
    next_countdown: Instant,
}

/// 涂布流程状态机
///
/// 设备运行期内唯一存活实例，仅由其持有者（控制循环线程）变更。
/// 阶段转换只发生在显式的确认事件或定时器到期，乱序确认是空操作。
#[derive(Debug)]
pub struct CoatingProcess {
    config: CoaterConfig,
    stage: ProcessStage,
    target_rpm: f64,
    remaining_s: u32,
    timers: Option<CoatingTimers>,
}

impl CoatingProcess {
    pub fn new(config: CoaterConfig) -> Self {
        Self {
            config,
            stage: ProcessStage::Idle,
            target_rpm: 0.0,
            remaining_s: 0,
            timers: None,
        }
    }

    // ==================== 只读访问（UI 边界） ====================

    pub fn stage(&self) -> ProcessStage {
        self.stage
    }

    /// 当前目标转速（RPM），控制循环据此设置转速环目标
    pub fn target_rpm(&self) -> f64 {
        self.target_rpm
    }

    /// 涂布剩余秒数（非涂布阶段为 0）
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_s
    }

    pub fn config(&self) -> &CoaterConfig {
        &self.config
    }

    // ==================== 事件 ====================

    /// 替换工艺配置
    ///
    /// 运行中的周期保持已锁存的目标转速与倒计时，新值从下一次转换生效。
    pub fn set_config(&mut self, config: CoaterConfig) {
        self.config = config;
    }

    /// 用户确认事件（已去抖的边沿）
    pub fn confirm(&mut self, now: Instant) {
        match self.stage {
            ProcessStage::Idle => {
                // 滴注用低速定值启动，温和开始点料
                self.stage = ProcessStage::Depositing;
                self.target_rpm = self.config.deposit_rpm;
                info!(deposit_rpm = self.target_rpm, "process: idle -> depositing");
            }
            ProcessStage::Depositing => {
                self.stage = ProcessStage::Coating;
                self.target_rpm = self.config.coating_rpm;
                self.remaining_s = self.config.coating_time_s;
                let coating_time = Duration::from_secs(self.config.coating_time_s as u64);
                self.timers = Some(CoatingTimers {
                    expires_at: now + coating_time,
                    next_countdown: now + Duration::from_secs(1),
                });
                info!(
                    coating_rpm = self.target_rpm,
                    coating_time_s = self.remaining_s,
                    "process: depositing -> coating"
                );
            }
            // 涂布中确认等价于手动停止
            ProcessStage::Coating => self.stop(),
        }
    }

    /// 手动停止：回到 Idle，目标清零，两个定时器一并取消
    pub fn stop(&mut self) {
        if self.stage == ProcessStage::Idle {
            return;
        }
        info!(stage = ?self.stage, "process: stop -> idle");
        self.stage = ProcessStage::Idle;
        self.target_rpm = 0.0;
        self.remaining_s = 0;
        self.timers = None;
    }

    /// 轮询定时器（每个控制周期调用一次）
    ///
    /// 先判到期再推倒数，到期路径丢弃整个定时器记录，
    /// 不会出现阶段已回到 Idle 之后的倒数递减。
    pub fn tick(&mut self, now: Instant) {
        let Some(mut timers) = self.timers else {
            return;
        };

        if now >= timers.expires_at {
            info!("process: coating time elapsed");
            self.stop();
            return;
        }

        while now >= timers.next_countdown {
            self.remaining_s = self.remaining_s.saturating_sub(1);
            timers.next_countdown += Duration::from_secs(1);
        }
        self.timers = Some(timers);
    }
}
