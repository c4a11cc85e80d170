//! 转速 PID 控制器
//!
//! 实现经典的比例-积分-微分控制算法，输出为 [0, 1] 区间的油门值。
//!
//! # 算法
//!
//! ```text
//! output = Kp * e + Ki * ∫e dt + Kd * de/dt
//! ```
//!
//! 其中 `e` = 目标转速 - 测量转速。
//!
//! # 抗积分饱和
//!
//! 采用钳位法（clamping）：当未钳位输出已越过输出边界时，
//! 本周期不再累积积分项，避免饱和期间积分持续增长导致的恢复滞后。

use std::time::Duration;

use crate::config::PidGains;

/// 输出下限（油门）
const OUTPUT_MIN: f64 = 0.0;

/// 输出上限（油门）
const OUTPUT_MAX: f64 = 1.0;

/// 转速闭环控制器
///
/// 由电机控制活动独占持有；`reset()` 清零积分累积量与上一周期误差。
#[derive(Debug, Clone)]
pub struct SpeedController {
    gains: PidGains,
    setpoint: f64,
    integral: f64,
    prev_error: Option<f64>,
}

impl SpeedController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            setpoint: 0.0,
            integral: 0.0,
            prev_error: None,
        }
    }

    /// 当前目标转速（RPM）
    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// 设置目标转速（RPM）
    pub fn set_setpoint(&mut self, rpm: f64) {
        self.setpoint = rpm;
    }

    /// 替换增益（配置编辑后生效），并清除控制历史
    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
        self.reset();
    }

    /// 清零积分累积量与上一周期误差
    ///
    /// 停机后（setpoint == 0 且测量转速衰减至近零）必须调用，
    /// 使下一个涂布周期从干净的控制状态启动，而非继承停机时的积分饱和。
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }

    /// 单步控制计算
    ///
    /// 以固定短周期调用，与遥测到达解耦：没有新样本时，
    /// 调用方直接以最近一次的测量值重新计算，而不是停转。
    pub fn update(&mut self, measured_rpm: f64, dt: Duration) -> f64 {
        let dt_s = dt.as_secs_f64();
        let error = self.setpoint - measured_rpm;

        let p = self.gains.kp * error;

        // 先试算本周期的积分项，输出饱和时不提交（钳位抗饱和）
        let candidate_integral = self.integral + self.gains.ki * error * dt_s;

        let d = match (self.prev_error, dt_s > 0.0) {
            (Some(prev), true) => self.gains.kd * (error - prev) / dt_s,
            _ => 0.0,
        };
        self.prev_error = Some(error);

        let unclamped = p + candidate_integral + d;
        if (OUTPUT_MIN..=OUTPUT_MAX).contains(&unclamped) {
            self.integral = candidate_integral;
        }

        unclamped.clamp(OUTPUT_MIN, OUTPUT_MAX)
    }
}
