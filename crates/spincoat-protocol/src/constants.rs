//! 协议常量定义
//!
//! 时序常量来自原固件使用的 RMT 外设配置（80 MHz 时钟，分频 7），
//! 对应单个 tick 87.5 ns。协议速率等级由这些数值隐式确定，
//! 此处作为可配置常量处理，而非经过验证的协议规范。

use std::time::Duration;

// ==================== 脉冲时序（单位：RMT tick） ====================

/// 逻辑 1 的高电平时长
pub const T1H_TICKS: u16 = 57;

/// 逻辑 0 的高电平时长
pub const T0H_TICKS: u16 = 29;

/// 单个比特的总时长
pub const BIT_TICKS: u16 = 76;

/// 帧间隔：附加在最后一个比特低电平段之后
pub const FRAME_GAP_TICKS: u16 = 240;

/// 每帧比特数（11 位载荷 + 1 位遥测请求 + 4 位校验）
pub const FRAME_BITS: usize = 16;

// ==================== 载荷范围 ====================

/// 解锁（disarmed）载荷
pub const PAYLOAD_DISARMED: u16 = 0;

/// 特殊命令载荷上限（1..=47 保留给命令）
pub const PAYLOAD_COMMAND_MAX: u16 = 47;

/// 油门载荷下限
pub const PAYLOAD_THROTTLE_MIN: u16 = 48;

/// 油门载荷上限
pub const PAYLOAD_THROTTLE_MAX: u16 = 2047;

/// 油门分辨率（48..=2047 共 2000 档）
pub const THROTTLE_STEPS: f64 = 2000.0;

// ==================== ESC 行为常量 ====================

/// 解锁序列时长：ESC 在接受油门前要求连续收到该时长的 disarmed 帧
pub const ARMING_DURATION: Duration = Duration::from_secs(3);

/// 解锁期间 disarmed 帧的发送间隔
pub const ARMING_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// 每个特殊命令需要重复发送的次数（BLHeli 约定）
pub const COMMAND_REPEAT: usize = 6;

/// 命令序列发送完毕后的稳定等待时间
pub const COMMAND_SETTLE: Duration = Duration::from_millis(12);

/// 默认电机极数（机械转速 = 电气转速 / 极对数）
pub const DEFAULT_MOTOR_POLES: u32 = 14;

/// 遥测帧长度（字节）
pub const TELEMETRY_FRAME_LEN: usize = 10;
