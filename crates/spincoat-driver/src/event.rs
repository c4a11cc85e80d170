//! 控制线程事件定义
//!
//! UI / 中断侧是流程事件的唯一生产者；事件经有界通道进入控制线程，
//! 由控制线程统一应用，保证流程状态只有一个写者。

use std::time::Instant;

use spincoat_control::CoaterConfig;

/// 投递给控制线程的事件
#[derive(Debug, Clone)]
pub enum CoaterEvent {
    /// 确认按键的原始边沿（去抖在控制线程内完成，
    /// 稳定窗口内的重复边沿不会触碰流程状态）
    Confirm { at: Instant },

    /// 手动停止当前流程
    Stop,

    /// 编辑流程完成：应用新配置并触发外部持久化
    UpdateConfig(CoaterConfig),

    /// 退出控制循环（先发一帧零油门再返回）
    Shutdown,
}
