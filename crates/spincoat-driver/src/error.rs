//! 运行时层错误类型定义

use thiserror::Error;

use crate::esc::EscError;

/// 运行时层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// ESC 链路错误
    #[error("ESC link error: {0}")]
    Esc(#[from] EscError),

    /// 事件通道已关闭（控制线程退出）
    #[error("Event channel closed")]
    ChannelClosed,

    /// 事件通道已满
    #[error("Event channel full (buffer size: {capacity})")]
    ChannelFull { capacity: usize },

    /// 连续发送失败超过容忍上限
    #[error("Consecutive ESC write failures: {count}, last error: {last_error}")]
    ConsecutiveFailures {
        count: u32,
        #[source]
        last_error: EscError,
    },

    /// 控制线程 panic
    #[error("Control thread panicked")]
    ThreadPanicked,
}
