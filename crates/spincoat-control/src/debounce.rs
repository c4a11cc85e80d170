//! 确认按键去抖
//!
//! 无状态重装的去抖方案：记录上一次接受的边沿时间戳，
//! 对每个原始边沿做最小间隔检查，与中断源的使能状态无关。
//! 稳定窗口内的后续边沿直接忽略，不会触碰流程状态。

use std::time::{Duration, Instant};

/// 默认稳定窗口
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(20);

/// 边沿去抖器
#[derive(Debug)]
pub struct Debouncer {
    settle: Duration,
    last_edge: Option<Instant>,
}

impl Debouncer {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            last_edge: None,
        }
    }

    /// 评估一个原始边沿：落在稳定窗口外则接受并推进时间戳
    pub fn accept(&mut self, now: Instant) -> bool {
        match self.last_edge {
            Some(last) if now.duration_since(last) < self.settle => false,
            _ => {
                self.last_edge = Some(now);
                true
            }
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_edge_accepted() {
        let mut d = Debouncer::default();
        assert!(d.accept(Instant::now()));
    }

    #[test]
    fn test_edges_inside_settle_window_rejected() {
        let mut d = Debouncer::default();
        let t0 = Instant::now();
        assert!(d.accept(t0));
        assert!(!d.accept(t0 + Duration::from_millis(5)));
        assert!(!d.accept(t0 + Duration::from_millis(19)));
        assert!(d.accept(t0 + Duration::from_millis(21)));
    }

    #[test]
    fn test_window_anchored_to_last_accepted_edge() {
        let mut d = Debouncer::new(Duration::from_millis(20));
        let t0 = Instant::now();
        assert!(d.accept(t0));
        // 被拒绝的边沿不得刷新窗口
        assert!(!d.accept(t0 + Duration::from_millis(10)));
        assert!(d.accept(t0 + Duration::from_millis(20)));
    }
}
