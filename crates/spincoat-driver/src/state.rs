//! 共享状态快照（ArcSwap 无锁读取）
//!
//! 控制线程每个周期整体发布一份 [`CoaterSnapshot`]；
//! 显示侧通过 [`Observer`] 以 `ArcSwap::load` 读取，无锁、无阻塞。
//! 快照是唯一跨线程共享的读路径，写者只有控制线程一个。

use std::sync::Arc;

use arc_swap::ArcSwap;

use spincoat_control::ProcessStage;

/// 对外可见的运行状态快照
///
/// UI 边界只读消费 `{measured_rpm, remaining_s, stage}`；
/// 其余字段供诊断显示（电压、温度来自最近一帧有效遥测）。
#[derive(Debug, Clone, Copy, Default)]
pub struct CoaterSnapshot {
    /// 流程阶段
    pub stage: ProcessStage,
    /// 最近接受的遥测换算转速（RPM），遥测丢失时保持陈旧值
    pub measured_rpm: f64,
    /// 当前目标转速（RPM）
    pub target_rpm: f64,
    /// 最近一次发送的油门值 [0, 1]
    pub throttle: f64,
    /// 涂布剩余秒数
    pub remaining_s: u32,
    /// 最近遥测电压（V）
    pub voltage: f64,
    /// 最近遥测温度（°C）
    pub temperature_c: u8,
}

/// 状态观察器（可廉价 Clone 的读句柄）
#[derive(Clone)]
pub struct Observer {
    inner: Arc<ArcSwap<CoaterSnapshot>>,
}

impl Observer {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(CoaterSnapshot::default())),
        }
    }

    /// 无锁读取当前快照
    pub fn snapshot(&self) -> Arc<CoaterSnapshot> {
        self.inner.load_full()
    }

    /// 控制线程整体发布新快照
    pub(crate) fn publish(&self, snapshot: CoaterSnapshot) {
        self.inner.store(Arc::new(snapshot));
    }
}
