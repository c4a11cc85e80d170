//! 完整涂布周期集成测试（模拟 ESC）
//!
//! 验证启动序列（解锁 + 遥测开启）、Idle → Depositing → Coating → Idle
//! 生命周期、到期与手动停止两条返回路径，以及停机后的控制器复位效果。

use std::time::{Duration, Instant};

use spincoat_control::{CoaterConfig, PidGains};
use spincoat_driver::mock::MockEsc;
use spincoat_driver::{Coater, CoaterBuilder, EscLinkConfig, Observer, PipelineConfig};
use spincoat_protocol::DshotCommand;

fn test_config(coating_time_s: u32) -> CoaterConfig {
    CoaterConfig {
        deposit_rpm: 500.0,
        coating_rpm: 3000.0,
        coating_time_s,
        pid: PidGains {
            kp: 0.0001,
            ki: 0.0005,
            kd: 0.0,
        },
    }
}

/// 解锁序列缩短到 50 ms，测试不必等满 3 秒
fn fast_esc_config() -> EscLinkConfig {
    EscLinkConfig {
        arming_duration: Duration::from_millis(50),
        arming_frame_interval: Duration::from_millis(1),
        command_settle: Duration::from_millis(5),
        ..EscLinkConfig::default()
    }
}

fn spawn_coater(esc: &MockEsc, coating_time_s: u32) -> Coater {
    let (output, telemetry) = esc.split();
    CoaterBuilder::new()
        .with_config(test_config(coating_time_s))
        .with_esc_config(fast_esc_config())
        .with_pipeline(PipelineConfig::default())
        .spawn(output, telemetry)
        .expect("spawn control thread")
}

fn wait_until(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

fn wait_for_startup(esc: &MockEsc, observer: &Observer) {
    assert!(
        wait_until(Duration::from_secs(2), || esc.telemetry_enabled()),
        "telemetry enable sequence did not complete"
    );
    // 控制循环已在发布快照
    assert!(wait_until(Duration::from_secs(1), || {
        observer.snapshot().throttle == 0.0
    }));
}

#[test]
fn full_cycle_with_timer_expiry() {
    let esc = MockEsc::new(10_000.0, 0.05);
    let coater = spawn_coater(&esc, 2);
    let observer = coater.observer().clone();

    wait_for_startup(&esc, &observer);

    // 解锁序列：ESC 必须先收到持续的 disarmed 帧
    assert!(esc.disarmed_frames() >= 20, "got {}", esc.disarmed_frames());
    // 遥测开启命令按约定重复了 6 次
    let enable = u16::from(DshotCommand::SignalLineContinuousErpmTelemetry);
    assert_eq!(esc.commands().iter().filter(|&&c| c == enable).count(), 6);

    // Idle -> Depositing
    coater.confirm().unwrap();
    assert!(wait_until(Duration::from_secs(1), || {
        observer.snapshot().stage == spincoat_control::ProcessStage::Depositing
    }));
    let snap = observer.snapshot();
    assert_eq!(snap.target_rpm, 500.0);

    // 闭环生效：转速向滴注目标爬升
    assert!(wait_until(Duration::from_secs(2), || {
        observer.snapshot().measured_rpm > 300.0
    }));

    // Depositing -> Coating
    coater.confirm().unwrap();
    assert!(wait_until(Duration::from_secs(1), || {
        observer.snapshot().stage == spincoat_control::ProcessStage::Coating
    }));
    let snap = observer.snapshot();
    assert_eq!(snap.target_rpm, 3000.0);
    assert!(snap.remaining_s <= 2);

    assert!(wait_until(Duration::from_secs(2), || {
        observer.snapshot().measured_rpm > 1500.0
    }));

    // 到期：自动回到 Idle，目标清零
    assert!(wait_until(Duration::from_secs(4), || {
        observer.snapshot().stage == spincoat_control::ProcessStage::Idle
    }));
    let snap = observer.snapshot();
    assert_eq!(snap.target_rpm, 0.0);
    assert_eq!(snap.remaining_s, 0);

    // 停机复位：转速衰减后油门强制归零
    assert!(wait_until(Duration::from_secs(2), || {
        let s = observer.snapshot();
        s.measured_rpm < 1000.0 && s.throttle == 0.0
    }));

    coater.shutdown().unwrap();
}

#[test]
fn manual_stop_returns_to_idle_immediately() {
    let esc = MockEsc::new(10_000.0, 0.05);
    let coater = spawn_coater(&esc, 60);
    let observer = coater.observer().clone();

    wait_for_startup(&esc, &observer);

    coater.confirm().unwrap();
    std::thread::sleep(Duration::from_millis(100));
    coater.confirm().unwrap();
    assert!(wait_until(Duration::from_secs(1), || {
        observer.snapshot().stage == spincoat_control::ProcessStage::Coating
    }));

    coater.stop().unwrap();
    assert!(wait_until(Duration::from_secs(1), || {
        observer.snapshot().stage == spincoat_control::ProcessStage::Idle
    }));

    // 取消必须同时覆盖倒数与到期：停止后快照不得再出现 Coating
    std::thread::sleep(Duration::from_millis(1500));
    let snap = observer.snapshot();
    assert_eq!(snap.stage, spincoat_control::ProcessStage::Idle);
    assert_eq!(snap.remaining_s, 0);

    coater.shutdown().unwrap();
}

#[test]
fn confirm_edges_inside_settle_window_are_ignored() {
    let esc = MockEsc::new(10_000.0, 0.05);
    let coater = spawn_coater(&esc, 60);
    let observer = coater.observer().clone();

    wait_for_startup(&esc, &observer);

    // 同一次按键抖动出的连续边沿：时间戳几乎相同，只有第一个生效
    coater.confirm().unwrap();
    coater.confirm().unwrap();
    coater.confirm().unwrap();

    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(
        observer.snapshot().stage,
        spincoat_control::ProcessStage::Depositing
    );

    coater.shutdown().unwrap();
}
