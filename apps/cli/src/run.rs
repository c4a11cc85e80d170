//! `run` 子命令：对模拟 ESC 跑一个完整涂布流程
//!
//! 控制线程之外再起一个显示活动（33 ms 周期），
//! 通过 Observer 只读消费 `{measured_rpm, remaining_seconds, stage}`。
//! 回车 = 确认按键边沿，`stop` = 手动停止，Ctrl-C = 退出。

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use spincoat_control::{CoaterConfig, ProcessStage};
use spincoat_driver::mock::MockEsc;
use spincoat_driver::{CoaterBuilder, Observer};

use crate::store::TomlConfigStore;

/// 显示刷新周期（与原设备的 OLED 刷新活动一致）
const DISPLAY_PERIOD: Duration = Duration::from_millis(33);

/// 模拟电机满油门稳态转速
const MOCK_MAX_RPM: f64 = 12_000.0;

/// 模拟电机一阶时间常数
const MOCK_TAU_S: f64 = 0.15;

pub fn run(config: CoaterConfig, store: TomlConfigStore) -> Result<()> {
    let esc = MockEsc::new(MOCK_MAX_RPM, MOCK_TAU_S);
    let (output, telemetry) = esc.split();

    info!("spawning control thread (arming takes ~3 s)");
    let coater = CoaterBuilder::new()
        .with_config(config)
        .with_store(Box::new(store))
        .spawn(output, telemetry)
        .context("spawn control thread")?;

    let running = Arc::new(AtomicBool::new(true));
    let ctrlc_flag = running.clone();
    ctrlc::set_handler(move || ctrlc_flag.store(false, Ordering::SeqCst))
        .context("install Ctrl-C handler")?;

    // 显示活动：~30 Hz 只读刷新
    let display_observer = coater.observer().clone();
    let display_running = running.clone();
    let display = thread::spawn(move || display_loop(display_observer, display_running));

    // 输入活动：stdin 行 => 事件
    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines().map_while(Result::ok) {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    println!("spin coater ready: Enter = confirm, 'stop' = manual stop, Ctrl-C = quit");
    while running.load(Ordering::SeqCst) {
        match line_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => match line.trim() {
                "" => coater.confirm()?,
                "stop" => coater.stop()?,
                "quit" => break,
                other => println!("unknown input: {other:?}"),
            },
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    running.store(false, Ordering::SeqCst);
    let _ = display.join();
    println!();
    coater.shutdown()?;
    Ok(())
}

fn display_loop(observer: Observer, running: Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        let snap = observer.snapshot();
        let stage = match snap.stage {
            ProcessStage::Idle => "Idle      ",
            ProcessStage::Depositing => "Depositing",
            ProcessStage::Coating => "Coating   ",
        };
        print!(
            "\r[{stage}] rpm {:7.1} / {:6.0} | throttle {:4.2} | {:4} s left | {:.1} V ",
            snap.measured_rpm, snap.target_rpm, snap.throttle, snap.remaining_s, snap.voltage,
        );
        let _ = io::stdout().flush();
        thread::sleep(DISPLAY_PERIOD);
    }
}
