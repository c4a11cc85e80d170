//! # Spincoat CLI
//!
//! 旋涂机命令行工具：
//!
//! ```bash
//! # 查看 / 编辑工艺配置
//! spincoat-cli config show
//! spincoat-cli config set --coating-rpm 4000 --coating-time 90
//!
//! # 对模拟 ESC 跑一个完整涂布流程
//! spincoat-cli run
//! ```
//!
//! 真实硬件后端通过 `spincoat-driver` 的 `PulseOutput` /
//! `TelemetrySource` 边界接入；本工具自带的后端是模拟 ESC。

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod run;
mod store;

use spincoat_control::{CoaterConfig, ConfigStore};
use store::TomlConfigStore;

/// Spincoat CLI - 旋涂机命令行工具
#[derive(Parser, Debug)]
#[command(name = "spincoat-cli")]
#[command(about = "Spin coater process runner and config tool", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径
    #[arg(long, global = true, default_value = "spincoat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 跑一个完整涂布流程（模拟 ESC）
    Run,

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// 打印当前配置
    Show,

    /// 修改配置字段并持久化
    Set {
        /// 滴注转速（RPM）
        #[arg(long)]
        deposit_rpm: Option<f64>,
        /// 涂布转速（RPM）
        #[arg(long)]
        coating_rpm: Option<f64>,
        /// 涂布时长（秒）
        #[arg(long)]
        coating_time: Option<u32>,
        /// 转速环 Kp
        #[arg(long)]
        kp: Option<f64>,
        /// 转速环 Ki
        #[arg(long)]
        ki: Option<f64>,
        /// 转速环 Kd
        #[arg(long)]
        kd: Option<f64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let store = TomlConfigStore::new(cli.config);

    match cli.command {
        Commands::Run => {
            let config = store.load_or_default().context("load config")?;
            run::run(config, store)
        }
        Commands::Config(ConfigCommand::Show) => {
            let config = store.load_or_default().context("load config")?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Config(ConfigCommand::Set {
            deposit_rpm,
            coating_rpm,
            coating_time,
            kp,
            ki,
            kd,
        }) => {
            let mut config = store.load_or_default().context("load config")?;
            apply(&mut config, deposit_rpm, coating_rpm, coating_time, kp, ki, kd);
            store.save(&config).context("save config")?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn apply(
    config: &mut CoaterConfig,
    deposit_rpm: Option<f64>,
    coating_rpm: Option<f64>,
    coating_time: Option<u32>,
    kp: Option<f64>,
    ki: Option<f64>,
    kd: Option<f64>,
) {
    if let Some(v) = deposit_rpm {
        config.deposit_rpm = v;
    }
    if let Some(v) = coating_rpm {
        config.coating_rpm = v;
    }
    if let Some(v) = coating_time {
        config.coating_time_s = v;
    }
    if let Some(v) = kp {
        config.pid.kp = v;
    }
    if let Some(v) = ki {
        config.pid.ki = v;
    }
    if let Some(v) = kd {
        config.pid.kd = v;
    }
}
