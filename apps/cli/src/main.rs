//! # Turret CLI
//!
//! 云台串口链路调试与弹道解算工具。
//!
//! ```bash
//! # 查看当前配置（默认 ~/.config/turret/config.toml）
//! turret-cli config show
//!
//! # 监控下位机状态，Ctrl+C 退出
//! turret-cli monitor --port /dev/ttyUSB0
//!
//! # 发送一条瞄准命令（先打印帧内容）
//! turret-cli send --x 0 --y -200 --z 5000 --fire
//!
//! # 离线解算俯仰角
//! turret-cli solve --z 6000 --y -300 --speed 15 --drag
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{ConfigCommand, MonitorCommand, SendCommand, SolveCommand};

/// Turret CLI - 云台命令行工具
#[derive(Parser, Debug)]
#[command(name = "turret-cli")]
#[command(about = "Command-line interface for the turret serial link and ballistic solver", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/turret/config.toml）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 监控下位机状态
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },

    /// 发送一条瞄准命令
    Send {
        #[command(flatten)]
        args: SendCommand,
    },

    /// 解算俯仰角和补偿后的瞄准点
    Solve {
        #[command(flatten)]
        args: SolveCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    turret_sdk::init_logging_with("turret_cli=info,info");

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => commands::config::default_config_path()?,
    };

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&config_path),
        Commands::Monitor { args } => args.execute(&config_path),
        Commands::Send { args } => args.execute(&config_path),
        Commands::Solve { args } => args.execute(&config_path),
    }
}
