//! 瞄准命令发送

use super::config::load_config;
use anyhow::Result;
use clap::Args;
use std::path::Path;
use std::time::Duration;
use turret_sdk::TurretBuilder;
use turret_sdk::protocol::{AimCommand, FireFlag};

/// 发送命令参数
#[derive(Args, Debug)]
pub struct SendCommand {
    /// 瞄准点 x（毫米）
    #[arg(long, allow_hyphen_values = true)]
    pub x: f64,

    /// 瞄准点 y（毫米，向下为正）
    #[arg(long, allow_hyphen_values = true)]
    pub y: f64,

    /// 瞄准点 z（毫米）
    #[arg(long, allow_hyphen_values = true)]
    pub z: f64,

    /// 开火
    #[arg(long)]
    pub fire: bool,

    /// 串口路径（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 只打印帧，不打开串口
    #[arg(long)]
    pub dry_run: bool,
}

impl SendCommand {
    pub fn command(&self) -> AimCommand {
        let flag = if self.fire { FireFlag::Fire } else { FireFlag::Idle };
        AimCommand::new(self.x, self.y, self.z, flag)
    }

    pub fn execute(&self, config_path: &Path) -> Result<()> {
        let command = self.command();
        println!(
            "帧: {}  (x={} y={} z={} flag={:?})",
            hex::encode_upper(command.to_frame()),
            command.x_mm,
            command.y_mm,
            command.z_mm,
            command.flag
        );
        if self.dry_run {
            return Ok(());
        }

        let config = load_config(config_path)?;
        let port = self.port.clone().unwrap_or(config.serial.port);
        let turret = TurretBuilder::new()
            .port(&port)
            .baud_rate(config.serial.baud_rate)
            .build()?;
        turret.send_command(command)?;

        // 等 TX 线程写出
        std::thread::sleep(Duration::from_millis(50));
        let sent = turret.metrics().tx_frames_sent;
        turret.close();
        if sent == 0 {
            anyhow::bail!("命令未写出（串口 {}）", port);
        }
        println!("✅ 已发送到 {}", port);
        Ok(())
    }
}
