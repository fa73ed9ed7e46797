//! 状态监控命令

use super::config::load_config;
use anyhow::Result;
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use turret_sdk::{DriverError, TurretBuilder};

/// 监控命令参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 串口路径（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 波特率（覆盖配置）
    #[arg(short, long)]
    pub baud_rate: Option<u32>,

    /// 打印频率（Hz）
    #[arg(short, long, default_value_t = 10)]
    pub frequency: u32,
}

impl MonitorCommand {
    pub fn execute(&self, config_path: &Path) -> Result<()> {
        let config = load_config(config_path)?;
        let port = self.port.clone().unwrap_or(config.serial.port);
        let baud_rate = self.baud_rate.unwrap_or(config.serial.baud_rate);

        println!("⏳ 打开串口 {} @ {} ...", port, baud_rate);
        let mut turret = TurretBuilder::new().port(&port).baud_rate(baud_rate).build()?;
        println!("✅ 已连接");
        println!("按 Ctrl+C 停止\n");

        // 设置 Ctrl+C 处理
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
        })?;

        let interval = Duration::from_secs_f64(1.0 / self.frequency.max(1) as f64);
        let mut last_print: Option<Instant> = None;

        while running.load(Ordering::SeqCst) {
            let snapshot = match turret.update() {
                Ok(snapshot) => snapshot,
                Err(DriverError::Timeout) => {
                    println!("⚠️  等待状态帧超时");
                    continue;
                },
                Err(e) => return Err(e.into()),
            };

            if let Some(last) = last_print {
                std::thread::sleep(interval.saturating_sub(last.elapsed()));
            }
            last_print = Some(Instant::now());

            let status = snapshot.status.status;
            println!(
                "#{:<3} yaw {:>8.2}°  pitch {:>7.2}°  speed {:>5.2} m/s  mode {:?}  team {:?}  id {}",
                status.stamp,
                status.yaw_degree,
                status.pitch_degree,
                snapshot.bullet_speed,
                snapshot.work_mode(),
                snapshot.team(),
                snapshot.robot_id(),
            );
        }

        let metrics = turret.metrics();
        println!("\n收到退出信号，正在关闭...");
        println!(
            "📊 有效帧 {}  校验错误 {}  哨兵错误 {}  短读 {}  重连 {}",
            metrics.rx_frames_valid,
            metrics.rx_bad_checksum,
            metrics.rx_bad_sentinel,
            metrics.rx_short_reads,
            metrics.reconnects,
        );
        turret.close();
        println!("✅ 监控已结束");
        Ok(())
    }
}
