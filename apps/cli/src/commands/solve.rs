//! 离线弹道解算

use super::config::load_config;
use anyhow::Result;
use clap::Args;
use nalgebra::Vector3;
use std::path::Path;
use turret_sdk::ballistics::{AdjustOptions, ProjectileKind};
use turret_sdk::trajectory_adjust;

/// 解算命令参数
#[derive(Args, Debug)]
pub struct SolveCommand {
    /// 目标 x（毫米，IMU 坐标系）
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub x: f64,

    /// 目标 y（毫米，向下为正）
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub y: f64,

    /// 目标 z（毫米）
    #[arg(long, allow_hyphen_values = true)]
    pub z: f64,

    /// 弹速（m/s）
    #[arg(short, long, default_value_t = 15.0)]
    pub speed: f64,

    /// 启用空气阻力（覆盖配置）
    #[arg(long)]
    pub drag: bool,

    /// 使用 42 mm 大弹丸参数（覆盖配置）
    #[arg(long)]
    pub large: bool,
}

impl SolveCommand {
    /// 合并配置和命令行参数
    pub fn options(&self, config_path: &Path) -> Result<AdjustOptions> {
        let mut settings = load_config(config_path)?.ballistics;
        if self.drag {
            settings.air_resistance = true;
        }
        if self.large {
            settings.projectile = ProjectileKind::Large42mm;
        }
        Ok(settings.adjust_options())
    }

    pub fn execute(&self, config_path: &Path) -> Result<()> {
        let options = self.options(config_path)?;
        let target = Vector3::new(self.x, self.y, self.z);
        let distance = self.x.hypot(self.z);

        let solution = options.solve(distance, -self.y, self.speed)?;
        let aim = trajectory_adjust(&target, self.speed, &options)?;

        let model = match options.air_resistance {
            Some(model) => format!("drag k/m = {:.4} 1/m", model.per_mass()),
            None => "gravity only".to_string(),
        };
        println!("模型: {}", model);
        println!("水平距离: {:.1} mm", distance);
        println!("俯仰角: {:.3}°", solution.pitch_degree);
        println!("飞行时间: {:.3} s", solution.flight_time_s);
        println!("瞄准点: ({:.1}, {:.1}, {:.1}) mm", aim.x, aim.y, aim.z);
        Ok(())
    }
}

impl Default for SolveCommand {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 5000.0,
            speed: 15.0,
            drag: false,
            large: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turret_sdk::ballistics::SolverOptions;

    #[test]
    fn test_flags_override_config() {
        let missing = Path::new("/nonexistent/turret/config.toml");
        let options = SolveCommand::default().options(missing).unwrap();
        assert_eq!(options.air_resistance, None);
        assert_eq!(options.solver.max_iterations, SolverOptions::default().max_iterations);

        let cmd = SolveCommand {
            drag: true,
            large: true,
            ..SolveCommand::default()
        };
        let options = cmd.options(missing).unwrap();
        assert_eq!(options.air_resistance, Some(ProjectileKind::Large42mm.drag_model()));
    }

    #[test]
    fn test_solve_reachable_and_unreachable() {
        let missing = Path::new("/nonexistent/turret/config.toml");
        assert!(SolveCommand::default().execute(missing).is_ok());

        let far = SolveCommand {
            z: 60_000.0,
            ..SolveCommand::default()
        };
        assert!(far.execute(missing).is_err());
    }
}
