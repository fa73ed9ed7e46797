//! 控制循环所需的云台能力
//!
//! [`Turret`] 是唯一的生产实现；测试中用脚本化的实现替换。

use nalgebra::Vector3;
use turret_driver::{DriverError, Orientation, Turret, TurretSnapshot};

/// 云台平台
pub trait AimPlatform {
    /// 等待新的图像和状态
    fn update(&mut self) -> Result<TurretSnapshot, DriverError>;

    /// 查询时刻 `t_us` 的云台姿态
    fn orientation_at(&self, t_us: u64) -> Result<Orientation, DriverError>;

    /// 下发瞄准点（米，IMU 坐标系，y 向下）
    fn shoot(
        &self,
        gun_up_degree: f64,
        gun_right_degree: f64,
        aim_point_m: &Vector3<f64>,
        fire_time_s: Option<f64>,
    ) -> Result<(), DriverError>;
}

impl AimPlatform for Turret {
    fn update(&mut self) -> Result<TurretSnapshot, DriverError> {
        Turret::update(self)
    }

    fn orientation_at(&self, t_us: u64) -> Result<Orientation, DriverError> {
        Turret::orientation_at(self, t_us)
    }

    fn shoot(
        &self,
        gun_up_degree: f64,
        gun_right_degree: f64,
        aim_point_m: &Vector3<f64>,
        fire_time_s: Option<f64>,
    ) -> Result<(), DriverError> {
        Turret::shoot(self, gun_up_degree, gun_right_degree, aim_point_m, fire_time_s)
    }
}
