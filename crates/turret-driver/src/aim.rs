//! 瞄准命令计算
//!
//! 把 IMU 坐标系下的瞄准点（米）转换为发给下位机的命令（毫米），
//! 并叠加枪管相对 IMU 的安装偏差。

use crate::error::DriverError;
use crate::geometry::rotate_about_vertical;
use nalgebra::Vector3;
use turret_protocol::{AimCommand, FireFlag};

/// 计算瞄准命令
///
/// 1. 绕竖直轴旋转 `gun_right_degree`
/// 2. 转换为毫米，水平距离 `d = sqrt(x² + z²)`
/// 3. `y = -d * tan(atan(-y / d) + gun_up)`
/// 4. `fire_time_s == Some(0.0)` 时置开火标志
///
/// # 参数
/// - `gun_up_degree`: 枪管上抬补偿（度）
/// - `gun_right_degree`: 枪管右偏补偿（度）
/// - `aim_point_m`: IMU 坐标系瞄准点（米，y 向下）
/// - `fire_time_s`: 距开火时刻的时间，`None` 表示不开火
///
/// # 错误
/// - `DriverError::InvalidInput`: 输入不是有限值，或瞄准点在竖直轴上
pub fn compute_aim_command(
    gun_up_degree: f64,
    gun_right_degree: f64,
    aim_point_m: &Vector3<f64>,
    fire_time_s: Option<f64>,
) -> Result<AimCommand, DriverError> {
    if !gun_up_degree.is_finite()
        || !gun_right_degree.is_finite()
        || !aim_point_m.iter().all(|v| v.is_finite())
    {
        return Err(DriverError::InvalidInput(format!(
            "non-finite aim input: up={}, right={}, point={:?}",
            gun_up_degree,
            gun_right_degree,
            aim_point_m.as_slice()
        )));
    }

    let point_mm = rotate_about_vertical(aim_point_m, gun_right_degree) * 1e3;
    let distance_mm = point_mm.x.hypot(point_mm.z);
    if distance_mm == 0.0 {
        return Err(DriverError::InvalidInput(
            "aim point lies on the vertical axis".to_string(),
        ));
    }

    let aim_pitch = (-point_mm.y / distance_mm).atan();
    let y_mm = -distance_mm * (aim_pitch + gun_up_degree.to_radians()).tan();

    let flag = if fire_time_s == Some(0.0) {
        FireFlag::Fire
    } else {
        FireFlag::Idle
    };

    Ok(AimCommand::new(point_mm.x, y_mm, point_mm.z, flag))
}
