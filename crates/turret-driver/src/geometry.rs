//! 角度与坐标变换
//!
//! IMU 坐标系：x 向右，y 向下，z 向前（枪管方向）。角度单位为度。

use nalgebra::{Rotation3, Vector3};

/// 将角度规范到 (-180, 180]
pub fn limit_degree(angle_degree: f64) -> f64 {
    let wrapped = (angle_degree + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 { wrapped + 360.0 } else { wrapped }
}

/// 沿最短弧插值两个角度
///
/// `k = 0` 返回 `from`，`k = 1` 返回 `to`，结果规范到 (-180, 180]。
pub fn interpolate_degree(from_degree: f64, to_degree: f64, k: f64) -> f64 {
    let delta_degree = limit_degree(to_degree - from_degree);
    limit_degree(k * delta_degree + from_degree)
}

/// 绕竖直轴（y）旋转
pub fn rotate_about_vertical(point: &Vector3<f64>, degree: f64) -> Vector3<f64> {
    Rotation3::from_axis_angle(&Vector3::y_axis(), degree.to_radians()) * point
}

/// 云台坐标系到 IMU 坐标系的旋转：`R_y(yaw) * R_x(pitch)`
pub fn gimbal_to_imu(yaw_degree: f64, pitch_degree: f64) -> Rotation3<f64> {
    let r_y = Rotation3::from_axis_angle(&Vector3::y_axis(), yaw_degree.to_radians());
    let r_x = Rotation3::from_axis_angle(&Vector3::x_axis(), pitch_degree.to_radians());
    r_y * r_x
}

/// 云台姿态对应的指向（单位向量 × 1000，IMU 坐标系，y 向下）
pub fn yaw_pitch_to_xyz(yaw_degree: f64, pitch_degree: f64) -> Vector3<f64> {
    let (yaw, pitch) = (yaw_degree.to_radians(), pitch_degree.to_radians());
    let y = -pitch.sin();
    let xz = pitch.cos();
    Vector3::new(xz * yaw.sin(), y, xz * yaw.cos()) * 1e3
}
