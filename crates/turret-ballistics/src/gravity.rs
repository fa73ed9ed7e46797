//! 重力弹道解算
//!
//! 忽略空气阻力，抛物线方程 `a·tan²θ − d·tanθ + (a + y) = 0`（y 向上），
//! 其中 `a = ½·g·d²/v²`（毫米）。两个根对应平射和吊射，取飞行时间短的一个。

use crate::{BallisticError, GRAVITY, check_finite, check_speed};

/// 俯仰角解
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PitchSolution {
    /// 发射俯仰角（度，向上为正）
    pub pitch_degree: f64,
    /// 飞行时间（秒）
    pub flight_time_s: f64,
}

/// 求击中目标所需的俯仰角
///
/// # 参数
/// - `x_mm`, `z_mm`: 水平面坐标（毫米）
/// - `y_mm`: 目标高度（毫米，向上为正）
/// - `speed_mps`: 弹速（m/s）
///
/// # 错误
/// - `BallisticError::Unreachable`: 判别式为负
/// - `BallisticError::InvalidInput`: 非有限输入、水平距离为零或弹速不为正
///
/// # Example
///
/// ```
/// use turret_ballistics::shoot_pitch;
///
/// let solution = shoot_pitch(0.0, 0.0, 5000.0, 15.0).unwrap();
/// assert!(solution.pitch_degree > 0.0 && solution.pitch_degree < 10.0);
/// ```
pub fn shoot_pitch(
    x_mm: f64,
    y_mm: f64,
    z_mm: f64,
    speed_mps: f64,
) -> Result<PitchSolution, BallisticError> {
    check_finite(&[x_mm, y_mm, z_mm, speed_mps])?;
    check_speed(speed_mps)?;

    let distance = x_mm.hypot(z_mm);
    if distance == 0.0 {
        return Err(BallisticError::InvalidInput(
            "horizontal distance is zero".to_string(),
        ));
    }

    // g 换算到 mm/s²（距离单位为毫米，速度单位为 m/s）
    let g = GRAVITY / 1000.0;
    let a = 0.5 * g * distance * distance / (speed_mps * speed_mps);
    let b = -distance;
    let c = a + y_mm;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Err(BallisticError::Unreachable);
    }
    let sqrt_disc = discriminant.sqrt();

    [(-b + sqrt_disc) / (2.0 * a), (-b - sqrt_disc) / (2.0 * a)]
        .into_iter()
        .map(|tan_pitch| {
            let pitch = tan_pitch.atan();
            PitchSolution {
                pitch_degree: pitch.to_degrees(),
                flight_time_s: distance / 1000.0 / (speed_mps * pitch.cos()),
            }
        })
        .min_by(|l, r| l.flight_time_s.total_cmp(&r.flight_time_s))
        .ok_or(BallisticError::Unreachable)
}

/// 飞行时间（秒），等价于 `shoot_pitch(..).flight_time_s`
///
/// # 错误
/// 同 [`shoot_pitch`]。
pub fn flight_time(x_mm: f64, y_mm: f64, z_mm: f64, speed_mps: f64) -> Result<f64, BallisticError> {
    shoot_pitch(x_mm, y_mm, z_mm, speed_mps).map(|s| s.flight_time_s)
}
