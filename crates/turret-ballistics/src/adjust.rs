//! 弹道补偿瞄准点
//!
//! 输入 IMU 坐标系下的目标点（毫米，y 向下），输出保持水平位置不变、
//! 高度改为 `−d·tan(pitch)` 的瞄准点，交给云台下发。

use crate::drag::{DragModel, SolverOptions, find_pitch};
use crate::gravity::{PitchSolution, shoot_pitch};
use crate::{BallisticError, check_finite};
use nalgebra::Vector3;

/// 补偿选项
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AdjustOptions {
    /// 空气阻力模型，`None` 只考虑重力
    pub air_resistance: Option<DragModel>,
    pub solver: SolverOptions,
}

impl AdjustOptions {
    pub fn gravity_only() -> Self {
        Self::default()
    }

    pub fn with_drag(model: DragModel) -> Self {
        Self {
            air_resistance: Some(model),
            ..Self::default()
        }
    }

    /// 求解俯仰角（高度向上为正）
    pub fn solve(
        &self,
        distance_mm: f64,
        height_mm: f64,
        speed_mps: f64,
    ) -> Result<PitchSolution, BallisticError> {
        match &self.air_resistance {
            Some(model) => find_pitch(distance_mm, height_mm, speed_mps, model, &self.solver),
            None => shoot_pitch(0.0, height_mm, distance_mm, speed_mps),
        }
    }
}

/// 计算补偿后的瞄准点
///
/// # 参数
/// - `point_imu_mm`: 目标点（IMU 坐标系，毫米，y 向下）
/// - `speed_mps`: 弹速（m/s）
/// - `options`: 是否考虑空气阻力及求解参数
///
/// # 错误
/// 见 [`shoot_pitch`] 和 [`find_pitch`]。
///
/// # Example
///
/// ```
/// use nalgebra::Vector3;
/// use turret_ballistics::{AdjustOptions, trajectory_adjust};
///
/// let target = Vector3::new(0.0, 0.0, 5000.0);
/// let aim = trajectory_adjust(&target, 15.0, &AdjustOptions::gravity_only()).unwrap();
/// // 抬高枪口：瞄准点在目标上方（y 向下，所以更小）
/// assert!(aim.y < target.y);
/// ```
pub fn trajectory_adjust(
    point_imu_mm: &Vector3<f64>,
    speed_mps: f64,
    options: &AdjustOptions,
) -> Result<Vector3<f64>, BallisticError> {
    check_finite(point_imu_mm.as_slice())?;

    let (x, y, z) = (point_imu_mm.x, point_imu_mm.y, point_imu_mm.z);
    let distance = x.hypot(z);
    let solution = options.solve(distance, -y, speed_mps)?;

    Ok(Vector3::new(
        x,
        -distance * solution.pitch_degree.to_radians().tan(),
        z,
    ))
}
