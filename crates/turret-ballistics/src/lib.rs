//! # Turret Ballistics
//!
//! 弹道解算（纯函数，无 I/O，可在控制线程直接调用）
//!
//! ## 模块
//!
//! - `gravity`: 只考虑重力的抛物线解算（解析解）
//! - `drag`: 二次空气阻力下的数值积分与割线法求俯仰角
//! - `adjust`: 把 IMU 坐标系目标点转换为补偿后的瞄准点
//!
//! ## 坐标与单位
//!
//! 距离使用毫米，速度使用 m/s，角度使用度。`gravity` / `drag` 中
//! 高度向上为正；`adjust` 接受 IMU 坐标系（y 向下）。

pub mod adjust;
pub mod drag;
pub mod gravity;

pub use adjust::{AdjustOptions, trajectory_adjust};
pub use drag::{DragModel, ProjectileKind, SolverOptions, TrajectoryPoint, calculate_drop, find_pitch};
pub use gravity::{PitchSolution, flight_time, shoot_pitch};

use thiserror::Error;

/// 重力加速度（m/s²）
pub const GRAVITY: f64 = 9.794;

/// 弹道解算错误
///
/// 都是可恢复错误：控制循环跳过本次射击。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BallisticError {
    /// 当前弹速无法到达目标
    #[error("Target unreachable")]
    Unreachable,

    /// 迭代次数用尽仍未收敛
    #[error("Pitch search did not converge after {iterations} iterations (residual {residual_mm:.2} mm)")]
    NotConverged { iterations: u32, residual_mm: f64 },

    /// 输入无效（非有限值、零距离、非正弹速）
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub(crate) fn check_finite(values: &[f64]) -> Result<(), BallisticError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(BallisticError::InvalidInput(format!("non-finite value in {:?}", values)))
    }
}

pub(crate) fn check_speed(speed_mps: f64) -> Result<(), BallisticError> {
    if speed_mps > 0.0 {
        Ok(())
    } else {
        Err(BallisticError::InvalidInput(format!(
            "bullet speed must be positive, got {}",
            speed_mps
        )))
    }
}
