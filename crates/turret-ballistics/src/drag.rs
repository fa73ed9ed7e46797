//! 二次空气阻力弹道
//!
//! 竖直平面内的二维运动：`a = −(k/m)·|v|·v`，竖直方向叠加重力。
//! RK4 积分直到水平距离达到目标距离，得到该距离处的高度；
//! 再以重力解为初值，用割线法搜索使高度等于目标高度的俯仰角。

use crate::gravity::{PitchSolution, shoot_pitch};
use crate::{BallisticError, GRAVITY, check_finite, check_speed};
use nalgebra::Vector4;

/// 俯仰角搜索上限（度）
const MAX_PITCH_DEGREE: f64 = 89.0;

/// 弹丸类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProjectileKind {
    /// 17 mm 小弹丸（约 3.2 g）
    #[default]
    Small17mm,
    /// 42 mm 大弹丸（约 41 g）
    Large42mm,
}

impl ProjectileKind {
    pub fn drag_model(self) -> DragModel {
        match self {
            ProjectileKind::Small17mm => DragModel::new(3.2e-3, 6.24e-5),
            ProjectileKind::Large42mm => DragModel::new(41e-3, 3.80e-4),
        }
    }
}

/// 阻力模型参数
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DragModel {
    /// 弹丸质量（kg）
    pub mass_kg: f64,
    /// 二次阻力系数 k（kg/m），`F = k·|v|²`
    pub drag_coefficient: f64,
}

impl DragModel {
    pub fn new(mass_kg: f64, drag_coefficient: f64) -> Self {
        Self {
            mass_kg,
            drag_coefficient,
        }
    }

    /// 单位质量阻力系数 `k/m`（1/m）
    pub fn per_mass(&self) -> f64 {
        self.drag_coefficient / self.mass_kg
    }
}

impl From<ProjectileKind> for DragModel {
    fn from(kind: ProjectileKind) -> Self {
        kind.drag_model()
    }
}

/// 求解参数
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverOptions {
    /// 高度容差（毫米）
    pub tolerance_mm: f64,
    /// 割线法最大迭代次数
    pub max_iterations: u32,
    /// 第二个初值相对重力解的偏移（度）
    pub window_degree: f64,
    /// 积分步长（秒）
    pub time_step_s: f64,
    /// 最长仿真时间（秒），超过视为无法到达
    pub max_time_s: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance_mm: 1.0,
            max_iterations: 20,
            window_degree: 2.0,
            time_step_s: 1e-3,
            max_time_s: 5.0,
        }
    }
}

/// 弹道在目标距离处的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPoint {
    /// 高度（毫米，向上为正）
    pub height_mm: f64,
    /// 飞行时间（秒）
    pub flight_time_s: f64,
}

/// 状态 `[x, y, vx, vy]`（米，米/秒）的导数
fn derivative(state: &Vector4<f64>, k_per_m: f64) -> Vector4<f64> {
    let (vx, vy) = (state[2], state[3]);
    let speed = vx.hypot(vy);
    Vector4::new(vx, vy, -k_per_m * speed * vx, -GRAVITY - k_per_m * speed * vy)
}

fn rk4_step(state: &Vector4<f64>, dt: f64, k_per_m: f64) -> Vector4<f64> {
    let k1 = derivative(state, k_per_m);
    let k2 = derivative(&(state + k1 * (dt / 2.0)), k_per_m);
    let k3 = derivative(&(state + k2 * (dt / 2.0)), k_per_m);
    let k4 = derivative(&(state + k3 * dt), k_per_m);
    state + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

/// 以 `pitch_degree` 发射，水平飞行 `distance_mm` 时的高度和时间
///
/// # 错误
/// - `BallisticError::Unreachable`: 在 `max_time_s` 内未到达目标距离
/// - `BallisticError::InvalidInput`: 非有限输入、距离不为正、弹速不为正或俯仰角不在 (-90, 90)
///
/// # 性能
/// 步数上限为 `max_time_s / time_step_s`。
pub fn calculate_drop(
    pitch_degree: f64,
    speed_mps: f64,
    distance_mm: f64,
    model: &DragModel,
    options: &SolverOptions,
) -> Result<TrajectoryPoint, BallisticError> {
    check_finite(&[pitch_degree, speed_mps, distance_mm])?;
    check_speed(speed_mps)?;
    if distance_mm <= 0.0 {
        return Err(BallisticError::InvalidInput(format!(
            "distance must be positive, got {}",
            distance_mm
        )));
    }
    if pitch_degree.abs() >= 90.0 {
        return Err(BallisticError::InvalidInput(format!(
            "pitch must be within (-90, 90), got {}",
            pitch_degree
        )));
    }
    if !options.time_step_s.is_finite() || options.time_step_s <= 0.0 {
        return Err(BallisticError::InvalidInput(format!(
            "time step must be positive, got {}",
            options.time_step_s
        )));
    }

    let target_m = distance_mm / 1000.0;
    let k_per_m = model.per_mass();
    let dt = options.time_step_s;
    let pitch = pitch_degree.to_radians();

    let mut state = Vector4::new(0.0, 0.0, speed_mps * pitch.cos(), speed_mps * pitch.sin());
    let mut t = 0.0;

    while t < options.max_time_s {
        let next = rk4_step(&state, dt, k_per_m);
        if next[0] >= target_m {
            // 在步内线性插值穿越点
            let frac = (target_m - state[0]) / (next[0] - state[0]);
            let height_m = state[1] + frac * (next[1] - state[1]);
            return Ok(TrajectoryPoint {
                height_mm: height_m * 1000.0,
                flight_time_s: t + frac * dt,
            });
        }
        state = next;
        t += dt;
    }

    Err(BallisticError::Unreachable)
}

/// 割线法搜索俯仰角
///
/// 初值取重力解 `p0` 和 `p0 + window_degree`，直到目标距离处高度误差
/// 不超过 `tolerance_mm`。
///
/// # 参数
/// - `distance_mm`: 水平距离（毫米）
/// - `height_mm`: 目标高度（毫米，向上为正）
/// - `speed_mps`: 弹速（m/s）
///
/// # 错误
/// - `BallisticError::Unreachable`: 重力解不存在，或试探角度在仿真时间内到不了目标
/// - `BallisticError::NotConverged`: 迭代 `max_iterations` 次仍未满足容差
/// - `BallisticError::InvalidInput`: 输入无效
pub fn find_pitch(
    distance_mm: f64,
    height_mm: f64,
    speed_mps: f64,
    model: &DragModel,
    options: &SolverOptions,
) -> Result<PitchSolution, BallisticError> {
    let seed = shoot_pitch(0.0, height_mm, distance_mm, speed_mps)?.pitch_degree;

    let residual = |pitch_degree: f64| {
        calculate_drop(pitch_degree, speed_mps, distance_mm, model, options)
            .map(|point| (point.height_mm - height_mm, point))
    };
    let solution = |pitch_degree: f64, point: TrajectoryPoint| PitchSolution {
        pitch_degree,
        flight_time_s: point.flight_time_s,
    };

    let mut p0 = seed;
    let (mut f0, point0) = residual(p0)?;
    if f0.abs() <= options.tolerance_mm {
        return Ok(solution(p0, point0));
    }

    let mut p1 = (seed + options.window_degree).clamp(-MAX_PITCH_DEGREE, MAX_PITCH_DEGREE);
    let (mut f1, mut point1) = residual(p1)?;

    for _ in 0..options.max_iterations {
        if f1.abs() <= options.tolerance_mm {
            return Ok(solution(p1, point1));
        }
        let slope = f1 - f0;
        if slope == 0.0 {
            break;
        }
        let p2 = (p1 - f1 * (p1 - p0) / slope).clamp(-MAX_PITCH_DEGREE, MAX_PITCH_DEGREE);
        (p0, f0) = (p1, f1);
        p1 = p2;
        (f1, point1) = residual(p1)?;
    }

    if f1.abs() <= options.tolerance_mm {
        return Ok(solution(p1, point1));
    }
    Err(BallisticError::NotConverged {
        iterations: options.max_iterations,
        residual_mm: f1.abs(),
    })
}
