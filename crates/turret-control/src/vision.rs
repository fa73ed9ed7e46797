//! 视觉协作接口
//!
//! 检测、跟踪和能量机关预测由外部实现，控制循环只依赖这里的 trait。

use nalgebra::Vector3;
use turret_ballistics::BallisticError;
use turret_driver::{CapturedImage, Orientation};
use turret_protocol::WorkMode;

/// 一次检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct TargetObservation {
    /// 目标类别名（与白名单比较）
    pub name: String,
    /// IMU 坐标系位置（米，y 向下）
    pub position_m: Vector3<f64>,
    /// 置信度 0..=1
    pub confidence: f64,
}

impl TargetObservation {
    pub fn new(name: impl Into<String>, position_m: Vector3<f64>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            position_m,
            confidence,
        }
    }
}

/// 目标检测器
pub trait Detector {
    /// 检测一帧图像
    ///
    /// `orientation` 为曝光时刻的云台姿态，用于把相机坐标转换到 IMU 坐标系。
    fn detect(&mut self, image: &CapturedImage, orientation: Orientation) -> Vec<TargetObservation>;
}

/// 跟踪器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    /// 没有目标
    #[default]
    Lost,
    /// 正在跟踪
    Tracking,
    /// 短暂丢失，仍按预测瞄准
    TempLost,
}

impl TrackerState {
    /// 该状态下是否应当瞄准
    pub fn should_aim(&self) -> bool {
        matches!(self, TrackerState::Tracking | TrackerState::TempLost)
    }
}

/// 瞄准解
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimSolution {
    /// IMU 坐标系瞄准点（米，y 向下）
    pub aim_point_m: Vector3<f64>,
    /// 开火时刻，`Some(0.0)` 表示立即开火
    pub fire_time_s: Option<f64>,
}

/// 目标跟踪器
pub trait Tracker {
    fn state(&self) -> TrackerState;

    /// 从 `Lost` 状态用新的观测初始化
    fn init(&mut self, observations: &[TargetObservation], time_s: f64);

    /// 用新的观测更新
    fn update(&mut self, observations: &[TargetObservation], time_s: f64);

    /// 求瞄准解
    ///
    /// # 错误
    /// 目标超出射程或迭代不收敛时返回 [`BallisticError`]。
    fn aim(&mut self, bullet_speed: f64) -> Result<AimSolution, BallisticError>;

    /// 丢弃全部跟踪状态，回到 `Lost`
    fn reset(&mut self);
}

/// 能量机关预测器
pub trait EnergyPredictor {
    fn update(&mut self, image: &CapturedImage, work_mode: WorkMode);

    /// 预测击打点（IMU 坐标系，毫米，y 向下），没有可打目标时返回 `None`
    fn shot_point(&mut self, bullet_speed: f64, orientation: Orientation) -> Option<Vector3<f64>>;

    fn reset(&mut self);
}

impl<T: Detector + ?Sized> Detector for Box<T> {
    fn detect(&mut self, image: &CapturedImage, orientation: Orientation) -> Vec<TargetObservation> {
        (**self).detect(image, orientation)
    }
}

impl<T: Tracker + ?Sized> Tracker for Box<T> {
    fn state(&self) -> TrackerState {
        (**self).state()
    }

    fn init(&mut self, observations: &[TargetObservation], time_s: f64) {
        (**self).init(observations, time_s)
    }

    fn update(&mut self, observations: &[TargetObservation], time_s: f64) {
        (**self).update(observations, time_s)
    }

    fn aim(&mut self, bullet_speed: f64) -> Result<AimSolution, BallisticError> {
        (**self).aim(bullet_speed)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

impl<T: EnergyPredictor + ?Sized> EnergyPredictor for Box<T> {
    fn update(&mut self, image: &CapturedImage, work_mode: WorkMode) {
        (**self).update(image, work_mode)
    }

    fn shot_point(&mut self, bullet_speed: f64, orientation: Orientation) -> Option<Vector3<f64>> {
        (**self).shot_point(bullet_speed, orientation)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_aim() {
        assert!(!TrackerState::Lost.should_aim());
        assert!(TrackerState::Tracking.should_aim());
        assert!(TrackerState::TempLost.should_aim());
        assert_eq!(TrackerState::default(), TrackerState::Lost);
    }
}
