//! 每帧遥测记录

use turret_driver::{CapturedImage, Orientation};
use turret_protocol::{Team, WorkMode};

/// 一次循环的上下文
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickTelemetry {
    /// 曝光时刻的云台姿态
    pub orientation: Orientation,
    /// 有效弹速（m/s）
    pub bullet_speed: f64,
    pub work_mode: WorkMode,
    pub team: Team,
    pub robot_id: u8,
}

/// 遥测输出（录像、调试画面等）
pub trait TelemetrySink {
    fn record(&mut self, image: &CapturedImage, telemetry: &TickTelemetry);
}

/// 丢弃全部记录
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn record(&mut self, _image: &CapturedImage, _telemetry: &TickTelemetry) {}
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Box<T> {
    fn record(&mut self, image: &CapturedImage, telemetry: &TickTelemetry) {
        (**self).record(image, telemetry)
    }
}
