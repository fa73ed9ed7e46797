//! # Turret Control
//!
//! 控制循环层：把驱动层的图像、姿态和弹道解算串成“检测 → 跟踪 → 瞄准”。
//!
//! ## 模块
//!
//! - `config`: 瞄准配置（TOML），按机器人编号覆盖枪管补偿和白名单
//! - `vision`: 检测器 / 跟踪器 / 能量机关预测器接口
//! - `telemetry`: 每帧遥测输出接口
//! - `platform`: 控制循环对云台的最小依赖（[`turret_driver::Turret`] 实现）
//! - `control_loop`: 控制循环与错误策略
//!
//! 视觉算法本身不在本 crate 中，由调用方实现 [`Detector`]、[`Tracker`]
//! 和 [`EnergyPredictor`] 后注入。

pub mod config;
pub mod control_loop;
mod error;
pub mod platform;
pub mod telemetry;
pub mod vision;

pub use config::{
    AimConfig, BallisticsSettings, ConfigError, EnergySettings, GunOffsets, ResolvedProfile,
    RobotProfile, SerialSettings,
};
pub use control_loop::{ControlLoop, LoopStats, TickOutcome};
pub use error::ControlError;
pub use platform::AimPlatform;
pub use telemetry::{NullTelemetry, TelemetrySink, TickTelemetry};
pub use vision::{
    AimSolution, Detector, EnergyPredictor, TargetObservation, Tracker, TrackerState,
};
