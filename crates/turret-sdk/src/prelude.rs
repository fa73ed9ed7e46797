//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use turret_sdk::prelude::*;
//! ```

// 驱动层
pub use turret_driver::{
    Camera, CapturedImage, DriverError, Image, Orientation, PipelineConfig, StatusSample, Turret,
    TurretBuilder, TurretSnapshot,
};

// 控制层
pub use turret_control::{
    AimConfig, AimPlatform, AimSolution, ControlError, ControlLoop, Detector, EnergyPredictor,
    NullTelemetry, TargetObservation, TelemetrySink, TickOutcome, TickTelemetry, Tracker,
    TrackerState,
};

// 弹道
pub use turret_ballistics::{AdjustOptions, BallisticError, ProjectileKind, trajectory_adjust};

// 协议
pub use turret_protocol::{AimCommand, FireFlag, Status, Team, WorkMode};
