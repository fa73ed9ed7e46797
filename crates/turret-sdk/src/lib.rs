//! Turret SDK - 云台自瞄核心 Rust SDK
//!
//! 串口链路、姿态时间对齐、弹道解算和控制循环的统一入口。
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **协议层** (`protocol`): 上下行帧的 CRC8 编解码
//! - **串口层** (`serial`): 串口适配器抽象、重连与日志去重
//! - **驱动层** (`driver`): RX / TX / 相机工作线程、状态历史、[`Turret`] 门面
//! - **弹道层** (`ballistics`): 重力解析解与空气阻力数值解
//! - **控制层** (`control`): 配置、视觉协作接口与控制循环
//!
//! # 快速开始
//!
//! ```no_run
//! use turret_sdk::prelude::*;
//!
//! turret_sdk::init_logging();
//!
//! let config = AimConfig::load_from_file("config.toml")?;
//! let mut turret = TurretBuilder::new()
//!     .port(&config.serial.port)
//!     .baud_rate(config.serial.baud_rate)
//!     .build()?;
//!
//! let snapshot = turret.update()?;
//! println!("yaw = {:.2}°", snapshot.status.status.yaw_degree);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use turret_ballistics as ballistics;
pub use turret_control as control;
pub use turret_driver as driver;
pub use turret_protocol as protocol;
pub use turret_serial as serial;

pub mod prelude;

// 常用类型
pub use turret_ballistics::{AdjustOptions, BallisticError, ProjectileKind, trajectory_adjust};
pub use turret_control::{AimConfig, ConfigError, ControlError, ControlLoop};
pub use turret_driver::{DriverError, PipelineConfig, Turret, TurretBuilder, TurretSnapshot};
pub use turret_protocol::{FrameError, Status, WorkMode};
pub use turret_serial::SerialError;

use tracing_subscriber::EnvFilter;

/// 默认日志级别（未设置 `RUST_LOG` 时）
pub const DEFAULT_LOG_FILTER: &str = "info";

/// 初始化全局日志
///
/// 使用 `RUST_LOG` 环境变量过滤（缺省为 `info`），并把依赖库通过 `log`
/// 输出的记录转发到 `tracing`。重复调用无副作用。
pub fn init_logging() {
    init_logging_with(DEFAULT_LOG_FILTER);
}

/// 以指定的缺省过滤规则初始化日志，`RUST_LOG` 优先
///
/// 返回 `false` 表示全局 subscriber 已经存在（本次调用未生效）。
pub fn init_logging_with(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }
    // serialport 等依赖使用 log
    let _ = tracing_log::LogTracer::init();
    true
}
