//! 驱动层模块
//!
//! 本模块提供云台的设备驱动功能，包括：
//! - 工作线程管理（串口 RX / 串口 TX / 相机，各自独立推进）
//! - 状态历史与时间对齐（相机曝光时刻的云台姿态）
//! - 瞄准命令计算与邮箱发送
//! - 链路指标
//!
//! # 使用场景
//!
//! 控制循环通过 [`Turret`] 读取图像和姿态、下发瞄准命令。
//! 串口断开时工作线程自行重连，不会把设备错误抛给控制循环。

pub mod aim;
mod builder;
pub mod camera;
pub mod clock;
mod error;
pub mod geometry;
pub mod history;
pub mod metrics;
pub mod pipeline;
pub mod sync;
mod turret;

pub use aim::compute_aim_command;
pub use builder::TurretBuilder;
pub use camera::{Camera, CameraError, CameraErrorKind, CapturedImage, FrameSlot, Image};
pub use clock::{monotonic_us, us_to_s};
pub use error::DriverError;
pub use geometry::{gimbal_to_imu, interpolate_degree, limit_degree, yaw_pitch_to_xyz};
pub use history::{Bracket, StatusHistory, StatusSample};
pub use metrics::{MetricsSnapshot, TurretMetrics};
pub use pipeline::{CommandMailbox, PipelineConfig, camera_loop, rx_loop, tx_loop_mailbox};
pub use sync::{Orientation, orientation_at};
pub use turret::{Turret, TurretSnapshot, WorkerHealth};
