//! 控制循环
//!
//! 每次循环：刷新图像与状态 → 按机器人编号选用配置 → 求曝光时刻姿态 →
//! 记录遥测 → 按工作模式分派：
//!
//! - 自瞄：检测 → 过滤白名单 → 跟踪器初始化或更新 → 跟踪中则瞄准开火
//! - 能量机关：预测击打点 → 距离窗口检查 → 弹道补偿 → 瞄准（不开火）
//!
//! 错误策略：等待超时和弹道无解只告警并跳过本帧；工作线程退出等
//! 不可恢复错误结束循环；关闭标志置位后正常返回。

use crate::config::{AimConfig, ResolvedProfile};
use crate::error::ControlError;
use crate::platform::AimPlatform;
use crate::telemetry::{NullTelemetry, TelemetrySink, TickTelemetry};
use crate::vision::{Detector, EnergyPredictor, TargetObservation, Tracker, TrackerState};
use nalgebra::Vector3;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, trace, warn};
use turret_ballistics::{AdjustOptions, trajectory_adjust};
use turret_driver::{CapturedImage, Orientation, TurretSnapshot, us_to_s};
use turret_protocol::WorkMode;

/// 单次循环的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// 未配置相机，没有可处理的图像
    NoImage,
    /// 没有可打的目标
    Idle,
    /// 能量机关击打点超出距离窗口
    OutOfRange { distance_mm: f64 },
    /// 已下发瞄准命令
    Aimed { fire: bool },
}

/// 循环计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStats {
    pub ticks: u64,
    pub shots: u64,
    pub timeouts: u64,
    /// 弹道无解或不收敛而跳过的次数
    pub ballistic_skips: u64,
    pub errors: u64,
}

/// 控制循环
///
/// 泛型参数依次为云台平台、检测器、跟踪器、能量机关预测器和遥测输出。
pub struct ControlLoop<P, D, T, E, S = NullTelemetry> {
    platform: P,
    detector: D,
    tracker: T,
    energy: E,
    telemetry: S,
    config: AimConfig,
    adjust: AdjustOptions,
    /// 当前机器人的枪管补偿和白名单（收到第一个状态后确定）
    profile: Option<Arc<ResolvedProfile>>,
    last_mode: Option<WorkMode>,
    stats: LoopStats,
}

impl<P, D, T, E> ControlLoop<P, D, T, E, NullTelemetry>
where
    P: AimPlatform,
    D: Detector,
    T: Tracker,
    E: EnergyPredictor,
{
    pub fn new(platform: P, detector: D, tracker: T, energy: E, config: AimConfig) -> Self {
        let adjust = config.ballistics.adjust_options();
        Self {
            platform,
            detector,
            tracker,
            energy,
            telemetry: NullTelemetry,
            config,
            adjust,
            profile: None,
            last_mode: None,
            stats: LoopStats::default(),
        }
    }
}

impl<P, D, T, E, S> ControlLoop<P, D, T, E, S>
where
    P: AimPlatform,
    D: Detector,
    T: Tracker,
    E: EnergyPredictor,
    S: TelemetrySink,
{
    /// 替换遥测输出
    pub fn with_telemetry<S2: TelemetrySink>(self, telemetry: S2) -> ControlLoop<P, D, T, E, S2> {
        ControlLoop {
            platform: self.platform,
            detector: self.detector,
            tracker: self.tracker,
            energy: self.energy,
            telemetry,
            config: self.config,
            adjust: self.adjust,
            profile: self.profile,
            last_mode: self.last_mode,
            stats: self.stats,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn config(&self) -> &AimConfig {
        &self.config
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// 当前生效的机器人配置（第一次 `tick` 之前为 `None`）
    pub fn profile(&self) -> Option<&ResolvedProfile> {
        self.profile.as_deref()
    }

    /// 执行一次循环
    ///
    /// # 错误
    /// - `ControlError::Driver(DriverError::Timeout)`: 等待图像、状态或姿态超时
    /// - `ControlError::Ballistic`: 目标不可达或迭代不收敛（本帧不下发）
    /// - `ControlError::Driver`: 下发失败或工作线程退出，见 [`ControlError::is_fatal`]
    pub fn tick(&mut self) -> Result<TickOutcome, ControlError> {
        self.stats.ticks += 1;

        let snapshot = self.platform.update()?;
        let profile = self.select_profile(snapshot.robot_id());
        let Some(image) = snapshot.image.clone() else {
            trace!("No camera image, skipping vision");
            return Ok(TickOutcome::NoImage);
        };

        let orientation = self.platform.orientation_at(image.timestamp_us)?;
        let work_mode = snapshot.work_mode();

        self.telemetry.record(
            &image,
            &TickTelemetry {
                orientation,
                bullet_speed: snapshot.bullet_speed,
                work_mode,
                team: snapshot.team(),
                robot_id: snapshot.robot_id(),
            },
        );

        self.switch_mode(work_mode);

        let outcome = if work_mode.is_energy() {
            self.energy_tick(&image, &snapshot, orientation, work_mode, &profile)?
        } else {
            self.auto_aim_tick(&image, &snapshot, orientation, &profile)?
        };

        if let TickOutcome::Aimed { .. } = outcome {
            self.stats.shots += 1;
        }
        Ok(outcome)
    }

    /// 循环直到 `shutdown` 置位或出现不可恢复错误
    ///
    /// # 错误
    /// 只返回 [`ControlError::is_fatal`] 为真的错误。
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), ControlError> {
        info!("Control loop started");

        while !shutdown.load(Ordering::Acquire) {
            match self.tick() {
                Ok(outcome) => {
                    trace!("Tick outcome: {:?}", outcome);
                },
                Err(e) if e.is_fatal() => {
                    error!("Control loop stopping on fatal error: {}", e);
                    return Err(e);
                },
                Err(e) if e.is_timeout() => {
                    self.stats.timeouts += 1;
                    warn!("Control loop tick timed out, retrying");
                },
                Err(ControlError::Ballistic(e)) => {
                    self.stats.ballistic_skips += 1;
                    warn!("Skipping shot: {}", e);
                },
                Err(e) => {
                    self.stats.errors += 1;
                    error!("Control loop tick failed: {}", e);
                },
            }
        }

        info!("Control loop stopped by shutdown request, stats: {:?}", self.stats);
        Ok(())
    }

    /// 按机器人编号选用枪管补偿和白名单，编号变化时重新选择
    fn select_profile(&mut self, robot_id: u8) -> Arc<ResolvedProfile> {
        if let Some(profile) = &self.profile
            && profile.robot_id == robot_id
        {
            return profile.clone();
        }

        let profile = Arc::new(self.config.profile_for(robot_id));
        info!(
            "Robot {} profile: gun up {:.2}°, right {:.2}°, whitelist {:?}",
            robot_id, profile.gun.up_degree, profile.gun.right_degree, profile.whitelist
        );
        self.profile = Some(profile.clone());
        profile
    }

    /// 工作模式切换时重置另一侧的状态
    fn switch_mode(&mut self, work_mode: WorkMode) {
        let was_energy = self.last_mode.map(|m| m.is_energy());
        if was_energy != Some(work_mode.is_energy()) {
            if work_mode.is_energy() {
                self.tracker.reset();
            } else {
                self.energy.reset();
            }
            if let Some(previous) = self.last_mode {
                info!("Work mode changed: {:?} -> {:?}", previous, work_mode);
            }
        }
        self.last_mode = Some(work_mode);
    }

    fn auto_aim_tick(
        &mut self,
        image: &CapturedImage,
        snapshot: &TurretSnapshot,
        orientation: Orientation,
        profile: &ResolvedProfile,
    ) -> Result<TickOutcome, ControlError> {
        let observations: Vec<TargetObservation> = self
            .detector
            .detect(image, orientation)
            .into_iter()
            .filter(|o| !profile.is_whitelisted(&o.name))
            .collect();

        let time_s = us_to_s(image.timestamp_us);
        if self.tracker.state() == TrackerState::Lost {
            self.tracker.init(&observations, time_s);
        } else {
            self.tracker.update(&observations, time_s);
        }

        if !self.tracker.state().should_aim() {
            return Ok(TickOutcome::Idle);
        }

        let solution = self.tracker.aim(snapshot.bullet_speed)?;
        self.platform.shoot(
            profile.gun.up_degree,
            profile.gun.right_degree,
            &solution.aim_point_m,
            solution.fire_time_s,
        )?;

        Ok(TickOutcome::Aimed {
            fire: solution.fire_time_s == Some(0.0),
        })
    }

    fn energy_tick(
        &mut self,
        image: &CapturedImage,
        snapshot: &TurretSnapshot,
        orientation: Orientation,
        work_mode: WorkMode,
        profile: &ResolvedProfile,
    ) -> Result<TickOutcome, ControlError> {
        self.energy.update(image, work_mode);

        let Some(point_mm) = self.energy.shot_point(snapshot.bullet_speed, orientation) else {
            return Ok(TickOutcome::Idle);
        };

        let distance_mm = point_mm.x.hypot(point_mm.z);
        if !self.config.energy.contains(distance_mm) {
            info!("Energy target out of range: distance = {:.0} mm", distance_mm);
            return Ok(TickOutcome::OutOfRange { distance_mm });
        }

        let aim_mm = trajectory_adjust(&point_mm, snapshot.bullet_speed, &self.adjust)?;
        let aim_m: Vector3<f64> = aim_mm / 1000.0;
        debug!("Energy aim point: {:?} mm -> {:?} m", point_mm, aim_m);

        self.platform.shoot(
            profile.gun.up_degree,
            profile.gun.right_degree,
            &aim_m,
            None,
        )?;
        Ok(TickOutcome::Aimed { fire: false })
    }
}
