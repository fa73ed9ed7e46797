//! Turret API 模块
//!
//! 提供对外的 `Turret` 结构体，封装三个工作线程和时间对齐细节。

use crate::aim::compute_aim_command;
use crate::camera::{Camera, CapturedImage, FrameSlot};
use crate::error::DriverError;
use crate::history::{StatusHistory, StatusSample};
use crate::metrics::{MetricsSnapshot, TurretMetrics};
use crate::pipeline::{CommandMailbox, PipelineConfig, camera_loop, rx_loop, tx_loop_mailbox};
use crate::sync::{Orientation, orientation_at};
use nalgebra::Vector3;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};
use turret_protocol::{AimCommand, StatusFlag, Team, WorkMode};
use turret_serial::SplittableAdapter;

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // 看门狗线程负责 join，超时后它继续存在直到目标线程退出
        thread::spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 一次 `update()` 的结果
#[derive(Debug, Clone)]
pub struct TurretSnapshot {
    /// 最新图像（未配置相机时为 `None`）
    pub image: Option<Arc<CapturedImage>>,
    /// 最新状态样本
    pub status: StatusSample,
    /// 有效弹速（m/s），上报值无效时为回退值
    pub bullet_speed: f64,
    pub flag: StatusFlag,
}

impl TurretSnapshot {
    pub fn work_mode(&self) -> WorkMode {
        self.flag.work_mode()
    }

    pub fn team(&self) -> Team {
        self.flag.team()
    }

    pub fn robot_id(&self) -> u8 {
        self.flag.robot_id()
    }
}

/// 工作线程存活状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerHealth {
    pub rx_alive: bool,
    pub tx_alive: bool,
    /// 未配置相机时为 `true`
    pub camera_alive: bool,
}

impl WorkerHealth {
    pub fn all_alive(&self) -> bool {
        self.rx_alive && self.tx_alive && self.camera_alive
    }
}

/// 云台驱动（对外 API）
///
/// 三个命名线程：`turret-rx`（状态接收）、`turret-tx`（命令发送）、
/// `turret-camera`（图像采集，可选）。Drop 时通知退出并限时 join。
pub struct Turret {
    history: Arc<StatusHistory>,
    frames: Arc<FrameSlot>,
    mailbox: Arc<CommandMailbox>,
    rx_thread: Option<JoinHandle<()>>,
    tx_thread: Option<JoinHandle<()>>,
    camera_thread: Option<JoinHandle<()>>,
    /// 运行标志（用于线程生命周期联动）
    is_running: Arc<AtomicBool>,
    metrics: Arc<TurretMetrics>,
    config: PipelineConfig,
    /// 上一次 `update()` 返回的图像序号
    last_image_sequence: Option<u64>,
    /// 上一次 `update()` 返回的状态接收时间
    last_status_us: Option<u64>,
}

fn spawn_worker(
    name: &str,
    is_running: &AtomicBool,
    f: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>, DriverError> {
    thread::Builder::new().name(name.to_string()).spawn(f).map_err(|e| {
        // 已启动的线程看到标志后自行退出
        is_running.store(false, Ordering::Release);
        DriverError::IoThread(format!("failed to spawn {}: {}", name, e))
    })
}

impl Turret {
    /// 分离串口并启动工作线程
    ///
    /// # 参数
    /// - `adapter`: 已打开的串口适配器，分离为 RX / TX 两半
    /// - `camera`: 相机，`None` 表示只运行串口链路
    /// - `config`: Pipeline 配置
    ///
    /// # 错误
    /// - `DriverError::Serial`: 分离串口失败
    /// - `DriverError::IoThread`: 线程创建失败
    pub fn new<A>(
        adapter: A,
        camera: Option<Box<dyn Camera + Send>>,
        config: PipelineConfig,
    ) -> Result<Self, DriverError>
    where
        A: SplittableAdapter,
        A::RxAdapter: Send + 'static,
        A::TxAdapter: Send + 'static,
    {
        let (rx_adapter, tx_adapter) = adapter.split()?;

        let history = Arc::new(config.new_history());
        let frames = Arc::new(FrameSlot::new());
        let mailbox = Arc::new(CommandMailbox::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(TurretMetrics::new());

        let rx_thread = {
            let history = history.clone();
            let config = config.clone();
            let running = is_running.clone();
            let metrics = metrics.clone();
            spawn_worker("turret-rx", &is_running, move || {
                rx_loop(rx_adapter, history, config, running, metrics);
            })?
        };

        let tx_thread = {
            let mailbox = mailbox.clone();
            let config = config.clone();
            let running = is_running.clone();
            let metrics = metrics.clone();
            spawn_worker("turret-tx", &is_running, move || {
                tx_loop_mailbox(tx_adapter, mailbox, config, running, metrics);
            })?
        };

        let camera_thread = match camera {
            Some(camera) => {
                let frames = frames.clone();
                let config = config.clone();
                let running = is_running.clone();
                let metrics = metrics.clone();
                Some(spawn_worker("turret-camera", &is_running, move || {
                    camera_loop(camera, frames, config, running, metrics);
                })?)
            },
            None => None,
        };

        info!(
            "Turret started (camera: {})",
            if camera_thread.is_some() { "enabled" } else { "disabled" }
        );

        Ok(Self {
            history,
            frames,
            mailbox,
            rx_thread: Some(rx_thread),
            tx_thread: Some(tx_thread),
            camera_thread,
            is_running,
            metrics,
            config,
            last_image_sequence: None,
            last_status_us: None,
        })
    }

    /// 刷新最新图像和状态
    ///
    /// 等待比上次返回的更新的一帧图像和状态样本，每项最多等待
    /// `update_timeout_ms`。
    ///
    /// # 错误
    /// - `DriverError::IoThread`: 有工作线程已退出
    /// - `DriverError::Timeout`: 等待超时（可在下一次循环重试）
    pub fn update(&mut self) -> Result<TurretSnapshot, DriverError> {
        let health = self.check_health();
        if !health.all_alive() {
            return Err(DriverError::IoThread(format!(
                "worker thread exited: {:?}",
                health
            )));
        }

        let timeout = Duration::from_millis(self.config.update_timeout_ms);

        let image = if self.camera_thread.is_some() {
            let image = self
                .frames
                .wait_newer(self.last_image_sequence, timeout)
                .ok_or(DriverError::Timeout)?;
            self.last_image_sequence = Some(image.sequence);
            Some(image)
        } else {
            None
        };

        let status = self
            .history
            .wait_newer(self.last_status_us, timeout)
            .ok_or(DriverError::Timeout)?;
        self.last_status_us = Some(status.read_time_us);

        Ok(TurretSnapshot {
            image,
            bullet_speed: self.config.effective_bullet_speed(status.status.bullet_speed),
            flag: status.status.status_flag(),
            status,
        })
    }

    /// 查询时刻 `t_us` 的云台姿态
    ///
    /// 时间与 [`CapturedImage::timestamp_us`] 同一时钟。
    ///
    /// # 错误
    /// - `DriverError::Timeout`: 在 `orientation_timeout_ms` 内没有收到晚于 `t_us` 的状态
    pub fn orientation_at(&self, t_us: u64) -> Result<Orientation, DriverError> {
        orientation_at(
            &self.history,
            t_us,
            Duration::from_millis(self.config.orientation_timeout_ms),
        )
    }

    /// 瞄准（可选开火）
    ///
    /// 命令放入邮箱后立即返回，不等待串口写出。
    ///
    /// # 参数
    /// - `gun_up_degree`: 枪管上抬补偿（度）
    /// - `gun_right_degree`: 枪管右偏补偿（度）
    /// - `aim_point_m`: IMU 坐标系瞄准点（米，y 向下）
    /// - `fire_time_s`: `Some(0.0)` 表示立即开火
    ///
    /// # 错误
    /// - `DriverError::InvalidInput`: 非有限输入或瞄准点在竖直轴上
    /// - `DriverError::ChannelClosed`: TX 线程已退出
    pub fn shoot(
        &self,
        gun_up_degree: f64,
        gun_right_degree: f64,
        aim_point_m: &Vector3<f64>,
        fire_time_s: Option<f64>,
    ) -> Result<(), DriverError> {
        let command =
            compute_aim_command(gun_up_degree, gun_right_degree, aim_point_m, fire_time_s)?;
        self.send_command(command)
    }

    /// 直接提交一条瞄准命令（邮箱模式，Last Write Wins）
    ///
    /// # 错误
    /// - `DriverError::ChannelClosed`: TX 线程已退出
    pub fn send_command(&self, command: AimCommand) -> Result<(), DriverError> {
        let tx_alive = self.tx_thread.as_ref().is_some_and(|h| !h.is_finished());
        if !tx_alive {
            return Err(DriverError::ChannelClosed);
        }

        let is_overwrite = self.mailbox.post(command);

        let total = self.metrics.tx_commands_total.fetch_add(1, Ordering::Relaxed) + 1;
        if is_overwrite {
            let overwrites = self.metrics.tx_mailbox_overwrites.fetch_add(1, Ordering::Relaxed) + 1;

            // 每 1000 次提交检查一次覆盖率
            if total.is_multiple_of(1000) {
                let rate = (overwrites as f64 / total as f64) * 100.0;
                if rate > 50.0 {
                    warn!(
                        "High command overwrite rate detected: {:.1}% ({} overwrites / {} total). \
                         TX thread cannot keep up with the control loop.",
                        rate, overwrites, total
                    );
                } else if rate > 30.0 {
                    info!(
                        "Moderate command overwrite rate: {:.1}% ({} overwrites / {} total).",
                        rate, overwrites, total
                    );
                }
            }
        }

        Ok(())
    }

    /// 最新状态样本（不等待）
    pub fn latest_status(&self) -> Option<StatusSample> {
        self.history.latest()
    }

    /// 等待接收时间晚于 `after_us` 的状态样本
    ///
    /// # 错误
    /// - `DriverError::Timeout`: 超时
    pub fn wait_status(
        &self,
        after_us: Option<u64>,
        timeout: Duration,
    ) -> Result<StatusSample, DriverError> {
        self.history.wait_newer(after_us, timeout).ok_or(DriverError::Timeout)
    }

    /// 最新图像（不等待）
    pub fn latest_image(&self) -> Option<Arc<CapturedImage>> {
        self.frames.latest()
    }

    /// 有效弹速（m/s）
    pub fn effective_bullet_speed(&self, reported: f64) -> f64 {
        self.config.effective_bullet_speed(reported)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 获取性能指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 检查线程健康状态
    pub fn check_health(&self) -> WorkerHealth {
        let alive = |handle: &Option<JoinHandle<()>>| handle.as_ref().is_some_and(|h| !h.is_finished());
        WorkerHealth {
            rx_alive: alive(&self.rx_thread),
            tx_alive: alive(&self.tx_thread),
            camera_alive: self.camera_thread.as_ref().is_none_or(|h| !h.is_finished()),
        }
    }

    /// 如果所有线程都存活，返回 `true`
    pub fn is_healthy(&self) -> bool {
        self.check_health().all_alive()
    }

    /// 停止工作线程并释放设备
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Release：之前的写入对各线程可见
        self.is_running.store(false, Ordering::Release);

        let join_timeout = Duration::from_millis(self.config.join_timeout_ms);
        for (name, handle) in [
            ("RX", self.rx_thread.take()),
            ("TX", self.tx_thread.take()),
            ("Camera", self.camera_thread.take()),
        ] {
            if let Some(handle) = handle
                && let Err(_e) = handle.join_timeout(join_timeout)
            {
                error!(
                    "{} thread panicked or failed to shut down within {:?}",
                    name, join_timeout
                );
            }
        }
    }
}

impl Drop for Turret {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraError, Image};
    use crate::clock::monotonic_us;
    use approx::assert_relative_eq;
    use std::time::Instant;
    use turret_protocol::{FireFlag, Status, encode_status};
    use turret_serial::mock::{MockLink, MockSerialAdapter};

    fn status_frame(stamp: u8, yaw: f64, bullet_speed: f64, flag: u8) -> Vec<u8> {
        encode_status(&Status {
            stamp,
            yaw_degree: yaw,
            pitch_degree: 0.0,
            bullet_speed,
            flag,
        })
        .to_vec()
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            update_timeout_ms: 1_000,
            orientation_timeout_ms: 1_000,
            reconnect_interval_ms: 1,
            ..PipelineConfig::default()
        }
    }

    fn serial_only() -> (Turret, MockLink) {
        let (adapter, link) = MockSerialAdapter::new(Duration::from_millis(2));
        let turret = Turret::new(adapter, None, test_config()).unwrap();
        (turret, link)
    }

    struct CountingCamera {
        next: u8,
    }

    impl Camera for CountingCamera {
        fn capture(&mut self) -> Result<Image, CameraError> {
            thread::sleep(Duration::from_millis(2));
            self.next = self.next.wrapping_add(1);
            Image::new(1, 1, 1, vec![self.next])
        }
    }

    #[test]
    fn test_turret_new_and_drop() {
        let (turret, link) = serial_only();
        assert!(turret.is_healthy());
        let start = Instant::now();
        drop(turret);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(!link.is_rx_open());
        assert!(!link.is_tx_open());
    }

    #[test]
    fn test_shoot_writes_frame() {
        let (turret, link) = serial_only();
        turret.shoot(0.0, 0.0, &Vector3::new(0.0, 0.0, 5.0), Some(0.0)).unwrap();

        let written = link.written().recv_timeout(Duration::from_secs(2)).unwrap();
        let command = AimCommand::from_frame(&written).unwrap();
        assert_eq!(command.x_mm, 0);
        assert_eq!(command.y_mm, 0);
        assert_eq!(command.z_mm, 5000);
        assert_eq!(command.flag, FireFlag::Fire);
        assert_eq!(turret.metrics().tx_commands_total, 1);
    }

    #[test]
    fn test_shoot_rejects_vertical_point() {
        let (turret, _link) = serial_only();
        let result = turret.shoot(0.0, 0.0, &Vector3::new(0.0, 1.0, 0.0), None);
        assert!(matches!(result, Err(DriverError::InvalidInput(_))));
        assert_eq!(turret.metrics().tx_commands_total, 0);
    }

    #[test]
    fn test_update_decodes_flag_and_bullet_speed() {
        let (mut turret, link) = serial_only();

        // 十位 2：小能量机关；百位 1：蓝方；个位 3：步兵
        link.feed(status_frame(1, 10.0, 3.0, 123));
        let snapshot = turret.update().unwrap();
        assert!(snapshot.image.is_none());
        assert_eq!(snapshot.bullet_speed, 15.0);
        assert_eq!(snapshot.work_mode(), WorkMode::SmallEnergy);
        assert_eq!(snapshot.team(), Team::Blue);
        assert_eq!(snapshot.robot_id(), 3);
        assert_relative_eq!(snapshot.status.status.yaw_degree, 10.0);

        link.feed(status_frame(2, 10.0, 28.5, 31));
        let sample = turret
            .wait_status(Some(snapshot.status.read_time_us), Duration::from_secs(2))
            .unwrap();
        assert_eq!(sample.status.stamp, 2);
        let snapshot = turret.update().unwrap();
        assert_relative_eq!(snapshot.bullet_speed, 28.5);
        assert_eq!(snapshot.work_mode(), WorkMode::BigEnergy);
        assert_eq!(snapshot.team(), Team::Red);
    }

    #[test]
    fn test_update_times_out_without_status() {
        let (adapter, _link) = MockSerialAdapter::new(Duration::from_millis(2));
        let config = PipelineConfig {
            update_timeout_ms: 20,
            ..PipelineConfig::default()
        };
        let mut turret = Turret::new(adapter, None, config).unwrap();
        assert!(matches!(turret.update(), Err(DriverError::Timeout)));
    }

    #[test]
    fn test_update_waits_for_newer_status() {
        let (adapter, link) = MockSerialAdapter::new(Duration::from_millis(2));
        let config = PipelineConfig {
            update_timeout_ms: 200,
            ..PipelineConfig::default()
        };
        let mut turret = Turret::new(adapter, None, config).unwrap();

        link.feed(status_frame(1, 10.0, 15.0, 1));
        let first = turret.update().unwrap();
        assert_eq!(first.status.status.stamp, 1);

        // 没有新状态：不重复返回旧样本
        assert!(matches!(turret.update(), Err(DriverError::Timeout)));

        link.feed(status_frame(2, 11.0, 15.0, 1));
        let second = turret.update().unwrap();
        assert_eq!(second.status.status.stamp, 2);
        assert!(second.status.read_time_us > first.status.read_time_us);
    }

    #[test]
    fn test_update_returns_newer_images() {
        let (adapter, link) = MockSerialAdapter::new(Duration::from_millis(2));
        let camera: Box<dyn Camera + Send> = Box::new(CountingCamera { next: 0 });
        let mut turret = Turret::new(adapter, Some(camera), test_config()).unwrap();
        link.feed(status_frame(1, 0.0, 15.0, 1));
        let first = turret.update().unwrap().image.unwrap();
        link.feed(status_frame(2, 0.0, 15.0, 1));
        let second = turret.update().unwrap().image.unwrap();
        assert!(second.sequence > first.sequence);
        assert!(turret.metrics().camera_frames >= 2);
    }

    #[test]
    fn test_orientation_at_between_samples() {
        let (turret, link) = serial_only();

        link.feed(status_frame(1, 0.0, 15.0, 1));
        let first = turret.wait_status(None, Duration::from_secs(2)).unwrap();
        thread::sleep(Duration::from_millis(1));
        let query_us = monotonic_us();
        thread::sleep(Duration::from_millis(5));
        link.feed(status_frame(2, 10.0, 15.0, 1));

        let o = turret.orientation_at(query_us).unwrap();
        assert!(query_us > first.read_time_us);
        assert!(o.yaw_degree > 0.0 && o.yaw_degree < 10.0);
    }
}
