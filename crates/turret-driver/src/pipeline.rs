//! Pipeline 工作线程模块
//!
//! 三个独立线程：串口接收、串口发送、相机采集。线程之间只通过
//! 状态历史（RX -> 读者）、命令邮箱（写者 -> TX）和最新帧插槽
//! （相机 -> 读者）通信。

use crate::camera::{Camera, CapturedImage, FrameSlot};
use crate::clock::monotonic_us;
use crate::history::{StatusHistory, StatusSample};
use crate::metrics::TurretMetrics;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};
use turret_protocol::{AimCommand, FrameError, RX_FRAME_LEN, decode};
use turret_serial::{ErrorLogGate, Reopen, RxAdapter, SerialErrorClass, TxAdapter};

/// 关闭检查粒度（重连/重试等待期间）
const SHUTDOWN_POLL: Duration = Duration::from_millis(5);

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use turret_driver::PipelineConfig;
///
/// let config = PipelineConfig {
///     reconnect_interval_ms: 500,
///     ..PipelineConfig::default()
/// };
/// assert_eq!(config.min_valid_bullet_speed, 5.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// 串口读超时（毫秒），决定 RX 线程响应退出信号的延迟
    pub receive_timeout_ms: u64,
    /// 重连间隔（毫秒）
    pub reconnect_interval_ms: u64,
    /// 状态历史最大样本数
    pub history_capacity: usize,
    /// 状态历史保留窗口（毫秒）
    pub history_retention_ms: u64,
    /// `orientation_at` 最长等待（毫秒）
    pub orientation_timeout_ms: u64,
    /// `update` 等待新图像/新状态的最长时间（毫秒）
    pub update_timeout_ms: u64,
    /// 下位机上报弹速高于此值才视为有效（m/s）
    pub min_valid_bullet_speed: f64,
    /// 上报弹速无效时使用的弹速（m/s）
    pub fallback_bullet_speed: f64,
    /// 相机采集失败后的重试间隔（毫秒）
    pub camera_retry_ms: u64,
    /// 关闭时等待工作线程退出的最长时间（毫秒）
    pub join_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 10,
            reconnect_interval_ms: 100,
            history_capacity: 1000,
            history_retention_ms: 2000,
            orientation_timeout_ms: 100,
            update_timeout_ms: 500,
            min_valid_bullet_speed: 5.0,
            fallback_bullet_speed: 15.0,
            camera_retry_ms: 10,
            join_timeout_ms: 2000,
        }
    }
}

impl PipelineConfig {
    /// 有效弹速
    pub fn effective_bullet_speed(&self, reported: f64) -> f64 {
        if reported > self.min_valid_bullet_speed {
            reported
        } else {
            self.fallback_bullet_speed
        }
    }

    pub fn new_history(&self) -> StatusHistory {
        StatusHistory::new(
            self.history_capacity,
            Duration::from_millis(self.history_retention_ms),
        )
    }
}

/// 单槽命令邮箱（最新命令覆盖未发送的旧命令）
#[derive(Debug, Default)]
pub struct CommandMailbox {
    slot: Mutex<Option<AimCommand>>,
}

impl CommandMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// 放入命令，返回是否覆盖了未取走的旧命令
    pub fn post(&self, command: AimCommand) -> bool {
        self.slot.lock().replace(command).is_some()
    }

    /// 取出命令，插槽变为空
    pub fn take(&self) -> Option<AimCommand> {
        self.slot.lock().take()
    }

    /// 放回未能写出的命令
    ///
    /// 插槽中已有更新的命令时不放回，返回 `false`。
    pub fn restore(&self, command: AimCommand) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(command);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

#[cfg(feature = "realtime")]
fn raise_thread_priority(name: &str) {
    use thread_priority::*;

    match set_current_thread_priority(ThreadPriority::Max) {
        Ok(_) => {
            info!("{} thread priority set to MAX (realtime)", name);
        },
        Err(e) => {
            warn!(
                "Failed to set {} thread priority: {}. \
                On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                name, e
            );
        },
    }
}

/// 休眠，期间每隔 [`SHUTDOWN_POLL`] 检查一次运行标志
///
/// 返回 `false` 表示等待期间收到退出信号。
fn sleep_while_running(duration: Duration, is_running: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if !is_running.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        spin_sleep::sleep((deadline - now).min(SHUTDOWN_POLL));
    }
}

/// 关闭并反复重新打开设备，直到成功或收到退出信号
///
/// 与触发重连的错误共用同一个日志门控：同类失败只记录一次。
/// 返回 `false` 表示收到退出信号。
pub fn reconnect(
    adapter: &mut impl Reopen,
    name: &str,
    interval: Duration,
    gate: &mut ErrorLogGate<SerialErrorClass>,
    is_running: &AtomicBool,
    metrics: &TurretMetrics,
) -> bool {
    adapter.close();
    loop {
        if !is_running.load(Ordering::Acquire) {
            return false;
        }
        match adapter.reopen() {
            Ok(()) => {
                metrics.reconnects.fetch_add(1, Ordering::Relaxed);
                info!("{} serial port reopened", name);
                return true;
            },
            Err(e) => {
                if gate.should_log(e.class()) {
                    error!("{} serial port reopen failed: {}", name, e);
                }
                if !sleep_while_running(interval, is_running) {
                    return false;
                }
            },
        }
    }
}

/// 处理一次读取的字节
///
/// 不足一帧时丢弃；否则只解码最后 11 个字节（丢弃更早的积压帧和
/// 前缀垃圾），成功后以 `read_time_us` 追加到历史。
pub fn process_read(
    bytes: &[u8],
    read_time_us: u64,
    history: &StatusHistory,
    metrics: &TurretMetrics,
) -> Option<StatusSample> {
    if bytes.is_empty() {
        return None;
    }
    if bytes.len() < RX_FRAME_LEN {
        metrics.rx_short_reads.fetch_add(1, Ordering::Relaxed);
        debug!("RX: short read {}", hex::encode(bytes));
        return None;
    }

    let frame = &bytes[bytes.len() - RX_FRAME_LEN..];
    match decode(frame) {
        Ok(status) => {
            let sample = StatusSample::new(read_time_us, status);
            if history.push(sample) {
                metrics.rx_frames_valid.fetch_add(1, Ordering::Relaxed);
                trace!(
                    "RX: stamp={} yaw={:.2} pitch={:.2} bullet_speed={:.2} flag={}",
                    status.stamp,
                    status.yaw_degree,
                    status.pitch_degree,
                    status.bullet_speed,
                    status.flag
                );
                Some(sample)
            } else {
                metrics.rx_history_rejected.fetch_add(1, Ordering::Relaxed);
                trace!("RX: sample at {}us rejected (time not increasing)", read_time_us);
                None
            }
        },
        Err(e) => {
            match e {
                FrameError::BadSentinel { .. } => &metrics.rx_bad_sentinel,
                FrameError::BadChecksum { .. } => &metrics.rx_bad_checksum,
                FrameError::BadLength { .. } => &metrics.rx_short_reads,
            }
            .fetch_add(1, Ordering::Relaxed);
            debug!("RX: failed to decode {}: {}", hex::encode(frame), e);
            None
        },
    }
}

/// RX 线程主循环
///
/// 读取 -> 取最后一帧 -> 解码 -> 写入历史。解码错误丢帧继续，
/// 设备错误进入重连，不会向调用方抛出。
///
/// # 参数
/// - `rx`: RX 适配器（只读）
/// - `history`: 状态历史
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志（用于生命周期联动）
/// - `metrics`: 性能指标
pub fn rx_loop(
    mut rx: impl RxAdapter,
    history: Arc<StatusHistory>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<TurretMetrics>,
) {
    #[cfg(feature = "realtime")]
    raise_thread_priority("RX");

    let reconnect_interval = Duration::from_millis(config.reconnect_interval_ms);
    let mut gate = ErrorLogGate::new();
    let mut buf = Vec::with_capacity(256);

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        buf.clear();
        match rx.read_available(&mut buf) {
            Ok(n) => {
                metrics.rx_bytes_total.fetch_add(n as u64, Ordering::Relaxed);
            },
            Err(e) if e.is_timeout() => {
                metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(e) => {
                metrics.device_errors.fetch_add(1, Ordering::Relaxed);
                if gate.should_log(e.class()) {
                    error!("RX thread: serial read error: {}", e);
                }
                if !reconnect(
                    &mut rx,
                    "RX",
                    reconnect_interval,
                    &mut gate,
                    &is_running,
                    &metrics,
                ) {
                    break;
                }
                continue;
            },
        }

        let read_time_us = monotonic_us();
        if process_read(&buf, read_time_us, &history, &metrics).is_some() {
            gate.reset();
        }
    }

    rx.close();
    trace!("RX thread: loop exited");
}

/// TX 线程主循环（邮箱模式）
///
/// 取出邮箱中的最新命令并写出。控制线程从不等待物理写入。
/// 写入失败时重连，成功后把该命令放回邮箱重发。
///
/// # 参数
/// - `tx`: TX 适配器（只写）
/// - `mailbox`: 命令邮箱
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志（用于生命周期联动）
/// - `metrics`: 性能指标
pub fn tx_loop_mailbox(
    mut tx: impl TxAdapter,
    mailbox: Arc<CommandMailbox>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<TurretMetrics>,
) {
    #[cfg(feature = "realtime")]
    raise_thread_priority("TX");

    let reconnect_interval = Duration::from_millis(config.reconnect_interval_ms);
    let mut gate = ErrorLogGate::new();

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("TX thread: is_running flag is false, exiting");
            break;
        }

        let Some(command) = mailbox.take() else {
            // 邮箱为空，避免忙等待
            spin_sleep::sleep(Duration::from_micros(50));
            continue;
        };

        let frame = command.to_frame();
        match tx.write_all(&frame) {
            Ok(()) => {
                metrics.tx_frames_sent.fetch_add(1, Ordering::Relaxed);
                gate.reset();
                trace!(
                    "TX: x={} y={} z={} flag={:?} {}",
                    command.x_mm,
                    command.y_mm,
                    command.z_mm,
                    command.flag,
                    hex::encode(frame)
                );
            },
            Err(e) => {
                metrics.device_errors.fetch_add(1, Ordering::Relaxed);
                if gate.should_log(e.class()) {
                    error!("TX thread: serial write error: {}", e);
                }
                if !reconnect(
                    &mut tx,
                    "TX",
                    reconnect_interval,
                    &mut gate,
                    &is_running,
                    &metrics,
                ) {
                    break;
                }
                // 重连后重发，除非期间已有新命令
                if !mailbox.restore(command) {
                    debug!("TX: newer command pending, dropping failed frame");
                }
            },
        }
    }

    tx.close();
    trace!("TX thread: loop exited");
}

/// 相机线程主循环
///
/// 持续采集并覆盖最新帧。采集失败计数、按类别去重记录，然后重试。
pub fn camera_loop(
    mut camera: impl Camera,
    slot: Arc<FrameSlot>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<TurretMetrics>,
) {
    let retry_interval = Duration::from_millis(config.camera_retry_ms);
    let mut gate = ErrorLogGate::new();
    let mut sequence = 0u64;

    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("Camera thread: is_running flag is false, exiting");
            break;
        }

        match camera.capture() {
            Ok(image) => {
                let timestamp_us = monotonic_us();
                sequence += 1;
                slot.publish(CapturedImage {
                    image,
                    timestamp_us,
                    sequence,
                });
                metrics.camera_frames.fetch_add(1, Ordering::Relaxed);
                let suppressed = gate.reset();
                if suppressed > 0 {
                    info!("Camera recovered after {} repeated failures", suppressed);
                }
            },
            Err(e) => {
                metrics.camera_errors.fetch_add(1, Ordering::Relaxed);
                if gate.should_log(e.kind()) {
                    warn!("Camera thread: capture failed: {}", e);
                }
                if !sleep_while_running(retry_interval, &is_running) {
                    break;
                }
            },
        }
    }

    camera.close();
    trace!("Camera thread: loop exited");
}
