//! 链路性能指标
//!
//! 原子计数器，任何线程都可以无锁读取。

use std::sync::atomic::{AtomicU64, Ordering};

/// 云台链路实时指标
///
/// # 使用示例
///
/// ```rust
/// use turret_driver::TurretMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = TurretMetrics::new();
/// metrics.rx_frames_valid.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().rx_frames_valid, 1);
/// ```
#[derive(Debug, Default)]
pub struct TurretMetrics {
    /// RX 读到的总字节数
    pub rx_bytes_total: AtomicU64,
    /// 成功解码并写入历史的状态帧数
    pub rx_frames_valid: AtomicU64,
    /// 读到的字节不足一帧（丢弃）
    pub rx_short_reads: AtomicU64,
    /// 帧头/帧尾错误（丢弃）
    pub rx_bad_sentinel: AtomicU64,
    /// CRC 错误（丢弃）
    pub rx_bad_checksum: AtomicU64,
    /// RX 读超时次数（无数据时的正常现象）
    pub rx_timeouts: AtomicU64,
    /// 接收时间未递增而被历史拒绝的样本数
    pub rx_history_rejected: AtomicU64,

    /// 提交到邮箱的瞄准命令数
    pub tx_commands_total: AtomicU64,
    /// 实际写出的帧数
    pub tx_frames_sent: AtomicU64,
    /// 邮箱覆盖次数（TX 线程来不及取走上一条命令）
    ///
    /// 持续增长说明 TX 写入跟不上控制频率。
    pub tx_mailbox_overwrites: AtomicU64,

    /// 串口设备错误次数
    pub device_errors: AtomicU64,
    /// 重连成功次数
    pub reconnects: AtomicU64,

    /// 相机采集成功帧数
    pub camera_frames: AtomicU64,
    /// 相机采集失败次数
    pub camera_errors: AtomicU64,
}

impl TurretMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_bytes_total: self.rx_bytes_total.load(Ordering::Relaxed),
            rx_frames_valid: self.rx_frames_valid.load(Ordering::Relaxed),
            rx_short_reads: self.rx_short_reads.load(Ordering::Relaxed),
            rx_bad_sentinel: self.rx_bad_sentinel.load(Ordering::Relaxed),
            rx_bad_checksum: self.rx_bad_checksum.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            rx_history_rejected: self.rx_history_rejected.load(Ordering::Relaxed),
            tx_commands_total: self.tx_commands_total.load(Ordering::Relaxed),
            tx_frames_sent: self.tx_frames_sent.load(Ordering::Relaxed),
            tx_mailbox_overwrites: self.tx_mailbox_overwrites.load(Ordering::Relaxed),
            device_errors: self.device_errors.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            camera_frames: self.camera_frames.load(Ordering::Relaxed),
            camera_errors: self.camera_errors.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        for counter in [
            &self.rx_bytes_total,
            &self.rx_frames_valid,
            &self.rx_short_reads,
            &self.rx_bad_sentinel,
            &self.rx_bad_checksum,
            &self.rx_timeouts,
            &self.rx_history_rejected,
            &self.tx_commands_total,
            &self.tx_frames_sent,
            &self.tx_mailbox_overwrites,
            &self.device_errors,
            &self.reconnects,
            &self.camera_frames,
            &self.camera_errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub rx_bytes_total: u64,
    pub rx_frames_valid: u64,
    pub rx_short_reads: u64,
    pub rx_bad_sentinel: u64,
    pub rx_bad_checksum: u64,
    pub rx_timeouts: u64,
    pub rx_history_rejected: u64,
    pub tx_commands_total: u64,
    pub tx_frames_sent: u64,
    pub tx_mailbox_overwrites: u64,
    pub device_errors: u64,
    pub reconnects: u64,
    pub camera_frames: u64,
    pub camera_errors: u64,
}

impl MetricsSnapshot {
    /// 丢弃的读取次数（不足一帧 + 帧头尾错误 + CRC 错误）
    pub fn rx_dropped(&self) -> u64 {
        self.rx_short_reads + self.rx_bad_sentinel + self.rx_bad_checksum
    }

    /// 有效帧率（百分比）
    ///
    /// 没有任何读取时返回 0.0。
    pub fn valid_frame_rate(&self) -> f64 {
        let total = self.rx_frames_valid + self.rx_dropped();
        if total == 0 {
            return 0.0;
        }
        (self.rx_frames_valid as f64 / total as f64) * 100.0
    }

    /// 邮箱覆盖率（百分比）
    pub fn overwrite_rate(&self) -> f64 {
        if self.tx_commands_total == 0 {
            return 0.0;
        }
        (self.tx_mailbox_overwrites as f64 / self.tx_commands_total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        let snapshot = TurretMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = TurretMetrics::new();
        metrics.rx_frames_valid.fetch_add(100, Ordering::Relaxed);
        metrics.tx_mailbox_overwrites.fetch_add(5, Ordering::Relaxed);
        metrics.camera_errors.fetch_add(1, Ordering::Relaxed);
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_concurrent_updates() {
        let metrics = Arc::new(TurretMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.rx_bytes_total.fetch_add(11, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().rx_bytes_total, 8 * 100 * 11);
    }

    #[test]
    fn test_snapshot_rates() {
        let snapshot = MetricsSnapshot {
            rx_frames_valid: 80,
            rx_short_reads: 10,
            rx_bad_sentinel: 5,
            rx_bad_checksum: 5,
            tx_commands_total: 50,
            tx_mailbox_overwrites: 5,
            ..Default::default()
        };
        assert_eq!(snapshot.rx_dropped(), 20);
        assert_eq!(snapshot.valid_frame_rate(), 80.0);
        assert_eq!(snapshot.overwrite_rate(), 10.0);
    }

    #[test]
    fn test_snapshot_rates_zero_total() {
        let snapshot = MetricsSnapshot::default();
        assert_eq!(snapshot.valid_frame_rate(), 0.0);
        assert_eq!(snapshot.overwrite_rate(), 0.0);
    }
}
