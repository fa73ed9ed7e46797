//! 状态历史
//!
//! RX 线程追加 `(接收时间, 状态)` 样本，控制线程按时间查询。
//! 这是唯一一个由一个线程写、另一个线程读的结构：`Mutex` + `Condvar`，
//! 读取时按值复制样本，不持有锁返回。

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use turret_protocol::Status;

/// 单个状态样本
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSample {
    /// 接收时间（微秒，见 [`crate::clock::monotonic_us`]）
    pub read_time_us: u64,
    pub status: Status,
}

impl StatusSample {
    pub fn new(read_time_us: u64, status: Status) -> Self {
        Self {
            read_time_us,
            status,
        }
    }
}

/// 查询时刻两侧的样本
///
/// 满足 `before.read_time_us < t <= after.read_time_us`。
/// `before` 为 `None` 表示 `t` 早于（或等于）历史中最早的样本。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub before: Option<StatusSample>,
    pub after: StatusSample,
}

/// 有界状态历史
///
/// - 接收时间严格递增（非递增样本被拒绝）
/// - 按数量上限和相对最新样本的保留窗口两种方式淘汰
pub struct StatusHistory {
    samples: Mutex<VecDeque<StatusSample>>,
    cond: Condvar,
    capacity: usize,
    retention_us: u64,
}

impl StatusHistory {
    /// # 参数
    /// - `capacity`: 最多保留的样本数（至少 1）
    /// - `retention`: 保留窗口，早于 `最新时间 - retention` 的样本被淘汰
    pub fn new(capacity: usize, retention: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            cond: Condvar::new(),
            capacity,
            retention_us: retention.as_micros() as u64,
        }
    }

    /// 追加样本并唤醒等待者
    ///
    /// 接收时间不大于最新样本时拒绝并返回 `false`。
    pub fn push(&self, sample: StatusSample) -> bool {
        {
            let mut samples = self.samples.lock();
            if let Some(last) = samples.back()
                && sample.read_time_us <= last.read_time_us
            {
                return false;
            }
            samples.push_back(sample);

            while samples.len() > self.capacity {
                samples.pop_front();
            }
            let horizon = sample.read_time_us.saturating_sub(self.retention_us);
            while samples.len() > 1
                && samples.front().is_some_and(|front| front.read_time_us < horizon)
            {
                samples.pop_front();
            }
        }
        self.cond.notify_all();
        true
    }

    /// 最新样本
    pub fn latest(&self) -> Option<StatusSample> {
        self.samples.lock().back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// 查找时刻 `t_us` 两侧的样本
    ///
    /// 历史中没有接收时间 `>= t_us` 的样本时返回 `None`。
    pub fn bracket(&self, t_us: u64) -> Option<Bracket> {
        let samples = self.samples.lock();
        // 第一个 read_time >= t 的位置
        let index = samples.partition_point(|s| s.read_time_us < t_us);
        let after = *samples.get(index)?;
        let before = index.checked_sub(1).and_then(|i| samples.get(i)).copied();
        Some(Bracket { before, after })
    }

    /// 等待直到最新样本的接收时间 `>= t_us`
    ///
    /// 返回当时的最新样本；超时返回 `None`。
    pub fn wait_until(&self, t_us: u64, timeout: Duration) -> Option<StatusSample> {
        self.wait_for(timeout, |latest| latest.read_time_us >= t_us)
    }

    /// 等待直到出现接收时间晚于 `after_us` 的样本（`None` 表示任意样本）
    pub fn wait_newer(&self, after_us: Option<u64>, timeout: Duration) -> Option<StatusSample> {
        match after_us {
            Some(t) => self.wait_for(timeout, |latest| latest.read_time_us > t),
            None => self.wait_for(timeout, |_| true),
        }
    }

    fn wait_for(
        &self,
        timeout: Duration,
        ready: impl Fn(&StatusSample) -> bool,
    ) -> Option<StatusSample> {
        let deadline = Instant::now() + timeout;
        let mut samples = self.samples.lock();
        loop {
            if let Some(latest) = samples.back()
                && ready(latest)
            {
                return Some(*latest);
            }
            if self.cond.wait_until(&mut samples, deadline).timed_out() {
                return samples.back().filter(|latest| ready(latest)).copied();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn sample(t: u64, yaw: f64) -> StatusSample {
        StatusSample::new(
            t,
            Status {
                yaw_degree: yaw,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_push_and_latest() {
        let history = StatusHistory::new(10, Duration::from_secs(1));
        assert!(history.latest().is_none());
        assert!(history.push(sample(100, 1.0)));
        assert!(history.push(sample(200, 2.0)));
        assert_eq!(history.latest().unwrap().read_time_us, 200);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_push_rejects_non_increasing_time() {
        let history = StatusHistory::new(10, Duration::from_secs(1));
        assert!(history.push(sample(100, 1.0)));
        assert!(!history.push(sample(100, 2.0)));
        assert!(!history.push(sample(50, 3.0)));
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().status.yaw_degree, 1.0);
    }

    #[test]
    fn test_capacity_eviction() {
        let history = StatusHistory::new(3, Duration::from_secs(10));
        for i in 1..=5 {
            history.push(sample(i * 10, i as f64));
        }
        assert_eq!(history.len(), 3);
        assert!(history.bracket(20).unwrap().before.is_none());
        assert_eq!(history.bracket(20).unwrap().after.read_time_us, 30);
    }

    #[test]
    fn test_retention_eviction() {
        let history = StatusHistory::new(100, Duration::from_micros(1_000));
        history.push(sample(0, 0.0));
        history.push(sample(500, 0.0));
        history.push(sample(2_000, 0.0));
        // 0 和 500 都早于 2000 - 1000
        assert_eq!(history.len(), 1);
        history.push(sample(2_600, 0.0));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_bracket_between_samples() {
        let history = StatusHistory::new(10, Duration::from_secs(1));
        history.push(sample(1_000, 1.0));
        history.push(sample(2_000, 2.0));
        history.push(sample(3_000, 3.0));

        let bracket = history.bracket(2_500).unwrap();
        assert_eq!(bracket.before.unwrap().read_time_us, 2_000);
        assert_eq!(bracket.after.read_time_us, 3_000);

        // 恰好等于某个样本时刻：after 为该样本
        let bracket = history.bracket(2_000).unwrap();
        assert_eq!(bracket.before.unwrap().read_time_us, 1_000);
        assert_eq!(bracket.after.read_time_us, 2_000);
    }

    #[test]
    fn test_bracket_before_first_sample() {
        let history = StatusHistory::new(10, Duration::from_secs(1));
        history.push(sample(1_000, 1.0));
        history.push(sample(2_000, 2.0));
        let bracket = history.bracket(500).unwrap();
        assert!(bracket.before.is_none());
        assert_eq!(bracket.after.read_time_us, 1_000);
    }

    #[test]
    fn test_bracket_after_latest_is_none() {
        let history = StatusHistory::new(10, Duration::from_secs(1));
        history.push(sample(1_000, 1.0));
        assert!(history.bracket(1_001).is_none());
    }

    #[test]
    fn test_wait_until_times_out() {
        let history = StatusHistory::new(10, Duration::from_secs(1));
        history.push(sample(1_000, 1.0));
        let start = Instant::now();
        assert!(history.wait_until(5_000, Duration::from_millis(20)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_until_already_satisfied() {
        let history = StatusHistory::new(10, Duration::from_secs(1));
        history.push(sample(1_000, 1.0));
        let latest = history.wait_until(500, Duration::ZERO).unwrap();
        assert_eq!(latest.read_time_us, 1_000);
    }

    #[test]
    fn test_wait_until_wakes_on_push() {
        let history = Arc::new(StatusHistory::new(10, Duration::from_secs(1)));
        let writer = history.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            writer.push(sample(1_000, 1.0));
            thread::sleep(Duration::from_millis(10));
            writer.push(sample(2_000, 2.0));
        });

        let latest = history.wait_until(1_500, Duration::from_secs(2)).unwrap();
        assert_eq!(latest.read_time_us, 2_000);
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_newer() {
        let history = StatusHistory::new(10, Duration::from_secs(1));
        assert!(history.wait_newer(None, Duration::from_millis(1)).is_none());
        history.push(sample(1_000, 1.0));
        assert!(history.wait_newer(None, Duration::ZERO).is_some());
        assert!(history.wait_newer(Some(1_000), Duration::from_millis(1)).is_none());
        assert!(history.wait_newer(Some(999), Duration::ZERO).is_some());
    }
}
