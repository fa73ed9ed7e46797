//! 进程内单调时钟
//!
//! 相机时间戳和状态帧接收时间必须来自同一时钟，才能做时间对齐。

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// 自进程内首次调用起经过的微秒数
#[inline]
pub fn monotonic_us() -> u64 {
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_micros() as u64
}

/// 微秒转秒
#[inline]
pub fn us_to_s(us: u64) -> f64 {
    us as f64 / 1e6
}
