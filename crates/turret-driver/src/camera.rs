//! 相机抽象与最新帧插槽
//!
//! 厂商 SDK 通过实现 [`Camera`] 接入。相机线程把每一帧连同时间戳、
//! 序号写入 [`FrameSlot`]，未读取的旧帧直接被覆盖。

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// 相机错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Hardware error: {0}")]
    Hardware(String),
    #[error("Capture error: {0}")]
    Capture(String),
    #[error("Capture timeout")]
    Timeout,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// 错误类别（日志去重用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraErrorKind {
    Hardware,
    Capture,
    Timeout,
    Config,
}

impl CameraError {
    pub fn kind(&self) -> CameraErrorKind {
        match self {
            CameraError::Hardware(_) => CameraErrorKind::Hardware,
            CameraError::Capture(_) => CameraErrorKind::Capture,
            CameraError::Timeout => CameraErrorKind::Timeout,
            CameraError::Config(_) => CameraErrorKind::Config,
        }
    }
}

/// 图像缓冲区（行主序，交错通道）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Bytes,
}

impl Image {
    /// # 错误
    /// - `CameraError::Capture`: 缓冲区长度与尺寸不符
    pub fn new(
        width: u32,
        height: u32,
        channels: u8,
        data: impl Into<Bytes>,
    ) -> Result<Self, CameraError> {
        let data = data.into();
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(CameraError::Capture(format!(
                "buffer length {} does not match {}x{}x{}",
                data.len(),
                width,
                height,
                channels
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// 读取像素 `(x, y)` 的通道切片
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let channels = self.channels as usize;
        let offset = (y as usize * self.width as usize + x as usize) * channels;
        self.data.get(offset..offset + channels)
    }
}

/// 带时间戳的图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub image: Image,
    /// 采集时间（微秒，与状态历史同一时钟）
    pub timestamp_us: u64,
    /// 相机线程内的递增序号（从 1 开始）
    pub sequence: u64,
}

/// 相机接口
pub trait Camera {
    /// 采集一帧（阻塞直到曝光完成）
    fn capture(&mut self) -> Result<Image, CameraError>;

    /// 释放设备
    fn close(&mut self) {}
}

impl<C: Camera + ?Sized> Camera for Box<C> {
    fn capture(&mut self) -> Result<Image, CameraError> {
        (**self).capture()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// 最新帧插槽
///
/// 写端覆盖，读端拿到 `Arc` 快照，不会看到写了一半的帧。
#[derive(Default)]
pub struct FrameSlot {
    latest: ArcSwapOption<CapturedImage>,
    sequence: Mutex<u64>,
    cond: Condvar,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发布新帧并唤醒等待者
    pub fn publish(&self, frame: CapturedImage) {
        let sequence = frame.sequence;
        self.latest.store(Some(Arc::new(frame)));
        *self.sequence.lock() = sequence;
        self.cond.notify_all();
    }

    pub fn latest(&self) -> Option<Arc<CapturedImage>> {
        self.latest.load_full()
    }

    /// 等待序号大于 `after_sequence` 的帧（`None` 表示任意帧）
    ///
    /// 超时返回 `None`。
    pub fn wait_newer(
        &self,
        after_sequence: Option<u64>,
        timeout: Duration,
    ) -> Option<Arc<CapturedImage>> {
        let threshold = after_sequence.unwrap_or(0);
        let deadline = Instant::now() + timeout;
        let mut sequence = self.sequence.lock();
        while *sequence <= threshold {
            if self.cond.wait_until(&mut sequence, deadline).timed_out() {
                break;
            }
        }
        if *sequence <= threshold {
            return None;
        }
        drop(sequence);
        self.latest()
    }
}
