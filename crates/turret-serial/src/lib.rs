//! # Turret Serial Transport
//!
//! 串口硬件抽象层：统一的收发接口、错误分类和断线重连支持。
//!
//! - `port`: 基于 `serialport` 的适配器，可分离为独立的 RX/TX 半边
//! - `gate`: 按错误类别去重的日志门控（重连循环使用）
//! - `mock`: 内存通道适配器（`mock` feature）

use std::io;
use thiserror::Error;

pub mod gate;
pub mod port;

#[cfg(feature = "mock")]
pub mod mock;

pub use gate::ErrorLogGate;
pub use port::{SerialPortAdapter, SerialRxAdapter, SerialTxAdapter};

/// 默认波特率（与下位机固件一致）
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// 串口层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] SerialDeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Port not open")]
    NotOpen,
}

impl SerialError {
    /// 错误类别（用于重连日志去重）
    ///
    /// 同类错误连续出现只记录一次，类别变化时重新记录。
    pub fn class(&self) -> SerialErrorClass {
        match self {
            SerialError::Io(e) => SerialErrorClass::Io(e.kind()),
            SerialError::Device(e) => SerialErrorClass::Device(e.kind),
            SerialError::Timeout => SerialErrorClass::Timeout,
            SerialError::NotOpen => SerialErrorClass::NotOpen,
        }
    }

    /// 是否为读超时（非错误，轮询继续）
    pub fn is_timeout(&self) -> bool {
        match self {
            SerialError::Timeout => true,
            SerialError::Io(e) => e.kind() == io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialErrorClass {
    Io(io::ErrorKind),
    Device(SerialDeviceErrorKind),
    Timeout,
    NotOpen,
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialDeviceErrorKind {
    Unknown,
    NoDevice,
    InvalidInput,
    AccessDenied,
    Busy,
    Io,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct SerialDeviceError {
    pub kind: SerialDeviceErrorKind,
    pub message: String,
}

impl SerialDeviceError {
    pub fn new(kind: SerialDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 设备是否已不可用（拔出 / 无权限），需要重新打开
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            SerialDeviceErrorKind::NoDevice | SerialDeviceErrorKind::AccessDenied
        )
    }
}

impl From<String> for SerialDeviceError {
    fn from(message: String) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for SerialDeviceError {
    fn from(message: &str) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

impl From<serialport::Error> for SerialDeviceError {
    fn from(e: serialport::Error) -> Self {
        let kind = match e.kind {
            serialport::ErrorKind::NoDevice => SerialDeviceErrorKind::NoDevice,
            serialport::ErrorKind::InvalidInput => SerialDeviceErrorKind::InvalidInput,
            serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
                SerialDeviceErrorKind::AccessDenied
            },
            serialport::ErrorKind::Io(io::ErrorKind::ResourceBusy) => SerialDeviceErrorKind::Busy,
            serialport::ErrorKind::Io(_) => SerialDeviceErrorKind::Io,
            serialport::ErrorKind::Unknown => SerialDeviceErrorKind::Unknown,
        };
        Self::new(kind, e.description)
    }
}

impl From<serialport::Error> for SerialError {
    fn from(e: serialport::Error) -> Self {
        SerialError::Device(e.into())
    }
}

/// 可关闭并重新打开的端点
///
/// 重连循环在设备错误后调用 `close()` 再反复 `reopen()` 直到成功。
pub trait Reopen {
    /// 释放设备句柄（幂等）
    fn close(&mut self);

    /// 重新打开设备
    fn reopen(&mut self) -> Result<(), SerialError>;
}

/// 接收端
pub trait RxAdapter: Reopen {
    /// 读取当前可用的全部字节，追加到 `buf`
    ///
    /// 没有待读数据时最多阻塞一个读超时，超时返回 `SerialError::Timeout`。
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, SerialError>;
}

/// 发送端
pub trait TxAdapter: Reopen {
    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError>;
}

/// 可分离为独立 RX/TX 的适配器
pub trait SplittableAdapter {
    type RxAdapter: RxAdapter;
    type TxAdapter: TxAdapter;

    /// 分离为接收端和发送端（消费 `self`）
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), SerialError>;
}
