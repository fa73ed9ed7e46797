//! 驱动层错误类型定义

use crate::camera::CameraError;
use thiserror::Error;
use turret_protocol::FrameError;
use turret_serial::SerialError;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口错误
    #[error("Serial error: {0}")]
    Serial(#[from] SerialError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] FrameError),

    /// 相机错误
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    /// 命令邮箱已关闭（TX 线程退出）
    #[error("Command channel closed")]
    ChannelClosed,

    /// IO 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,

    /// 无效输入（如目标点位于竖直轴上）
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DriverError {
    /// 是否为不可恢复错误（工作线程已退出）
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::ChannelClosed | DriverError::IoThread(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let driver_error = DriverError::Serial(SerialError::Timeout);
        assert!(driver_error.to_string().contains("Read timeout"));

        let driver_error = DriverError::Protocol(FrameError::BadLength {
            expected: 11,
            actual: 4,
        });
        assert!(driver_error.to_string().contains("Invalid frame length"));

        assert_eq!(DriverError::ChannelClosed.to_string(), "Command channel closed");
        assert_eq!(DriverError::Timeout.to_string(), "Operation timeout");

        let msg = DriverError::IoThread("rx gone".to_string()).to_string();
        assert!(msg.contains("IO thread") && msg.contains("rx gone"));
    }

    #[test]
    fn test_from_serial_error() {
        let driver_error: DriverError = SerialError::NotOpen.into();
        assert!(matches!(driver_error, DriverError::Serial(SerialError::NotOpen)));
    }

    #[test]
    fn test_from_frame_error() {
        let err = FrameError::BadSentinel {
            head: 0,
            tail: 0xF2,
        };
        let driver_error: DriverError = err.clone().into();
        match driver_error {
            DriverError::Protocol(e) => assert_eq!(e, err),
            _ => panic!("Expected Protocol variant"),
        }
    }

    #[test]
    fn test_is_fatal() {
        assert!(DriverError::ChannelClosed.is_fatal());
        assert!(DriverError::IoThread("x".into()).is_fatal());
        assert!(!DriverError::Timeout.is_fatal());
        assert!(!DriverError::InvalidInput("d == 0".into()).is_fatal());
    }
}
