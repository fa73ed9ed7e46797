//! # Turret Protocol
//!
//! 云台下位机串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `crc`: CRC8 查表校验（与下位机逐位一致）
//! - `control`: 上行瞄准帧构建（10 字节）
//! - `feedback`: 下行状态帧解析（11 字节）
//! - `flag`: 状态帧标志位（机器人 ID / 工作模式 / 队伍颜色）
//!
//! ## 帧格式
//!
//! ```text
//! 上行（视觉 -> 下位机）: [0xF1][x:i16][y:i16][z:i16][flag:u8][crc8][0xF2]
//! 下行（下位机 -> 视觉）: [0xF1][stamp:u8][yaw:i16][pitch:i16][speed:u16][flag:u8][crc8][0xF2]
//! ```
//!
//! ## 字节序
//!
//! 所有多字节字段使用小端字节序（Little Endian），与下位机 MCU 一致。

pub mod control;
pub mod crc;
pub mod feedback;
pub mod flag;

pub use control::{AimCommand, FireFlag, encode};
pub use crc::crc8;
pub use feedback::{Status, decode, encode_status};
pub use flag::{StatusFlag, Team, WorkMode};

use thiserror::Error;

/// 帧头哨兵字节
pub const FRAME_HEAD: u8 = 0xF1;

/// 帧尾哨兵字节
pub const FRAME_TAIL: u8 = 0xF2;

/// 上行瞄准帧长度（字节）
pub const TX_FRAME_LEN: usize = 10;

/// 下行状态帧长度（字节）
pub const RX_FRAME_LEN: usize = 11;

/// 帧解析错误类型
///
/// 这些错误都是瞬态的：接收线程丢弃该帧并继续读取，不会向上层传播。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    BadLength { expected: usize, actual: usize },

    #[error("Invalid frame sentinel: head=0x{head:02X}, tail=0x{tail:02X}")]
    BadSentinel { head: u8, tail: u8 },

    #[error("Checksum mismatch: frame carries 0x{received:02X}, computed 0x{computed:02X}")]
    BadChecksum { received: u8, computed: u8 },
}

/// 小端字节序转 i16
pub fn bytes_to_i16_le(bytes: [u8; 2]) -> i16 {
    i16::from_le_bytes(bytes)
}

/// 小端字节序转 u16
pub fn bytes_to_u16_le(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// 检查帧头帧尾
pub(crate) fn check_sentinels(frame: &[u8]) -> Result<(), FrameError> {
    let head = frame[0];
    let tail = frame[frame.len() - 1];
    if head != FRAME_HEAD || tail != FRAME_TAIL {
        return Err(FrameError::BadSentinel { head, tail });
    }
    Ok(())
}

/// 校验 CRC（覆盖 CRC 字节之前的所有字节）
pub(crate) fn check_crc(frame: &[u8]) -> Result<(), FrameError> {
    let crc_index = frame.len() - 2;
    let received = frame[crc_index];
    let computed = crc8(&frame[..crc_index]);
    if received != computed {
        return Err(FrameError::BadChecksum { received, computed });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_i16_le() {
        assert_eq!(bytes_to_i16_le([0x34, 0x12]), 0x1234);
        assert_eq!(bytes_to_i16_le([0xFF, 0xFF]), -1);
    }

    #[test]
    fn test_bytes_to_u16_le() {
        assert_eq!(bytes_to_u16_le([0xFF, 0xFF]), u16::MAX);
        assert_eq!(bytes_to_u16_le([0xDC, 0x05]), 1500);
    }

    #[test]
    fn test_frame_error_display() {
        let err = FrameError::BadLength {
            expected: 11,
            actual: 4,
        };
        assert_eq!(err.to_string(), "Invalid frame length: expected 11, got 4");

        let err = FrameError::BadSentinel {
            head: 0x00,
            tail: 0xF2,
        };
        assert!(err.to_string().contains("head=0x00"));

        let err = FrameError::BadChecksum {
            received: 0x12,
            computed: 0x34,
        };
        assert!(err.to_string().contains("0x12"));
        assert!(err.to_string().contains("0x34"));
    }
}
