//! 瞄准帧构建模块
//!
//! 上行帧：视觉 -> 下位机，10 字节定长。

use crate::{FRAME_HEAD, FRAME_TAIL, FrameError, TX_FRAME_LEN, bytes_to_i16_le, crc8};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 开火标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum FireFlag {
    /// 只跟随，不开火
    #[default]
    Idle = 0,
    /// 立即开火
    Fire = 1,
}

/// 瞄准命令
///
/// 目标点位于枪管/IMU 坐标系，单位毫米（线上为整数毫米）。
/// 构建后不可变，每个控制周期最多产生一个，由 TX 线程恰好消费一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AimCommand {
    pub x_mm: i16,
    pub y_mm: i16,
    pub z_mm: i16,
    pub flag: FireFlag,
}

impl AimCommand {
    /// 从浮点毫米坐标创建
    ///
    /// 向零截断；超出 i16 范围的值饱和到边界，NaN 变为 0。
    pub fn new(x_mm: f64, y_mm: f64, z_mm: f64, flag: FireFlag) -> Self {
        Self {
            x_mm: x_mm as i16,
            y_mm: y_mm as i16,
            z_mm: z_mm as i16,
            flag,
        }
    }

    /// 是否为开火命令
    pub fn is_fire(&self) -> bool {
        self.flag == FireFlag::Fire
    }

    /// 编码为线上帧
    pub fn to_frame(&self) -> [u8; TX_FRAME_LEN] {
        let mut frame = [0u8; TX_FRAME_LEN];
        frame[0] = FRAME_HEAD;
        frame[1..3].copy_from_slice(&self.x_mm.to_le_bytes());
        frame[3..5].copy_from_slice(&self.y_mm.to_le_bytes());
        frame[5..7].copy_from_slice(&self.z_mm.to_le_bytes());
        frame[7] = self.flag.into();
        frame[8] = crc8(&frame[..8]);
        frame[9] = FRAME_TAIL;
        frame
    }

    /// 从线上帧解析（下位机侧 / 测试使用）
    pub fn from_frame(frame: &[u8]) -> Result<Self, FrameError> {
        if frame.len() != TX_FRAME_LEN {
            return Err(FrameError::BadLength {
                expected: TX_FRAME_LEN,
                actual: frame.len(),
            });
        }
        crate::check_sentinels(frame)?;
        crate::check_crc(frame)?;

        // 未知标志按空闲处理，下位机同样只识别 1 为开火
        let flag = FireFlag::try_from(frame[7]).unwrap_or(FireFlag::Idle);

        Ok(Self {
            x_mm: bytes_to_i16_le([frame[1], frame[2]]),
            y_mm: bytes_to_i16_le([frame[3], frame[4]]),
            z_mm: bytes_to_i16_le([frame[5], frame[6]]),
            flag,
        })
    }
}

/// 编码瞄准帧
///
/// 便捷函数，等价于 `AimCommand::new(..).to_frame()`。
pub fn encode(x_mm: f64, y_mm: f64, z_mm: f64, flag: FireFlag) -> [u8; TX_FRAME_LEN] {
    AimCommand::new(x_mm, y_mm, z_mm, flag).to_frame()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_layout() {
        let frame = encode(1000.0, -200.0, 5000.0, FireFlag::Fire);
        assert_eq!(frame.len(), TX_FRAME_LEN);
        assert_eq!(frame[0], FRAME_HEAD);
        assert_eq!(&frame[1..3], &1000i16.to_le_bytes());
        assert_eq!(&frame[3..5], &(-200i16).to_le_bytes());
        assert_eq!(&frame[5..7], &5000i16.to_le_bytes());
        assert_eq!(frame[7], 1);
        assert_eq!(frame[8], crc8(&frame[..8]));
        assert_eq!(frame[9], FRAME_TAIL);
    }

    #[test]
    fn test_encode_truncates_toward_zero() {
        let cmd = AimCommand::new(12.9, -12.9, 0.4, FireFlag::Idle);
        assert_eq!(cmd.x_mm, 12);
        assert_eq!(cmd.y_mm, -12);
        assert_eq!(cmd.z_mm, 0);
    }

    #[test]
    fn test_encode_saturates_out_of_range() {
        let cmd = AimCommand::new(40_000.0, -40_000.0, f64::NAN, FireFlag::Idle);
        assert_eq!(cmd.x_mm, i16::MAX);
        assert_eq!(cmd.y_mm, i16::MIN);
        assert_eq!(cmd.z_mm, 0);
    }

    #[test]
    fn test_idle_flag_byte() {
        let frame = encode(0.0, 0.0, 0.0, FireFlag::Idle);
        assert_eq!(frame[7], 0);
    }

    #[test]
    fn test_from_frame_rejects_bad_length() {
        let err = AimCommand::from_frame(&[FRAME_HEAD, FRAME_TAIL]).unwrap_err();
        assert_eq!(
            err,
            FrameError::BadLength {
                expected: TX_FRAME_LEN,
                actual: 2
            }
        );
    }

    #[test]
    fn test_from_frame_rejects_bad_crc() {
        let mut frame = encode(1.0, 2.0, 3.0, FireFlag::Idle);
        frame[8] ^= 0x01;
        assert!(matches!(
            AimCommand::from_frame(&frame),
            Err(FrameError::BadChecksum { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_aim_frame_roundtrip(x in any::<i16>(), y in any::<i16>(), z in any::<i16>(), fire in any::<bool>()) {
            let flag = if fire { FireFlag::Fire } else { FireFlag::Idle };
            let cmd = AimCommand { x_mm: x, y_mm: y, z_mm: z, flag };
            let decoded = AimCommand::from_frame(&cmd.to_frame()).unwrap();
            prop_assert_eq!(decoded, cmd);
        }
    }
}
