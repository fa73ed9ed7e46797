//! 状态帧解析模块
//!
//! 下行帧：下位机 -> 视觉，11 字节定长，携带云台姿态和弹速。

use crate::{
    FRAME_HEAD, FRAME_TAIL, FrameError, RX_FRAME_LEN, StatusFlag, bytes_to_i16_le,
    bytes_to_u16_le, crc8,
};

/// 定点数缩放系数（厘度 / 厘米每秒）
const CENTI: f64 = 1e2;

/// 下位机状态
///
/// 一帧解码后的结果。`Copy` 语义，跨线程按值传递。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Status {
    /// 下位机帧序号（回绕计数）
    pub stamp: u8,
    /// 云台偏航角（度）
    pub yaw_degree: f64,
    /// 云台俯仰角（度）
    pub pitch_degree: f64,
    /// 弹速（m/s）
    pub bullet_speed: f64,
    /// 打包标志（见 [`StatusFlag`]）
    pub flag: u8,
}

impl Status {
    /// 解析打包标志
    pub fn status_flag(&self) -> StatusFlag {
        StatusFlag::new(self.flag)
    }
}

/// 解码状态帧
///
/// # 错误
/// - `FrameError::BadLength`: 长度不是 11 字节
/// - `FrameError::BadSentinel`: 帧头或帧尾不匹配
/// - `FrameError::BadChecksum`: CRC 校验失败
pub fn decode(frame: &[u8]) -> Result<Status, FrameError> {
    if frame.len() != RX_FRAME_LEN {
        return Err(FrameError::BadLength {
            expected: RX_FRAME_LEN,
            actual: frame.len(),
        });
    }
    crate::check_sentinels(frame)?;
    crate::check_crc(frame)?;

    let yaw = bytes_to_i16_le([frame[2], frame[3]]);
    let pitch = bytes_to_i16_le([frame[4], frame[5]]);
    let bullet_speed = bytes_to_u16_le([frame[6], frame[7]]);

    Ok(Status {
        stamp: frame[1],
        yaw_degree: yaw as f64 / CENTI,
        pitch_degree: pitch as f64 / CENTI,
        bullet_speed: bullet_speed as f64 / CENTI,
        flag: frame[8],
    })
}

/// 编码状态帧（下位机方向）
///
/// 用于仿真下位机和测试。角度/弹速四舍五入到厘单位，超出范围饱和。
pub fn encode_status(status: &Status) -> [u8; RX_FRAME_LEN] {
    let yaw = (status.yaw_degree * CENTI).round() as i16;
    let pitch = (status.pitch_degree * CENTI).round() as i16;
    let bullet_speed = (status.bullet_speed * CENTI).round() as u16;

    let mut frame = [0u8; RX_FRAME_LEN];
    frame[0] = FRAME_HEAD;
    frame[1] = status.stamp;
    frame[2..4].copy_from_slice(&yaw.to_le_bytes());
    frame[4..6].copy_from_slice(&pitch.to_le_bytes());
    frame[6..8].copy_from_slice(&bullet_speed.to_le_bytes());
    frame[8] = status.flag;
    frame[9] = crc8(&frame[..9]);
    frame[10] = FRAME_TAIL;
    frame
}
