//! 时间对齐
//!
//! 求相机曝光时刻的云台姿态：在状态历史中找到该时刻两侧的样本，
//! 按时间比例对 yaw / pitch 做最短弧插值。

use crate::error::DriverError;
use crate::geometry::interpolate_degree;
use crate::history::{Bracket, StatusHistory, StatusSample};
use std::time::Duration;

/// 云台姿态（度）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub yaw_degree: f64,
    pub pitch_degree: f64,
}

impl From<&StatusSample> for Orientation {
    fn from(sample: &StatusSample) -> Self {
        Self {
            yaw_degree: sample.status.yaw_degree,
            pitch_degree: sample.status.pitch_degree,
        }
    }
}

/// 在两侧样本间插值
///
/// 没有 `before` 时直接返回 `after` 的姿态。
pub fn interpolate(bracket: &Bracket, t_us: u64) -> Orientation {
    let after = Orientation::from(&bracket.after);
    let Some(before) = bracket.before.as_ref() else {
        return after;
    };

    let span = (bracket.after.read_time_us - before.read_time_us) as f64;
    let k = (t_us - before.read_time_us) as f64 / span;
    let before = Orientation::from(before);

    Orientation {
        yaw_degree: interpolate_degree(before.yaw_degree, after.yaw_degree, k),
        pitch_degree: interpolate_degree(before.pitch_degree, after.pitch_degree, k),
    }
}

/// 查询时刻 `t_us` 的云台姿态
///
/// 历史中还没有晚于 `t_us` 的样本时最多等待 `timeout`。
/// 早于保留窗口的查询返回最早保留样本的姿态，不报错。
///
/// # 错误
/// - `DriverError::Timeout`: 等待超时
pub fn orientation_at(
    history: &StatusHistory,
    t_us: u64,
    timeout: Duration,
) -> Result<Orientation, DriverError> {
    if history.wait_until(t_us, timeout).is_none() {
        return Err(DriverError::Timeout);
    }
    // wait_until 成功后最新样本不早于 t_us，bracket 必有结果；
    // 查询时刻早于保留窗口时得到最早保留的样本
    let bracket = history.bracket(t_us).ok_or(DriverError::Timeout)?;
    Ok(interpolate(&bracket, t_us))
}
