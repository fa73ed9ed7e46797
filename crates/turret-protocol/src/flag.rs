//! 状态帧标志位
//!
//! 标志字节按十进制打包：个位为机器人 ID，十位为工作模式，
//! 数值小于 100 表示红方。

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 工作模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum WorkMode {
    /// 自瞄（装甲板）
    #[default]
    AutoAim = 1,
    /// 小能量机关
    SmallEnergy = 2,
    /// 大能量机关
    BigEnergy = 3,
}

impl WorkMode {
    /// 是否为能量机关模式
    pub fn is_energy(&self) -> bool {
        matches!(self, WorkMode::SmallEnergy | WorkMode::BigEnergy)
    }
}

/// 队伍颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Team {
    Red,
    Blue,
}

/// 打包标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusFlag(pub u8);

impl StatusFlag {
    pub fn new(raw: u8) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u8 {
        self.0
    }

    /// 机器人 ID（个位）
    pub fn robot_id(&self) -> u8 {
        self.0 % 10
    }

    /// 工作模式（十位，整数除法）
    ///
    /// 2 = 小能量机关，3 = 大能量机关，其余一律视为自瞄。
    pub fn work_mode(&self) -> WorkMode {
        match (self.0 / 10) % 10 {
            2 => WorkMode::SmallEnergy,
            3 => WorkMode::BigEnergy,
            _ => WorkMode::AutoAim,
        }
    }

    pub fn team(&self) -> Team {
        if self.0 < 100 { Team::Red } else { Team::Blue }
    }
}

impl From<u8> for StatusFlag {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}
