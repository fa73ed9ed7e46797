//! 控制层错误类型定义

use crate::config::ConfigError;
use thiserror::Error;
use turret_ballistics::BallisticError;
use turret_driver::DriverError;

/// 控制层错误类型
#[derive(Error, Debug)]
pub enum ControlError {
    /// 驱动层错误
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 弹道解算错误
    #[error("Ballistic error: {0}")]
    Ballistic(#[from] BallisticError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ControlError {
    /// 是否需要结束控制循环
    pub fn is_fatal(&self) -> bool {
        match self {
            ControlError::Driver(e) => e.is_fatal(),
            ControlError::Ballistic(_) => false,
            ControlError::Config(_) => true,
        }
    }

    /// 是否为等待超时（下一次循环重试）
    pub fn is_timeout(&self) -> bool {
        matches!(self, ControlError::Driver(DriverError::Timeout))
    }
}
