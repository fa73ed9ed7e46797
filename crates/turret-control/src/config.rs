//! # 瞄准配置
//!
//! 串口、枪管安装补偿、弹道参数、能量机关距离窗口和目标白名单。
//! `[profiles.<robot_id>]` 按机器人编号（状态帧标志个位）覆盖
//! 枪管补偿和白名单，未覆盖的字段沿用顶层设置。
//!
//! ```toml
//! whitelist = ["base", "outpost"]
//!
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//!
//! [gun]
//! up_degree = 0.5
//! right_degree = -0.2
//!
//! [ballistics]
//! projectile = "small17mm"
//! air_resistance = false
//! tolerance_mm = 1.0
//! max_iterations = 20
//!
//! [energy]
//! min_distance_mm = 5000.0
//! max_distance_mm = 8500.0
//!
//! # 英雄
//! [profiles.1]
//! up_degree = 4.5
//! right_degree = 0.1
//! whitelist = []
//!
//! [profiles.7]
//! up_degree = 1.0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use turret_ballistics::{AdjustOptions, ProjectileKind, SolverOptions};

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 瞄准配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AimConfig {
    pub serial: SerialSettings,
    pub gun: GunOffsets,
    pub ballistics: BallisticsSettings,
    pub energy: EnergySettings,
    /// 忽略的目标名称
    pub whitelist: Vec<String>,
    /// 按机器人编号覆盖的设置，键为 0-9
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, RobotProfile>,
}

/// 单台机器人的覆盖项，缺省字段沿用顶层设置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up_degree: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_degree: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<String>>,
}

/// 某台机器人实际生效的枪管补偿和白名单
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedProfile {
    pub robot_id: u8,
    pub gun: GunOffsets,
    pub whitelist: Vec<String>,
}

impl ResolvedProfile {
    /// 目标是否在白名单中（白名单内的目标不打）
    pub fn is_whitelisted(&self, name: &str) -> bool {
        self.whitelist.iter().any(|w| w == name)
    }
}

/// 串口设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
        }
    }
}

/// 枪管相对 IMU 的安装补偿
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GunOffsets {
    /// 上抬（度）
    pub up_degree: f64,
    /// 右偏（度）
    pub right_degree: f64,
}

/// 弹道参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallisticsSettings {
    pub projectile: ProjectileKind,
    /// 是否启用空气阻力修正
    pub air_resistance: bool,
    /// 高度容差（毫米）
    pub tolerance_mm: f64,
    pub max_iterations: u32,
}

impl Default for BallisticsSettings {
    fn default() -> Self {
        let solver = SolverOptions::default();
        Self {
            projectile: ProjectileKind::Small17mm,
            air_resistance: false,
            tolerance_mm: solver.tolerance_mm,
            max_iterations: solver.max_iterations,
        }
    }
}

impl BallisticsSettings {
    /// 转换为弹道补偿选项
    pub fn adjust_options(&self) -> AdjustOptions {
        AdjustOptions {
            air_resistance: self.air_resistance.then(|| self.projectile.drag_model()),
            solver: SolverOptions {
                tolerance_mm: self.tolerance_mm,
                max_iterations: self.max_iterations,
                ..SolverOptions::default()
            },
        }
    }
}

/// 能量机关距离窗口（毫米）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergySettings {
    pub min_distance_mm: f64,
    pub max_distance_mm: f64,
}

impl Default for EnergySettings {
    fn default() -> Self {
        Self {
            min_distance_mm: 5000.0,
            max_distance_mm: 8500.0,
        }
    }
}

impl EnergySettings {
    pub fn contains(&self, distance_mm: f64) -> bool {
        (self.min_distance_mm..=self.max_distance_mm).contains(&distance_mm)
    }
}

impl AimConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为 TOML 字符串
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 保存配置到文件（自动创建父目录）
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(path, self.to_toml_string()?).map_err(io_error)
    }

    /// 校验数值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.port.is_empty() {
            return Err(ConfigError::Invalid("serial.port is empty".to_string()));
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid("serial.baud_rate must be positive".to_string()));
        }
        if !self.gun.up_degree.is_finite() || !self.gun.right_degree.is_finite() {
            return Err(ConfigError::Invalid("gun offsets must be finite".to_string()));
        }
        let tolerance = self.ballistics.tolerance_mm;
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "ballistics.tolerance_mm must be positive, got {}",
                tolerance
            )));
        }
        let EnergySettings {
            min_distance_mm,
            max_distance_mm,
        } = self.energy;
        if min_distance_mm.is_nan() || max_distance_mm.is_nan() || min_distance_mm > max_distance_mm
        {
            return Err(ConfigError::Invalid(format!(
                "energy distance window is empty: {} > {}",
                min_distance_mm, max_distance_mm
            )));
        }
        for (key, profile) in &self.profiles {
            if !key.parse::<u8>().is_ok_and(|id| id <= 9) {
                return Err(ConfigError::Invalid(format!(
                    "profiles.{}: robot id must be a single digit",
                    key
                )));
            }
            let offsets = [profile.up_degree, profile.right_degree];
            if offsets.iter().flatten().any(|v| !v.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "profiles.{}: gun offsets must be finite",
                    key
                )));
            }
        }
        Ok(())
    }

    /// 机器人 `robot_id` 生效的设置
    ///
    /// 没有对应 `[profiles.<robot_id>]` 时使用顶层 `[gun]` 和 `whitelist`。
    pub fn profile_for(&self, robot_id: u8) -> ResolvedProfile {
        let profile = self.profiles.get(&robot_id.to_string());
        ResolvedProfile {
            robot_id,
            gun: GunOffsets {
                up_degree: profile
                    .and_then(|p| p.up_degree)
                    .unwrap_or(self.gun.up_degree),
                right_degree: profile
                    .and_then(|p| p.right_degree)
                    .unwrap_or(self.gun.right_degree),
            },
            whitelist: profile
                .and_then(|p| p.whitelist.clone())
                .unwrap_or_else(|| self.whitelist.clone()),
        }
    }
}
