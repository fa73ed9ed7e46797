//! 配置管理命令
//!
//! 瞄准配置为 TOML 文件，格式见 [`AimConfig`]。

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use turret_sdk::AimConfig;

/// 默认配置文件路径：`<config_dir>/turret/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("turret");
    path.push("config.toml");
    Ok(path)
}

/// 加载配置，文件不存在时使用默认值
pub fn load_config(path: &Path) -> Result<AimConfig> {
    if !path.exists() {
        tracing::debug!("Config file {} not found, using defaults", path.display());
        return Ok(AimConfig::default());
    }
    AimConfig::load_from_file(path)
        .with_context(|| format!("读取配置文件失败: {}", path.display()))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示当前生效的配置
    Show,

    /// 写入默认配置
    Init {
        /// 覆盖已有文件
        #[arg(short, long)]
        force: bool,
    },

    /// 打印配置文件路径
    Path,
}

impl ConfigCommand {
    pub fn execute(self, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Show => Self::show_(path),
            ConfigCommand::Init { force } => Self::init_(path, force),
            ConfigCommand::Path => {
                println!("{}", path.display());
                Ok(())
            },
        }
    }

    fn show_(path: &Path) -> Result<()> {
        let config = load_config(path)?;
        if path.exists() {
            println!("# {}", path.display());
        } else {
            println!("# {} (不存在，显示默认值)", path.display());
        }
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn init_(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
        }
        AimConfig::default()
            .save_to_file(path)
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }
}
