//! 终端设置
//!
//! 设置保存在 `<配置目录>/terminal-chess/settings.json`，命令行参数优先于文件。

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chess_ai::{AiConfig, Difficulty};
use chess_core::Color;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// `EnvFilter` 指令中使用的名称
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// 终端设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 默认 AI 难度
    pub difficulty: Difficulty,
    /// AI 思考时间（毫秒），None 表示使用难度默认值
    pub time_budget_ms: Option<u64>,
    /// 搜索深度上限
    pub max_depth: Option<u8>,
    /// 玩家执子
    pub human_side: Color,
    /// 双人对局（不启用 AI）
    pub pvp: bool,
    /// 日志级别
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            time_budget_ms: None,
            max_depth: None,
            human_side: Color::White,
            pvp: false,
            log_level: LogLevel::default(),
        }
    }
}

impl Settings {
    /// 获取默认设置文件路径
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("terminal-chess");
            path.push("settings.json");
            path
        })
    }

    /// 读取设置文件；文件不存在时返回 `Ok(None)`
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取设置文件: {:?}", path))?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("设置文件格式无效: {:?}", path))?;
        Ok(Some(settings))
    }

    /// 根据读取结果确定设置，失败时回退到默认值
    pub fn resolve(path: &Path, loaded: Result<Option<Self>>) -> Self {
        match loaded {
            Ok(Some(settings)) => {
                info!("已加载设置: {:?}", path);
                settings
            }
            Ok(None) => {
                info!("设置文件不存在，使用默认设置");
                Self::default()
            }
            Err(e) => {
                warn!("{:#}，使用默认设置", e);
                Self::default()
            }
        }
    }

    /// 从文件加载设置，缺失或无效时使用默认设置
    pub fn load_from(path: &Path) -> Self {
        Self::resolve(path, Self::read(path))
    }

    /// 保存设置到文件（自动创建目录）
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("无法创建配置目录: {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self).context("序列化设置失败")?;
        std::fs::write(path, content).with_context(|| format!("写入设置文件失败: {:?}", path))?;

        info!("设置已保存: {:?}", path);
        Ok(())
    }

    /// 生成 AI 配置
    pub fn ai_config(&self) -> AiConfig {
        let mut config = AiConfig::from_difficulty(self.difficulty);
        if let Some(ms) = self.time_budget_ms {
            config = config.with_time_budget(Duration::from_millis(ms));
        }
        if let Some(depth) = self.max_depth {
            config = config.with_max_depth(depth);
        }
        config
    }
}
