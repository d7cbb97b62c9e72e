/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量覆盖和配置验证
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub mod emitter;

pub use emitter::{
    EmitterOptions, EmitterOptionsPatch, Padding, ParticleOptions, Rect, ValueRange,
    DEFAULT_POOL_SIZE,
};

use crate::core::frame_source::ONE_FRAME_TIME_MS;
use crate::impl_default;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 粒子系统主配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticleConfig {
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 帧源配置
    #[serde(default)]
    pub frame: FrameConfig,

    /// 发射器配置，缺省时使用雪花预设
    #[serde(default = "EmitterOptions::snow")]
    pub emitter: EmitterOptions,
}

impl_default!(ParticleConfig {
    logging: LoggingConfig::default(),
    frame: FrameConfig::default(),
    emitter: EmitterOptions::snow(),
});

impl ParticleConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 按扩展名加载配置文件（`.json` 走JSON，其余按TOML解析）
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("PARTICLES_POOL_SIZE") {
            if let Ok(size) = val.parse() {
                self.emitter.pool_size = size;
            }
        }
        if let Ok(val) = env::var("PARTICLES_MAX_COUNT") {
            if let Ok(count) = val.parse() {
                self.emitter.max_count = Some(count);
            }
        }
        if let Ok(val) = env::var("PARTICLES_THROTTLE") {
            if let Ok(throttle) = val.parse() {
                self.emitter.throttle = throttle;
            }
        }
        if let Ok(val) = env::var("PARTICLES_FRAME_INTERVAL_MS") {
            if let Ok(interval) = val.parse() {
                self.frame.interval_ms = interval;
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.frame.validate()?;
        self.emitter.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./particles.toml
    /// 2. ./particles.json
    /// 3. ~/.config/micro_particles/particles.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("particles.toml") {
            tracing::info!(target: "config", "Loaded config from particles.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("particles.json") {
            tracing::info!(target: "config", "Loaded config from particles.json");
            return config;
        }

        if let Some(home) = env::var_os("HOME") {
            let config_path = PathBuf::from(home)
                .join(".config")
                .join("micro_particles")
                .join("particles.toml");

            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "config", "Loaded config from {:?}", config_path);
                return config;
            }
        }

        tracing::info!(target: "config", "Using default configuration");
        Self::default()
    }
}

/// 帧源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// 定时器帧间隔（毫秒）
    pub interval_ms: u64,

    /// 演示程序运行的帧数
    pub frames: usize,
}

impl_default!(FrameConfig {
    interval_ms: ONE_FRAME_TIME_MS,
    frames: 600,
});

impl FrameConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Frame interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,

    /// 是否输出到控制台
    pub log_to_console: bool,

    /// 是否显示日志目标
    pub show_targets: bool,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
    log_to_console: true,
    show_targets: true,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}
