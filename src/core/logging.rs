//! 日志初始化

use crate::config::{LogLevel, LoggingConfig};
use tracing_subscriber::EnvFilter;

impl LogLevel {
    /// 对应的过滤指令
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// 初始化日志系统
///
/// 配置tracing日志框架。`RUST_LOG` 环境变量优先，否则使用配置中的级别。
/// 重复初始化时静默忽略，返回 `false`。
pub fn init_logging(config: &LoggingConfig) -> bool {
    if !config.log_to_console {
        return false;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.show_targets)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(target: "config", "Logging initialized at {:?}", config.level);
    }
    installed
}
