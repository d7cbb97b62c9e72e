//! 统一错误处理模块
//!
//! 粒子核心本身是尽力而为的视觉模拟，没有可恢复错误：缺失的范围退化为 `[0, 0]`，
//! 非法的生命周期切换（恢复未暂停的发射器、重复销毁）都是空操作。
//!
//! 唯一会暴露给宿主的故障来自帧源：当帧源拒绝调度下一帧时，帧驱动器在构造或
//! 每一帧回调中立即返回 [`TickerError`]，由驱动帧的宿主接收；此后驱动器停止，
//! 向它注册新的订阅（包括创建和恢复发射器）返回 [`TickerError::NotRunning`]。

use crate::config::ConfigError;
use thiserror::Error;

/// 引擎核心错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Ticker error: {0}")]
    Ticker(#[from] TickerError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// 帧驱动器错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TickerError {
    #[error("Frame source is closed and cannot schedule frame #{frame}")]
    FrameSourceClosed { frame: u64 },

    /// 向已停止的驱动器注册订阅
    #[error("Ticker is no longer running")]
    NotRunning,
}

/// 引擎结果类型别名
pub type EngineResult<T> = Result<T, EngineError>;
pub type TickerResult<T> = Result<T, TickerError>;
