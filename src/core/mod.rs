//! 核心模块
//!
//! 包含粒子引擎的基础设施：
//! - `error` - 错误类型定义
//! - `logging` - 日志初始化
//! - `frame_source` - 帧源抽象（手动步进、定时器）
//! - `ticker` - 帧驱动器，向订阅者广播每一帧

pub mod error;
pub mod frame_source;
pub mod logging;
pub mod ticker;
#[macro_use]
pub mod macros;

// 重新导出错误类型
pub use error::{EngineError, EngineResult, TickerError, TickerResult};

// 重新导出主要类型
pub use frame_source::{FrameHandle, FrameSource, ManualFrameSource, TimerFrameSource};
pub use logging::init_logging;
pub use ticker::{FrameListener, Ticker};
