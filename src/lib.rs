//! # Micro Particles
//!
//! A small, render-target-agnostic particle emission engine.
//!
//! ## Features
//!
//! - **Frame Driver**: A single ticker fans each animation frame out to every subscriber
//! - **Emitter**: Spawns, advances and culls particles with throttle and capacity gates
//! - **Object Pool**: Culled particles are recycled instead of reallocated
//! - **Render Factory**: Hosts plug in their own stage (DOM, scene graph, headless)
//! - **Configuration**: TOML/JSON files with environment variable overrides
//!
//! ## Architecture Design
//!
//! Everything runs on a single thread. Frame sources queue callbacks, the
//! [`Ticker`] re-arms itself after each frame, and emitters are plain frame
//! listeners held by shared reference.
//!
//! ### Example
//!
//! ```ignore
//! use micro_particles::{Emitter, EmitterOptions, ManualFrameSource, SceneFactory, SceneStage, Ticker};
//! use std::rc::Rc;
//!
//! let source = Rc::new(ManualFrameSource::new());
//! let ticker = Ticker::new(source.clone())?;
//! let stage = Rc::new(SceneStage::new());
//! let emitter = Emitter::new(EmitterOptions::snow(), SceneFactory::new(stage, "circle"), &ticker)?;
//! source.step_n(120)?;
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Errors, logging, frame sources and the ticker
//! - [`config`]: Emitter options and file/env configuration
//! - [`performance`]: Object pooling
//! - [`render`]: Particles, the render factory contract and the emitter

/// Errors, logging, frame sources and the frame driver
pub mod core;
/// Configuration system
pub mod config;
/// Object pooling
pub mod performance;
/// Particle emission and the render factory contract
pub mod render;

pub use crate::config::{
    ConfigError, ConfigResult, EmitterOptions, EmitterOptionsPatch, Padding, ParticleConfig,
    ParticleOptions, Rect, ValueRange,
};
pub use crate::core::{
    EngineError, EngineResult, FrameListener, FrameSource, ManualFrameSource, Ticker, TickerError,
    TickerResult, TimerFrameSource,
};
pub use crate::performance::{ObjectPool, PoolItem, PoolStats};
pub use crate::render::particles::{
    Emitter, EmitterState, EmitterStats, Particle, ParticleTransform, ParticleVisual,
    RenderFactory, SceneFactory, SceneStage, Sprite, SpriteHandle,
};
