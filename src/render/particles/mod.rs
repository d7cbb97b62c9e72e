//! 粒子发射模块
//!
//! 与渲染目标无关的粒子发射器：粒子只负责运动学，可视句柄的创建和挂载交给
//! 宿主实现的 [`RenderFactory`]。
//!
//! ## 架构设计
//!
//! ```text
//! ┌──────────────┐  每帧回调   ┌──────────────────────────────┐
//! │    Ticker    │ ──────────► │           Emitter            │
//! │ (FrameSource)│             │  1. 更新存活粒子              │
//! └──────────────┘             │  2. 剔除越界粒子 → ObjectPool │
//!                              │  3. 节流/容量门控后发射       │
//!                              └──────────────┬───────────────┘
//!                                             │ add / remove
//!                                             ▼
//!                              ┌──────────────────────────────┐
//!                              │   RenderFactory（宿主舞台）   │
//!                              └──────────────────────────────┘
//! ```
//!
//! ## 使用示例
//!
//! ```ignore
//! let source = Rc::new(ManualFrameSource::new());
//! let ticker = Ticker::new(source.clone())?;
//! let stage = Rc::new(SceneStage::new());
//!
//! let options = EmitterOptions::new(Rect::new(0.0, 0.0, 800.0, 600.0))
//!     .with_max_count(200)
//!     .with_particle(ParticleOptions::default().with_speed(1.0, 3.0));
//! let emitter = Emitter::new(options, SceneFactory::new(stage.clone(), "circle"), &ticker)?;
//!
//! source.step_n(60)?;
//! println!("{} sprites on stage", stage.len());
//! ```

pub mod emitter;
pub mod factory;
pub mod particle;
pub mod stage;

pub use emitter::{Emitter, EmitterState, EmitterStats};
pub use factory::RenderFactory;
pub use particle::{Particle, ParticleId, ParticleTransform, ParticleVisual};
pub use stage::{SceneFactory, SceneStage, Sprite, SpriteHandle};
