//! 渲染模块
//!
//! 引擎本身不绘制任何东西，只通过 [`particles::RenderFactory`] 驱动宿主提供的舞台。

pub mod particles;

pub use particles::{
    Emitter, EmitterState, EmitterStats, Particle, ParticleTransform, ParticleVisual,
    RenderFactory, SceneFactory, SceneStage, Sprite, SpriteHandle,
};
