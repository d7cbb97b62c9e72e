//! 粒子
//!
//! 粒子持有运动学状态和一个后端相关的可视句柄。可视句柄在构造时创建一次，之后只会
//! 被重置和更新，从舞台移除时也不会销毁，以便从对象池中复用。
//!
//! ## 坐标约定
//!
//! 屏幕坐标系，y 轴向下。角度从 +x 轴起算，速度为 `speed · (cos θ, sin θ)`，
//! 因此 θ = π/2 表示向屏幕下方运动，θ = -π/2 表示向上。

use crate::config::{ParticleOptions, Rect, ValueRange};
use crate::performance::PoolItem;
use glam::Vec2;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PARTICLE_ID: AtomicU64 = AtomicU64::new(1);

/// 粒子实例标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(u64);

impl ParticleId {
    fn next() -> Self {
        Self(NEXT_PARTICLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// 推送给可视句柄的变换
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleTransform {
    pub position: Vec2,
    pub scale: f32,
}

impl Default for ParticleTransform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

/// 可视句柄能力
///
/// 由具体渲染后端实现（DOM 节点、场景图精灵等）。
pub trait ParticleVisual {
    /// 每次重置时调用，清除之前的变换状态
    fn reset_visual(&mut self);

    /// 每次运动学更新后调用，把位置和缩放推送到可视句柄上
    fn update_visual(&mut self, transform: &ParticleTransform);
}

/// 单个粒子
///
/// 不实现 `Clone`：粒子身份由 [`ParticleId`] 决定，对象池据此去重。
#[derive(Debug)]
pub struct Particle<V> {
    id: ParticleId,
    position: Vec2,
    scale: f32,
    velocity: Vec2,
    acceleration: Vec2,
    angle: f32,
    speed_step: f32,
    scale_step: f32,
    spawn_region: Rect,
    visual: V,
}

impl<V: ParticleVisual> Particle<V> {
    /// 以已创建的可视句柄构造粒子
    ///
    /// 运动学状态在第一次 [`reset`](Self::reset) 之前没有意义。
    pub fn new(visual: V) -> Self {
        Self {
            id: ParticleId::next(),
            position: Vec2::ZERO,
            scale: 1.0,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            angle: 0.0,
            speed_step: 0.0,
            scale_step: 0.0,
            spawn_region: Rect::default(),
            visual,
        }
    }

    /// 重置粒子属性参数
    pub fn reset(&mut self, options: &ParticleOptions) {
        self.reset_with(options, &mut rand::thread_rng());
    }

    /// 使用给定随机源重置粒子属性参数
    pub fn reset_with<R: Rng>(&mut self, options: &ParticleOptions, rng: &mut R) {
        self.angle = random_in(options.angle, rng);
        self.speed_step = random_in(options.speed_step, rng);
        self.scale_step = random_in(options.scale_step, rng);
        self.acceleration = options.acceleration.unwrap_or(Vec2::ZERO);
        self.velocity = Vec2::from_angle(self.angle) * self.speed_step;
        self.scale = 1.0;
        self.spawn_region = options.spawn_region.unwrap_or_default();
        self.position = self.spawn_region.sample(rng.gen(), rng.gen());

        self.visual.reset_visual();
        self.sync_visual();
    }

    /// 半隐式欧拉积分一步，然后同步可视句柄
    ///
    /// 不做时间步长缩放，每帧固定前进一步。
    pub fn update(&mut self) {
        self.velocity += self.acceleration;
        self.position += self.velocity;
        self.scale += self.scale_step;

        self.sync_visual();
    }

    fn sync_visual(&mut self) {
        let transform = self.transform();
        self.visual.update_visual(&transform);
    }
}

impl<V> Particle<V> {
    pub fn id(&self) -> ParticleId {
        self.id
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn acceleration(&self) -> Vec2 {
        self.acceleration
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn speed_step(&self) -> f32 {
        self.speed_step
    }

    pub fn scale_step(&self) -> f32 {
        self.scale_step
    }

    pub fn spawn_region(&self) -> Rect {
        self.spawn_region
    }

    pub fn transform(&self) -> ParticleTransform {
        ParticleTransform {
            position: self.position,
            scale: self.scale,
        }
    }

    pub fn visual(&self) -> &V {
        &self.visual
    }

    pub fn visual_mut(&mut self) -> &mut V {
        &mut self.visual
    }
}

impl<V> PoolItem for Particle<V> {
    fn is_same(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// 在范围内均匀取值，缺省范围视为 `[0, 0]`
fn random_in<R: Rng>(range: Option<ValueRange>, rng: &mut R) -> f32 {
    range.unwrap_or_default().lerp(rng.gen())
}
