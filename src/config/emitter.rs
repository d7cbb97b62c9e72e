use super::{ConfigError, ConfigResult};
use crate::impl_default;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// 默认对象池大小
pub const DEFAULT_POOL_SIZE: usize = 30;

/// 数值范围 `[min, max]`，在其中均匀取值
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// 退化范围，取值恒为 `value`
    pub fn fixed(value: f32) -> Self {
        Self { min: value, max: value }
    }

    /// 以 `t ∈ [0, 1)` 插值
    ///
    /// `min == max` 时结果恰好为 `min`。
    pub fn lerp(&self, t: f32) -> f32 {
        self.min + (self.max - self.min) * t
    }
}

/// 矩形区域
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// 宽高为零的点区域
    pub fn point(x: f32, y: f32) -> Self {
        Self::new(x, y, 0.0, 0.0)
    }

    /// 开区间包含测试：落在边上的点不算在内
    pub fn contains_open(&self, p: Vec2) -> bool {
        p.x > self.x && p.x < self.x + self.width && p.y > self.y && p.y < self.y + self.height
    }

    /// 以 `(u, v) ∈ [0, 1)²` 在区域内取点
    pub fn sample(&self, u: f32, v: f32) -> Vec2 {
        Vec2::new(self.x + u * self.width, self.y + v * self.height)
    }
}

/// 边界内边距，顺序为 `[top, right, bottom, left]`
///
/// 内边距扩大剔除区域，避免粒子中心刚越过边界、图像仍可见时就被回收。
/// 扩大方式为 `{x - left, y - top, width + 2·right, height + 2·bottom}`：
/// 左、上只移动原点，右、下按两倍计入尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Padding(pub [f32; 4]);

impl Padding {
    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self([top, right, bottom, left])
    }

    pub fn uniform(value: f32) -> Self {
        Self([value; 4])
    }

    pub fn top(&self) -> f32 {
        self.0[0]
    }

    pub fn right(&self) -> f32 {
        self.0[1]
    }

    pub fn bottom(&self) -> f32 {
        self.0[2]
    }

    pub fn left(&self) -> f32 {
        self.0[3]
    }

    /// 计算剔除用的扩展边界
    pub fn inflate(&self, bounds: &Rect) -> Rect {
        Rect {
            x: bounds.x - self.left(),
            y: bounds.y - self.top(),
            width: bounds.width + self.right() * 2.0,
            height: bounds.height + self.bottom() * 2.0,
        }
    }
}

/// 单个粒子的生成参数
///
/// 所有字段可缺省：缺省范围按 `[0, 0]` 处理，缺省加速度为零，缺省生成区域为原点。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleOptions {
    /// 加速度
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<Vec2>,
    /// 运动角度范围（弧度）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<ValueRange>,
    /// 初始速度范围
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_step: Option<ValueRange>,
    /// 缩放增量范围
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_step: Option<ValueRange>,
    /// 粒子产生的区域
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_region: Option<Rect>,
}

impl ParticleOptions {
    /// 逐字段浅合并，`patch` 中未设置的字段保留原值
    pub fn merge(&mut self, patch: ParticleOptions) {
        if patch.angle.is_some() {
            self.angle = patch.angle;
        }
        if patch.speed_step.is_some() {
            self.speed_step = patch.speed_step;
        }
        if patch.scale_step.is_some() {
            self.scale_step = patch.scale_step;
        }
        if patch.acceleration.is_some() {
            self.acceleration = patch.acceleration;
        }
        if patch.spawn_region.is_some() {
            self.spawn_region = patch.spawn_region;
        }
    }

    pub fn with_angle(mut self, min: f32, max: f32) -> Self {
        self.angle = Some(ValueRange::new(min, max));
        self
    }

    pub fn with_speed(mut self, min: f32, max: f32) -> Self {
        self.speed_step = Some(ValueRange::new(min, max));
        self
    }

    pub fn with_scale_step(mut self, min: f32, max: f32) -> Self {
        self.scale_step = Some(ValueRange::new(min, max));
        self
    }

    pub fn with_acceleration(mut self, acceleration: Vec2) -> Self {
        self.acceleration = Some(acceleration);
        self
    }

    pub fn with_spawn_region(mut self, region: Rect) -> Self {
        self.spawn_region = Some(region);
        self
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        let ranges = [
            ("angle", self.angle),
            ("speed_step", self.speed_step),
            ("scale_step", self.scale_step),
        ];
        for (name, range) in ranges {
            if let Some(r) = range {
                if !(r.min.is_finite() && r.max.is_finite()) || r.min > r.max {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid {} range: [{}, {}]",
                        name, r.min, r.max
                    )));
                }
            }
        }
        if let Some(region) = self.spawn_region {
            if region.width < 0.0 || region.height < 0.0 {
                return Err(ConfigError::ValidationError(
                    "Spawn region size must be non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// 粒子发射器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterOptions {
    /// 粒子对象池大小
    pub pool_size: usize,

    /// 舞台中最大粒子数量（None = 不限）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_count: Option<usize>,

    /// 节流参数，每隔多少帧尝试发射一次
    pub throttle: u32,

    /// 是否手动发射粒子
    pub manual: bool,

    /// 边界内边距
    pub padding: Padding,

    /// 粒子舞台边界
    pub bounds: Rect,

    /// 粒子生成参数
    pub particle: ParticleOptions,
}

impl_default!(EmitterOptions {
    pool_size: DEFAULT_POOL_SIZE,
    max_count: None,
    throttle: 1,
    manual: false,
    padding: Padding::default(),
    bounds: Rect::default(),
    particle: ParticleOptions::default(),
});

impl EmitterOptions {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            ..Default::default()
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = Some(max_count);
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_particle(mut self, particle: ParticleOptions) -> Self {
        self.particle = particle;
        self
    }

    pub fn with_throttle(mut self, throttle: u32) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn manual(mut self) -> Self {
        self.manual = true;
        self
    }

    /// 剔除用的扩展边界
    pub fn cull_bounds(&self) -> Rect {
        self.padding.inflate(&self.bounds)
    }

    /// 应用部分配置
    ///
    /// 节流与边界整体替换；粒子参数逐字段浅合并。
    pub fn apply_patch(&mut self, patch: EmitterOptionsPatch) {
        match patch.throttle {
            Some(0) => {
                tracing::warn!(target: "config", "Ignoring throttle 0 in options patch");
            }
            Some(throttle) => self.throttle = throttle,
            None => {}
        }
        if let Some(bounds) = patch.bounds {
            self.bounds = bounds;
        }
        if let Some(particle) = patch.particle {
            self.particle.merge(particle);
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.throttle == 0 {
            return Err(ConfigError::ValidationError(
                "Throttle must be at least 1".to_string(),
            ));
        }
        if self.bounds.width < 0.0 || self.bounds.height < 0.0 {
            return Err(ConfigError::ValidationError(
                "Bounds size must be non-negative".to_string(),
            ));
        }
        if self.padding.0.iter().any(|p| *p < 0.0 || !p.is_finite()) {
            return Err(ConfigError::ValidationError(
                "Padding values must be non-negative".to_string(),
            ));
        }
        self.particle.validate()
    }

    /// 雪花：自顶部横向铺开、缓慢下落
    pub fn snow() -> Self {
        Self::new(Rect::new(0.0, 0.0, 800.0, 600.0))
            .with_pool_size(200)
            .with_max_count(200)
            .with_padding(Padding::uniform(100.0))
            .with_throttle(2)
            .with_particle(
                ParticleOptions::default()
                    .with_angle(PI / 2.0, PI / 2.0)
                    .with_speed(1.0, 2.0)
                    .with_scale_step(0.0, 0.01)
                    .with_acceleration(Vec2::new(0.0, 0.02))
                    .with_spawn_region(Rect::new(0.0, -50.0, 800.0, 0.0)),
            )
    }

    /// 爆炸：从中心向所有方向扩散
    pub fn burst() -> Self {
        Self::new(Rect::new(0.0, 0.0, 800.0, 600.0))
            .with_pool_size(200)
            .with_max_count(200)
            .with_padding(Padding::uniform(50.0))
            .with_particle(
                ParticleOptions::default()
                    .with_angle(0.0, PI * 2.0)
                    .with_speed(1.0, 2.0)
                    .with_scale_step(0.0, 0.01)
                    .with_spawn_region(Rect::point(400.0, 300.0)),
            )
    }

    /// 烟花：从底部中央向上喷射，受重力回落
    pub fn fireworks() -> Self {
        Self::new(Rect::new(0.0, 0.0, 800.0, 600.0))
            .with_pool_size(100)
            .with_max_count(100)
            .with_padding(Padding::uniform(50.0))
            .with_throttle(2)
            .with_particle(
                ParticleOptions::default()
                    .with_angle(-PI * 0.65, -PI * 0.35)
                    .with_speed(6.0, 8.0)
                    .with_acceleration(Vec2::new(0.0, 0.06))
                    .with_spawn_region(Rect::point(400.0, 620.0)),
            )
    }
}

/// 发射器部分配置，用于运行时更新
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterOptionsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throttle: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particle: Option<ParticleOptions>,
}

impl EmitterOptionsPatch {
    pub fn throttle(throttle: u32) -> Self {
        Self {
            throttle: Some(throttle),
            ..Default::default()
        }
    }

    pub fn bounds(bounds: Rect) -> Self {
        Self {
            bounds: Some(bounds),
            ..Default::default()
        }
    }

    pub fn particle(particle: ParticleOptions) -> Self {
        Self {
            particle: Some(particle),
            ..Default::default()
        }
    }
}
