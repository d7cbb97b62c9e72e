//! 粒子发射器
//!
//! 发射器持有对象池和存活粒子列表，订阅帧驱动器，每帧依次：
//! 1. 更新所有存活粒子的运动学状态
//! 2. 逆序遍历，剔除越出扩展边界的粒子（回收到池中并从舞台卸载）
//! 3. 非手动模式下尝试发射一个粒子，并递增帧计数器
//!
//! ## 生命周期
//!
//! ```text
//!   new ──► Active ──pause──► Paused
//!             ▲                  │
//!             └──────resume──────┘
//!   any ──destroy──► Destroyed（终态）
//! ```

use super::factory::RenderFactory;
use super::particle::{Particle, ParticleTransform};
use crate::config::{EmitterOptions, EmitterOptionsPatch};
use crate::core::error::TickerResult;
use crate::core::ticker::{FrameListener, Ticker};
use crate::performance::{ObjectPool, PoolStats};
use std::cell::RefCell;
use std::rc::Rc;

/// 发射器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    /// 已订阅帧驱动器
    Active,
    /// 已退订，保留存活粒子
    Paused,
    /// 已销毁，不可恢复
    Destroyed,
}

/// 发射器统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterStats {
    /// 当前存活粒子数
    pub live: usize,
    /// 总发射数
    pub spawned: u64,
    /// 总剔除数
    pub culled: u64,
    /// 已处理的帧数
    pub ticks: u64,
    /// 对象池统计
    pub pool: PoolStats,
}

struct EmitterCore<F: RenderFactory> {
    pool: ObjectPool<Particle<F::Visual>>,
    particles: Vec<Particle<F::Visual>>,
    factory: F,
    options: EmitterOptions,
    update_counter: u64,
    spawned: u64,
    culled: u64,
    ticks: u64,
}

impl<F: RenderFactory> EmitterCore<F> {
    fn render(&mut self) {
        self.ticks += 1;

        for particle in self.particles.iter_mut() {
            particle.update();
        }

        // 逆序遍历，移除不会跳过元素
        let bounds = self.options.cull_bounds();
        for index in (0..self.particles.len()).rev() {
            if !bounds.contains_open(self.particles[index].position()) {
                self.remove_particle(index);
            }
        }

        if !self.options.manual {
            self.create_particle();
            self.update_counter += 1;
        }

        tracing::trace!(
            target: "emitter",
            "Tick {}: {} live, {} pooled",
            self.ticks,
            self.particles.len(),
            self.pool.len()
        );
    }

    fn create_particle(&mut self) -> bool {
        if self.update_counter % u64::from(self.options.throttle) != 0 {
            return false;
        }
        if let Some(max_count) = self.options.max_count {
            if self.particles.len() >= max_count {
                return false;
            }
        }

        let factory = &self.factory;
        let mut particle = self.pool.create(|| factory.new_particle());
        particle.reset(&self.options.particle);
        self.factory.add_to_stage(particle.visual());
        self.particles.push(particle);
        self.spawned += 1;
        true
    }

    fn remove_particle(&mut self, index: usize) {
        let particle = self.particles.remove(index);
        self.factory.remove_from_stage(particle.visual());
        self.pool.recycle(particle);
        self.culled += 1;
    }

    fn clear(&mut self) {
        self.factory.remove_all();
        self.update_counter = 0;
        self.particles.clear();
        self.pool.clear();
    }

    fn stats(&self) -> EmitterStats {
        EmitterStats {
            live: self.particles.len(),
            spawned: self.spawned,
            culled: self.culled,
            ticks: self.ticks,
            pool: self.pool.stats(),
        }
    }
}

impl<F: RenderFactory> FrameListener for EmitterCore<F> {
    fn on_frame(&mut self) {
        self.render();
    }
}

/// 粒子发射器
///
/// # 示例
///
/// ```ignore
/// let source = Rc::new(ManualFrameSource::new());
/// let ticker = Ticker::new(source.clone())?;
/// let stage = Rc::new(SceneStage::new());
/// let factory = SceneFactory::new(stage.clone(), "circle");
///
/// let mut emitter = Emitter::new(EmitterOptions::snow(), factory, &ticker)?;
/// source.step_n(60)?;
/// emitter.destroy();
/// ```
pub struct Emitter<F: RenderFactory + 'static> {
    core: Rc<RefCell<EmitterCore<F>>>,
    ticker: Ticker,
    state: EmitterState,
}

impl<F: RenderFactory + 'static> Emitter<F> {
    /// 创建发射器并立即订阅帧驱动器
    ///
    /// 节流参数为 0 时按 1 处理。驱动器已停止时返回
    /// [`TickerError::NotRunning`](crate::core::error::TickerError::NotRunning)。
    pub fn new(mut options: EmitterOptions, factory: F, ticker: &Ticker) -> TickerResult<Self> {
        if options.throttle == 0 {
            tracing::warn!(target: "emitter", "Throttle 0 is invalid, using 1");
            options.throttle = 1;
        }

        let core = Rc::new(RefCell::new(EmitterCore {
            pool: ObjectPool::new(options.pool_size),
            particles: Vec::new(),
            factory,
            options,
            update_counter: 0,
            spawned: 0,
            culled: 0,
            ticks: 0,
        }));

        ticker.add(core.clone())?;
        tracing::debug!(target: "emitter", "Emitter created and subscribed");

        Ok(Self {
            core,
            ticker: ticker.clone(),
            state: EmitterState::Active,
        })
    }

    /// 尝试发射一个粒子
    ///
    /// 同时受节流和容量限制：帧计数器必须是节流参数的整数倍，且存活粒子数小于上限。
    /// 手动模式下帧计数器不会自动递增。销毁后为空操作。返回是否发射成功。
    pub fn create_particle(&self) -> bool {
        if self.state == EmitterState::Destroyed {
            return false;
        }
        self.core.borrow_mut().create_particle()
    }

    /// 更新发射器参数，下一次发射时生效
    pub fn update_emitter_options(&self, patch: EmitterOptionsPatch) {
        self.core.borrow_mut().options.apply_patch(patch);
        tracing::debug!(target: "emitter", "Emitter options updated");
    }

    /// 暂停粒子系统
    pub fn pause(&mut self) {
        if self.state != EmitterState::Active {
            return;
        }
        self.ticker.remove(&self.core);
        self.state = EmitterState::Paused;
        tracing::debug!(target: "emitter", "Emitter paused");
    }

    /// 恢复粒子系统，仅在暂停状态下生效
    ///
    /// 驱动器已停止时保持暂停并返回错误。
    pub fn resume(&mut self) -> TickerResult<()> {
        if self.state != EmitterState::Paused {
            return Ok(());
        }
        self.ticker.add(self.core.clone())?;
        self.state = EmitterState::Active;
        tracing::debug!(target: "emitter", "Emitter resumed");
        Ok(())
    }

    /// 销毁粒子发射器
    ///
    /// 退订帧驱动器，清空舞台、存活粒子和对象池。
    pub fn destroy(&mut self) {
        if self.state == EmitterState::Destroyed {
            return;
        }
        self.pause();
        self.core.borrow_mut().clear();
        self.state = EmitterState::Destroyed;
        tracing::debug!(target: "emitter", "Emitter destroyed");
    }

    pub fn state(&self) -> EmitterState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == EmitterState::Paused
    }

    /// 当前存活粒子数
    pub fn live_count(&self) -> usize {
        self.core.borrow().particles.len()
    }

    /// 池中空闲粒子数
    pub fn pooled_count(&self) -> usize {
        self.core.borrow().pool.len()
    }

    /// 当前配置的拷贝
    pub fn options(&self) -> EmitterOptions {
        self.core.borrow().options.clone()
    }

    /// 按发射顺序导出存活粒子的变换
    pub fn particles(&self) -> Vec<ParticleTransform> {
        self.core
            .borrow()
            .particles
            .iter()
            .map(Particle::transform)
            .collect()
    }

    /// 遍历存活粒子
    pub fn for_each_particle(&self, mut f: impl FnMut(&Particle<F::Visual>)) {
        for particle in self.core.borrow().particles.iter() {
            f(particle);
        }
    }

    pub fn stats(&self) -> EmitterStats {
        self.core.borrow().stats()
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }
}

impl<F: RenderFactory + 'static> Drop for Emitter<F> {
    /// 释放时只退订，不清空舞台（舞台可能与其他发射器共享）
    fn drop(&mut self) {
        if self.state == EmitterState::Active {
            self.ticker.remove(&self.core);
        }
    }
}

impl<F: RenderFactory + 'static> std::fmt::Debug for Emitter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("state", &self.state)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Padding, ParticleOptions, Rect};
    use crate::core::error::TickerError;
    use crate::core::frame_source::ManualFrameSource;
    use crate::render::particles::stage::{SceneFactory, SceneStage};
    use glam::Vec2;
    use proptest::prelude::*;

    struct Harness {
        source: Rc<ManualFrameSource>,
        ticker: Ticker,
        stage: Rc<SceneStage>,
    }

    impl Harness {
        fn new() -> Self {
            let source = Rc::new(ManualFrameSource::new());
            let ticker = Ticker::new(source.clone()).unwrap();
            Self {
                source,
                ticker,
                stage: Rc::new(SceneStage::new()),
            }
        }

        fn emitter(&self, options: EmitterOptions) -> Emitter<SceneFactory> {
            let factory = SceneFactory::new(self.stage.clone(), "circle");
            Emitter::new(options, factory, &self.ticker).unwrap()
        }

        fn step(&self, frames: usize) {
            self.source.step_n(frames).unwrap();
        }
    }

    /// 静止粒子，生成在 `(x, y)`，边界 100×100
    fn still_at(x: f32, y: f32) -> EmitterOptions {
        EmitterOptions::new(Rect::new(0.0, 0.0, 100.0, 100.0))
            .with_particle(ParticleOptions::default().with_spawn_region(Rect::point(x, y)))
    }

    #[test]
    fn test_spawns_one_particle_per_tick() {
        let h = Harness::new();
        let emitter = h.emitter(still_at(50.0, 50.0));
        assert_eq!(emitter.state(), EmitterState::Active);
        assert_eq!(h.ticker.listener_count(), 1);

        h.step(4);
        assert_eq!(emitter.live_count(), 4);
        assert_eq!(h.stage.len(), 4);
        assert_eq!(emitter.stats().spawned, 4);
    }

    #[test]
    fn test_capacity_gate() {
        let h = Harness::new();
        let emitter = h.emitter(still_at(50.0, 50.0).with_max_count(2));

        h.step(10);
        assert_eq!(emitter.live_count(), 2);
        assert!(!emitter.create_particle());
    }

    #[test]
    fn test_throttle_gate() {
        let h = Harness::new();
        let emitter = h.emitter(still_at(50.0, 50.0).with_throttle(3));

        h.step(1);
        assert_eq!(emitter.live_count(), 1);
        h.step(2);
        assert_eq!(emitter.live_count(), 1);
        h.step(1);
        assert_eq!(emitter.live_count(), 2);
    }

    #[test]
    fn test_zero_throttle_is_normalised() {
        let h = Harness::new();
        let emitter = h.emitter(still_at(50.0, 50.0).with_throttle(0));
        assert_eq!(emitter.options().throttle, 1);
        h.step(2);
        assert_eq!(emitter.live_count(), 2);
    }

    #[test]
    fn test_particle_on_edge_is_culled() {
        let h = Harness::new();
        let emitter = h.emitter(still_at(0.0, 50.0).manual());

        assert!(emitter.create_particle());
        assert_eq!(emitter.live_count(), 1);

        h.step(1);
        assert_eq!(emitter.live_count(), 0);
        assert_eq!(emitter.pooled_count(), 1);
        assert!(h.stage.is_empty());
    }

    #[test]
    fn test_particle_just_inside_is_retained() {
        let h = Harness::new();
        let emitter = h.emitter(still_at(99.5, 0.5).manual());

        emitter.create_particle();
        h.step(3);
        assert_eq!(emitter.live_count(), 1);
    }

    #[test]
    fn test_particle_leaving_is_culled_next_tick() {
        let h = Harness::new();
        let options = EmitterOptions::new(Rect::new(0.0, 0.0, 100.0, 100.0))
            .manual()
            .with_particle(
                ParticleOptions::default()
                    .with_speed(1.0, 1.0)
                    .with_spawn_region(Rect::point(98.0, 50.0)),
            );
        let emitter = h.emitter(options);
        emitter.create_particle();

        // 98 -> 99，仍在内部
        h.step(1);
        assert_eq!(emitter.live_count(), 1);
        // 99 -> 100，落在边上被剔除
        h.step(1);
        assert_eq!(emitter.live_count(), 0);
        assert_eq!(emitter.stats().culled, 1);
    }

    #[test]
    fn test_padding_extends_cull_bounds() {
        let h = Harness::new();
        // 左内边距 10：x = -5 仍在扩展边界内
        let options = still_at(-5.0, 50.0)
            .manual()
            .with_padding(Padding::new(0.0, 0.0, 0.0, 10.0));
        let emitter = h.emitter(options);
        emitter.create_particle();
        h.step(2);
        assert_eq!(emitter.live_count(), 1);

        // 上内边距不移动左边界
        let options = still_at(-5.0, 50.0)
            .manual()
            .with_padding(Padding::new(10.0, 0.0, 0.0, 0.0));
        let emitter = h.emitter(options);
        emitter.create_particle();
        h.step(1);
        assert_eq!(emitter.live_count(), 0);
    }

    #[test]
    fn test_culled_particles_are_reused_from_pool() {
        let h = Harness::new();
        let stage = h.stage.clone();
        let factory = Rc::new(SceneFactory::new(stage, "circle"));
        let emitter =
            Emitter::new(still_at(0.0, 0.0).manual(), factory.clone(), &h.ticker).unwrap();

        for _ in 0..5 {
            emitter.create_particle();
            h.step(1);
        }
        assert_eq!(factory.created_count(), 1);
        assert_eq!(emitter.stats().pool.reused, 4);
    }

    #[test]
    fn test_manual_mode_does_not_advance_counter() {
        let h = Harness::new();
        let emitter = h.emitter(still_at(50.0, 50.0).manual().with_throttle(2));

        h.step(5);
        assert_eq!(emitter.live_count(), 0);

        // 计数器保持为 0，节流门总是通过
        assert!(emitter.create_particle());
        assert!(emitter.create_particle());
        assert_eq!(emitter.live_count(), 2);
    }

    #[test]
    fn test_pause_and_resume() {
        let h = Harness::new();
        let options = EmitterOptions::new(Rect::new(0.0, 0.0, 100.0, 100.0)).with_particle(
            ParticleOptions::default()
                .with_speed(1.0, 1.0)
                .with_spawn_region(Rect::point(10.0, 50.0)),
        );
        let mut emitter = h.emitter(options);
        h.step(1);
        let before = emitter.particles();

        emitter.pause();
        emitter.pause();
        assert!(emitter.is_paused());
        assert_eq!(h.ticker.listener_count(), 0);

        h.step(5);
        assert_eq!(emitter.particles(), before);

        emitter.resume().unwrap();
        assert_eq!(emitter.state(), EmitterState::Active);
        assert_eq!(h.ticker.listener_count(), 1);
        emitter.resume().unwrap();
        assert_eq!(h.ticker.listener_count(), 1);

        h.step(1);
        assert_eq!(emitter.live_count(), 2);
        assert_eq!(emitter.particles()[0].position, Vec2::new(11.0, 50.0));
    }

    #[test]
    fn test_destroy_is_terminal() {
        let h = Harness::new();
        let mut emitter = h.emitter(still_at(50.0, 50.0));
        h.step(3);
        assert_eq!(h.stage.len(), 3);

        emitter.destroy();
        assert_eq!(emitter.state(), EmitterState::Destroyed);
        assert_eq!(h.ticker.listener_count(), 0);
        assert_eq!(emitter.live_count(), 0);
        assert_eq!(emitter.pooled_count(), 0);
        assert!(h.stage.is_empty());

        emitter.resume().unwrap();
        emitter.pause();
        emitter.destroy();
        assert_eq!(emitter.state(), EmitterState::Destroyed);
        assert_eq!(h.ticker.listener_count(), 0);

        assert!(!emitter.create_particle());
        h.step(2);
        assert_eq!(emitter.live_count(), 0);
    }

    #[test]
    fn test_destroy_while_paused() {
        let h = Harness::new();
        let mut emitter = h.emitter(still_at(50.0, 50.0));
        h.step(2);
        emitter.pause();
        emitter.destroy();

        assert_eq!(emitter.state(), EmitterState::Destroyed);
        assert_eq!(emitter.live_count(), 0);
        assert!(h.stage.is_empty());
    }

    #[test]
    fn test_update_options_applies_to_next_spawn() {
        let h = Harness::new();
        let emitter = h.emitter(still_at(50.0, 50.0).manual());
        emitter.create_particle();

        emitter.update_emitter_options(EmitterOptionsPatch::particle(
            ParticleOptions::default().with_spawn_region(Rect::point(20.0, 20.0)),
        ));
        emitter.create_particle();

        let positions: Vec<Vec2> = emitter.particles().iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![Vec2::new(50.0, 50.0), Vec2::new(20.0, 20.0)]);
    }

    #[test]
    fn test_update_bounds_culls_on_next_tick() {
        let h = Harness::new();
        let emitter = h.emitter(still_at(50.0, 50.0).manual());
        emitter.create_particle();

        emitter.update_emitter_options(EmitterOptionsPatch::bounds(Rect::new(0.0, 0.0, 40.0, 40.0)));
        h.step(1);
        assert_eq!(emitter.live_count(), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let h = Harness::new();
        let emitter = h.emitter(still_at(50.0, 50.0));
        h.step(2);
        drop(emitter);

        assert_eq!(h.ticker.listener_count(), 0);
        // 舞台保留，由宿主决定是否清空
        assert_eq!(h.stage.len(), 2);
    }

    #[test]
    fn test_stopped_ticker_rejects_new_emitter() {
        let h = Harness::new();
        h.source.close();
        assert!(h.source.step().is_err());

        let factory = SceneFactory::new(h.stage.clone(), "circle");
        let result = Emitter::new(still_at(50.0, 50.0), factory, &h.ticker);
        assert_eq!(result.err(), Some(TickerError::NotRunning));
        assert_eq!(h.ticker.listener_count(), 0);
    }

    #[test]
    fn test_resume_on_stopped_ticker_stays_paused() {
        let h = Harness::new();
        let mut emitter = h.emitter(still_at(50.0, 50.0));
        h.step(1);
        emitter.pause();

        h.source.close();
        assert!(h.source.step().is_err());

        assert_eq!(emitter.resume(), Err(TickerError::NotRunning));
        assert_eq!(emitter.state(), EmitterState::Paused);
        assert_eq!(h.ticker.listener_count(), 0);
        assert_eq!(emitter.live_count(), 1);
    }

    #[test]
    fn test_emitters_share_ticker_independently() {
        let h = Harness::new();
        let mut a = h.emitter(still_at(50.0, 50.0));
        let b = h.emitter(still_at(60.0, 60.0).with_throttle(2));
        assert_eq!(h.ticker.listener_count(), 2);

        h.step(4);
        assert_eq!(a.live_count(), 4);
        assert_eq!(b.live_count(), 2);

        a.pause();
        h.step(2);
        assert_eq!(a.live_count(), 4);
        assert_eq!(b.live_count(), 3);
    }

    proptest! {
        #[test]
        fn throttle_passes_once_per_period(throttle in 1u32..8, periods in 1usize..10) {
            let h = Harness::new();
            let emitter = h.emitter(still_at(50.0, 50.0).with_throttle(throttle));
            h.step(periods * throttle as usize);
            prop_assert_eq!(emitter.stats().spawned, periods as u64);
        }

        #[test]
        fn live_count_never_exceeds_max(
            max_count in 0usize..12,
            throttle in 1u32..4,
            ticks in 0usize..60
        ) {
            let h = Harness::new();
            let options = EmitterOptions::new(Rect::new(0.0, 0.0, 100.0, 100.0))
                .with_max_count(max_count)
                .with_throttle(throttle)
                .with_particle(
                    ParticleOptions::default()
                        .with_angle(0.0, std::f32::consts::TAU)
                        .with_speed(0.0, 3.0)
                        .with_spawn_region(Rect::new(40.0, 40.0, 20.0, 20.0)),
                );
            let emitter = h.emitter(options);
            for _ in 0..ticks {
                h.step(1);
                prop_assert!(emitter.live_count() <= max_count);
                emitter.create_particle();
                prop_assert!(emitter.live_count() <= max_count);
            }
        }
    }
}
