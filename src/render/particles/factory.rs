//! 渲染工厂契约
//!
//! 宿主环境实现 [`RenderFactory`]，负责创建粒子可视句柄，并把它挂载到舞台或从舞台卸载。
//! 舞台通常是内部可变的容器（DOM 节点、场景图容器），因此所有方法都取 `&self`。
//! 同一个工厂可以通过 `Rc` 在多个发射器之间共享。

use super::particle::{Particle, ParticleVisual};
use std::rc::Rc;

/// 渲染工厂
pub trait RenderFactory {
    /// 该后端的可视句柄类型
    type Visual: ParticleVisual;

    /// 创建一个可视句柄，每个粒子只在构造时调用一次
    fn create_visual(&self) -> Self::Visual;

    /// 实例化粒子对象
    fn new_particle(&self) -> Particle<Self::Visual> {
        Particle::new(self.create_visual())
    }

    /// 把可视句柄添加到舞台
    fn add_to_stage(&self, visual: &Self::Visual);

    /// 从舞台移除可视句柄（不销毁，以便复用）
    fn remove_from_stage(&self, visual: &Self::Visual);

    /// 一次性清空舞台容器，不依赖逐个粒子的卸载记录
    fn remove_all(&self);
}

impl<F: RenderFactory + ?Sized> RenderFactory for Rc<F> {
    type Visual = F::Visual;

    fn create_visual(&self) -> Self::Visual {
        (**self).create_visual()
    }

    fn new_particle(&self) -> Particle<Self::Visual> {
        (**self).new_particle()
    }

    fn add_to_stage(&self, visual: &Self::Visual) {
        (**self).add_to_stage(visual)
    }

    fn remove_from_stage(&self, visual: &Self::Visual) {
        (**self).remove_from_stage(visual)
    }

    fn remove_all(&self) {
        (**self).remove_all()
    }
}
