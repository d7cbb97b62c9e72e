//! 无头场景图后端
//!
//! 一个最小的场景图：[`SceneStage`] 是挂载精灵的容器，[`SpriteHandle`] 是共享的精灵
//! 节点，[`SceneFactory`] 把两者接到 [`RenderFactory`] 上。宿主可以直接读取舞台内容，
//! 再交给自己的绘制层；测试和基准也用它代替真实的渲染后端。

use super::factory::RenderFactory;
use super::particle::{ParticleTransform, ParticleVisual};
use glam::Vec2;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// 精灵节点
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    /// 纹理名称
    pub texture: String,
    /// 位置
    pub position: Vec2,
    /// 缩放
    pub scale: f32,
    /// 锚点（0.5 = 居中）
    pub anchor: Vec2,
}

impl Sprite {
    pub fn new(texture: impl Into<String>) -> Self {
        Self {
            texture: texture.into(),
            position: Vec2::ZERO,
            scale: 1.0,
            anchor: Vec2::splat(0.5),
        }
    }
}

/// 共享精灵句柄
///
/// 克隆得到同一个节点的另一个引用，舞台按引用身份识别节点。
#[derive(Debug, Clone)]
pub struct SpriteHandle(Rc<RefCell<Sprite>>);

impl SpriteHandle {
    pub fn new(sprite: Sprite) -> Self {
        Self(Rc::new(RefCell::new(sprite)))
    }

    pub fn ptr_eq(&self, other: &SpriteHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// 当前节点状态的拷贝
    pub fn snapshot(&self) -> Sprite {
        self.0.borrow().clone()
    }

    pub fn position(&self) -> Vec2 {
        self.0.borrow().position
    }

    pub fn scale(&self) -> f32 {
        self.0.borrow().scale
    }
}

impl ParticleVisual for SpriteHandle {
    fn reset_visual(&mut self) {
        let mut sprite = self.0.borrow_mut();
        sprite.position = Vec2::ZERO;
        sprite.scale = 1.0;
    }

    fn update_visual(&mut self, transform: &ParticleTransform) {
        let mut sprite = self.0.borrow_mut();
        sprite.position = transform.position;
        sprite.scale = transform.scale;
    }
}

/// 舞台容器
#[derive(Debug, Default)]
pub struct SceneStage {
    children: RefCell<Vec<SpriteHandle>>,
}

impl SceneStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加子节点；已挂载的节点移到末尾
    pub fn add_child(&self, sprite: &SpriteHandle) {
        let mut children = self.children.borrow_mut();
        children.retain(|c| !c.ptr_eq(sprite));
        children.push(sprite.clone());
    }

    /// 移除子节点，未挂载时为空操作
    pub fn remove_child(&self, sprite: &SpriteHandle) -> bool {
        let mut children = self.children.borrow_mut();
        let before = children.len();
        children.retain(|c| !c.ptr_eq(sprite));
        children.len() != before
    }

    pub fn remove_children(&self) {
        self.children.borrow_mut().clear();
    }

    pub fn contains(&self, sprite: &SpriteHandle) -> bool {
        self.children.borrow().iter().any(|c| c.ptr_eq(sprite))
    }

    pub fn len(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.borrow().is_empty()
    }

    /// 按挂载顺序导出所有精灵
    pub fn sprites(&self) -> Vec<Sprite> {
        self.children.borrow().iter().map(SpriteHandle::snapshot).collect()
    }
}

/// 场景图渲染工厂
#[derive(Debug)]
pub struct SceneFactory {
    stage: Rc<SceneStage>,
    texture: String,
    created: Cell<usize>,
}

impl SceneFactory {
    pub fn new(stage: Rc<SceneStage>, texture: impl Into<String>) -> Self {
        Self {
            stage,
            texture: texture.into(),
            created: Cell::new(0),
        }
    }

    pub fn stage(&self) -> &Rc<SceneStage> {
        &self.stage
    }

    /// 已创建的可视句柄数
    pub fn created_count(&self) -> usize {
        self.created.get()
    }
}

impl RenderFactory for SceneFactory {
    type Visual = SpriteHandle;

    fn create_visual(&self) -> SpriteHandle {
        self.created.set(self.created.get() + 1);
        SpriteHandle::new(Sprite::new(self.texture.clone()))
    }

    fn add_to_stage(&self, visual: &SpriteHandle) {
        self.stage.add_child(visual);
    }

    fn remove_from_stage(&self, visual: &SpriteHandle) {
        self.stage.remove_child(visual);
    }

    fn remove_all(&self) {
        self.stage.remove_children();
    }
}
