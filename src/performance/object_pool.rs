use std::collections::VecDeque;
use std::rc::Rc;

/// 可池化对象 trait
///
/// 池按引用身份去重：同一个实例（或其共享句柄）不会在空闲列表中出现两次。
pub trait PoolItem {
    /// 是否与另一个对象是同一个实例
    fn is_same(&self, other: &Self) -> bool;
}

impl<T: ?Sized> PoolItem for Rc<T> {
    fn is_same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

/// 对象池 - 减少内存分配和释放的开销
///
/// 空闲列表有界，容量即配置的池大小。池满时归还的对象被直接丢弃。
pub struct ObjectPool<T: PoolItem> {
    available: VecDeque<T>,
    max_size: usize,
    stats: PoolStats,
}

impl<T: PoolItem> ObjectPool<T> {
    /// 创建对象池
    pub fn new(max_size: usize) -> Self {
        Self {
            available: VecDeque::with_capacity(max_size),
            max_size,
            stats: PoolStats::default(),
        }
    }

    /// 从池中获取对象，池为空时调用 `factory` 新建
    pub fn create<F>(&mut self, factory: F) -> T
    where
        F: FnOnce() -> T,
    {
        match self.available.pop_front() {
            Some(item) => {
                self.stats.reused += 1;
                item
            }
            None => {
                self.stats.created += 1;
                factory()
            }
        }
    }

    /// 将对象归还到池中
    ///
    /// 已在池中的实例为空操作；池已满时对象被丢弃。返回对象是否被保留。
    pub fn recycle(&mut self, item: T) -> bool {
        if self.available.iter().any(|held| held.is_same(&item)) {
            return false;
        }

        if self.available.len() < self.max_size {
            self.available.push_back(item);
            self.stats.recycled += 1;
            true
        } else {
            // 如果池已满,对象将被丢弃
            self.stats.dropped += 1;
            tracing::trace!(target: "pool", "Pool full ({}), dropping instance", self.max_size);
            false
        }
    }

    /// 获取池中可用对象的数量
    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// 清空池
    ///
    /// 直接清空后备存储，不经过 `recycle`。
    pub fn clear(&mut self) {
        self.available.clear();
    }

    /// 获取池统计信息
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            available: self.available.len(),
            max_size: self.max_size,
            ..self.stats
        }
    }
}

/// 对象池统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// 通过工厂新建的次数
    pub created: usize,
    /// 复用空闲对象的次数
    pub reused: usize,
    /// 成功归还的次数
    pub recycled: usize,
    /// 因池满被丢弃的次数
    pub dropped: usize,
    /// 当前可用对象数
    pub available: usize,
    /// 池最大大小
    pub max_size: usize,
}

impl PoolStats {
    /// 计算缓存命中率
    pub fn hit_rate(&self) -> f32 {
        let total = self.created + self.reused;
        if total == 0 {
            0.0
        } else {
            self.reused as f32 / total as f32
        }
    }
}
