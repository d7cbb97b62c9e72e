//! 帧驱动器
//!
//! 每个动画帧按注册顺序调用一次所有订阅者。多个发射器可以共享同一个驱动器，
//! 互不干扰。驱动器在构造时立即开始计时，通过帧源自我调度，直到最后一个句柄被释放。
//!
//! ## 帧内修改订阅
//!
//! 每帧先对订阅列表做快照：
//! - 帧内新增的订阅从下一帧开始执行
//! - 帧内被移除的订阅（即使还没轮到）本帧不再执行
//!
//! ```ignore
//! let source = Rc::new(ManualFrameSource::new());
//! let ticker = Ticker::new(source.clone())?;
//!
//! let counter = Rc::new(RefCell::new(|| println!("frame")));
//! ticker.add(counter.clone())?;
//! source.step()?;
//! ticker.remove(&counter);
//! ```

use super::error::{TickerError, TickerResult};
use super::frame_source::{FrameHandle, FrameSource};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// 帧订阅者
pub trait FrameListener {
    /// 每帧调用一次
    fn on_frame(&mut self);
}

impl<F: FnMut()> FrameListener for F {
    fn on_frame(&mut self) {
        self()
    }
}

type SharedListener = Rc<RefCell<dyn FrameListener>>;

struct Subscription {
    id: u64,
    listener: SharedListener,
}

struct TickerInner {
    source: Rc<dyn FrameSource>,
    subscriptions: RefCell<Vec<Subscription>>,
    next_id: Cell<u64>,
    frame_count: Cell<u64>,
    pending: Cell<Option<FrameHandle>>,
    running: Cell<bool>,
}

/// 监听器的数据指针，用于按引用相等比较
fn listener_addr<L: ?Sized>(listener: &Rc<RefCell<L>>) -> *const () {
    Rc::as_ptr(listener) as *const ()
}

impl TickerInner {
    fn tick(self: &Rc<Self>, _timestamp: f64) -> TickerResult<()> {
        self.pending.set(None);

        let frame = self.frame_count.get() + 1;
        self.frame_count.set(frame);

        let snapshot: Vec<(u64, SharedListener)> = self
            .subscriptions
            .borrow()
            .iter()
            .map(|s| (s.id, Rc::clone(&s.listener)))
            .collect();

        for (id, listener) in snapshot {
            if !self.is_subscribed(id) {
                continue;
            }
            match listener.try_borrow_mut() {
                Ok(mut l) => l.on_frame(),
                Err(_) => {
                    tracing::warn!(target: "ticker", "Listener #{} is busy, skipped on frame {}", id, frame);
                }
            }
        }

        self.schedule_next(frame)
    }

    fn schedule_next(self: &Rc<Self>, frame: u64) -> TickerResult<()> {
        let weak: Weak<TickerInner> = Rc::downgrade(self);
        let callback = Box::new(move |timestamp: f64| match weak.upgrade() {
            Some(inner) => inner.tick(timestamp),
            None => Ok(()),
        });

        match self.source.request_frame(callback) {
            Some(handle) => {
                self.pending.set(Some(handle));
                Ok(())
            }
            None => {
                self.running.set(false);
                tracing::error!(target: "ticker", "Frame source refused to schedule frame {}", frame + 1);
                Err(TickerError::FrameSourceClosed { frame: frame + 1 })
            }
        }
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.subscriptions.borrow().iter().any(|s| s.id == id)
    }
}

impl Drop for TickerInner {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.source.cancel_frame(handle);
        }
    }
}

/// 帧驱动器句柄
///
/// 克隆得到的是同一个驱动器的另一个句柄。
#[derive(Clone)]
pub struct Ticker {
    inner: Rc<TickerInner>,
}

impl Ticker {
    /// 创建驱动器并立即执行第一帧
    ///
    /// # 错误
    ///
    /// 帧源拒绝调度下一帧时返回 [`TickerError::FrameSourceClosed`]。
    pub fn new(source: Rc<dyn FrameSource>) -> TickerResult<Self> {
        let inner = Rc::new(TickerInner {
            source,
            subscriptions: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            frame_count: Cell::new(0),
            pending: Cell::new(None),
            running: Cell::new(true),
        });
        inner.tick(0.0)?;
        tracing::debug!(target: "ticker", "Ticker started");
        Ok(Self { inner })
    }

    /// 追加订阅
    ///
    /// 同一个监听器可以重复注册，每次注册都会在每帧被调用一次。
    ///
    /// # 错误
    ///
    /// 驱动器已停止（帧源拒绝过调度）时返回 [`TickerError::NotRunning`]，不注册。
    pub fn add<L: FrameListener + 'static>(&self, listener: Rc<RefCell<L>>) -> TickerResult<()> {
        if !self.inner.running.get() {
            tracing::warn!(target: "ticker", "Rejecting listener, ticker stopped at frame {}", self.frame_count());
            return Err(TickerError::NotRunning);
        }
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let listener: SharedListener = listener;
        self.inner
            .subscriptions
            .borrow_mut()
            .push(Subscription { id, listener });
        tracing::trace!(target: "ticker", "Listener #{} added", id);
        Ok(())
    }

    /// 移除第一个引用相等的订阅，未找到时为空操作
    pub fn remove<L: FrameListener + ?Sized>(&self, listener: &Rc<RefCell<L>>) -> bool {
        let addr = listener_addr(listener);
        let mut subscriptions = self.inner.subscriptions.borrow_mut();
        match subscriptions
            .iter()
            .position(|s| listener_addr(&s.listener) == addr)
        {
            Some(index) => {
                let removed = subscriptions.remove(index);
                tracing::trace!(target: "ticker", "Listener #{} removed", removed.id);
                true
            }
            None => false,
        }
    }

    /// 是否存在引用相等的订阅
    pub fn contains<L: FrameListener + ?Sized>(&self, listener: &Rc<RefCell<L>>) -> bool {
        let addr = listener_addr(listener);
        self.inner
            .subscriptions
            .borrow()
            .iter()
            .any(|s| listener_addr(&s.listener) == addr)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.subscriptions.borrow().len()
    }

    /// 已执行的帧数（包括构造时的第一帧）
    pub fn frame_count(&self) -> u64 {
        self.inner.frame_count.get()
    }

    /// 帧源拒绝调度后驱动器停止运行
    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// 两个句柄是否指向同一个驱动器
    pub fn ptr_eq(&self, other: &Ticker) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("listeners", &self.listener_count())
            .field("frame_count", &self.frame_count())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame_source::ManualFrameSource;

    fn manual_ticker() -> (Rc<ManualFrameSource>, Ticker) {
        let source = Rc::new(ManualFrameSource::new());
        let ticker = Ticker::new(source.clone()).unwrap();
        (source, ticker)
    }

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl FrameListener for Recorder {
        fn on_frame(&mut self) {
            self.log.borrow_mut().push(self.name);
        }
    }

    #[test]
    fn test_ticks_immediately_and_reschedules() {
        let (source, ticker) = manual_ticker();
        assert_eq!(ticker.frame_count(), 1);
        assert_eq!(source.pending(), 1);

        source.step_n(3).unwrap();
        assert_eq!(ticker.frame_count(), 4);
        assert_eq!(source.pending(), 1);
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let (source, ticker) = manual_ticker();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::new(RefCell::new(Recorder { name: "a", log: log.clone() }));
        let b = Rc::new(RefCell::new(Recorder { name: "b", log: log.clone() }));

        ticker.add(a.clone()).unwrap();
        ticker.add(b.clone()).unwrap();
        source.step().unwrap();

        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_matches_by_reference() {
        let (source, ticker) = manual_ticker();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::new(RefCell::new(Recorder { name: "a", log: log.clone() }));
        let twin = Rc::new(RefCell::new(Recorder { name: "a", log: log.clone() }));

        ticker.add(a.clone()).unwrap();
        assert!(!ticker.remove(&twin));
        assert!(ticker.contains(&a));

        assert!(ticker.remove(&a));
        assert!(!ticker.remove(&a));
        source.step().unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_remove_only_first_duplicate() {
        let (source, ticker) = manual_ticker();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::new(RefCell::new(Recorder { name: "a", log: log.clone() }));

        ticker.add(a.clone()).unwrap();
        ticker.add(a.clone()).unwrap();
        ticker.remove(&a);
        assert_eq!(ticker.listener_count(), 1);

        source.step().unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_closure_listener() {
        let (source, ticker) = manual_ticker();
        let hits = Rc::new(Cell::new(0));
        let hits_cb = hits.clone();
        let listener = Rc::new(RefCell::new(move || hits_cb.set(hits_cb.get() + 1)));

        ticker.add(listener.clone()).unwrap();
        source.step_n(2).unwrap();
        assert_eq!(hits.get(), 2);
    }

    /// 在帧内移除另一个订阅者、追加新的订阅者
    struct Mutator {
        ticker: Ticker,
        victim: Rc<RefCell<Recorder>>,
        newcomer: Rc<RefCell<Recorder>>,
        done: bool,
    }

    impl FrameListener for Mutator {
        fn on_frame(&mut self) {
            if !self.done {
                self.ticker.remove(&self.victim);
                self.ticker.add(self.newcomer.clone()).unwrap();
                self.done = true;
            }
        }
    }

    #[test]
    fn test_mutation_during_tick_affects_future_ticks_only() {
        let (source, ticker) = manual_ticker();
        let log = Rc::new(RefCell::new(Vec::new()));
        let victim = Rc::new(RefCell::new(Recorder { name: "victim", log: log.clone() }));
        let newcomer = Rc::new(RefCell::new(Recorder { name: "newcomer", log: log.clone() }));
        let mutator = Rc::new(RefCell::new(Mutator {
            ticker: ticker.clone(),
            victim: victim.clone(),
            newcomer: newcomer.clone(),
            done: false,
        }));

        ticker.add(mutator.clone()).unwrap();
        ticker.add(victim.clone()).unwrap();

        source.step().unwrap();
        assert!(log.borrow().is_empty());

        source.step().unwrap();
        assert_eq!(*log.borrow(), vec!["newcomer"]);

        ticker.remove(&mutator);
    }

    #[test]
    fn test_closed_source_fails_fast() {
        let source = Rc::new(ManualFrameSource::new());
        source.close();
        let result = Ticker::new(source);
        assert_eq!(result.unwrap_err(), TickerError::FrameSourceClosed { frame: 2 });
    }

    #[test]
    fn test_source_closed_mid_run_surfaces_to_host() {
        let (source, ticker) = manual_ticker();
        source.close();

        let err = source.step().unwrap_err();
        assert_eq!(err, TickerError::FrameSourceClosed { frame: 3 });
        assert!(!ticker.is_running());
    }

    #[test]
    fn test_stopped_ticker_rejects_listeners() {
        let (source, ticker) = manual_ticker();
        source.close();
        assert!(source.step().is_err());

        let listener = Rc::new(RefCell::new(|| {}));
        assert_eq!(ticker.add(listener.clone()), Err(TickerError::NotRunning));
        assert_eq!(ticker.listener_count(), 0);
        assert!(!ticker.contains(&listener));
    }

    #[test]
    fn test_dropping_ticker_stops_scheduling() {
        let (source, ticker) = manual_ticker();
        assert_eq!(source.pending(), 1);
        drop(ticker);
        assert_eq!(source.pending(), 0);
        assert_eq!(source.step().unwrap(), 0);
    }
}
