//! 帧源
//!
//! 帧驱动器只依赖一个抽象契约：调度"下一帧"执行一次的回调并返回可取消的句柄，
//! 以及对应的取消函数。宿主环境实现 [`FrameSource`]，本模块提供两个实现：
//!
//! - [`ManualFrameSource`]：由宿主主动推进，适合游戏主循环和测试
//! - [`TimerFrameSource`]：没有原生逐帧原语时的定时器回退，名义帧间隔 16ms，带漂移补偿

use super::error::TickerResult;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// 名义帧间隔（毫秒）
pub const ONE_FRAME_TIME_MS: u64 = 16;

/// 帧回调，参数为帧时间戳（毫秒）
///
/// 回调返回的错误会原样传给推进帧的宿主。
pub type FrameCallback = Box<dyn FnOnce(f64) -> TickerResult<()>>;

/// 已调度帧的句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// 帧源契约
pub trait FrameSource {
    /// 调度一次下一帧回调
    ///
    /// 帧源拒绝调度（例如已关闭）时返回 `None`。
    fn request_frame(&self, callback: FrameCallback) -> Option<FrameHandle>;

    /// 取消尚未执行的回调，句柄未知时为空操作
    fn cancel_frame(&self, handle: FrameHandle);
}

// ============================================================================
// 手动帧源
// ============================================================================

/// 由宿主推进的帧源
///
/// `advance` 只执行调用前已排队的回调；回调执行期间新调度的回调等到下一次 `advance`。
pub struct ManualFrameSource {
    queue: RefCell<VecDeque<(FrameHandle, FrameCallback)>>,
    next_handle: Cell<u64>,
    clock_ms: Cell<f64>,
    closed: Cell<bool>,
}

impl ManualFrameSource {
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            next_handle: Cell::new(1),
            clock_ms: Cell::new(0.0),
            closed: Cell::new(false),
        }
    }

    /// 以给定时间戳推进一帧，返回执行的回调数
    ///
    /// 回调出错时剩余回调放回队首，错误返回给调用者。
    pub fn advance(&self, timestamp: f64) -> TickerResult<usize> {
        self.clock_ms.set(timestamp);
        let mut due = std::mem::take(&mut *self.queue.borrow_mut());
        let mut ran = 0;

        while let Some((_, callback)) = due.pop_front() {
            if let Err(e) = callback(timestamp) {
                let mut queue = self.queue.borrow_mut();
                while let Some(entry) = due.pop_back() {
                    queue.push_front(entry);
                }
                return Err(e);
            }
            ran += 1;
        }
        Ok(ran)
    }

    /// 按名义帧间隔推进一帧
    pub fn step(&self) -> TickerResult<usize> {
        self.advance(self.clock_ms.get() + ONE_FRAME_TIME_MS as f64)
    }

    /// 连续推进 `frames` 帧
    pub fn step_n(&self, frames: usize) -> TickerResult<usize> {
        let mut ran = 0;
        for _ in 0..frames {
            ran += self.step()?;
        }
        Ok(ran)
    }

    /// 排队中的回调数
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// 关闭帧源，之后的调度请求全部被拒绝
    pub fn close(&self) {
        self.closed.set(true);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

impl Default for ManualFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for ManualFrameSource {
    fn request_frame(&self, callback: FrameCallback) -> Option<FrameHandle> {
        if self.closed.get() {
            return None;
        }
        let handle = FrameHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        self.queue.borrow_mut().push_back((handle, callback));
        Some(handle)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.queue.borrow_mut().retain(|(h, _)| *h != handle);
    }
}

// ============================================================================
// 定时器帧源
// ============================================================================

struct ScheduledFrame {
    handle: FrameHandle,
    due: Instant,
    callback: FrameCallback,
}

/// 定时器回退帧源
///
/// 每次调度的延迟为 `max(0, interval + last - now)`，其中 `last` 是上一次调度或
/// 执行的时间，使长期平均帧间隔贴近名义值。`run_frames` 阻塞调用线程。
pub struct TimerFrameSource {
    interval: Duration,
    start: Instant,
    last_time: Cell<Instant>,
    queue: RefCell<Vec<ScheduledFrame>>,
    next_handle: Cell<u64>,
}

impl TimerFrameSource {
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            start: now,
            last_time: Cell::new(now),
            queue: RefCell::new(Vec::new()),
            next_handle: Cell::new(1),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 自创建以来的毫秒数
    pub fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// 阻塞执行最多 `frames` 个回调，返回实际执行数
    ///
    /// 队列为空时提前返回。
    pub fn run_frames(&self, frames: usize) -> TickerResult<usize> {
        let mut ran = 0;
        while ran < frames {
            let next = {
                let mut queue = self.queue.borrow_mut();
                let earliest = queue
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, f)| f.due)
                    .map(|(i, _)| i);
                match earliest {
                    Some(i) => queue.swap_remove(i),
                    None => break,
                }
            };

            let wait = next.due.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }

            self.last_time.set(Instant::now());
            (next.callback)(self.now_ms())?;
            ran += 1;
        }
        Ok(ran)
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl FrameSource for TimerFrameSource {
    fn request_frame(&self, callback: FrameCallback) -> Option<FrameHandle> {
        let now = Instant::now();
        let delay = (self.last_time.get() + self.interval).saturating_duration_since(now);
        self.last_time.set(now);

        let handle = FrameHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        self.queue.borrow_mut().push(ScheduledFrame {
            handle,
            due: now + delay,
            callback,
        });
        Some(handle)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.queue.borrow_mut().retain(|f| f.handle != handle);
    }
}
