//! Wall clock and one-shot deferred callbacks
//!
//! The gateway debounces through the `Scheduler` trait so the same code runs
//! on the browser event loop (`BrowserScheduler`) and on a virtual clock
//! (`ManualScheduler`) that tests and the native demo drive by hand.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// A deferred callback. Runs at most once.
pub type Task = Box<dyn FnOnce()>;

/// Single-threaded scheduler of cancellable one-shot callbacks
pub trait Scheduler {
    /// Token for an armed callback; passing it to `cancel` disarms it
    type Handle;

    fn schedule(&self, delay: Duration, task: Task) -> Self::Handle;

    /// Disarm a callback. Cancelling one that already ran is harmless.
    fn cancel(&self, handle: Self::Handle);
}

/// Unix timestamp in milliseconds
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// Unix timestamp in milliseconds
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// `window.setTimeout` based scheduler
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone)]
pub struct BrowserScheduler {
    window: Option<web_sys::Window>,
}

/// Armed browser timeout. Owns the JS callback until it fires or is cancelled.
#[cfg(target_arch = "wasm32")]
pub struct TimeoutHandle {
    id: i32,
    _callback: wasm_bindgen::closure::Closure<dyn FnMut()>,
}

#[cfg(target_arch = "wasm32")]
impl BrowserScheduler {
    pub fn new() -> Self {
        Self {
            window: web_sys::window(),
        }
    }

    /// Whether timers can be armed (false in workers without a window)
    pub fn is_available(&self) -> bool {
        self.window.is_some()
    }
}

#[cfg(target_arch = "wasm32")]
impl Default for BrowserScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
impl Scheduler for BrowserScheduler {
    type Handle = TimeoutHandle;

    fn schedule(&self, delay: Duration, task: Task) -> TimeoutHandle {
        use wasm_bindgen::JsCast;
        use wasm_bindgen::closure::Closure;

        let mut task = Some(task);
        let callback = Closure::<dyn FnMut()>::new(move || {
            if let Some(task) = task.take() {
                task();
            }
        });
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        let armed = self.window.as_ref().map(|window| {
            window.set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                millis,
            )
        });
        let id = match armed {
            Some(Ok(id)) => id,
            Some(Err(err)) => {
                log::warn!("setTimeout failed: {:?}", err);
                0
            }
            None => {
                log::warn!("No window: deferred callback dropped");
                0
            }
        };

        TimeoutHandle {
            id,
            _callback: callback,
        }
    }

    fn cancel(&self, handle: TimeoutHandle) {
        if let Some(window) = &self.window {
            window.clear_timeout_with_handle(handle.id);
        }
    }
}

#[derive(Default)]
struct Clock {
    now: Duration,
    next_id: u64,
    /// Armed tasks keyed by (deadline, arm order)
    tasks: BTreeMap<(Duration, u64), Task>,
}

/// Virtual-time scheduler. Nothing fires until `advance` is called.
///
/// Clones share the same clock, so a test can keep one and hand another to
/// the gateway.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<Clock>>,
}

/// Handle to a task armed on a `ManualScheduler`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId {
    deadline: Duration,
    seq: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation
    pub fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    /// Number of armed tasks
    pub fn pending(&self) -> usize {
        self.clock.borrow().tasks.len()
    }

    /// Move the clock forward, running every task that comes due in
    /// deadline order. Tasks may arm or cancel others while running.
    /// Returns how many tasks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut fired = 0;

        loop {
            let task = {
                let mut guard = self.clock.borrow_mut();
                let clock = &mut *guard;
                let Some(entry) = clock.tasks.first_entry() else {
                    break;
                };
                let (deadline, _) = *entry.key();
                if deadline > target {
                    break;
                }
                clock.now = deadline;
                entry.remove()
            };
            // Borrow released: the task may re-enter the scheduler
            task();
            fired += 1;
        }

        self.clock.borrow_mut().now = target;
        fired
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clock = self.clock.borrow();
        f.debug_struct("ManualScheduler")
            .field("now", &clock.now)
            .field("pending", &clock.tasks.len())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    type Handle = TaskId;

    fn schedule(&self, delay: Duration, task: Task) -> TaskId {
        let mut clock = self.clock.borrow_mut();
        let seq = clock.next_id;
        clock.next_id += 1;
        let deadline = clock.now + delay;
        clock.tasks.insert((deadline, seq), task);
        TaskId { deadline, seq }
    }

    fn cancel(&self, handle: TaskId) {
        self.clock
            .borrow_mut()
            .tasks
            .remove(&(handle.deadline, handle.seq));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, impl Fn() -> Task) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let make = move || -> Task {
            let c = c.clone();
            Box::new(move || c.set(c.get() + 1))
        };
        (count, make)
    }

    #[test]
    fn test_fires_at_deadline() {
        let scheduler = ManualScheduler::new();
        let (count, task) = counter();
        scheduler.schedule(Duration::from_millis(100), task());

        assert_eq!(scheduler.advance(Duration::from_millis(99)), 0);
        assert_eq!(count.get(), 0);
        assert_eq!(scheduler.advance(Duration::from_millis(1)), 1);
        assert_eq!(count.get(), 1);
        assert_eq!(scheduler.now(), Duration::from_millis(100));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_cancel() {
        let scheduler = ManualScheduler::new();
        let (count, task) = counter();
        let handle = scheduler.schedule(Duration::from_millis(10), task());
        scheduler.cancel(handle);
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(count.get(), 0);

        // Cancelling after the fact is a no-op
        scheduler.cancel(handle);
    }

    #[test]
    fn test_deadline_order() {
        let scheduler = ManualScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for (label, ms) in [("late", 30), ("early", 10), ("mid", 20)] {
            let order = order.clone();
            scheduler.schedule(
                Duration::from_millis(ms),
                Box::new(move || order.borrow_mut().push(label)),
            );
        }
        scheduler.advance(Duration::from_millis(30));
        assert_eq!(*order.borrow(), vec!["early", "mid", "late"]);
    }

    #[test]
    fn test_task_can_reschedule() {
        let scheduler = ManualScheduler::new();
        let (count, task) = counter();
        let inner = scheduler.clone();
        let follow_up = task();
        scheduler.schedule(
            Duration::from_millis(5),
            Box::new(move || {
                inner.schedule(Duration::from_millis(5), follow_up);
            }),
        );

        assert_eq!(scheduler.advance(Duration::from_millis(10)), 2);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_now_ms_is_positive() {
        assert!(now_ms() > 0.0);
    }
}
