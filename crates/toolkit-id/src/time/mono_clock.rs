use portable_atomic::{AtomicU64, Ordering};
use std::{
    sync::{Arc, OnceLock},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{SystemClock, TimeSource};

/// Shared ticker thread that updates every millisecond.
#[derive(Debug)]
struct SharedTickerInner {
    current: AtomicU64,
    _handle: OnceLock<JoinHandle<()>>,
}

/// A monotonic time source anchored to the Unix wall clock.
///
/// The wall clock is read exactly once, at construction. After that, time is
/// measured with [`Instant`], so readings never go backward even if the
/// system clock is stepped by NTP or an operator. Generators fed by this clock
/// never hit their clock-rollback wait.
///
/// Readings may drift from the wall clock over long uptimes since nothing
/// re-anchors them.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    inner: Arc<SharedTickerInner>,
    anchor_millis: u64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Constructs a monotonic clock anchored to the current wall-clock time.
    ///
    /// Internally this spawns a background thread that updates a shared atomic
    /// counter once per millisecond. The thread exits once the last clone of
    /// the clock is dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use toolkit_id::{MonotonicClock, TimeSource};
    ///
    /// let clock = MonotonicClock::new();
    /// let before = clock.current_millis();
    /// std::thread::sleep(Duration::from_millis(5));
    ///
    /// // The counter is only ever moved forward.
    /// assert!(clock.current_millis() >= before);
    /// ```
    pub fn new() -> Self {
        Self::anchored_at(SystemClock.current_millis())
    }

    /// Constructs a monotonic clock whose first reading is `anchor_millis`.
    pub fn anchored_at(anchor_millis: u64) -> Self {
        let start = Instant::now();

        let inner = Arc::new(SharedTickerInner {
            current: AtomicU64::new(0),
            _handle: OnceLock::new(),
        });

        let weak_inner = Arc::downgrade(&inner);
        let handle = thread::spawn(move || {
            let mut tick = 0;

            loop {
                let Some(inner_ref) = weak_inner.upgrade() else {
                    break;
                };

                // Compute the absolute target time of the next tick
                let target = start + Duration::from_millis(tick);

                let now = Instant::now();
                if now < target {
                    // Don't keep the clock alive while asleep.
                    drop(inner_ref);
                    thread::sleep(target - now);
                    continue;
                }

                let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                inner_ref.current.fetch_max(now_ms, Ordering::Release);

                // Align to next tick after the current actual time
                tick = now_ms.saturating_add(1);
            }
        });

        // A freshly created OnceLock is always empty.
        let _ = inner._handle.set(handle);

        Self {
            inner,
            anchor_millis,
        }
    }
}

impl TimeSource for MonotonicClock {
    /// Returns the anchor plus the milliseconds elapsed since construction.
    fn current_millis(&self) -> u64 {
        self.anchor_millis
            .saturating_add(self.inner.current.load(Ordering::Acquire))
    }
}
