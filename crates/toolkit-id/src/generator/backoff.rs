use std::sync::Arc;
use std::time::Duration;

/// What a generator does between clock polls while it cannot mint.
///
/// A generator waits in two situations: the 4096 sequence values of the
/// current millisecond are used up, or the clock reads earlier than the last
/// timestamp it minted at. In both cases it calls [`Backoff::wait`] and then
/// re-reads its time source, until the clock reaches `until`.
///
/// The wait has no timeout. Callers that need a deadline should drive
/// [`SnowflakeGenerator::poll_id`] themselves.
///
/// [`SnowflakeGenerator::poll_id`]: crate::SnowflakeGenerator::poll_id
pub trait Backoff {
    /// Called once per failed poll. `now` is the latest clock reading and
    /// `until` the first millisecond at which minting can resume.
    fn wait(&self, now: u64, until: u64);
}

impl<B: Backoff + ?Sized> Backoff for &B {
    fn wait(&self, now: u64, until: u64) {
        (**self).wait(now, until);
    }
}

impl<B: Backoff + ?Sized> Backoff for Arc<B> {
    fn wait(&self, now: u64, until: u64) {
        (**self).wait(now, until);
    }
}

/// Tight polling with a CPU spin-loop hint. Lowest latency once the clock
/// advances, at the cost of burning a core while waiting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SpinWait;

impl Backoff for SpinWait {
    #[inline]
    fn wait(&self, _now: u64, _until: u64) {
        core::hint::spin_loop();
    }
}

/// Polling that hands the processor back to the scheduler between reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct YieldWait;

impl Backoff for YieldWait {
    #[inline]
    fn wait(&self, _now: u64, _until: u64) {
        std::thread::yield_now();
    }
}

/// Sleeps until the clock is expected to reach `until`, capped at `max`.
///
/// Suitable where spinning is expensive (shared vCPUs, battery-powered
/// hosts). The cap bounds how long a large backward clock jump keeps the
/// thread asleep before the clock is checked again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SleepWait {
    max: Duration,
}

impl SleepWait {
    /// Sleeps at most `max` per poll. A zero cap degrades to a yield.
    pub const fn new(max: Duration) -> Self {
        Self { max }
    }

    /// The upper bound on a single sleep.
    pub const fn max(&self) -> Duration {
        self.max
    }
}

impl Default for SleepWait {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl Backoff for SleepWait {
    fn wait(&self, now: u64, until: u64) {
        let remaining = Duration::from_millis(until.saturating_sub(now));
        let nap = remaining.min(self.max);
        if nap.is_zero() {
            std::thread::yield_now();
        } else {
            std::thread::sleep(nap);
        }
    }
}

/// Backoff strategy selected by name, for configuration surfaces that can't
/// name a type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BackoffKind {
    /// [`SpinWait`]
    #[default]
    Spin,
    /// [`YieldWait`]
    Yield,
    /// [`SleepWait`] with its default cap.
    Sleep,
}

impl Backoff for BackoffKind {
    fn wait(&self, now: u64, until: u64) {
        match self {
            Self::Spin => SpinWait.wait(now, until),
            Self::Yield => YieldWait.wait(now, until),
            Self::Sleep => SleepWait::default().wait(now, until),
        }
    }
}

impl core::str::FromStr for BackoffKind {
    type Err = UnknownBackoff;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spin" => Ok(Self::Spin),
            "yield" => Ok(Self::Yield),
            "sleep" => Ok(Self::Sleep),
            _ => Err(UnknownBackoff(s.to_owned())),
        }
    }
}

/// Returned when a backoff name is not one of `spin`, `yield` or `sleep`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown backoff strategy `{0}` (expected spin, yield or sleep)")]
pub struct UnknownBackoff(pub String);
