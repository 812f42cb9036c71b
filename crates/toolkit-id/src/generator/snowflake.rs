use core::cmp::Ordering;
use core::fmt;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Backoff, GeneratorConfig, IdGenStatus, IdGenerator, Result, SnowflakeId, SpinWait,
    SystemClock, TimeSource, ValidatedConfig,
    generator::{Mutex, lock},
};

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// Every ID carries the generator's datacenter and worker IDs, so generators
/// configured with distinct `(datacenter_id, worker_id)` pairs never collide.
/// Assigning those pairs is up to the operator; nothing checks for a second
/// generator using the same pair.
///
/// The mutable state (last minted millisecond and the sequence within it)
/// lives behind a single mutex. Minting runs entirely under that lock, so IDs
/// from one instance are strictly increasing in lock order.
///
/// ## Features
/// - ✅ Thread-safe, share it behind an `Arc` or a `&`
/// - ✅ Infallible minting once constructed
/// - ✅ Pluggable [`TimeSource`] and [`Backoff`]
///
/// ## Blocking
///
/// [`next_id`](Self::next_id) blocks (under the lock) when the 4096 sequence
/// values of the current millisecond are used up, or when the clock reads
/// earlier than the last minted millisecond. The second case waits for as long
/// as the clock takes to catch up, with no upper bound. Use
/// [`poll_id`](Self::poll_id) to implement a deadline instead.
///
/// # Example
///
/// ```
/// use toolkit_id::{SnowflakeGenerator, DEFAULT_EPOCH_MILLIS};
///
/// let generator = SnowflakeGenerator::new(1, 2, DEFAULT_EPOCH_MILLIS as i64).unwrap();
///
/// let a = generator.next_id();
/// let b = generator.next_id();
/// assert!(b > a);
/// assert_eq!(a.datacenter_id(), 1);
/// assert_eq!(a.worker_id(), 2);
/// ```
pub struct SnowflakeGenerator<T = SystemClock, B = SpinWait>
where
    T: TimeSource,
    B: Backoff,
{
    config: ValidatedConfig,
    state: Mutex<State>,
    time: T,
    backoff: B,
}

#[derive(Debug, Default)]
struct State {
    /// `None` until the first ID is minted.
    last_timestamp: Option<u64>,
    sequence: u64,
}

/// Outcome of one pass through the minting step.
enum Step {
    Ready(SnowflakeId),
    Exhausted { until: u64 },
    ClockBehind { last: u64 },
}

impl State {
    /// Attempts to mint at clock reading `now`. The state is only written when
    /// an ID is produced.
    fn step(&mut self, now: u64, config: &ValidatedConfig) -> Step {
        let epoch = config.epoch_millis();
        let Some(last) = self.last_timestamp else {
            // Nothing minted yet: the epoch is the floor.
            if now < epoch {
                return Step::ClockBehind { last: epoch };
            }
            return self.mint(now, 0, config);
        };

        match now.cmp(&last) {
            Ordering::Equal => {
                if self.sequence < SnowflakeId::MAX_SEQUENCE {
                    self.mint(now, self.sequence + 1, config)
                } else {
                    Step::Exhausted { until: last + 1 }
                }
            }
            Ordering::Greater => self.mint(now, 0, config),
            Ordering::Less => Step::ClockBehind { last },
        }
    }

    fn mint(&mut self, timestamp: u64, sequence: u64, config: &ValidatedConfig) -> Step {
        self.last_timestamp = Some(timestamp);
        self.sequence = sequence;
        Step::Ready(SnowflakeId::from_components(
            timestamp - config.epoch_millis(),
            config.datacenter_id(),
            config.worker_id(),
            sequence,
        ))
    }
}

impl SnowflakeGenerator<SystemClock, SpinWait> {
    /// Creates a generator on the system clock with spin waiting.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`](crate::ConfigError) if either ID is outside
    /// `0..=31`, or if `epoch_millis` is negative, in the future, or too far
    /// in the past for the 41-bit timestamp field.
    pub fn new(datacenter_id: i64, worker_id: i64, epoch_millis: i64) -> Result<Self> {
        Self::from_config(GeneratorConfig::new(datacenter_id, worker_id, epoch_millis))
    }

    /// Creates a generator on the system clock from a [`GeneratorConfig`].
    ///
    /// # Errors
    ///
    /// See [`GeneratorConfig::validate`].
    pub fn from_config(config: GeneratorConfig) -> Result<Self> {
        Self::with_parts(config, SystemClock, SpinWait)
    }
}

impl<T> SnowflakeGenerator<T, SpinWait>
where
    T: TimeSource,
{
    /// Creates a generator reading time from `time`, with spin waiting.
    ///
    /// # Errors
    ///
    /// See [`GeneratorConfig::validate`].
    pub fn with_time_source(config: GeneratorConfig, time: T) -> Result<Self> {
        Self::with_parts(config, time, SpinWait)
    }
}

impl<T, B> SnowflakeGenerator<T, B>
where
    T: TimeSource,
    B: Backoff,
{
    /// Creates a generator from its configuration, time source, and wait
    /// strategy.
    ///
    /// The time source is read once here to reject an epoch in the future. No
    /// later operation revalidates the configuration.
    ///
    /// # Errors
    ///
    /// See [`GeneratorConfig::validate`].
    pub fn with_parts(config: GeneratorConfig, time: T, backoff: B) -> Result<Self> {
        let now = time.current_millis();
        let config = config.validate(now)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            datacenter_id = config.datacenter_id(),
            worker_id = config.worker_id(),
            epoch_millis = config.epoch_millis(),
            "snowflake generator ready"
        );

        Ok(Self {
            config,
            state: Mutex::new(State::default()),
            time,
            backoff,
        })
    }

    /// The validated configuration this generator was built with.
    pub const fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Generates the next ID, blocking until one can be minted.
    ///
    /// The whole operation, including any wait, holds the generator's lock.
    /// The returned ID is strictly greater than every ID this instance
    /// returned before.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> SnowflakeId {
        let mut state = lock(&self.state);
        let mut reported_clock_behind = false;

        loop {
            let now = self.time.current_millis();
            match state.step(now, &self.config) {
                Step::Ready(id) => return id,
                Step::Exhausted { until } => self.backoff.wait(now, until),
                Step::ClockBehind { last } => {
                    if !reported_clock_behind {
                        Self::cold_clock_behind(now, last);
                        reported_clock_behind = true;
                    }
                    self.backoff.wait(now, last);
                }
            }
        }
    }

    /// Generates the next ID and returns its packed 64-bit value.
    pub fn next_raw(&self) -> u64 {
        self.next_id().to_raw()
    }

    /// Makes a single, non-blocking attempt to mint an ID.
    ///
    /// Returns [`IdGenStatus::Pending`] with the millisecond to retry at when
    /// the sequence is exhausted or the clock is behind. A pending attempt
    /// leaves the generator's state unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::{Duration, Instant};
    /// use toolkit_id::{IdGenStatus, SnowflakeGenerator, DEFAULT_EPOCH_MILLIS};
    ///
    /// let generator = SnowflakeGenerator::new(0, 0, DEFAULT_EPOCH_MILLIS as i64).unwrap();
    ///
    /// // Give up after 50ms instead of waiting forever on a broken clock.
    /// let deadline = Instant::now() + Duration::from_millis(50);
    /// let id = loop {
    ///     match generator.poll_id() {
    ///         IdGenStatus::Ready { id } => break Some(id),
    ///         IdGenStatus::Pending { .. } if Instant::now() >= deadline => break None,
    ///         IdGenStatus::Pending { .. } => std::thread::yield_now(),
    ///     }
    /// };
    /// assert!(id.is_some());
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn poll_id(&self) -> IdGenStatus {
        let mut state = lock(&self.state);
        let now = self.time.current_millis();
        match state.step(now, &self.config) {
            Step::Ready(id) => IdGenStatus::Ready { id },
            Step::Exhausted { until } => IdGenStatus::Pending { yield_until: until },
            Step::ClockBehind { last } => IdGenStatus::Pending { yield_until: last },
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(_now: u64, _last: u64) {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            now = _now,
            last_timestamp = _last,
            behind_ms = _last - _now,
            "clock moved backwards, waiting for it to catch up"
        );
    }
}

impl<T, B> IdGenerator for SnowflakeGenerator<T, B>
where
    T: TimeSource + Send + Sync,
    B: Backoff + Send + Sync,
{
    fn generate_id(&self) -> String {
        self.next_id().to_string()
    }
}

impl<T, B> fmt::Debug for SnowflakeGenerator<T, B>
where
    T: TimeSource,
    B: Backoff,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeGenerator")
            .field("datacenter_id", &self.config.datacenter_id())
            .field("worker_id", &self.config.worker_id())
            .field("epoch_millis", &self.config.epoch_millis())
            .finish_non_exhaustive()
    }
}
