use crate::SnowflakeId;

/// Represents the result of a single non-blocking mint attempt.
///
/// This type models the outcome of [`SnowflakeGenerator::poll_id`]:
///
/// - [`IdGenStatus::Ready`] indicates a new ID was successfully generated.
/// - [`IdGenStatus::Pending`] means the generator cannot produce a new ID until
///   the clock reaches `yield_until`, either because the sequence for the
///   current millisecond is exhausted or because the clock moved backward.
///
/// This allows callers to build their own wait policy, including giving up
/// after a deadline, on top of the blocking [`SnowflakeGenerator::next_id`].
///
/// # Example
///
/// ```
/// use toolkit_id::{GeneratorConfig, IdGenStatus, SnowflakeGenerator, TimeSource};
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1_600_000_000_000
///     }
/// }
///
/// let generator = SnowflakeGenerator::with_time_source(GeneratorConfig::default(), FixedTime).unwrap();
/// match generator.poll_id() {
///     IdGenStatus::Ready { id } => println!("ID: {id}"),
///     IdGenStatus::Pending { yield_until } => println!("Back off until: {yield_until}"),
/// }
/// ```
///
/// [`SnowflakeGenerator::poll_id`]: crate::SnowflakeGenerator::poll_id
/// [`SnowflakeGenerator::next_id`]: crate::SnowflakeGenerator::next_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated Snowflake ID.
        id: SnowflakeId,
    },
    /// No ID could be generated at the current clock reading.
    ///
    /// You should wait until the clock reaches or exceeds `yield_until`
    /// (Unix milliseconds) before attempting to generate a new ID again.
    Pending {
        /// The first timestamp (inclusive) at which minting can resume.
        yield_until: u64,
    },
}

impl IdGenStatus {
    /// Returns the ID if the attempt succeeded.
    pub const fn ready(self) -> Option<SnowflakeId> {
        match self {
            Self::Ready { id } => Some(id),
            Self::Pending { .. } => None,
        }
    }

    /// Returns `true` if the attempt has to be retried later.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}
