/// A result type defaulting to [`ConfigError`], the only error a generator can
/// surface.
pub type Result<T, E = ConfigError> = core::result::Result<T, E>;

/// Reasons a generator refuses to be constructed.
///
/// These are only ever produced by the constructors. Once a generator exists,
/// minting is infallible: clock faults and sequence exhaustion block the caller
/// instead of failing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The worker id is negative or wider than the 5-bit worker field.
    #[error("worker id out of range: {value} (expected 0..={max})")]
    WorkerIdOutOfRange { value: i64, max: u64 },

    /// The datacenter id is negative or wider than the 5-bit datacenter field.
    #[error("datacenter id out of range: {value} (expected 0..={max})")]
    DatacenterIdOutOfRange { value: i64, max: u64 },

    /// The epoch is before 1970-01-01T00:00:00Z.
    #[error("epoch millis must be >= 0, got {epoch}")]
    NegativeEpoch { epoch: i64 },

    /// The epoch is later than the time source's reading at construction.
    #[error("epoch millis {epoch} is later than the current time {now}")]
    EpochInFuture { epoch: u64, now: u64 },

    /// The distance between the epoch and now no longer fits in the 41-bit
    /// timestamp field.
    #[error("epoch millis {epoch} is too far behind the current time {now} for a 41-bit timestamp")]
    EpochTooOld { epoch: u64, now: u64 },
}

/// Errors produced when parsing the decimal text form of a
/// [`SnowflakeId`](crate::SnowflakeId).
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum ParseIdError {
    /// The input string was empty.
    #[error("cannot parse an id from an empty string")]
    Empty,

    /// The input contained something other than an ASCII decimal digit.
    #[error("invalid digit {byte:#04x} at index {index}")]
    InvalidDigit { index: usize, byte: u8 },

    /// The value does not fit in 64 bits.
    #[error("id does not fit in 64 bits")]
    Overflow,
}
