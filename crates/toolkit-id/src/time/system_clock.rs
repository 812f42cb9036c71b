use std::time::{SystemTime, UNIX_EPOCH};

use crate::TimeSource;

/// A time source that reads the system wall clock on every call.
///
/// This is the default clock for [`SnowflakeGenerator`]. Its readings follow
/// the operating system, so NTP corrections can move it backward; the
/// generator absorbs that by waiting for the clock to catch up.
///
/// [`SnowflakeGenerator`]: crate::SnowflakeGenerator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        // Readings before 1970 saturate to zero.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
            })
    }
}
