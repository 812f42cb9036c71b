use crate::{ConfigError, DEFAULT_EPOCH_MILLIS, Result, SnowflakeId};

/// Unvalidated construction parameters for a [`SnowflakeGenerator`].
///
/// Fields are signed because they usually arrive from the outside world (CLI
/// flags, environment, config files) where a negative value is a possible
/// input that has to be rejected rather than a type error.
///
/// [`SnowflakeGenerator`]: crate::SnowflakeGenerator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GeneratorConfig {
    /// Datacenter partition, `0..=31`.
    pub datacenter_id: i64,
    /// Worker partition within the datacenter, `0..=31`.
    pub worker_id: i64,
    /// Zero point of the timestamp field, in Unix milliseconds. Must not be
    /// negative or later than the current time.
    pub epoch_millis: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            datacenter_id: 0,
            worker_id: 0,
            epoch_millis: DEFAULT_EPOCH_MILLIS as i64,
        }
    }
}

impl GeneratorConfig {
    pub const fn new(datacenter_id: i64, worker_id: i64, epoch_millis: i64) -> Self {
        Self {
            datacenter_id,
            worker_id,
            epoch_millis,
        }
    }

    /// Checks every bound against a clock reading of `now_millis`.
    ///
    /// Checks run in a fixed order and the first failure wins: worker id,
    /// datacenter id, negative epoch, epoch in the future, epoch too far in the
    /// past for the 41-bit timestamp field.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] for the first violated bound.
    pub fn validate(&self, now_millis: u64) -> Result<ValidatedConfig> {
        let worker_id = check_id(self.worker_id, SnowflakeId::MAX_WORKER_ID).ok_or(
            ConfigError::WorkerIdOutOfRange {
                value: self.worker_id,
                max: SnowflakeId::MAX_WORKER_ID,
            },
        )?;
        let datacenter_id = check_id(self.datacenter_id, SnowflakeId::MAX_DATACENTER_ID).ok_or(
            ConfigError::DatacenterIdOutOfRange {
                value: self.datacenter_id,
                max: SnowflakeId::MAX_DATACENTER_ID,
            },
        )?;

        let epoch_millis = u64::try_from(self.epoch_millis).map_err(|_| {
            ConfigError::NegativeEpoch {
                epoch: self.epoch_millis,
            }
        })?;
        if epoch_millis > now_millis {
            return Err(ConfigError::EpochInFuture {
                epoch: epoch_millis,
                now: now_millis,
            });
        }
        if now_millis - epoch_millis > SnowflakeId::MAX_TIMESTAMP {
            return Err(ConfigError::EpochTooOld {
                epoch: epoch_millis,
                now: now_millis,
            });
        }

        Ok(ValidatedConfig {
            datacenter_id,
            worker_id,
            epoch_millis,
        })
    }
}

fn check_id(value: i64, max: u64) -> Option<u64> {
    u64::try_from(value).ok().filter(|&id| id <= max)
}

/// A configuration that passed [`GeneratorConfig::validate`].
///
/// Immutable for the life of the generator that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValidatedConfig {
    datacenter_id: u64,
    worker_id: u64,
    epoch_millis: u64,
}

impl ValidatedConfig {
    pub const fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub const fn epoch_millis(&self) -> u64 {
        self.epoch_millis
    }
}

impl From<ValidatedConfig> for GeneratorConfig {
    fn from(config: ValidatedConfig) -> Self {
        // Validated fields are at most 31 and at most the current time, so
        // they always fit in an i64.
        Self {
            datacenter_id: config.datacenter_id as i64,
            worker_id: config.worker_id as i64,
            epoch_millis: config.epoch_millis as i64,
        }
    }
}
