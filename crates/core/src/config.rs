//! Debounce timing configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default quiet period before a window fires
pub const DEFAULT_DELAY_MS: u64 = 200;

/// Largest accepted delay (one hour)
pub const MAX_DELAY_MS: u64 = 3_600_000;

/// Timing for a debouncer
///
/// `delay` is the quiet period a window waits for after its last
/// submission. `max_wait`, when set, caps how long a window may stay open
/// while submissions keep arriving. Both are written to and read from
/// config files as whole milliseconds (`delay_ms`, `max_wait_ms`), but keep
/// full precision when built from a [`Duration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Quiet period (default: 200ms)
    #[serde(
        rename = "delay_ms",
        with = "duration_millis",
        default = "default_delay"
    )]
    pub delay: Duration,

    /// Upper bound on window length (default: unbounded)
    #[serde(
        rename = "max_wait_ms",
        with = "opt_duration_millis",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_wait: Option<Duration>,
}

impl DebounceConfig {
    /// Config with the given delay and no max wait
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_wait: None,
        }
    }

    /// Set the max wait
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Check ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delay > Duration::from_millis(MAX_DELAY_MS) {
            return Err(ConfigError::DelayOutOfRange {
                value: as_millis(self.delay),
                max: MAX_DELAY_MS,
            });
        }

        if let Some(max_wait) = self.max_wait {
            if max_wait < self.delay {
                return Err(ConfigError::MaxWaitBelowDelay {
                    max_wait: as_millis(max_wait),
                    delay: as_millis(self.delay),
                });
            }
        }

        Ok(())
    }

    /// Parse and validate a TOML fragment such as `delay_ms = 300`
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self::new(default_delay())
    }
}

impl From<Duration> for DebounceConfig {
    fn from(delay: Duration) -> Self {
        Self::new(delay)
    }
}

fn default_delay() -> Duration {
    Duration::from_millis(DEFAULT_DELAY_MS)
}

/// Whole milliseconds, saturating at `u64::MAX`
fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(dur: &Duration, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ser.serialize_u64(super::as_millis(*dur))
    }

    pub fn deserialize<'de, D>(de: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(de)?;
        Ok(Duration::from_millis(ms))
    }
}

mod opt_duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(dur: &Option<Duration>, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dur {
            Some(dur) => ser.serialize_some(&super::as_millis(*dur)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(de: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = Option::<u64>::deserialize(de)?;
        Ok(ms.map(Duration::from_millis))
    }
}
