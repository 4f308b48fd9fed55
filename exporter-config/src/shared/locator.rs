use serde::Deserialize;

use crate::shared::ValidationError;

/// Tuning for the time-to-identifier search.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LocatorConfig {
    /// Accept a probe that lands on the requested side of the target within this many seconds.
    ///
    /// Zero disables the early-accept path so the search converges on the closest row.
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: u64,
    /// Pause after every probe, in milliseconds, to stay under the store's rate limits.
    #[serde(default = "default_probe_delay_ms")]
    pub probe_delay_ms: u64,
    /// Initial step used when a search is seeded with a previously located id.
    #[serde(default = "default_seed_step")]
    pub seed_step: i64,
    /// Margin, in minutes, added on both sides of a day before locating its bounds.
    #[serde(default = "default_margin_mins")]
    pub margin_mins: u64,
}

impl LocatorConfig {
    /// Default acceptance window: five minutes.
    pub const DEFAULT_TOLERANCE_SECS: u64 = 300;

    /// Default pause between probes.
    pub const DEFAULT_PROBE_DELAY_MS: u64 = 1000;

    /// Default step for seeded searches.
    pub const DEFAULT_SEED_STEP: i64 = 100_000_000;

    /// Default margin around each exported day.
    pub const DEFAULT_MARGIN_MINS: u64 = 60;

    /// Largest accepted tolerance: one day.
    pub const MAX_TOLERANCE_SECS: u64 = 86_400;

    /// Largest accepted margin: one week.
    pub const MAX_MARGIN_MINS: u64 = 10_080;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.seed_step <= 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "locator.seed_step".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        if self.tolerance_secs > Self::MAX_TOLERANCE_SECS {
            return Err(ValidationError::InvalidFieldValue {
                field: "locator.tolerance_secs".to_string(),
                constraint: format!("must be at most {}", Self::MAX_TOLERANCE_SECS),
            });
        }

        if self.margin_mins > Self::MAX_MARGIN_MINS {
            return Err(ValidationError::InvalidFieldValue {
                field: "locator.margin_mins".to_string(),
                constraint: format!("must be at most {}", Self::MAX_MARGIN_MINS),
            });
        }

        Ok(())
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            tolerance_secs: default_tolerance_secs(),
            probe_delay_ms: default_probe_delay_ms(),
            seed_step: default_seed_step(),
            margin_mins: default_margin_mins(),
        }
    }
}

fn default_tolerance_secs() -> u64 {
    LocatorConfig::DEFAULT_TOLERANCE_SECS
}

fn default_probe_delay_ms() -> u64 {
    LocatorConfig::DEFAULT_PROBE_DELAY_MS
}

fn default_seed_step() -> i64 {
    LocatorConfig::DEFAULT_SEED_STEP
}

fn default_margin_mins() -> u64 {
    LocatorConfig::DEFAULT_MARGIN_MINS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(LocatorConfig::default().validate().is_ok());
    }

    #[test]
    fn tolerance_above_one_day_is_rejected() {
        let config = LocatorConfig {
            tolerance_secs: 10_000_000_000_000_000,
            ..Default::default()
        };

        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidFieldValue {
                field: "locator.tolerance_secs".to_string(),
                constraint: "must be at most 86400".to_string(),
            })
        );

        let at_limit = LocatorConfig {
            tolerance_secs: LocatorConfig::MAX_TOLERANCE_SECS,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn margin_above_one_week_is_rejected() {
        let config = LocatorConfig {
            margin_mins: u64::MAX,
            ..Default::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidFieldValue { ref field, .. }) if field == "locator.margin_mins"
        ));
    }

    #[test]
    fn non_positive_seed_step_is_rejected() {
        let config = LocatorConfig {
            seed_step: 0,
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }
}
