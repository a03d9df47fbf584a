//! Failover configuration.

use crate::core::Env;
use std::time::Duration;

/// Environment variable holding the per-backend attempt budget.
pub const MAX_ATTEMPTS_VAR: &str = "CIRCUIT_BREAKER_MAX_ATTEMPTS";

/// Environment variable holding the level reset interval in milliseconds.
pub const LEVEL_RESET_MS_VAR: &str = "CIRCUIT_BREAKER_LEVEL_RESET_MS";

const DEFAULT_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_LEVEL_RESET_MS: u64 = 10_000;

/// Configuration for a failover coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverConfig {
    /// Consecutive failures allowed against one backend before moving to
    /// the next one. A coordinator raises 0 to 1.
    pub max_attempts: u32,

    /// How long the coordinator stays on a fallback backend before probing
    /// the primary again.
    pub level_reset_interval: Duration,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            level_reset_interval: Duration::from_millis(DEFAULT_LEVEL_RESET_MS),
        }
    }
}

impl FailoverConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `CIRCUIT_BREAKER_MAX_ATTEMPTS` and `CIRCUIT_BREAKER_LEVEL_RESET_MS`.
    ///
    /// Missing or non-numeric values fall back to the defaults, so a typo in
    /// the deployment never prevents startup.
    pub fn from_env(env: &Env) -> Self {
        let max_attempts = match env.parse_or(MAX_ATTEMPTS_VAR, DEFAULT_MAX_ATTEMPTS) {
            0 => {
                tracing::warn!(
                    key = MAX_ATTEMPTS_VAR,
                    default = DEFAULT_MAX_ATTEMPTS,
                    "Attempt budget must be at least 1, using default"
                );
                DEFAULT_MAX_ATTEMPTS
            }
            n => n,
        };
        let reset_ms = env.parse_or(LEVEL_RESET_MS_VAR, DEFAULT_LEVEL_RESET_MS);

        Self {
            max_attempts,
            level_reset_interval: Duration::from_millis(reset_ms),
        }
    }

    /// Sets the attempt budget per backend.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the level reset interval.
    pub fn with_level_reset_interval(mut self, interval: Duration) -> Self {
        self.level_reset_interval = interval;
        self
    }

    /// Creates a configuration that abandons a failing backend quickly.
    ///
    /// Three attempts per backend, primary re-probed after two seconds.
    pub fn fast_failover() -> Self {
        Self {
            max_attempts: 3,
            level_reset_interval: Duration::from_secs(2),
        }
    }

    /// Creates a configuration that sticks with each backend longer.
    ///
    /// Twenty-five attempts per backend, primary re-probed after one minute.
    pub fn patient() -> Self {
        Self {
            max_attempts: 25,
            level_reset_interval: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FailoverConfig::default();
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.level_reset_interval, Duration::from_millis(10_000));
    }

    #[test]
    fn test_config_builder() {
        let config = FailoverConfig::new()
            .with_max_attempts(4)
            .with_level_reset_interval(Duration::from_millis(250));

        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.level_reset_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_max_attempts_never_zero() {
        assert_eq!(FailoverConfig::new().with_max_attempts(0).max_attempts, 1);
    }

    #[test]
    fn test_from_env_reads_overrides() {
        let env = Env::from_pairs([(MAX_ATTEMPTS_VAR, "3"), (LEVEL_RESET_MS_VAR, "1500")]);
        let config = FailoverConfig::from_env(&env);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.level_reset_interval, Duration::from_millis(1500));
    }

    #[test]
    fn test_from_env_invalid_values_fall_back() {
        let env = Env::from_pairs([(MAX_ATTEMPTS_VAR, "ten"), (LEVEL_RESET_MS_VAR, "-5")]);
        assert_eq!(FailoverConfig::from_env(&env), FailoverConfig::default());

        let env = Env::from_pairs([(MAX_ATTEMPTS_VAR, "0")]);
        assert_eq!(FailoverConfig::from_env(&env).max_attempts, 10);
    }

    #[test]
    fn test_from_env_empty_uses_defaults() {
        assert_eq!(FailoverConfig::from_env(&Env::new()), FailoverConfig::default());
    }

    #[test]
    fn test_presets() {
        assert!(FailoverConfig::fast_failover().max_attempts < FailoverConfig::default().max_attempts);
        assert!(
            FailoverConfig::patient().level_reset_interval
                > FailoverConfig::default().level_reset_interval
        );
    }
}
