//! Snapshot of process configuration.
//!
//! Adapters and the failover layer read their settings once, at
//! construction, from an [`Env`]. Production code takes a snapshot of the
//! process environment; tests build one from literal pairs.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

/// An immutable set of configuration variables.
#[derive(Debug, Clone, Default)]
pub struct Env {
    vars: Arc<HashMap<String, String>>,
}

impl Env {
    /// Creates an empty environment; every lookup falls back to defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the current process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self {
            vars: Arc::new(vars),
        }
    }

    /// Builds an environment from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            vars: Arc::new(vars),
        }
    }

    /// Returns the value of `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Returns the value of `key`, or `default` if unset.
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Returns the first of `keys` that is set.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| {
            let value = self.get(key);
            tracing::debug!(key = %key, value = ?value, "Reading configuration variable");
            value
        })
    }

    /// Parses `key` as `T`, falling back to `default` when unset or invalid.
    ///
    /// An invalid value is logged and never fails startup.
    pub fn parse_or<T>(&self, key: &str, default: T) -> T
    where
        T: FromStr + Display,
        T::Err: Display,
    {
        match self.get(key) {
            None => default,
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(
                        key = %key,
                        value = %raw,
                        error = %e,
                        default = %default,
                        "Invalid configuration value, using default"
                    );
                    default
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_defaults() {
        let env = Env::from_pairs([("HOST", "broker-1")]);
        assert_eq!(env.get("HOST"), Some("broker-1"));
        assert_eq!(env.get("PORT"), None);
        assert_eq!(env.get_or("PORT", "9092"), "9092");
    }

    #[test]
    fn test_first_of_prefers_earlier_keys() {
        let env = Env::from_pairs([("B", "second"), ("A", "first")]);
        assert_eq!(env.first_of(&["A", "B"]), Some("first"));
        assert_eq!(env.first_of(&["C", "B"]), Some("second"));
        assert_eq!(env.first_of(&["C", "D"]), None);
    }

    #[test]
    fn test_parse_or_falls_back_on_invalid() {
        let env = Env::from_pairs([("GOOD", " 42 "), ("BAD", "forty-two")]);
        assert_eq!(env.parse_or("GOOD", 10u32), 42);
        assert_eq!(env.parse_or("BAD", 10u32), 10);
        assert_eq!(env.parse_or("MISSING", 7u64), 7);
    }

    #[test]
    fn test_from_process_matches_std_env() {
        let env = Env::from_process();
        for (key, value) in std::env::vars() {
            assert_eq!(env.get(&key), Some(value.as_str()));
        }
    }
}
