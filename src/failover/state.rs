//! Failover state machine.
//!
//! All transitions are methods on [`FailoverState`] taking the current time
//! explicitly, so the coordinator can hold the state behind a lock only for
//! the duration of a transition and tests can drive it with synthetic
//! instants.
//!
//! ```text
//! enter:    level == N                        → level 0 (restart after exhaustion)
//!           level > 0, idle > reset interval  → level 0 (time-based recovery)
//! success:  attempts := 1
//! failure:  attempts < max                    → attempts + 1, same level
//!           attempts == max                   → attempts := 1, level + 1
//!           level + 1 == N                    → exhausted
//! ```

use crate::failover::config::FailoverConfig;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Mutable failover position of one coordinator.
#[derive(Debug, Clone)]
pub struct FailoverState {
    /// Index of the adapter in use. Equals the chain length only between an
    /// exhausted call and the next entry.
    level: usize,
    /// Consecutive failures against `level`, starting at 1.
    attempts: u32,
    /// When `level` last moved up. `None` while on the primary.
    level_changed_at: Option<Instant>,
}

/// Why a call started from the primary instead of the stored level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// The previous call exhausted the whole chain.
    AfterExhaustion,
    /// The reset interval elapsed while on a fallback level.
    IntervalElapsed {
        /// Level the coordinator was on.
        from: usize,
        /// Time spent on that level.
        elapsed: Duration,
    },
}

/// Result of entering a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Level the call starts at.
    pub level: usize,
    /// Set when entry moved the state back to the primary.
    pub reset: Option<ResetReason>,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Try `level` again.
    Retry {
        /// Level to invoke next.
        level: usize,
        /// Attempt number the next invocation represents.
        attempt: u32,
    },
    /// The budget at `from` is spent; continue with `to`.
    Escalate {
        /// Level that exhausted its budget.
        from: usize,
        /// Next level to invoke.
        to: usize,
    },
    /// Every level has spent its budget.
    Exhausted,
}

impl FailoverState {
    /// Creates the initial state: primary level, first attempt.
    pub fn new() -> Self {
        Self {
            level: 0,
            attempts: 1,
            level_changed_at: None,
        }
    }

    /// Returns the current level.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Returns the current attempt number.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns when the level last moved away from the primary.
    pub fn level_changed_at(&self) -> Option<Instant> {
        self.level_changed_at
    }

    /// Returns `true` if the last call exhausted the chain.
    pub fn is_exhausted(&self, chain_len: usize) -> bool {
        self.level >= chain_len
    }

    /// Prepares the state for a new call and returns the level to start at.
    pub fn enter(&mut self, now: Instant, config: &FailoverConfig, chain_len: usize) -> Entry {
        if self.level >= chain_len {
            self.reset();
            return Entry {
                level: 0,
                reset: Some(ResetReason::AfterExhaustion),
            };
        }

        if self.level > 0 {
            if let Some(changed_at) = self.level_changed_at {
                let elapsed = now.saturating_duration_since(changed_at);
                if elapsed > config.level_reset_interval {
                    let from = self.level;
                    self.reset();
                    return Entry {
                        level: 0,
                        reset: Some(ResetReason::IntervalElapsed { from, elapsed }),
                    };
                }
            }
        }

        Entry {
            level: self.level,
            reset: None,
        }
    }

    /// Records a successful attempt against `attempted`.
    pub fn record_success(&mut self, attempted: usize) {
        if self.level == attempted {
            self.attempts = 1;
        }
    }

    /// Records a failed attempt against `attempted` and decides the next step.
    ///
    /// A failure against a level the state has already left (another caller
    /// escalated or recovered in the meantime) is not counted; the call just
    /// continues at the current level.
    pub fn record_failure(
        &mut self,
        attempted: usize,
        now: Instant,
        config: &FailoverConfig,
        chain_len: usize,
    ) -> Step {
        if self.level >= chain_len {
            return Step::Exhausted;
        }

        if self.level != attempted {
            return Step::Retry {
                level: self.level,
                attempt: self.attempts,
            };
        }

        if self.attempts < config.max_attempts {
            self.attempts += 1;
            return Step::Retry {
                level: self.level,
                attempt: self.attempts,
            };
        }

        self.attempts = 1;
        self.level += 1;
        self.level_changed_at = Some(now);

        if self.level >= chain_len {
            Step::Exhausted
        } else {
            Step::Escalate {
                from: attempted,
                to: self.level,
            }
        }
    }

    /// Returns a copy of the observable state.
    pub fn snapshot(&self, now: Instant) -> FailoverSnapshot {
        FailoverSnapshot {
            level: self.level,
            attempts: self.attempts,
            time_on_level: self
                .level_changed_at
                .map(|at| now.saturating_duration_since(at)),
        }
    }

    fn reset(&mut self) {
        self.level = 0;
        self.attempts = 1;
        self.level_changed_at = None;
    }
}

impl Default for FailoverState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a coordinator's failover position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverSnapshot {
    /// Current level.
    pub level: usize,
    /// Current attempt number.
    pub attempts: u32,
    /// Time since the level last moved up, while off the primary.
    pub time_on_level: Option<Duration>,
}

/// Counters describing coordinator behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailoverMetrics {
    /// Calls made to the coordinator.
    pub total_calls: u64,
    /// Calls that returned a result.
    pub successful_calls: u64,
    /// Individual adapter attempts that failed.
    pub failed_attempts: u64,
    /// Times a level spent its budget and the next one was tried.
    pub escalations: u64,
    /// Calls that ran out of backends.
    pub exhaustions: u64,
    /// Times the coordinator went back to the primary on entry.
    pub resets: u64,
}

impl FailoverMetrics {
    /// Creates new empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the start of a call.
    pub fn record_call(&mut self) {
        self.total_calls += 1;
    }

    /// Records a call that returned a result.
    pub fn record_success(&mut self) {
        self.successful_calls += 1;
    }

    /// Records one failed adapter attempt.
    pub fn record_failed_attempt(&mut self) {
        self.failed_attempts += 1;
    }

    /// Records an escalation to the next level.
    pub fn record_escalation(&mut self) {
        self.escalations += 1;
    }

    /// Records a call that exhausted the chain.
    pub fn record_exhaustion(&mut self) {
        self.exhaustions += 1;
    }

    /// Records a reset to the primary.
    pub fn record_reset(&mut self) {
        self.resets += 1;
    }

    /// Returns the fraction of calls that succeeded (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 1.0;
        }
        self.successful_calls as f64 / self.total_calls as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_attempts: u32) -> FailoverConfig {
        FailoverConfig::new()
            .with_max_attempts(max_attempts)
            .with_level_reset_interval(Duration::from_secs(10))
    }

    #[test]
    fn test_initial_state() {
        let state = FailoverState::default();
        assert_eq!(state.level(), 0);
        assert_eq!(state.attempts(), 1);
        assert!(state.level_changed_at().is_none());
    }

    #[test]
    fn test_failures_retry_then_escalate() {
        let cfg = config(3);
        let now = Instant::now();
        let mut state = FailoverState::new();

        assert_eq!(
            state.record_failure(0, now, &cfg, 2),
            Step::Retry { level: 0, attempt: 2 }
        );
        assert_eq!(
            state.record_failure(0, now, &cfg, 2),
            Step::Retry { level: 0, attempt: 3 }
        );
        assert_eq!(
            state.record_failure(0, now, &cfg, 2),
            Step::Escalate { from: 0, to: 1 }
        );
        assert_eq!(state.level(), 1);
        assert_eq!(state.attempts(), 1);
        assert_eq!(state.level_changed_at(), Some(now));
    }

    #[test]
    fn test_last_level_exhausts() {
        let cfg = config(1);
        let now = Instant::now();
        let mut state = FailoverState::new();

        assert_eq!(
            state.record_failure(0, now, &cfg, 2),
            Step::Escalate { from: 0, to: 1 }
        );
        assert_eq!(state.record_failure(1, now, &cfg, 2), Step::Exhausted);
        assert!(state.is_exhausted(2));
        assert_eq!(state.level(), 2);
    }

    #[test]
    fn test_enter_after_exhaustion_restarts_at_primary() {
        let cfg = config(1);
        let now = Instant::now();
        let mut state = FailoverState::new();
        state.record_failure(0, now, &cfg, 1);
        assert!(state.is_exhausted(1));

        let entry = state.enter(now, &cfg, 1);
        assert_eq!(entry.level, 0);
        assert_eq!(entry.reset, Some(ResetReason::AfterExhaustion));
        assert_eq!(state.attempts(), 1);
        assert!(state.level_changed_at().is_none());
    }

    #[test]
    fn test_success_resets_attempts_and_keeps_level() {
        let cfg = config(5);
        let now = Instant::now();
        let mut state = FailoverState::new();
        state.record_failure(0, now, &cfg, 2);
        state.record_failure(0, now, &cfg, 2);
        assert_eq!(state.attempts(), 3);

        state.record_success(0);
        assert_eq!(state.level(), 0);
        assert_eq!(state.attempts(), 1);
    }

    #[test]
    fn test_enter_recovers_after_interval() {
        let cfg = config(1);
        let start = Instant::now();
        let mut state = FailoverState::new();
        state.record_failure(0, start, &cfg, 3);
        assert_eq!(state.level(), 1);

        // Exactly at the interval: not yet.
        let entry = state.enter(start + Duration::from_secs(10), &cfg, 3);
        assert_eq!(entry, Entry { level: 1, reset: None });

        let later = start + Duration::from_secs(11);
        let entry = state.enter(later, &cfg, 3);
        assert_eq!(entry.level, 0);
        assert_eq!(
            entry.reset,
            Some(ResetReason::IntervalElapsed {
                from: 1,
                elapsed: Duration::from_secs(11),
            })
        );
        assert_eq!(state.level(), 0);
    }

    #[test]
    fn test_enter_on_primary_never_resets() {
        let cfg = config(10);
        let mut state = FailoverState::new();
        let entry = state.enter(Instant::now() + Duration::from_secs(3600), &cfg, 2);
        assert_eq!(entry, Entry { level: 0, reset: None });
    }

    #[test]
    fn test_stale_failure_is_not_counted() {
        let cfg = config(2);
        let now = Instant::now();
        let mut state = FailoverState::new();
        state.record_failure(0, now, &cfg, 3);
        state.record_failure(0, now, &cfg, 3);
        assert_eq!(state.level(), 1);

        // A slower caller reports a failure from level 0.
        assert_eq!(
            state.record_failure(0, now, &cfg, 3),
            Step::Retry { level: 1, attempt: 1 }
        );
        assert_eq!(state.attempts(), 1);

        // A late success from level 0 does not touch level 1's counter.
        state.record_failure(1, now, &cfg, 3);
        state.record_success(0);
        assert_eq!(state.attempts(), 2);
    }

    #[test]
    fn test_snapshot() {
        let cfg = config(1);
        let start = Instant::now();
        let mut state = FailoverState::new();
        assert_eq!(state.snapshot(start).time_on_level, None);

        state.record_failure(0, start, &cfg, 2);
        let snapshot = state.snapshot(start + Duration::from_millis(40));
        assert_eq!(snapshot.level, 1);
        assert_eq!(snapshot.attempts, 1);
        assert_eq!(snapshot.time_on_level, Some(Duration::from_millis(40)));
    }

    #[test]
    fn test_metrics() {
        let mut metrics = FailoverMetrics::new();
        assert_eq!(metrics.success_rate(), 1.0);

        metrics.record_call();
        metrics.record_success();
        metrics.record_call();
        metrics.record_failed_attempt();
        metrics.record_exhaustion();

        assert_eq!(metrics.total_calls, 2);
        assert_eq!(metrics.exhaustions, 1);
        assert!((metrics.success_rate() - 0.5).abs() < f64::EPSILON);
    }
}
