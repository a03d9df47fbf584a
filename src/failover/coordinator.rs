//! Failover coordinator implementation.

use crate::audit::{self, FailoverAuditEvent};
use crate::core::{
    ArcAdapter, CloseFailure, ExhaustedError, Operation, TransportAdapter, TransportError,
    TransportResult,
};
use crate::failover::chain::AdapterChain;
use crate::failover::config::FailoverConfig;
use crate::failover::state::{FailoverMetrics, FailoverSnapshot, FailoverState, Step};

use async_trait::async_trait;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use uuid::Uuid;

const AUDIT_LOG_CAPACITY: usize = 32;

/// A transport that spreads calls over an ordered chain of adapters.
///
/// Every call starts at the current level. Failures are retried against the
/// same adapter until the attempt budget is spent, then the next adapter in
/// the chain takes over within the same call. After the level reset interval
/// the primary is probed again.
///
/// State is shared by every topic and every caller of one coordinator. It
/// lives behind a mutex that is never held while an adapter is awaited.
///
/// # Example
///
/// ```rust,ignore
/// use busbridge::backends::MockAdapter;
/// use busbridge::failover::{AdapterChain, FailoverConfig, FailoverCoordinator};
/// use std::sync::Arc;
///
/// let chain = AdapterChain::new(vec![
///     Arc::new(MockAdapter::new().with_name("primary")),
///     Arc::new(MockAdapter::new().with_name("fallback")),
/// ])?;
/// let coordinator = FailoverCoordinator::new(chain, FailoverConfig::default());
///
/// coordinator.send("orders", "order-1").await?;
/// ```
pub struct FailoverCoordinator {
    /// Identifier used to correlate log lines.
    id: Uuid,
    /// Adapters in priority order.
    chain: AdapterChain,
    /// Name reported through `TransportAdapter::name`.
    name: String,
    /// Configuration.
    config: FailoverConfig,
    /// Current level and attempt counter.
    state: Mutex<FailoverState>,
    /// Metrics.
    metrics: Mutex<FailoverMetrics>,
    /// Most recent audit events, oldest first.
    audit_log: Mutex<VecDeque<FailoverAuditEvent>>,
}

impl FailoverCoordinator {
    /// Creates a coordinator over `chain`.
    ///
    /// A `max_attempts` of 0 is raised to 1.
    pub fn new(chain: AdapterChain, mut config: FailoverConfig) -> Self {
        if config.max_attempts == 0 {
            tracing::warn!("Attempt budget must be at least 1, using 1");
            config.max_attempts = 1;
        }

        let name = format!("failover({})", chain.names().join("/"));
        let id = Uuid::new_v4();

        tracing::debug!(
            coordinator_id = %id,
            chain = ?chain,
            max_attempts = config.max_attempts,
            level_reset_ms = config.level_reset_interval.as_millis() as u64,
            "Created failover coordinator"
        );

        Self {
            id,
            chain,
            name,
            config,
            state: Mutex::new(FailoverState::new()),
            metrics: Mutex::new(FailoverMetrics::new()),
            audit_log: Mutex::new(VecDeque::with_capacity(AUDIT_LOG_CAPACITY)),
        }
    }

    /// Creates a coordinator with default configuration.
    pub fn with_defaults(chain: AdapterChain) -> Self {
        Self::new(chain, FailoverConfig::default())
    }

    /// Returns the identifier used in log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the chain of adapters.
    pub fn chain(&self) -> &AdapterChain {
        &self.chain
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    /// Returns the current level.
    pub fn level(&self) -> usize {
        self.lock_state().level()
    }

    /// Returns the current attempt number.
    pub fn attempts(&self) -> u32 {
        self.lock_state().attempts()
    }

    /// Returns a copy of the current failover position.
    pub fn snapshot(&self) -> FailoverSnapshot {
        self.lock_state().snapshot(now())
    }

    /// Returns a copy of the current metrics.
    pub fn metrics(&self) -> FailoverMetrics {
        self.lock_metrics().clone()
    }

    /// Returns the most recent audit events, oldest first.
    pub fn recent_events(&self) -> Vec<FailoverAuditEvent> {
        self.audit_log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Puts the coordinator back on the primary adapter.
    pub fn reset(&self) {
        *self.lock_state() = FailoverState::new();
    }

    /// Sends `payload` to `topic` through the chain.
    pub async fn send(&self, topic: &str, payload: &str) -> Result<(), ExhaustedError> {
        self.run(Operation::Send, topic, |adapter| async move {
            adapter.send(topic, payload).await
        })
        .await
    }

    /// Receives the pending messages of `topic` through the chain.
    pub async fn receive(&self, topic: &str) -> Result<Vec<String>, ExhaustedError> {
        self.run(Operation::Receive, topic, |adapter| async move {
            adapter.receive(topic).await
        })
        .await
    }

    /// Closes every adapter in the chain.
    ///
    /// A failure on one adapter never prevents closing the others; failures
    /// are logged and returned.
    pub async fn shutdown(&self) -> Vec<CloseFailure> {
        let mut failures = Vec::new();

        for adapter in &self.chain {
            match adapter.close().await {
                Ok(()) => {
                    tracing::debug!(
                        coordinator_id = %self.id,
                        backend = adapter.name(),
                        "Closed backend"
                    );
                }
                Err(error) => {
                    let failure = CloseFailure {
                        backend: adapter.name().to_string(),
                        error,
                    };
                    let event = audit::emit_close_failed(&self.id.to_string(), &failure);
                    self.push_event(event);
                    failures.push(failure);
                }
            }
        }

        failures
    }

    /// Runs one call through the state machine.
    async fn run<T, F, Fut>(
        &self,
        operation: Operation,
        topic: &str,
        call: F,
    ) -> Result<T, ExhaustedError>
    where
        F: Fn(ArcAdapter) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let chain_len = self.chain.len();
        self.lock_metrics().record_call();

        let entry = self
            .lock_state()
            .enter(now(), &self.config, chain_len);
        if let Some(reason) = entry.reset {
            self.lock_metrics().record_reset();
            let event = audit::emit_level_reset(
                &self.id.to_string(),
                &reason,
                self.chain.primary().name(),
            );
            self.push_event(event);
        }

        let mut level = entry.level;
        let mut tried = BTreeSet::new();
        let budget = self.config.max_attempts as usize * chain_len;

        for _ in 0..budget {
            let adapter = match self.chain.get(level) {
                Some(adapter) => adapter.clone(),
                None => break,
            };
            tried.insert(level);

            match call(adapter.clone()).await {
                Ok(value) => {
                    self.lock_state().record_success(level);
                    self.lock_metrics().record_success();
                    return Ok(value);
                }
                Err(error) => {
                    self.lock_metrics().record_failed_attempt();
                    let step = self.lock_state().record_failure(
                        level,
                        now(),
                        &self.config,
                        chain_len,
                    );

                    match step {
                        Step::Retry { level: next, attempt } => {
                            tracing::debug!(
                                coordinator_id = %self.id,
                                operation = %operation,
                                topic = %topic,
                                backend = adapter.name(),
                                level,
                                attempt,
                                error = %error,
                                "Attempt failed, retrying"
                            );
                            level = next;
                        }
                        Step::Escalate { from, to } => {
                            tracing::debug!(
                                coordinator_id = %self.id,
                                backend = adapter.name(),
                                error = %error,
                                "Last attempt on level failed"
                            );
                            self.lock_metrics().record_escalation();
                            let event = audit::emit_level_escalated(
                                &self.id.to_string(),
                                operation,
                                topic,
                                (from, adapter.name()),
                                (to, self.chain[to].name()),
                                self.config.max_attempts,
                            );
                            self.push_event(event);
                            level = to;
                        }
                        Step::Exhausted => {
                            tracing::debug!(
                                coordinator_id = %self.id,
                                backend = adapter.name(),
                                error = %error,
                                "Last backend in chain failed"
                            );
                            break;
                        }
                    }
                }
            }
        }

        let error = ExhaustedError {
            operation,
            topic: topic.to_string(),
            backends: tried
                .into_iter()
                .map(|level| self.chain[level].name().to_string())
                .collect(),
            max_attempts: self.config.max_attempts,
        };
        self.lock_metrics().record_exhaustion();
        let event = audit::emit_chain_exhausted(&self.id.to_string(), &error);
        self.push_event(event);
        Err(error)
    }

    fn push_event(&self, event: FailoverAuditEvent) {
        let mut log = self
            .audit_log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if log.len() == AUDIT_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, FailoverState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_metrics(&self) -> MutexGuard<'_, FailoverMetrics> {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Current time on the tokio clock, so paused test time applies.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

impl fmt::Debug for FailoverCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailoverCoordinator")
            .field("id", &self.id)
            .field("chain", &self.chain)
            .field("state", &*self.lock_state())
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl TransportAdapter for FailoverCoordinator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, topic: &str, payload: &str) -> TransportResult<()> {
        FailoverCoordinator::send(self, topic, payload)
            .await
            .map_err(TransportError::from)
    }

    async fn receive(&self, topic: &str) -> TransportResult<Vec<String>> {
        FailoverCoordinator::receive(self, topic)
            .await
            .map_err(TransportError::from)
    }

    async fn health_check(&self) -> TransportResult<()> {
        let level = self.lock_state().level();
        let adapter = self
            .chain
            .get(level)
            .unwrap_or_else(|| self.chain.primary())
            .clone();
        adapter.health_check().await
    }

    async fn close(&self) -> TransportResult<()> {
        let failures = self.shutdown().await;
        if !failures.is_empty() {
            tracing::warn!(
                coordinator_id = %self.id,
                failed = failures.len(),
                total = self.chain.len(),
                "Some backends could not be closed"
            );
        }
        Ok(())
    }
}
