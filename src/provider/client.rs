//! Lazily built producer and consumer clients.

use crate::core::{ArcAdapter, CloseFailure, ConstructionResult, Env};
use crate::failover::FailoverConfig;
use crate::provider::chain::ChainBuilder;

use tokio::sync::OnceCell;

/// Environment variable naming the produce chain.
pub const PRODUCE_CLIENT_VAR: &str = "PRODUCE_CLIENT";

/// Environment variable naming the consume chain.
pub const CONSUME_CLIENT_VAR: &str = "CONSUME_CLIENT";

const DEFAULT_PRODUCE_SPEC: &str = "PULSAR/REDIS";
const DEFAULT_CONSUME_SPEC: &str = "PULSAR";

/// Which chains to build and how they fail over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Chain used for sending, e.g. `"PULSAR/REDIS"`.
    pub produce_spec: String,
    /// Chain used for receiving.
    pub consume_spec: String,
    /// Failover settings shared by both chains.
    pub failover: FailoverConfig,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            produce_spec: DEFAULT_PRODUCE_SPEC.to_string(),
            consume_spec: DEFAULT_CONSUME_SPEC.to_string(),
            failover: FailoverConfig::default(),
        }
    }
}

impl ClientSettings {
    /// Reads `PRODUCE_CLIENT`, `CONSUME_CLIENT` and the failover variables.
    pub fn from_env(env: &Env) -> Self {
        Self {
            produce_spec: env.get_or(PRODUCE_CLIENT_VAR, DEFAULT_PRODUCE_SPEC),
            consume_spec: env.get_or(CONSUME_CLIENT_VAR, DEFAULT_CONSUME_SPEC),
            failover: FailoverConfig::from_env(env),
        }
    }

    /// Sets the produce chain.
    pub fn with_produce_spec(mut self, spec: impl Into<String>) -> Self {
        self.produce_spec = spec.into();
        self
    }

    /// Sets the consume chain.
    pub fn with_consume_spec(mut self, spec: impl Into<String>) -> Self {
        self.consume_spec = spec.into();
        self
    }

    /// Sets the failover configuration.
    pub fn with_failover(mut self, failover: FailoverConfig) -> Self {
        self.failover = failover;
        self
    }
}

/// Hands out the application's producer and consumer clients.
///
/// Each client is built on first request and shared afterwards. The two
/// chains are independent: they have their own adapters and their own
/// failover state even when they name the same backends.
///
/// # Example
///
/// ```rust,ignore
/// use busbridge::provider::ClientProvider;
///
/// let provider = ClientProvider::from_process_env();
/// provider.producer().await?.send("orders", "order-1").await?;
/// let pending = provider.consumer().await?.receive("orders").await?;
/// ```
#[derive(Debug)]
pub struct ClientProvider {
    settings: ClientSettings,
    env: Env,
    builder: ChainBuilder,
    producer: OnceCell<ArcAdapter>,
    consumer: OnceCell<ArcAdapter>,
}

impl ClientProvider {
    /// Creates a provider with explicit settings.
    pub fn new(settings: ClientSettings, env: Env, builder: ChainBuilder) -> Self {
        Self {
            settings,
            env,
            builder,
            producer: OnceCell::new(),
            consumer: OnceCell::new(),
        }
    }

    /// Creates a provider whose settings come from `env`.
    pub fn from_env(env: Env, builder: ChainBuilder) -> Self {
        Self::new(ClientSettings::from_env(&env), env, builder)
    }

    /// Creates a provider from the process environment and every backend
    /// compiled into this build.
    pub fn from_process_env() -> Self {
        Self::from_env(Env::from_process(), ChainBuilder::default())
    }

    /// Returns the settings.
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Returns the produce client, building it on first use.
    ///
    /// A failed build is not cached; the next call tries again.
    pub async fn producer(&self) -> ConstructionResult<ArcAdapter> {
        self.producer
            .get_or_try_init(|| self.build("produce", &self.settings.produce_spec))
            .await
            .cloned()
    }

    /// Returns the consume client, building it on first use.
    pub async fn consumer(&self) -> ConstructionResult<ArcAdapter> {
        self.consumer
            .get_or_try_init(|| self.build("consume", &self.settings.consume_spec))
            .await
            .cloned()
    }

    /// Closes whichever clients have been built.
    pub async fn close(&self) -> Vec<CloseFailure> {
        let mut failures = Vec::new();

        for client in [self.producer.get(), self.consumer.get()].into_iter().flatten() {
            if let Err(error) = client.close().await {
                tracing::warn!(client = client.name(), error = %error, "Failed to close client");
                failures.push(CloseFailure {
                    backend: client.name().to_string(),
                    error,
                });
            }
        }

        failures
    }

    async fn build(&self, role: &str, spec: &str) -> ConstructionResult<ArcAdapter> {
        tracing::info!(role = %role, spec = %spec, "Building client");
        self.builder
            .build_client(spec, &self.env, self.settings.failover.clone())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockAdapter;
    use crate::core::BackendKind;
    use crate::failover::MAX_ATTEMPTS_VAR;
    use crate::provider::AdapterFactory;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn mock_builder(builds: Arc<AtomicUsize>) -> ChainBuilder {
        let mut factory = AdapterFactory::empty();
        for kind in BackendKind::ALL {
            let builds = builds.clone();
            factory = factory.with_constructor(kind, move |_| {
                builds.fetch_add(1, Ordering::SeqCst);
                async move {
                    Ok(Arc::new(MockAdapter::new().with_name(kind.as_str())) as ArcAdapter)
                }
            });
        }
        ChainBuilder::new(factory)
    }

    #[test]
    fn test_settings_defaults() {
        let settings = ClientSettings::from_env(&Env::new());
        assert_eq!(settings, ClientSettings::default());
        assert_eq!(settings.produce_spec, "PULSAR/REDIS");
        assert_eq!(settings.consume_spec, "PULSAR");
    }

    #[test]
    fn test_settings_from_env() {
        let env = Env::from_pairs([
            (PRODUCE_CLIENT_VAR, "kafka/redis"),
            (CONSUME_CLIENT_VAR, "redis"),
            (MAX_ATTEMPTS_VAR, "4"),
        ]);
        let settings = ClientSettings::from_env(&env);
        assert_eq!(settings.produce_spec, "kafka/redis");
        assert_eq!(settings.consume_spec, "redis");
        assert_eq!(settings.failover.max_attempts, 4);
    }

    #[tokio::test]
    async fn test_clients_are_built_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let provider = ClientProvider::new(
            ClientSettings::default(),
            Env::new(),
            mock_builder(builds.clone()),
        );

        let first = provider.producer().await.unwrap();
        let second = provider.producer().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "failover(PULSAR/REDIS)");
        assert_eq!(builds.load(Ordering::SeqCst), 2);

        let consumer = provider.consumer().await.unwrap();
        assert_eq!(consumer.name(), "PULSAR");
        assert_eq!(builds.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalid_spec_is_not_cached() {
        let builds = Arc::new(AtomicUsize::new(0));
        let env = Env::from_pairs([(CONSUME_CLIENT_VAR, "anything")]);
        let provider = ClientProvider::from_env(env, mock_builder(builds));

        assert!(provider.consumer().await.is_err());
        assert!(provider.consumer().await.is_err());
    }

    #[tokio::test]
    async fn test_close_only_touches_built_clients() {
        let builds = Arc::new(AtomicUsize::new(0));
        let provider = ClientProvider::new(
            ClientSettings::default().with_consume_spec("REDIS"),
            Env::new(),
            mock_builder(builds),
        );

        assert!(provider.close().await.is_empty());
        provider.consumer().await.unwrap();
        assert!(provider.close().await.is_empty());
    }

    #[tokio::test]
    async fn test_failover_settings_reach_the_coordinator() {
        let kafka = Arc::new(MockAdapter::new_failing().with_name("kafka"));
        let redis = Arc::new(MockAdapter::new().with_name("redis"));
        let shared = kafka.clone();
        let fallback = redis.clone();
        let factory = AdapterFactory::empty()
            .with_constructor(BackendKind::Kafka, move |_| {
                let adapter = shared.clone() as ArcAdapter;
                async move { Ok(adapter) }
            })
            .with_constructor(BackendKind::Redis, move |_| {
                let adapter = fallback.clone() as ArcAdapter;
                async move { Ok(adapter) }
            });

        let settings = ClientSettings::default()
            .with_produce_spec("kafka/redis")
            .with_failover(FailoverConfig::new().with_max_attempts(3));
        let provider = ClientProvider::new(settings, Env::new(), ChainBuilder::new(factory));
        assert_eq!(provider.settings().failover.max_attempts, 3);

        let producer = provider.producer().await.unwrap();
        producer.send("orders", "order-1").await.unwrap();
        assert_eq!(kafka.send_count(), 3);
        assert_eq!(redis.send_count(), 1);
    }
}
