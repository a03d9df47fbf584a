//! Construction of single adapters from a backend kind.

use crate::core::{ArcAdapter, BackendKind, ConstructionError, ConstructionResult, Env};

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds one adapter from an environment snapshot.
pub type AdapterConstructor =
    Arc<dyn Fn(Env) -> BoxFuture<'static, ConstructionResult<ArcAdapter>> + Send + Sync>;

/// Maps each [`BackendKind`] to the constructor of its adapter.
///
/// `AdapterFactory::new()` knows every backend compiled into this build.
/// Tests and embedders can override any entry with
/// [`with_constructor`](Self::with_constructor).
///
/// # Example
///
/// ```rust
/// use busbridge::backends::MockAdapter;
/// use busbridge::core::{ArcAdapter, BackendKind};
/// use busbridge::provider::AdapterFactory;
/// use std::sync::Arc;
///
/// let factory = AdapterFactory::empty().with_constructor(BackendKind::Kafka, |_env| async {
///     Ok(Arc::new(MockAdapter::new().with_name("kafka")) as ArcAdapter)
/// });
/// assert!(factory.supports(BackendKind::Kafka));
/// ```
#[derive(Clone)]
pub struct AdapterFactory {
    constructors: HashMap<BackendKind, AdapterConstructor>,
}

impl AdapterFactory {
    /// Creates a factory for every backend enabled in this build.
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut factory = Self::empty();

        #[cfg(feature = "redis")]
        {
            factory = factory.with_constructor(BackendKind::Redis, |env| async move {
                use crate::backends::{RedisAdapter, RedisConfig};
                let adapter = RedisAdapter::new(RedisConfig::from_env(&env))?;
                Ok(Arc::new(adapter) as ArcAdapter)
            });
        }

        #[cfg(feature = "kafka")]
        {
            factory = factory.with_constructor(BackendKind::Kafka, |env| async move {
                use crate::backends::{KafkaAdapter, KafkaConfig};
                let adapter = KafkaAdapter::new(KafkaConfig::from_env(&env))?;
                Ok(Arc::new(adapter) as ArcAdapter)
            });
        }

        #[cfg(feature = "pulsar")]
        {
            factory = factory.with_constructor(BackendKind::Pulsar, |env| async move {
                use crate::backends::{PulsarAdapter, PulsarConfig};
                Ok(Arc::new(PulsarAdapter::new(PulsarConfig::from_env(&env))) as ArcAdapter)
            });
        }

        #[cfg(feature = "rabbitmq")]
        {
            factory = factory.with_constructor(BackendKind::RabbitMq, |env| async move {
                use crate::backends::{RabbitMqAdapter, RabbitMqConfig};
                Ok(Arc::new(RabbitMqAdapter::new(RabbitMqConfig::from_env(&env))) as ArcAdapter)
            });
        }

        factory
    }

    /// Creates a factory with no constructors registered.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers `constructor` for `kind`, replacing any previous one.
    pub fn with_constructor<F, Fut>(mut self, kind: BackendKind, constructor: F) -> Self
    where
        F: Fn(Env) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ConstructionResult<ArcAdapter>> + Send + 'static,
    {
        let constructor: AdapterConstructor = Arc::new(move |env| constructor(env).boxed());
        self.constructors.insert(kind, constructor);
        self
    }

    /// Returns `true` if `kind` can be built by this factory.
    pub fn supports(&self, kind: BackendKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Returns the kinds this factory can build, in declaration order.
    pub fn supported(&self) -> Vec<BackendKind> {
        BackendKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.supports(*kind))
            .collect()
    }

    /// Builds the adapter for `kind`.
    pub async fn build(&self, kind: BackendKind, env: &Env) -> ConstructionResult<ArcAdapter> {
        let Some(constructor) = self.constructors.get(&kind) else {
            if !kind.is_enabled() {
                return Err(ConstructionError::BackendDisabled {
                    backend: kind,
                    feature: kind.feature(),
                });
            }
            return Err(ConstructionError::client_init(
                kind,
                "no constructor registered",
            ));
        };

        let adapter = constructor(env.clone()).await.map_err(|e| {
            tracing::error!(backend = %kind, error = %e, "Failed to create adapter");
            e
        })?;

        tracing::info!(backend = %kind, adapter = adapter.name(), "Created adapter");
        Ok(adapter)
    }

    /// Parses `name` and builds the matching adapter.
    pub async fn build_named(&self, name: &str, env: &Env) -> ConstructionResult<ArcAdapter> {
        let kind: BackendKind = name.parse()?;
        self.build(kind, env).await
    }
}

impl Default for AdapterFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AdapterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterFactory")
            .field("supported", &self.supported())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockAdapter;

    fn mock_factory() -> AdapterFactory {
        AdapterFactory::empty()
            .with_constructor(BackendKind::Kafka, |_| async {
                Ok(Arc::new(MockAdapter::new().with_name("kafka")) as ArcAdapter)
            })
            .with_constructor(BackendKind::Redis, |env: Env| async move {
                let name = env.get_or("MOCK_NAME", "redis");
                Ok(Arc::new(MockAdapter::new().with_name(name)) as ArcAdapter)
            })
    }

    #[tokio::test]
    async fn test_build_registered_kind() {
        let factory = mock_factory();
        let adapter = factory.build(BackendKind::Kafka, &Env::new()).await.unwrap();
        assert_eq!(adapter.name(), "kafka");
    }

    #[tokio::test]
    async fn test_constructor_sees_env() {
        let factory = mock_factory();
        let env = Env::from_pairs([("MOCK_NAME", "redis-eu")]);
        let adapter = factory.build(BackendKind::Redis, &env).await.unwrap();
        assert_eq!(adapter.name(), "redis-eu");
    }

    #[tokio::test]
    async fn test_build_named_is_case_insensitive() {
        let factory = mock_factory();
        let adapter = factory.build_named(" kafka ", &Env::new()).await.unwrap();
        assert_eq!(adapter.name(), "kafka");
    }

    #[tokio::test]
    async fn test_unknown_name_is_rejected() {
        let err = mock_factory()
            .build_named("mqtt", &Env::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConstructionError::UnknownBackend { ref value } if value == "mqtt"));
    }

    #[tokio::test]
    async fn test_unregistered_kind_fails() {
        let err = AdapterFactory::empty()
            .build(BackendKind::Pulsar, &Env::new())
            .await
            .unwrap_err();
        assert_eq!(err.backend(), Some(BackendKind::Pulsar));
        if cfg!(feature = "pulsar") {
            assert!(matches!(err, ConstructionError::ClientInit { .. }));
        } else {
            assert!(matches!(
                err,
                ConstructionError::BackendDisabled { feature: "pulsar", .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_constructor_error_propagates() {
        let factory = AdapterFactory::empty().with_constructor(BackendKind::Redis, |_| async {
            Err(ConstructionError::client_init(BackendKind::Redis, "bad url"))
        });
        let err = factory.build(BackendKind::Redis, &Env::new()).await.unwrap_err();
        assert!(err.to_string().contains("bad url"));
    }

    #[test]
    fn test_default_factory_matches_features() {
        let factory = AdapterFactory::new();
        for kind in BackendKind::ALL {
            assert_eq!(factory.supports(kind), kind.is_enabled());
        }
    }

    #[cfg(feature = "redis")]
    #[tokio::test]
    async fn test_default_factory_builds_redis_lazily() {
        let adapter = AdapterFactory::new()
            .build(BackendKind::Redis, &Env::new())
            .await
            .unwrap();
        assert_eq!(adapter.name(), "redis");
    }
}
