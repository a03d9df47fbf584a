//! Building adapter chains from `/`-separated specifications.

use crate::core::{ArcAdapter, BackendKind, ConstructionError, ConstructionResult, Env};
use crate::failover::{AdapterChain, FailoverConfig, FailoverCoordinator};
use crate::provider::factory::AdapterFactory;

use std::sync::Arc;

/// Turns a specification such as `"PULSAR/REDIS"` into adapters.
///
/// The first backend in the specification is the primary; the rest are
/// fallbacks in order.
///
/// # Example
///
/// ```rust,ignore
/// use busbridge::core::Env;
/// use busbridge::failover::FailoverConfig;
/// use busbridge::provider::ChainBuilder;
///
/// let builder = ChainBuilder::default();
/// let client = builder
///     .build_client("KAFKA/REDIS", &Env::from_process(), FailoverConfig::default())
///     .await?;
/// client.send("orders", "order-1").await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChainBuilder {
    factory: AdapterFactory,
}

impl ChainBuilder {
    /// Creates a builder that uses `factory` for each backend.
    pub fn new(factory: AdapterFactory) -> Self {
        Self { factory }
    }

    /// Returns the factory.
    pub fn factory(&self) -> &AdapterFactory {
        &self.factory
    }

    /// Parses a specification into backend kinds, in priority order.
    ///
    /// ```rust
    /// use busbridge::core::BackendKind;
    /// use busbridge::provider::ChainBuilder;
    ///
    /// let kinds = ChainBuilder::parse("pulsar / Redis").unwrap();
    /// assert_eq!(kinds, vec![BackendKind::Pulsar, BackendKind::Redis]);
    /// assert!(ChainBuilder::parse("PULSAR//REDIS").is_err());
    /// ```
    pub fn parse(spec: &str) -> ConstructionResult<Vec<BackendKind>> {
        if spec.trim().is_empty() {
            return Err(ConstructionError::EmptyChain);
        }

        spec.split('/')
            .enumerate()
            .map(|(position, segment)| {
                let segment = segment.trim();
                if segment.is_empty() {
                    return Err(ConstructionError::EmptySegment {
                        spec: spec.to_string(),
                        position,
                    });
                }
                segment.parse()
            })
            .collect()
    }

    /// Builds every adapter named by `spec`, in order.
    ///
    /// If any backend fails to build, the adapters already built for this
    /// specification are closed and the error is returned.
    pub async fn build(&self, spec: &str, env: &Env) -> ConstructionResult<AdapterChain> {
        let kinds = Self::parse(spec)?;
        let mut adapters: Vec<ArcAdapter> = Vec::with_capacity(kinds.len());

        for kind in kinds {
            match self.factory.build(kind, env).await {
                Ok(adapter) => adapters.push(adapter),
                Err(e) => {
                    tracing::error!(
                        spec = %spec,
                        backend = %kind,
                        built = adapters.len(),
                        error = %e,
                        "Failed to build backend chain"
                    );
                    close_all(&adapters).await;
                    return Err(e);
                }
            }
        }

        let chain = AdapterChain::new(adapters)?;
        tracing::info!(spec = %spec, chain = ?chain, "Built backend chain");
        Ok(chain)
    }

    /// Builds a client for `spec`.
    ///
    /// A single backend is returned as-is; two or more are wrapped in a
    /// [`FailoverCoordinator`] configured with `config`.
    pub async fn build_client(
        &self,
        spec: &str,
        env: &Env,
        config: FailoverConfig,
    ) -> ConstructionResult<ArcAdapter> {
        let chain = self.build(spec, env).await?;

        if chain.len() == 1 {
            return Ok(chain.primary().clone());
        }
        Ok(Arc::new(FailoverCoordinator::new(chain, config)))
    }
}

async fn close_all(adapters: &[ArcAdapter]) {
    for adapter in adapters {
        if let Err(e) = adapter.close().await {
            tracing::warn!(
                backend = adapter.name(),
                error = %e,
                "Failed to close adapter after chain construction failed"
            );
        }
    }
}
