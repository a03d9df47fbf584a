//! Ordered, non-empty list of adapters.

use crate::core::{ArcAdapter, ConstructionError, ConstructionResult};

use std::fmt;
use std::ops::Index;

/// Adapters in failover priority order. Index 0 is the primary.
///
/// A chain always holds at least one adapter and never changes after
/// construction.
#[derive(Clone)]
pub struct AdapterChain {
    adapters: Vec<ArcAdapter>,
}

impl AdapterChain {
    /// Creates a chain, rejecting an empty list.
    pub fn new(adapters: Vec<ArcAdapter>) -> ConstructionResult<Self> {
        if adapters.is_empty() {
            return Err(ConstructionError::EmptyChain);
        }
        Ok(Self { adapters })
    }

    /// Creates a chain holding one adapter.
    pub fn single(adapter: ArcAdapter) -> Self {
        Self {
            adapters: vec![adapter],
        }
    }

    /// Returns the number of adapters; always at least 1.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Always `false`; present for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the adapter at `level`.
    pub fn get(&self, level: usize) -> Option<&ArcAdapter> {
        self.adapters.get(level)
    }

    /// Returns the primary adapter.
    pub fn primary(&self) -> &ArcAdapter {
        &self.adapters[0]
    }

    /// Iterates over the adapters in priority order.
    pub fn iter(&self) -> std::slice::Iter<'_, ArcAdapter> {
        self.adapters.iter()
    }

    /// Returns the adapter names in priority order.
    pub fn names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }

    /// Unwraps the chain into its adapters.
    pub fn into_inner(self) -> Vec<ArcAdapter> {
        self.adapters
    }
}

impl Index<usize> for AdapterChain {
    type Output = ArcAdapter;

    fn index(&self, level: usize) -> &Self::Output {
        &self.adapters[level]
    }
}

impl<'a> IntoIterator for &'a AdapterChain {
    type Item = &'a ArcAdapter;
    type IntoIter = std::slice::Iter<'a, ArcAdapter>;

    fn into_iter(self) -> Self::IntoIter {
        self.adapters.iter()
    }
}

impl fmt::Debug for AdapterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
