// SPDX-License-Identifier: Apache-2.0

//! Extractor Registry
//!
//! Resolves the extractor responsible for a data source's engine.
//! Extractors are consulted in registration order; the first one that
//! supports the engine wins.

use std::sync::Arc;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{DataSource, EngineType};

use super::extractor::{MetadataExtractor, MySqlExtractor, PostgresExtractor};
use super::retry::RetryPolicy;

/// Ordered set of available metadata extractors
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn MetadataExtractor>>,
}

impl ExtractorRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Registry with the built-in MySQL and PostgreSQL extractors
    pub fn with_defaults(retry: RetryPolicy) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MySqlExtractor::new(retry)));
        registry.register(Arc::new(PostgresExtractor::new(retry)));
        registry
    }

    /// Appends an extractor. Earlier registrations take precedence.
    pub fn register(&mut self, extractor: Arc<dyn MetadataExtractor>) {
        self.extractors.push(extractor);
    }

    pub fn resolve_engine(&self, engine: EngineType) -> EngineResult<Arc<dyn MetadataExtractor>> {
        self.extractors
            .iter()
            .find(|e| e.supports(engine))
            .cloned()
            .ok_or_else(|| EngineError::unsupported_engine(engine.as_str()))
    }

    /// Picks the extractor for a data source's engine
    pub fn resolve(&self, source: &DataSource) -> EngineResult<Arc<dyn MetadataExtractor>> {
        self.resolve_engine(source.engine)
    }

    /// Lists registered extractor IDs in precedence order
    pub fn list(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.extractor_id()).collect()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults(RetryPolicy::default())
    }
}
