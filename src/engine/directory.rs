// SPDX-License-Identifier: Apache-2.0

//! In-memory data-source directory
//!
//! Backs the [`DataSourceDirectory`] trait with a map keyed by data-source
//! id. Registration replaces any previous entry with the same id.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::DataSourceDirectory;
use crate::engine::types::DataSource;

#[derive(Default)]
pub struct InMemoryDirectory {
    sources: RwLock<HashMap<String, DataSource>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, source: DataSource) {
        self.sources.write().insert(source.id.clone(), source);
    }

    pub fn remove(&self, data_source_id: &str) -> Option<DataSource> {
        self.sources.write().remove(data_source_id)
    }

    pub fn len(&self) -> usize {
        self.sources.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.read().is_empty()
    }
}

#[async_trait]
impl DataSourceDirectory for InMemoryDirectory {
    async fn get(&self, data_source_id: &str) -> EngineResult<DataSource> {
        self.sources
            .read()
            .get(data_source_id)
            .cloned()
            .ok_or_else(|| EngineError::data_source_not_found(data_source_id))
    }
}
