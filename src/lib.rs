// SPDX-License-Identifier: Apache-2.0

// QoreDB Catalog - relational metadata introspection
// Core library

pub mod config;
pub mod engine;
pub mod metadata;
pub mod metrics;
pub mod observability;

#[cfg(test)]
mod test_support;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use config::CatalogConfig;
use engine::{ConnectionProvider, DataSourceDirectory, EngineResult, SqlxConnectionProvider};
use metadata::{ExtractorRegistry, FetchSummary, MetadataFetchService, MetadataStore, TableMetadata};

/// Wires the data-source directory, connection provider, extractors and
/// metadata store into the operations exposed to callers.
pub struct CatalogService {
    config: CatalogConfig,
    fetcher: MetadataFetchService,
}

impl CatalogService {
    /// Loads `catalog.json` from `data_dir`, starts file logging under
    /// `data_dir/logs` with the configured retention, opens the metadata
    /// store and registers the built-in extractors behind SQLx connections.
    pub async fn open(data_dir: &Path, directory: Arc<dyn DataSourceDirectory>) -> EngineResult<Self> {
        let config = CatalogConfig::load(data_dir)?;
        observability::init_tracing(&CatalogConfig::log_dir(data_dir), config.log_retention_days);

        let store = MetadataStore::connect(&config.storage_url(data_dir)).await?;
        let connections = Arc::new(SqlxConnectionProvider::new(config.connect_timeout()));

        info!(data_dir = %data_dir.display(), "Catalog service ready");
        Ok(Self::with_parts(config, directory, connections, store))
    }

    /// Builds a service from explicit collaborators.
    pub fn with_parts(
        config: CatalogConfig,
        directory: Arc<dyn DataSourceDirectory>,
        connections: Arc<dyn ConnectionProvider>,
        store: MetadataStore,
    ) -> Self {
        let registry = Arc::new(ExtractorRegistry::with_defaults(config.retry));
        let fetcher = MetadataFetchService::new(directory, connections, registry, store);
        Self { config, fetcher }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn store(&self) -> &MetadataStore {
        self.fetcher.storage()
    }

    pub async fn fetch_and_save_all(&self, data_source_id: &str, actor: &str) -> EngineResult<FetchSummary> {
        self.fetcher.fetch_and_save_all(data_source_id, actor).await
    }

    pub async fn fetch_and_save_one(
        &self,
        data_source_id: &str,
        schema: &str,
        table: &str,
        actor: &str,
    ) -> EngineResult<TableMetadata> {
        self.fetcher.fetch_and_save_one(data_source_id, schema, table, actor).await
    }

    pub async fn refresh_all(&self, data_source_id: &str, actor: &str) -> EngineResult<FetchSummary> {
        self.fetcher.refresh_all(data_source_id, actor).await
    }

    pub async fn get_by_data_source(&self, data_source_id: &str) -> EngineResult<Vec<TableMetadata>> {
        self.store().get_by_data_source(data_source_id).await
    }

    pub async fn get_by_schema(&self, data_source_id: &str, schema: &str) -> EngineResult<Vec<TableMetadata>> {
        self.store().get_by_schema(data_source_id, schema).await
    }

    pub async fn get_table(&self, data_source_id: &str, schema: &str, table: &str) -> EngineResult<TableMetadata> {
        self.store().get_table(data_source_id, schema, table).await
    }

    pub async fn list_schemas(&self, data_source_id: &str) -> EngineResult<Vec<String>> {
        self.store().list_schemas(data_source_id).await
    }

    pub async fn delete_by_data_source(&self, data_source_id: &str) -> EngineResult<u64> {
        self.store().delete_by_data_source(data_source_id).await
    }
}
