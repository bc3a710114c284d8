// SPDX-License-Identifier: Apache-2.0

//! Metadata Fetch Orchestrator
//!
//! Resolves a data source, opens one dedicated catalog connection, runs the
//! matching extractor and hands the result to the store. The connection is
//! closed on every exit path before results are persisted.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::{CatalogConnection, ConnectionProvider, DataSourceDirectory};

use super::model::TableMetadata;
use super::registry::ExtractorRegistry;
use super::storage::{MetadataStore, SaveReport};

/// Result of a whole-catalog fetch
#[derive(Debug, Serialize)]
pub struct FetchSummary {
    pub tables: Vec<TableMetadata>,
    pub save_report: SaveReport,
}

pub struct MetadataFetchService {
    directory: Arc<dyn DataSourceDirectory>,
    connections: Arc<dyn ConnectionProvider>,
    registry: Arc<ExtractorRegistry>,
    storage: MetadataStore,
}

impl MetadataFetchService {
    pub fn new(
        directory: Arc<dyn DataSourceDirectory>,
        connections: Arc<dyn ConnectionProvider>,
        registry: Arc<ExtractorRegistry>,
        storage: MetadataStore,
    ) -> Self {
        Self {
            directory,
            connections,
            registry,
            storage,
        }
    }

    pub fn storage(&self) -> &MetadataStore {
        &self.storage
    }

    /// Extracts every table of the data source and saves them best-effort.
    ///
    /// Failures before or during extraction come back as
    /// [`EngineError::FetchFailed`] carrying the original cause. Per-table
    /// save failures are reported in the returned [`SaveReport`].
    #[instrument(skip(self))]
    pub async fn fetch_and_save_all(
        &self,
        data_source_id: &str,
        actor: &str,
    ) -> EngineResult<FetchSummary> {
        validate_request(data_source_id, actor)?;
        let wrap = |e| EngineError::fetch_failed(data_source_id, None, None, e);

        let source = self.directory.get(data_source_id).await.map_err(wrap)?;
        let extractor = self.registry.resolve(&source).map_err(wrap)?;
        let mut conn = self.connections.get_connection(&source).await.map_err(wrap)?;

        let extracted = extractor.extract_all(conn.as_mut(), data_source_id).await;
        release(conn, data_source_id).await;
        let tables = extracted.map_err(wrap)?;

        let save_report = self.storage.save_all_tables(&tables, actor).await;
        info!(
            extracted = tables.len(),
            saved = save_report.saved,
            failed = save_report.failures.len(),
            "Catalog fetched and saved"
        );

        Ok(FetchSummary {
            tables,
            save_report,
        })
    }

    /// Extracts and saves a single table.
    ///
    /// Fails with [`EngineError::TableNotFound`] when the source has no such
    /// table.
    #[instrument(skip(self))]
    pub async fn fetch_and_save_one(
        &self,
        data_source_id: &str,
        schema: &str,
        table: &str,
        actor: &str,
    ) -> EngineResult<TableMetadata> {
        validate_request(data_source_id, actor)?;
        let wrap = |e| EngineError::fetch_failed(data_source_id, Some(schema), Some(table), e);

        let source = self.directory.get(data_source_id).await.map_err(wrap)?;
        let extractor = self.registry.resolve(&source).map_err(wrap)?;
        let mut conn = self.connections.get_connection(&source).await.map_err(wrap)?;

        let extracted = extractor
            .extract_table(conn.as_mut(), data_source_id, schema, table)
            .await;
        release(conn, data_source_id).await;

        let metadata = extracted
            .map_err(wrap)?
            .ok_or_else(|| EngineError::table_not_found(data_source_id, schema, table))?;

        self.storage.save_table(&metadata, actor).await?;
        info!(columns = metadata.columns().len(), indexes = metadata.indexes().len(), "Table fetched and saved");
        Ok(metadata)
    }

    /// Replaces the stored catalog: delete, then fetch and save.
    ///
    /// The two steps are not atomic. If the fetch fails after the delete the
    /// data source is left with an empty catalog until the next successful
    /// refresh.
    #[instrument(skip(self))]
    pub async fn refresh_all(&self, data_source_id: &str, actor: &str) -> EngineResult<FetchSummary> {
        validate_request(data_source_id, actor)?;
        self.directory
            .get(data_source_id)
            .await
            .map_err(|e| EngineError::fetch_failed(data_source_id, None, None, e))?;

        let removed = self.storage.delete_by_data_source(data_source_id).await?;
        info!(removed, "Stored catalog cleared for refresh");

        self.fetch_and_save_all(data_source_id, actor).await
    }
}

fn validate_request(data_source_id: &str, actor: &str) -> EngineResult<()> {
    if data_source_id.trim().is_empty() {
        return Err(EngineError::validation("Data source id must not be empty"));
    }
    if actor.trim().is_empty() {
        return Err(EngineError::validation("Actor must not be empty"));
    }
    Ok(())
}

async fn release(conn: Box<dyn CatalogConnection>, data_source_id: &str) {
    if let Err(e) = conn.close().await {
        warn!(data_source_id, error = %e, "Failed to close catalog connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::directory::InMemoryDirectory;
    use crate::engine::types::{DataSource, EngineType, Value};
    use crate::metadata::extractor::mysql::QUERIES;
    use crate::metadata::retry::RetryPolicy;
    use crate::observability::Sensitive;
    use crate::test_support::{row, text, ScriptedConnection, ScriptedProvider};

    fn source(id: &str, engine: EngineType) -> DataSource {
        DataSource {
            id: id.into(),
            name: format!("{id} source"),
            engine,
            host: "db.internal".into(),
            port: 3306,
            username: "catalog".into(),
            password: Sensitive::new("secret".into()),
            database: "app".into(),
        }
    }

    fn app_schema() -> ScriptedConnection {
        ScriptedConnection::new(|query, params| {
            let rows = if query == QUERIES.schemas {
                vec![row(&[("schema_name", text("app"))])]
            } else if query == QUERIES.tables {
                vec![
                    row(&[("table_name", text("users"))]),
                    row(&[("table_name", text("audit_log"))]),
                ]
            } else if query == QUERIES.table_stats {
                match params[1] {
                    "users" => vec![row(&[("row_count", Value::Int(3))])],
                    "audit_log" => {
                        return Err(EngineError::execution_error("Incorrect key file for table"))
                    }
                    _ => Vec::new(),
                }
            } else if query == QUERIES.columns {
                vec![row(&[
                    ("column_name", text("id")),
                    ("data_type", text("int")),
                    ("is_nullable", text("NO")),
                ])]
            } else if query == QUERIES.primary_keys {
                vec![row(&[("column_name", text("id"))])]
            } else {
                Vec::new()
            };
            Ok(rows)
        })
    }

    async fn service(provider: ScriptedProvider) -> MetadataFetchService {
        let directory = InMemoryDirectory::new();
        directory.register(source("ds-mysql", EngineType::MySql));
        directory.register(source("ds-hive", EngineType::Hive));

        MetadataFetchService::new(
            Arc::new(directory),
            Arc::new(provider),
            Arc::new(ExtractorRegistry::with_defaults(RetryPolicy::none())),
            MetadataStore::in_memory().await.unwrap(),
        )
    }

    #[tokio::test]
    async fn fetch_all_saves_what_could_be_extracted_and_closes() {
        let provider = ScriptedProvider::new(app_schema);
        let log = provider.log();
        let service = service(provider).await;

        let summary = service.fetch_and_save_all("ds-mysql", "alice").await.unwrap();

        assert_eq!(summary.tables.len(), 1);
        assert_eq!(summary.save_report.saved, 1);
        assert_eq!(log.close_count(), 1);

        let stored = service.storage().get_table("ds-mysql", "app", "users").await.unwrap();
        assert_eq!(stored, summary.tables[0]);
    }

    #[tokio::test]
    async fn extraction_failure_is_wrapped_and_connection_released() {
        let provider = ScriptedProvider::new(|| {
            ScriptedConnection::new(|_, _| Err(EngineError::execution_error("access denied")))
        });
        let log = provider.log();
        let service = service(provider).await;

        let err = service.fetch_and_save_all("ds-mysql", "alice").await.unwrap_err();

        match err {
            EngineError::FetchFailed { data_source_id, cause, .. } => {
                assert_eq!(data_source_id, "ds-mysql");
                assert!(matches!(*cause, EngineError::ExecutionError { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(log.close_count(), 1);
    }

    #[tokio::test]
    async fn unsupported_engine_never_opens_a_connection() {
        let provider = ScriptedProvider::new(app_schema);
        let log = provider.log();
        let service = service(provider).await;

        let err = service.fetch_and_save_all("ds-hive", "alice").await.unwrap_err();

        assert!(matches!(
            err,
            EngineError::FetchFailed { ref cause, .. } if matches!(**cause, EngineError::UnsupportedEngine { .. })
        ));
        assert_eq!(log.query_count(), 0);
        assert_eq!(log.close_count(), 0);
    }

    #[tokio::test]
    async fn connect_failure_is_wrapped() {
        let service = service(ScriptedProvider::unreachable()).await;
        let err = service.fetch_and_save_all("ds-mysql", "alice").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::FetchFailed { ref cause, .. } if cause.is_transient()
        ));
    }

    #[tokio::test]
    async fn fetch_one_reports_missing_table() {
        let provider = ScriptedProvider::new(app_schema);
        let log = provider.log();
        let service = service(provider).await;

        let err = service
            .fetch_and_save_one("ds-mysql", "app", "ghost", "alice")
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::TableNotFound { .. }));
        assert_eq!(log.close_count(), 1);
    }

    #[tokio::test]
    async fn fetch_one_saves_single_table() {
        let service = service(ScriptedProvider::new(app_schema)).await;

        let table = service
            .fetch_and_save_one("ds-mysql", "app", "users", "alice")
            .await
            .unwrap();

        assert_eq!(table.primary_key(), vec!["id"]);
        assert_eq!(service.storage().list_schemas("ds-mysql").await.unwrap(), vec!["app"]);
    }

    #[tokio::test]
    async fn unknown_data_source_keeps_stored_catalog() {
        let service = service(ScriptedProvider::new(app_schema)).await;
        service.fetch_and_save_all("ds-mysql", "alice").await.unwrap();

        let err = service.refresh_all("ds-missing", "alice").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::FetchFailed { ref cause, .. } if matches!(**cause, EngineError::DataSourceNotFound { .. })
        ));
        assert_eq!(service.storage().get_by_data_source("ds-mysql").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn refresh_replaces_stale_tables() {
        let service = service(ScriptedProvider::new(app_schema)).await;

        let mut stale = TableMetadata::new("ds-mysql", "app", "dropped_last_week");
        stale
            .add_column(crate::metadata::model::ColumnMetadata::new(
                "id",
                crate::metadata::model::ColumnType::Integer,
            ))
            .unwrap();
        service.storage().save_table(&stale, "alice").await.unwrap();

        service.refresh_all("ds-mysql", "bob").await.unwrap();

        let names: Vec<String> = service
            .storage()
            .get_by_data_source("ds-mysql")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["users"]);
    }

    #[tokio::test]
    async fn empty_actor_is_rejected_up_front() {
        let provider = ScriptedProvider::new(app_schema);
        let log = provider.log();
        let service = service(provider).await;

        let err = service.fetch_and_save_all("ds-mysql", "").await.unwrap_err();
        assert!(matches!(err, EngineError::ValidationError { .. }));
        assert_eq!(log.query_count(), 0);
    }
}
