// SPDX-License-Identifier: Apache-2.0

//! Metadata extractors
//!
//! An extractor walks one engine's system catalog through a
//! [`CatalogConnection`] and builds [`TableMetadata`] graphs. Each dialect
//! supplies its catalog queries as a [`CatalogQueries`] table; the queries
//! alias their result columns to a shared vocabulary so the row handling
//! below is the same for every engine:
//!
//! | query          | columns |
//! |----------------|---------|
//! | `schemas`      | `schema_name` |
//! | `tables`       | `table_name` |
//! | `table_stats`  | `table_comment`, `row_count`, `data_size`, `index_size` |
//! | `columns`      | `column_name`, `data_type`, `type_code`?, `column_length`, `column_precision`, `is_nullable`, `column_default`, `column_comment`, `is_auto_increment` |
//! | `primary_keys` | `column_name` |
//! | `indexes`      | `index_name`, `is_unique`, `column_name`, `cardinality`, `index_size`? |
//!
//! All per-table queries take `(schema, table)` as positional parameters.

pub mod mysql;
pub mod postgres;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::engine::error::EngineResult;
use crate::engine::traits::CatalogConnection;
use crate::engine::types::{CatalogRow, EngineType};
use crate::metrics;

use super::model::{ColumnMetadata, IndexMetadata, TableMetadata};
use super::retry::RetryPolicy;
use super::type_mapper::TypeMapper;

pub use mysql::MySqlExtractor;
pub use postgres::PostgresExtractor;

/// Catalog introspection for one database engine
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Stable identifier used in logs (e.g. "mysql")
    fn extractor_id(&self) -> &'static str;

    /// Returns true if this extractor handles the given engine
    fn supports(&self, engine: EngineType) -> bool;

    /// Lists user schemas; system schemas of the dialect are never returned.
    async fn get_schemas(&self, conn: &mut dyn CatalogConnection) -> EngineResult<Vec<String>>;

    /// Lists base tables and views of a schema, minus system tables.
    async fn get_tables(
        &self,
        conn: &mut dyn CatalogConnection,
        schema: &str,
    ) -> EngineResult<Vec<String>>;

    /// Extracts the full metadata of one table.
    ///
    /// Returns `Ok(None)` when the table no longer exists in the catalog.
    async fn extract_table(
        &self,
        conn: &mut dyn CatalogConnection,
        data_source_id: &str,
        schema: &str,
        table: &str,
    ) -> EngineResult<Option<TableMetadata>>;

    /// Walks every schema and table. A failing table (or table listing) is
    /// logged and skipped; only a failure to list schemas aborts the walk.
    #[instrument(skip(self, conn), fields(extractor = self.extractor_id()))]
    async fn extract_all(
        &self,
        conn: &mut dyn CatalogConnection,
        data_source_id: &str,
    ) -> EngineResult<Vec<TableMetadata>> {
        let schemas = self.get_schemas(conn).await?;
        let mut tables = Vec::new();

        for schema in &schemas {
            let names = match self.get_tables(conn, schema).await {
                Ok(names) => names,
                Err(e) => {
                    warn!(schema = %schema, error = %e, "Failed to list tables, skipping schema");
                    continue;
                }
            };

            for name in &names {
                match self.extract_table(conn, data_source_id, schema, name).await {
                    Ok(Some(table)) => {
                        metrics::record_table_extracted();
                        tables.push(table);
                    }
                    Ok(None) => {
                        metrics::record_table_skipped();
                        warn!(schema = %schema, table = %name, "Table disappeared during extraction");
                    }
                    Err(e) => {
                        metrics::record_table_skipped();
                        warn!(schema = %schema, table = %name, error = %e, "Failed to extract table, skipping");
                    }
                }
            }
        }

        info!(schemas = schemas.len(), tables = tables.len(), "Catalog extraction finished");
        Ok(tables)
    }
}

/// The fixed set of catalog queries of one dialect
#[derive(Debug, Clone, Copy)]
pub struct CatalogQueries {
    pub schemas: &'static str,
    pub tables: &'static str,
    pub table_stats: &'static str,
    pub columns: &'static str,
    pub primary_keys: &'static str,
    pub indexes: &'static str,
}

/// Runs one catalog query under the retry policy.
pub(crate) async fn fetch_rows(
    conn: &mut dyn CatalogConnection,
    retry: &RetryPolicy,
    query: &str,
    params: &[&str],
) -> EngineResult<Vec<CatalogRow>> {
    // each attempt needs its own reborrow of the connection
    let conn = Mutex::new(conn);
    let conn = &conn;
    retry
        .run(|| async move { conn.lock().await.fetch_all(query, params).await })
        .await
}

/// Reads a single text column out of every row, skipping NULLs.
pub(crate) fn column_values(rows: &[CatalogRow], label: &str) -> Vec<String> {
    rows.iter().filter_map(|row| row.get_str(label)).collect()
}

/// Tables whose names mark them as internal bookkeeping
pub(crate) fn is_system_table(name: &str) -> bool {
    name.starts_with("sys_") || name.starts_with('_')
}

/// Runs the stats, column, primary-key and index passes for one table.
pub(crate) async fn introspect_table(
    conn: &mut dyn CatalogConnection,
    retry: &RetryPolicy,
    queries: &CatalogQueries,
    mapper: &TypeMapper,
    data_source_id: &str,
    schema: &str,
    table: &str,
) -> EngineResult<Option<TableMetadata>> {
    let params = [schema, table];

    let stats = fetch_rows(conn, retry, queries.table_stats, &params).await?;
    let Some(stats) = stats.first() else {
        debug!(schema, table, "No catalog entry for table");
        return Ok(None);
    };

    let mut metadata = TableMetadata::new(data_source_id, schema, table);
    metadata.comment = non_empty(stats.get_str("table_comment"));
    metadata.row_count = stats.get_i64("row_count");
    metadata.data_size = stats.get_i64("data_size");
    metadata.index_size = stats.get_i64("index_size");

    let column_rows = fetch_rows(conn, retry, queries.columns, &params).await?;
    if column_rows.is_empty() {
        debug!(schema, table, "Table has no columns left");
        return Ok(None);
    }
    for row in &column_rows {
        let Some(column) = column_from_row(row, mapper) else {
            warn!(schema, table, "Skipping column row without a name");
            continue;
        };
        if let Err(e) = metadata.add_column(column) {
            warn!(schema, table, error = %e, "Skipping column");
        }
    }

    let pk_rows = fetch_rows(conn, retry, queries.primary_keys, &params).await?;
    let pk_columns = column_values(&pk_rows, "column_name");
    metadata.mark_primary_key(pk_columns.iter().map(String::as_str));

    let index_rows = fetch_rows(conn, retry, queries.indexes, &params).await?;
    for mut index in build_indexes(&index_rows) {
        index.columns.retain(|c| metadata.column(c).is_some());
        metadata.add_index(index);
    }

    Ok(Some(metadata))
}

fn column_from_row(row: &CatalogRow, mapper: &TypeMapper) -> Option<ColumnMetadata> {
    let name = row.get_str("column_name")?;
    let native_type = row.get_str("data_type").unwrap_or_default();

    let mut column = ColumnMetadata::new(name, mapper.map(row.get_i64("type_code"), &native_type));
    column.length = row.get_i64("column_length").map(clamp_i32);
    column.precision = row.get_i64("column_precision").map(clamp_i32);
    column.nullable = row.get_bool("is_nullable");
    column.default_value = row.get_str("column_default");
    column.comment = non_empty(row.get_str("column_comment"));
    column.auto_increment = row.get_bool("is_auto_increment");
    Some(column)
}

/// Groups per-column index rows into indexes, keeping the row order for
/// both the index list and each key column list.
pub(crate) fn build_indexes(rows: &[CatalogRow]) -> Vec<IndexMetadata> {
    let mut indexes: Vec<IndexMetadata> = Vec::new();

    for row in rows {
        let Some(name) = row.get_str("index_name") else {
            continue;
        };

        let pos = match indexes.iter().position(|i| i.name == name) {
            Some(pos) => pos,
            None => {
                let mut index = IndexMetadata::new(name, row.get_bool("is_unique"));
                index.size_bytes = row.get_i64("index_size");
                indexes.push(index);
                indexes.len() - 1
            }
        };

        let index = &mut indexes[pos];
        if let Some(column) = row.get_str("column_name") {
            index.add_column(column);
        }
        if let Some(cardinality) = row.get_i64("cardinality") {
            index.cardinality = Some(index.cardinality.map_or(cardinality, |c| c.max(cardinality)));
        }
    }

    indexes
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(0, i32::MAX as i64) as i32
}
