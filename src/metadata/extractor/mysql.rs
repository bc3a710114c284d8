// SPDX-License-Identifier: Apache-2.0

//! MySQL catalog extractor
//!
//! Reads `information_schema` for schemas, tables, columns, primary keys and
//! indexes. Index sizes come from `mysql.innodb_index_stats` when the
//! connected user may read it; otherwise they stay unknown.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::engine::error::EngineResult;
use crate::engine::traits::CatalogConnection;
use crate::engine::types::EngineType;
use crate::metadata::model::TableMetadata;
use crate::metadata::retry::RetryPolicy;
use crate::metadata::type_mapper;

use super::{column_values, fetch_rows, introspect_table, is_system_table, CatalogQueries, MetadataExtractor};

/// Schemas that belong to the server itself
pub const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "mysql", "performance_schema", "sys"];

// information_schema text columns are cast to CHAR so they decode as
// strings regardless of the server's collation.
pub const QUERIES: CatalogQueries = CatalogQueries {
    schemas: "SELECT CAST(SCHEMA_NAME AS CHAR) AS schema_name \
              FROM information_schema.SCHEMATA \
              ORDER BY SCHEMA_NAME",
    tables: "SELECT CAST(TABLE_NAME AS CHAR) AS table_name \
             FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = ? AND TABLE_TYPE IN ('BASE TABLE', 'VIEW') \
             ORDER BY TABLE_NAME",
    table_stats: "SELECT CAST(TABLE_COMMENT AS CHAR) AS table_comment, \
                  TABLE_ROWS AS row_count, \
                  DATA_LENGTH AS data_size, \
                  INDEX_LENGTH AS index_size \
                  FROM information_schema.TABLES \
                  WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?",
    columns: "SELECT CAST(COLUMN_NAME AS CHAR) AS column_name, \
              CAST(DATA_TYPE AS CHAR) AS data_type, \
              CAST(COALESCE(CHARACTER_MAXIMUM_LENGTH, NUMERIC_PRECISION, DATETIME_PRECISION) AS SIGNED) AS column_length, \
              CAST(NUMERIC_SCALE AS SIGNED) AS column_precision, \
              CAST(IS_NULLABLE AS CHAR) AS is_nullable, \
              CAST(COLUMN_DEFAULT AS CHAR) AS column_default, \
              CAST(COLUMN_COMMENT AS CHAR) AS column_comment, \
              EXTRA LIKE '%auto_increment%' AS is_auto_increment \
              FROM information_schema.COLUMNS \
              WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
              ORDER BY ORDINAL_POSITION",
    primary_keys: "SELECT CAST(COLUMN_NAME AS CHAR) AS column_name \
                   FROM information_schema.KEY_COLUMN_USAGE \
                   WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY' \
                   ORDER BY ORDINAL_POSITION",
    indexes: "SELECT CAST(INDEX_NAME AS CHAR) AS index_name, \
              NON_UNIQUE = 0 AS is_unique, \
              CAST(COLUMN_NAME AS CHAR) AS column_name, \
              CARDINALITY AS cardinality \
              FROM information_schema.STATISTICS \
              WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
              ORDER BY INDEX_NAME, SEQ_IN_INDEX",
};

/// Per-index on-disk size, in pages times the server page size
pub const INDEX_SIZE_QUERY: &str = "SELECT CAST(index_name AS CHAR) AS index_name, \
    CAST(stat_value * @@innodb_page_size AS SIGNED) AS index_size \
    FROM mysql.innodb_index_stats \
    WHERE database_name = ? AND table_name = ? AND stat_name = 'size'";

pub fn is_system_schema(name: &str) -> bool {
    SYSTEM_SCHEMAS.iter().any(|s| s.eq_ignore_ascii_case(name))
}

pub struct MySqlExtractor {
    retry: RetryPolicy,
}

impl MySqlExtractor {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    /// Fills in index sizes. Missing privileges or a non-InnoDB table are
    /// not errors; the sizes just stay unknown.
    async fn apply_index_sizes(&self, conn: &mut dyn CatalogConnection, table: &mut TableMetadata) {
        let params = [table.schema.as_str(), table.name.as_str()];
        let rows = match fetch_rows(conn, &self.retry, INDEX_SIZE_QUERY, &params).await {
            Ok(rows) => rows,
            Err(e) => {
                debug!(table = %table.qualified_name(), error = %e, "Index sizes unavailable");
                return;
            }
        };

        for row in &rows {
            let (Some(name), Some(size)) = (row.get_str("index_name"), row.get_i64("index_size")) else {
                continue;
            };
            if let Some(index) = table.index_mut(&name) {
                index.size_bytes = Some(size);
            }
        }
    }
}

impl Default for MySqlExtractor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[async_trait]
impl MetadataExtractor for MySqlExtractor {
    fn extractor_id(&self) -> &'static str {
        "mysql"
    }

    fn supports(&self, engine: EngineType) -> bool {
        engine == EngineType::MySql
    }

    async fn get_schemas(&self, conn: &mut dyn CatalogConnection) -> EngineResult<Vec<String>> {
        let rows = fetch_rows(conn, &self.retry, QUERIES.schemas, &[]).await?;
        Ok(column_values(&rows, "schema_name")
            .into_iter()
            .filter(|s| !is_system_schema(s))
            .collect())
    }

    async fn get_tables(
        &self,
        conn: &mut dyn CatalogConnection,
        schema: &str,
    ) -> EngineResult<Vec<String>> {
        let rows = fetch_rows(conn, &self.retry, QUERIES.tables, &[schema]).await?;
        Ok(column_values(&rows, "table_name")
            .into_iter()
            .filter(|t| !is_system_table(t))
            .collect())
    }

    #[instrument(skip(self, conn), fields(extractor = "mysql"))]
    async fn extract_table(
        &self,
        conn: &mut dyn CatalogConnection,
        data_source_id: &str,
        schema: &str,
        table: &str,
    ) -> EngineResult<Option<TableMetadata>> {
        let mut metadata = introspect_table(
            conn,
            &self.retry,
            &QUERIES,
            &type_mapper::MYSQL,
            data_source_id,
            schema,
            table,
        )
        .await?;

        if let Some(metadata) = metadata.as_mut() {
            if !metadata.indexes().is_empty() {
                self.apply_index_sizes(conn, metadata).await;
            }
        }
        Ok(metadata)
    }
}
