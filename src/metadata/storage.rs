// SPDX-License-Identifier: Apache-2.0

//! Metadata Storage
//!
//! Persists catalog snapshots in a local SQLite database. A table is stored
//! as one `table_metadata` record plus `column_metadata` / `index_metadata`
//! child records that reference it by surrogate id. Index key columns are
//! kept as one delimited string per index.
//!
//! Saving a table replaces its children wholesale inside one transaction.
//! Batches and delete-then-refetch refreshes are not atomic across tables.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info, instrument, warn};

use crate::engine::error::{EngineError, EngineResult};
use crate::metrics;
use crate::observability::redact_url;

use super::model::{ColumnMetadata, ColumnType, IndexMetadata, TableMetadata};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS table_metadata (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        data_source_id TEXT NOT NULL,
        schema_name TEXT NOT NULL,
        table_name TEXT NOT NULL,
        table_comment TEXT,
        row_count INTEGER,
        data_size INTEGER,
        index_size INTEGER,
        last_analyzed TEXT NOT NULL,
        created_by TEXT NOT NULL,
        updated_by TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (data_source_id, schema_name, table_name)
    )",
    "CREATE TABLE IF NOT EXISTS column_metadata (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        table_id INTEGER NOT NULL REFERENCES table_metadata(id) ON DELETE CASCADE,
        column_name TEXT NOT NULL,
        column_type TEXT NOT NULL,
        column_length INTEGER,
        column_precision INTEGER,
        nullable INTEGER NOT NULL,
        ordinal_position INTEGER NOT NULL,
        default_value TEXT,
        column_comment TEXT,
        primary_key INTEGER NOT NULL,
        auto_increment INTEGER NOT NULL,
        created_by TEXT NOT NULL,
        updated_by TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (table_id, column_name)
    )",
    "CREATE TABLE IF NOT EXISTS index_metadata (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        table_id INTEGER NOT NULL REFERENCES table_metadata(id) ON DELETE CASCADE,
        index_name TEXT NOT NULL,
        is_unique INTEGER NOT NULL,
        cardinality INTEGER,
        size_bytes INTEGER,
        column_names TEXT NOT NULL,
        created_by TEXT NOT NULL,
        updated_by TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (table_id, index_name)
    )",
    "CREATE INDEX IF NOT EXISTS idx_column_metadata_table ON column_metadata(table_id)",
    "CREATE INDEX IF NOT EXISTS idx_index_metadata_table ON index_metadata(table_id)",
];

const UPSERT_TABLE: &str = "INSERT INTO table_metadata (
        data_source_id, schema_name, table_name, table_comment, row_count, data_size,
        index_size, last_analyzed, created_by, updated_by, created_at, updated_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (data_source_id, schema_name, table_name) DO UPDATE SET
        table_comment = excluded.table_comment,
        row_count = excluded.row_count,
        data_size = excluded.data_size,
        index_size = excluded.index_size,
        last_analyzed = excluded.last_analyzed,
        updated_by = excluded.updated_by,
        updated_at = excluded.updated_at
    RETURNING id";

const INSERT_COLUMN: &str = "INSERT INTO column_metadata (
        table_id, column_name, column_type, column_length, column_precision, nullable,
        ordinal_position, default_value, column_comment, primary_key, auto_increment,
        created_by, updated_by, created_at, updated_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const INSERT_INDEX: &str = "INSERT INTO index_metadata (
        table_id, index_name, is_unique, cardinality, size_bytes, column_names,
        created_by, updated_by, created_at, updated_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const SELECT_TABLE: &str = "SELECT id, data_source_id, schema_name, table_name, table_comment,
        row_count, data_size, index_size
    FROM table_metadata";

/// Maps a metadata-store driver error.
pub fn storage_error(err: sqlx::Error) -> EngineError {
    EngineError::storage(err.to_string())
}

/// Outcome of a best-effort batch save
#[derive(Debug, Default, Serialize)]
pub struct SaveReport {
    pub saved: usize,
    pub failures: Vec<SaveFailure>,
}

impl SaveReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Serialize)]
pub struct SaveFailure {
    pub schema: String,
    pub table: String,
    pub error: EngineError,
}

/// Audit trail of a stored table record
#[derive(Debug, Clone, Serialize)]
pub struct TableAudit {
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_analyzed: DateTime<Utc>,
}

/// SQLite-backed catalog snapshot store
#[derive(Clone)]
pub struct MetadataStore {
    pool: SqlitePool,
}

impl MetadataStore {
    /// Opens (creating if missing) the store at a `sqlite:` URL.
    pub async fn connect(url: &str) -> EngineResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(storage_error)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(storage_error)?;

        info!(url = %redact_url(url), "Metadata store opened");
        Self::with_pool(pool).await
    }

    /// Private in-memory store; lives as long as its single connection.
    pub async fn in_memory() -> EngineResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(storage_error)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(storage_error)?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> EngineResult<Self> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(storage_error)?;
        }
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Upserts the table record and replaces all of its column and index
    /// records. Either everything is written or nothing is.
    #[instrument(skip(self, table), fields(data_source_id = %table.data_source_id, table = %table.qualified_name()))]
    pub async fn save_table(&self, table: &TableMetadata, actor: &str) -> EngineResult<i64> {
        if actor.trim().is_empty() {
            return Err(EngineError::validation("Actor must not be empty"));
        }
        if table.data_source_id.is_empty() || table.schema.is_empty() || table.name.is_empty() {
            return Err(EngineError::validation(format!(
                "Incomplete table identity: {:?}.{:?}.{:?}",
                table.data_source_id, table.schema, table.name
            )));
        }
        if let Some(index) = table
            .indexes()
            .iter()
            .find(|i| i.columns.iter().any(|c| c.is_empty()))
        {
            return Err(EngineError::validation(format!(
                "Index {} on {} has an unnamed key column",
                index.name,
                table.qualified_name()
            )));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let table_id: i64 = sqlx::query(UPSERT_TABLE)
            .bind(&table.data_source_id)
            .bind(&table.schema)
            .bind(&table.name)
            .bind(&table.comment)
            .bind(table.row_count)
            .bind(table.data_size)
            .bind(table.index_size)
            .bind(now)
            .bind(actor)
            .bind(actor)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage_error)?
            .try_get("id")
            .map_err(storage_error)?;

        sqlx::query("DELETE FROM column_metadata WHERE table_id = ?")
            .bind(table_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        sqlx::query("DELETE FROM index_metadata WHERE table_id = ?")
            .bind(table_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        for column in table.columns() {
            sqlx::query(INSERT_COLUMN)
                .bind(table_id)
                .bind(&column.name)
                .bind(column.column_type.as_str())
                .bind(column.length)
                .bind(column.precision)
                .bind(column.nullable)
                .bind(column.ordinal_position)
                .bind(&column.default_value)
                .bind(&column.comment)
                .bind(column.primary_key)
                .bind(column.auto_increment)
                .bind(actor)
                .bind(actor)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(storage_error)?;
        }

        for index in table.indexes() {
            sqlx::query(INSERT_INDEX)
                .bind(table_id)
                .bind(&index.name)
                .bind(index.unique)
                .bind(index.cardinality)
                .bind(index.size_bytes)
                .bind(encode_columns(&index.columns))
                .bind(actor)
                .bind(actor)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(storage_error)?;
        }

        tx.commit().await.map_err(storage_error)?;
        debug!(table_id, columns = table.columns().len(), indexes = table.indexes().len(), "Table metadata saved");
        Ok(table_id)
    }

    /// Saves every table independently; a failing table does not stop the rest.
    pub async fn save_all_tables(&self, tables: &[TableMetadata], actor: &str) -> SaveReport {
        let mut report = SaveReport::default();

        for table in tables {
            match self.save_table(table, actor).await {
                Ok(_) => {
                    metrics::record_save(true);
                    report.saved += 1;
                }
                Err(error) => {
                    metrics::record_save(false);
                    warn!(
                        data_source_id = %table.data_source_id,
                        table = %table.qualified_name(),
                        error = %error,
                        "Failed to save table metadata"
                    );
                    report.failures.push(SaveFailure {
                        schema: table.schema.clone(),
                        table: table.name.clone(),
                        error,
                    });
                }
            }
        }

        info!(saved = report.saved, failed = report.failures.len(), "Batch save finished");
        report
    }

    pub async fn get_by_data_source(&self, data_source_id: &str) -> EngineResult<Vec<TableMetadata>> {
        let rows = sqlx::query(&format!(
            "{SELECT_TABLE} WHERE data_source_id = ? ORDER BY schema_name, table_name"
        ))
        .bind(data_source_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        self.assemble_all(&rows).await
    }

    pub async fn get_by_schema(
        &self,
        data_source_id: &str,
        schema: &str,
    ) -> EngineResult<Vec<TableMetadata>> {
        let rows = sqlx::query(&format!(
            "{SELECT_TABLE} WHERE data_source_id = ? AND schema_name = ? ORDER BY table_name"
        ))
        .bind(data_source_id)
        .bind(schema)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        self.assemble_all(&rows).await
    }

    pub async fn get_table(
        &self,
        data_source_id: &str,
        schema: &str,
        table: &str,
    ) -> EngineResult<TableMetadata> {
        let row = sqlx::query(&format!(
            "{SELECT_TABLE} WHERE data_source_id = ? AND schema_name = ? AND table_name = ?"
        ))
        .bind(data_source_id)
        .bind(schema)
        .bind(table)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| EngineError::table_not_found(data_source_id, schema, table))?;

        self.assemble(&row).await
    }

    pub async fn table_audit(
        &self,
        data_source_id: &str,
        schema: &str,
        table: &str,
    ) -> EngineResult<TableAudit> {
        let row = sqlx::query(
            "SELECT created_by, updated_by, created_at, updated_at, last_analyzed
             FROM table_metadata
             WHERE data_source_id = ? AND schema_name = ? AND table_name = ?",
        )
        .bind(data_source_id)
        .bind(schema)
        .bind(table)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| EngineError::table_not_found(data_source_id, schema, table))?;

        Ok(TableAudit {
            created_by: row.try_get("created_by").map_err(storage_error)?,
            updated_by: row.try_get("updated_by").map_err(storage_error)?,
            created_at: row.try_get("created_at").map_err(storage_error)?,
            updated_at: row.try_get("updated_at").map_err(storage_error)?,
            last_analyzed: row.try_get("last_analyzed").map_err(storage_error)?,
        })
    }

    pub async fn list_schemas(&self, data_source_id: &str) -> EngineResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT schema_name FROM table_metadata WHERE data_source_id = ? ORDER BY schema_name",
        )
        .bind(data_source_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(|(schema,)| schema).collect())
    }

    /// Removes every stored table of a data source together with its
    /// columns and indexes. Returns the number of tables removed.
    #[instrument(skip(self))]
    pub async fn delete_by_data_source(&self, data_source_id: &str) -> EngineResult<u64> {
        let result = sqlx::query("DELETE FROM table_metadata WHERE data_source_id = ?")
            .bind(data_source_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        info!(tables = result.rows_affected(), "Stored catalog deleted");
        Ok(result.rows_affected())
    }

    async fn assemble_all(&self, rows: &[SqliteRow]) -> EngineResult<Vec<TableMetadata>> {
        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            tables.push(self.assemble(row).await?);
        }
        Ok(tables)
    }

    /// Rebuilds a fresh in-memory graph from a table record and its children.
    async fn assemble(&self, row: &SqliteRow) -> EngineResult<TableMetadata> {
        let table_id: i64 = row.try_get("id").map_err(storage_error)?;
        let data_source_id: String = row.try_get("data_source_id").map_err(storage_error)?;
        let schema: String = row.try_get("schema_name").map_err(storage_error)?;
        let name: String = row.try_get("table_name").map_err(storage_error)?;

        let mut table = TableMetadata::new(data_source_id, schema, name);
        table.comment = row.try_get("table_comment").map_err(storage_error)?;
        table.row_count = row.try_get("row_count").map_err(storage_error)?;
        table.data_size = row.try_get("data_size").map_err(storage_error)?;
        table.index_size = row.try_get("index_size").map_err(storage_error)?;

        let column_rows = sqlx::query(
            "SELECT column_name, column_type, column_length, column_precision, nullable,
                    default_value, column_comment, primary_key, auto_increment
             FROM column_metadata WHERE table_id = ? ORDER BY ordinal_position",
        )
        .bind(table_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        for row in &column_rows {
            table.add_column(column_from_record(row)?)?;
        }

        let index_rows = sqlx::query(
            "SELECT index_name, is_unique, cardinality, size_bytes, column_names
             FROM index_metadata WHERE table_id = ? ORDER BY id",
        )
        .bind(table_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        for row in &index_rows {
            table.add_index(index_from_record(row)?);
        }

        Ok(table)
    }
}

fn column_from_record(row: &SqliteRow) -> EngineResult<ColumnMetadata> {
    let name: String = row.try_get("column_name").map_err(storage_error)?;
    let type_name: String = row.try_get("column_type").map_err(storage_error)?;
    let column_type = ColumnType::from_str(&type_name).map_err(|_| {
        EngineError::storage(format!("Stored column {} has unknown type {}", name, type_name))
    })?;

    let mut column = ColumnMetadata::new(name, column_type);
    column.length = row.try_get("column_length").map_err(storage_error)?;
    column.precision = row.try_get("column_precision").map_err(storage_error)?;
    column.nullable = row.try_get("nullable").map_err(storage_error)?;
    column.default_value = row.try_get("default_value").map_err(storage_error)?;
    column.comment = row.try_get("column_comment").map_err(storage_error)?;
    column.primary_key = row.try_get("primary_key").map_err(storage_error)?;
    column.auto_increment = row.try_get("auto_increment").map_err(storage_error)?;
    Ok(column)
}

fn index_from_record(row: &SqliteRow) -> EngineResult<IndexMetadata> {
    let mut index = IndexMetadata::new(
        row.try_get::<String, _>("index_name").map_err(storage_error)?,
        row.try_get("is_unique").map_err(storage_error)?,
    );
    index.cardinality = row.try_get("cardinality").map_err(storage_error)?;
    index.size_bytes = row.try_get("size_bytes").map_err(storage_error)?;
    let encoded: String = row.try_get("column_names").map_err(storage_error)?;
    index.columns = decode_columns(&encoded);
    Ok(index)
}

/// Joins index key columns with `,`. Commas and backslashes inside a name
/// are escaped with a backslash so any name survives a round trip.
pub fn encode_columns(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| c.replace('\\', "\\\\").replace(',', "\\,"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Inverse of [`encode_columns`]
pub fn decode_columns(encoded: &str) -> Vec<String> {
    if encoded.is_empty() {
        return Vec::new();
    }

    let mut columns = Vec::new();
    let mut current = String::new();
    let mut chars = encoded.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ',' => columns.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    columns.push(current);
    columns
}
