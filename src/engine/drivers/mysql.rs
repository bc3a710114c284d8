// SPDX-License-Identifier: Apache-2.0

//! MySQL catalog connection
//!
//! Wraps a single dedicated SQLx `MySqlConnection` and converts result rows
//! into [`CatalogRow`]s.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow, MySqlSslMode};
use sqlx::{Column, ConnectOptions, Connection, Row};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::CatalogConnection;
use crate::engine::types::{CatalogRow, DataSource, Value};

pub struct MySqlCatalogConnection {
    conn: MySqlConnection,
}

impl MySqlCatalogConnection {
    /// Opens a dedicated connection, bounded by `connect_timeout`.
    pub async fn connect(source: &DataSource, connect_timeout: Duration) -> EngineResult<Self> {
        let options = Self::build_connect_options(source);

        let conn = tokio::time::timeout(connect_timeout, options.connect())
            .await
            .map_err(|_| EngineError::Timeout {
                timeout_ms: connect_timeout.as_millis() as u64,
            })?
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("Access denied") {
                    EngineError::connection_failed(format!("Authentication failed: {}", msg))
                } else {
                    EngineError::from_sqlx(e)
                }
            })?;

        Ok(Self { conn })
    }

    fn build_connect_options(source: &DataSource) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&source.host)
            .port(source.port)
            .username(&source.username)
            .password(source.password.expose())
            .database(&source.database)
            .ssl_mode(MySqlSslMode::Preferred)
    }

    /// Converts a SQLx row to a catalog row keyed by column label
    fn convert_row(mysql_row: &MySqlRow) -> CatalogRow {
        let mut row = CatalogRow::new();
        for col in mysql_row.columns() {
            row.push(col.name(), Self::extract_value(mysql_row, col.ordinal()));
        }
        row
    }

    /// Extracts a value from a MySqlRow at the given index
    fn extract_value(row: &MySqlRow, idx: usize) -> Value {
        // information_schema exposes counters as BIGINT UNSIGNED
        if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
            return v.map(|u| Value::Int(u as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return v.map(Value::Int).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<u32>, _>(idx) {
            return v.map(|u| Value::Int(u as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i8>, _>(idx) {
            return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
            return v.map(Value::Bool).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            return v.map(Value::Float).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            return v.map(Value::Text).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
            return v.map(Value::Bytes).unwrap_or(Value::Null);
        }

        Value::Null
    }
}

#[async_trait]
impl CatalogConnection for MySqlCatalogConnection {
    async fn fetch_all(&mut self, query: &str, params: &[&str]) -> EngineResult<Vec<CatalogRow>> {
        let mut q = sqlx::query(query);
        for param in params {
            q = q.bind(*param);
        }

        let rows: Vec<MySqlRow> = q
            .fetch_all(&mut self.conn)
            .await
            .map_err(EngineError::from_sqlx)?;

        Ok(rows.iter().map(Self::convert_row).collect())
    }

    async fn close(self: Box<Self>) -> EngineResult<()> {
        self.conn.close().await.map_err(EngineError::from_sqlx)
    }
}
