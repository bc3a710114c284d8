// SPDX-License-Identifier: Apache-2.0

//! PostgreSQL catalog connection
//!
//! Wraps a single dedicated SQLx `PgConnection`. Catalog queries are
//! expected to cast `oid`, `name` and `regtype` columns to `bigint`/`text`
//! so that the generic value ladder below can decode them.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, PgSslMode};
use sqlx::{Column, ConnectOptions, Connection, Row};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::CatalogConnection;
use crate::engine::types::{CatalogRow, DataSource, Value};

pub struct PgCatalogConnection {
    conn: PgConnection,
}

impl PgCatalogConnection {
    pub async fn connect(source: &DataSource, connect_timeout: Duration) -> EngineResult<Self> {
        let options = Self::build_connect_options(source);

        let conn = tokio::time::timeout(connect_timeout, options.connect())
            .await
            .map_err(|_| EngineError::Timeout {
                timeout_ms: connect_timeout.as_millis() as u64,
            })?
            .map_err(EngineError::from_sqlx)?;

        Ok(Self { conn })
    }

    fn build_connect_options(source: &DataSource) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&source.host)
            .port(source.port)
            .username(&source.username)
            .password(source.password.expose())
            .database(&source.database)
            .ssl_mode(PgSslMode::Prefer)
    }

    fn convert_row(pg_row: &PgRow) -> CatalogRow {
        let mut row = CatalogRow::new();
        for col in pg_row.columns() {
            row.push(col.name(), Self::extract_value(pg_row, col.ordinal()));
        }
        row
    }

    /// Extracts a value from a PgRow at the given index
    fn extract_value(row: &PgRow, idx: usize) -> Value {
        if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
            return v.map(Value::Bool).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return v.map(Value::Int).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            return v.map(Value::Float).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
            return v.map(|f| Value::Float(f as f64)).unwrap_or(Value::Null);
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
impl CatalogConnection for PgCatalogConnection {
    async fn fetch_all(&mut self, query: &str, params: &[&str]) -> EngineResult<Vec<CatalogRow>> {
        let mut q = sqlx::query(query);
        for param in params {
            q = q.bind(*param);
        }

        let rows: Vec<PgRow> = q
            .fetch_all(&mut self.conn)
            .await
            .map_err(EngineError::from_sqlx)?;

        Ok(rows.iter().map(Self::convert_row).collect())
    }

    async fn close(self: Box<Self>) -> EngineResult<()> {
        self.conn.close().await.map_err(EngineError::from_sqlx)
    }
}
