// SPDX-License-Identifier: Apache-2.0

//! Catalog source drivers
//!
//! One dedicated SQLx connection is opened per fetch call; nothing is pooled
//! or cached here.

pub mod mysql;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::{CatalogConnection, ConnectionProvider};
use crate::engine::types::{DataSource, EngineType};

use self::mysql::MySqlCatalogConnection;
use self::postgres::PgCatalogConnection;

/// Connection provider backed by SQLx drivers
pub struct SqlxConnectionProvider {
    connect_timeout: Duration,
}

impl SqlxConnectionProvider {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for SqlxConnectionProvider {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

#[async_trait]
impl ConnectionProvider for SqlxConnectionProvider {
    #[instrument(
        skip(self, source),
        fields(
            data_source_id = %source.id,
            engine = %source.engine,
            host = %source.host,
            port = source.port,
        )
    )]
    async fn get_connection(&self, source: &DataSource) -> EngineResult<Box<dyn CatalogConnection>> {
        let conn: Box<dyn CatalogConnection> = match source.engine {
            EngineType::MySql => {
                Box::new(MySqlCatalogConnection::connect(source, self.connect_timeout).await?)
            }
            EngineType::PostgreSql => {
                Box::new(PgCatalogConnection::connect(source, self.connect_timeout).await?)
            }
            other => return Err(EngineError::unsupported_engine(other.as_str())),
        };

        debug!("Catalog connection opened");
        Ok(conn)
    }
}
