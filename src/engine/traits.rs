// SPDX-License-Identifier: Apache-2.0

//! Collaborator traits consumed by the catalog engine
//!
//! The extraction pipeline never opens network connections itself: it is
//! handed a [`CatalogConnection`] by a [`ConnectionProvider`] and learns the
//! engine of a data source from a [`DataSourceDirectory`].

use async_trait::async_trait;

use crate::engine::error::EngineResult;
use crate::engine::types::{CatalogRow, DataSource};

/// An open connection able to run parameterized catalog queries
///
/// Implementations are not required to support concurrent statements; the
/// extractors issue one query at a time.
#[async_trait]
pub trait CatalogConnection: Send {
    /// Runs a read-only query with positional text parameters.
    async fn fetch_all(&mut self, query: &str, params: &[&str]) -> EngineResult<Vec<CatalogRow>>;

    /// Closes the connection and releases its resources
    async fn close(self: Box<Self>) -> EngineResult<()>;
}

/// Opens connections for a data source
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn get_connection(&self, source: &DataSource) -> EngineResult<Box<dyn CatalogConnection>>;
}

/// Resolves data-source identifiers to their connection settings
#[async_trait]
pub trait DataSourceDirectory: Send + Sync {
    async fn get(&self, data_source_id: &str) -> EngineResult<DataSource>;
}
