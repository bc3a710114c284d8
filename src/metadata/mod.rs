// SPDX-License-Identifier: Apache-2.0

// Metadata Module
// Catalog extraction, type normalization and snapshot storage

pub mod extractor;
pub mod fetch;
pub mod model;
pub mod registry;
pub mod retry;
pub mod storage;
pub mod type_mapper;

pub use extractor::{CatalogQueries, MetadataExtractor, MySqlExtractor, PostgresExtractor};
pub use fetch::{FetchSummary, MetadataFetchService};
pub use model::{ColumnMetadata, ColumnType, IndexMetadata, TableMetadata};
pub use registry::ExtractorRegistry;
pub use retry::{retry, RetryPolicy};
pub use storage::{MetadataStore, SaveFailure, SaveReport, TableAudit};
pub use type_mapper::{TypeMapper, TypeRule};
