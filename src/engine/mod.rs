// SPDX-License-Identifier: Apache-2.0

// Data Engine Module
// Connection-level abstractions shared by every catalog dialect

pub mod directory;
pub mod drivers;
pub mod error;
pub mod traits;
pub mod types;

pub use directory::InMemoryDirectory;
pub use drivers::SqlxConnectionProvider;
pub use error::{EngineError, EngineResult};
pub use traits::{CatalogConnection, ConnectionProvider, DataSourceDirectory};
pub use types::*;
