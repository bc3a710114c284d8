// SPDX-License-Identifier: Apache-2.0

//! Universal data types for the catalog engine
//!
//! These types describe configured data sources and the raw rows returned
//! by system-catalog queries, independent of the underlying driver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::error::EngineError;
use crate::observability::Sensitive;

/// Database engine declared by a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineType {
    MySql,
    PostgreSql,
    Oracle,
    SqlServer,
    Db2,
    Hive,
    ClickHouse,
    Doris,
}

impl EngineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "MYSQL",
            Self::PostgreSql => "POSTGRESQL",
            Self::Oracle => "ORACLE",
            Self::SqlServer => "SQLSERVER",
            Self::Db2 => "DB2",
            Self::Hive => "HIVE",
            Self::ClickHouse => "CLICKHOUSE",
            Self::Doris => "DORIS",
        }
    }

    /// Classic OLTP engines with a standard relational catalog
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            Self::MySql | Self::PostgreSql | Self::Oracle | Self::SqlServer | Self::Db2
        )
    }

    pub fn is_analytical(&self) -> bool {
        matches!(self, Self::ClickHouse | Self::Doris)
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MYSQL" => Ok(Self::MySql),
            "POSTGRESQL" | "POSTGRES" => Ok(Self::PostgreSql),
            "ORACLE" => Ok(Self::Oracle),
            "SQLSERVER" => Ok(Self::SqlServer),
            "DB2" => Ok(Self::Db2),
            "HIVE" => Ok(Self::Hive),
            "CLICKHOUSE" => Ok(Self::ClickHouse),
            "DORIS" => Ok(Self::Doris),
            other => Err(EngineError::unsupported_engine(other)),
        }
    }
}

/// A configured data source, as returned by the data-source directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    pub name: String,
    pub engine: EngineType,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Sensitive<String>,
    pub database: String,
}

/// A single value read from a catalog row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// One row of a system-catalog query, addressed by column label.
///
/// Labels are lower-cased on construction so dialects that upper-case
/// `information_schema` column names can be read with the same accessors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogRow {
    columns: Vec<(String, Value)>,
}

impl CatalogRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, label: &str, value: Value) -> Self {
        self.push(label, value);
        self
    }

    pub fn push(&mut self, label: &str, value: Value) {
        self.columns.push((label.to_ascii_lowercase(), value));
    }

    pub fn get(&self, label: &str) -> Option<&Value> {
        let label = label.to_ascii_lowercase();
        self.columns
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, value)| value)
    }

    /// Reads a text column; numbers are rendered, bytes decoded as UTF-8.
    pub fn get_str(&self, label: &str) -> Option<String> {
        match self.get(label)? {
            Value::Text(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Bytes(b) => String::from_utf8(b.clone()).ok(),
            Value::Null => None,
        }
    }

    pub fn get_i64(&self, label: &str) -> Option<i64> {
        match self.get(label)? {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Reads a flag column; accepts booleans, 0/1 and `YES`/`NO` style text.
    pub fn get_bool(&self, label: &str) -> bool {
        match self.get(label) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Int(i)) => *i != 0,
            Some(Value::Text(s)) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "t" | "true" | "y" | "yes"
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_type_parses_and_displays() {
        assert_eq!("mysql".parse::<EngineType>().unwrap(), EngineType::MySql);
        assert_eq!(
            "PostgreSQL".parse::<EngineType>().unwrap(),
            EngineType::PostgreSql
        );
        assert_eq!(EngineType::ClickHouse.to_string(), "CLICKHOUSE");
        assert!(matches!(
            "mongo".parse::<EngineType>(),
            Err(EngineError::UnsupportedEngine { .. })
        ));
    }

    #[test]
    fn engine_type_classification() {
        assert!(EngineType::MySql.is_relational());
        assert!(!EngineType::Hive.is_relational());
        assert!(EngineType::Doris.is_analytical());
    }

    #[test]
    fn catalog_row_accessors_are_case_insensitive() {
        let row = CatalogRow::new()
            .with("COLUMN_NAME", Value::Text("id".into()))
            .with("ORDINAL_POSITION", Value::Int(1))
            .with("IS_NULLABLE", Value::Text("NO".into()))
            .with("COLUMN_DEFAULT", Value::Null)
            .with("TABLE_ROWS", Value::Text("42".into()));

        assert_eq!(row.get_str("column_name").as_deref(), Some("id"));
        assert_eq!(row.get_i64("ordinal_position"), Some(1));
        assert!(!row.get_bool("is_nullable"));
        assert_eq!(row.get_str("column_default"), None);
        assert_eq!(row.get_i64("table_rows"), Some(42));
        assert_eq!(row.get_i64("missing"), None);
    }

    #[test]
    fn data_source_password_is_redacted() {
        let source = DataSource {
            id: "ds-1".into(),
            name: "orders".into(),
            engine: EngineType::MySql,
            host: "localhost".into(),
            port: 3306,
            username: "app".into(),
            password: Sensitive::new("hunter2".into()),
            database: "orders".into(),
        };
        let debug = format!("{:?}", source);
        assert!(!debug.contains("hunter2"));
        let json = serde_json::to_string(&source).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
