// SPDX-License-Identifier: Apache-2.0

//! In-memory catalog graph
//!
//! A [`TableMetadata`] exclusively owns its columns and indexes. Children do
//! not point back to their table; the owning table is always the container
//! they are reached through.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::error::{EngineError, EngineResult};

/// Canonical column type every dialect-native type is mapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Double,
    Decimal,
    Char,
    Varchar,
    Text,
    Date,
    Time,
    Timestamp,
    Boolean,
    Binary,
    VarBinary,
    Blob,
    Json,
}

impl ColumnType {
    pub const ALL: [ColumnType; 18] = [
        Self::TinyInt,
        Self::SmallInt,
        Self::Integer,
        Self::BigInt,
        Self::Float,
        Self::Double,
        Self::Decimal,
        Self::Char,
        Self::Varchar,
        Self::Text,
        Self::Date,
        Self::Time,
        Self::Timestamp,
        Self::Boolean,
        Self::Binary,
        Self::VarBinary,
        Self::Blob,
        Self::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Decimal => "DECIMAL",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::Text => "TEXT",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Boolean => "BOOLEAN",
            Self::Binary => "BINARY",
            Self::VarBinary => "VARBINARY",
            Self::Blob => "BLOB",
            Self::Json => "JSON",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::validation(format!("Unknown column type: {}", s)))
    }
}

/// One column of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub column_type: ColumnType,
    /// Declared length (character types) or total digits (numeric types)
    pub length: Option<i32>,
    /// Fractional digits of numeric types
    pub precision: Option<i32>,
    pub nullable: bool,
    /// 1-based position within the table, assigned by [`TableMetadata::add_column`]
    pub ordinal_position: i32,
    pub default_value: Option<String>,
    pub comment: Option<String>,
    pub primary_key: bool,
    pub auto_increment: bool,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            length: None,
            precision: None,
            nullable: true,
            ordinal_position: 0,
            default_value: None,
            comment: None,
            primary_key: false,
            auto_increment: false,
        }
    }
}

/// One index of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub name: String,
    pub unique: bool,
    /// Estimated number of distinct keys, when the dialect exposes it cheaply
    pub cardinality: Option<i64>,
    pub size_bytes: Option<i64>,
    /// Participating columns in index key order
    pub columns: Vec<String>,
}

impl IndexMetadata {
    pub fn new(name: impl Into<String>, unique: bool) -> Self {
        Self {
            name: name.into(),
            unique,
            cardinality: None,
            size_bytes: None,
            columns: Vec::new(),
        }
    }

    /// Appends a key column. Empty names and columns already in the key
    /// are ignored.
    pub fn add_column(&mut self, column: impl Into<String>) {
        let column = column.into();
        if column.is_empty() || self.columns.contains(&column) {
            return;
        }
        self.columns.push(column);
    }
}

/// One physical table (or view) and everything it owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub data_source_id: String,
    pub schema: String,
    pub name: String,
    pub comment: Option<String>,
    pub row_count: Option<i64>,
    pub data_size: Option<i64>,
    pub index_size: Option<i64>,
    columns: Vec<ColumnMetadata>,
    indexes: Vec<IndexMetadata>,
}

impl TableMetadata {
    pub fn new(
        data_source_id: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            data_source_id: data_source_id.into(),
            schema: schema.into(),
            name: name.into(),
            comment: None,
            row_count: None,
            data_size: None,
            index_size: None,
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn indexes(&self) -> &[IndexMetadata] {
        &self.indexes
    }

    /// Appends a column and assigns it the next ordinal position.
    ///
    /// Ordinals stay dense (1..N) even when the source catalog has gaps,
    /// e.g. after dropped PostgreSQL columns.
    pub fn add_column(&mut self, mut column: ColumnMetadata) -> EngineResult<()> {
        if self.column(&column.name).is_some() {
            return Err(EngineError::validation(format!(
                "Duplicate column {} in table {}",
                column.name,
                self.qualified_name()
            )));
        }
        column.ordinal_position = self.columns.len() as i32 + 1;
        self.columns.push(column);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut ColumnMetadata> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Flags the named columns as primary key. Unknown names are ignored;
    /// the column list is authoritative.
    pub fn mark_primary_key<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            if let Some(column) = self.column_mut(name) {
                column.primary_key = true;
            }
        }
    }

    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn add_index(&mut self, index: IndexMetadata) {
        self.indexes.push(index);
    }

    pub fn index(&self, name: &str) -> Option<&IndexMetadata> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn index_mut(&mut self, name: &str) -> Option<&mut IndexMetadata> {
        self.indexes.iter_mut().find(|i| i.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_string_forms_round_trip() {
        for ty in ColumnType::ALL {
            assert_eq!(ty.as_str().parse::<ColumnType>().unwrap(), ty);
        }
        assert_eq!("varchar".parse::<ColumnType>().unwrap(), ColumnType::Varchar);
        assert!("GEOMETRY".parse::<ColumnType>().is_err());
    }

    #[test]
    fn ordinals_are_dense_in_insertion_order() {
        let mut table = TableMetadata::new("ds", "app", "users");
        for (name, native_pos) in [("id", 1), ("email", 3), ("created_at", 7)] {
            let mut column = ColumnMetadata::new(name, ColumnType::Varchar);
            column.ordinal_position = native_pos;
            table.add_column(column).unwrap();
        }

        let ordinals: Vec<i32> = table.columns().iter().map(|c| c.ordinal_position).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
        assert_eq!(table.columns()[1].name, "email");
    }

    #[test]
    fn duplicate_column_names_are_rejected() {
        let mut table = TableMetadata::new("ds", "app", "users");
        table.add_column(ColumnMetadata::new("id", ColumnType::Integer)).unwrap();
        let err = table
            .add_column(ColumnMetadata::new("id", ColumnType::BigInt))
            .unwrap_err();
        assert!(matches!(err, EngineError::ValidationError { .. }));
        assert_eq!(table.columns().len(), 1);
    }

    #[test]
    fn index_key_skips_repeated_and_empty_names() {
        let mut index = IndexMetadata::new("idx_a_b", false);
        for column in ["a", "a", "", "b", "b"] {
            index.add_column(column);
        }
        assert_eq!(index.columns, vec!["a", "b"]);
    }

    #[test]
    fn primary_key_merge_ignores_unknown_columns() {
        let mut table = TableMetadata::new("ds", "app", "orders");
        table.add_column(ColumnMetadata::new("id", ColumnType::BigInt)).unwrap();
        table.add_column(ColumnMetadata::new("sku", ColumnType::Varchar)).unwrap();

        table.mark_primary_key(["id", "ghost"]);

        assert_eq!(table.primary_key(), vec!["id"]);
        assert!(table.column("ghost").is_none());
    }
}
