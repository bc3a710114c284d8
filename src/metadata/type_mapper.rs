// SPDX-License-Identifier: Apache-2.0

//! Native type → canonical type mapping
//!
//! Each dialect supplies a static rule table. Rules are tried in three
//! passes: native type code, exact lower-cased type name, then substring of
//! the lower-cased type name (in table order). Anything left unmatched maps
//! to [`ColumnType::Varchar`], so mapping never fails.

use super::model::ColumnType;

/// A single matching rule of a dialect table
#[derive(Debug, Clone, Copy)]
pub enum TypeRule {
    /// Native numeric type identifier (e.g. a PostgreSQL type OID)
    Code(i64, ColumnType),
    /// Whole lower-cased type name
    Name(&'static str, ColumnType),
    /// Substring of the lower-cased type name
    Contains(&'static str, ColumnType),
}

#[derive(Debug, Clone, Copy)]
pub struct TypeMapper {
    rules: &'static [TypeRule],
}

impl TypeMapper {
    pub const FALLBACK: ColumnType = ColumnType::Varchar;

    pub const fn new(rules: &'static [TypeRule]) -> Self {
        Self { rules }
    }

    pub fn map(&self, native_code: Option<i64>, native_name: &str) -> ColumnType {
        if let Some(code) = native_code {
            for rule in self.rules {
                if let TypeRule::Code(c, ty) = rule {
                    if *c == code {
                        return *ty;
                    }
                }
            }
        }

        let name = normalize(native_name);
        for rule in self.rules {
            if let TypeRule::Name(n, ty) = rule {
                if *n == name {
                    return *ty;
                }
            }
        }
        for rule in self.rules {
            if let TypeRule::Contains(fragment, ty) = rule {
                if name.contains(fragment) {
                    return *ty;
                }
            }
        }

        Self::FALLBACK
    }
}

/// Lower-cases and strips length / modifier suffixes: `varchar(255)` → `varchar`,
/// `int unsigned` stays intact.
fn normalize(native_name: &str) -> String {
    let lower = native_name.trim().to_ascii_lowercase();
    match lower.find('(') {
        Some(pos) => {
            let mut base = lower[..pos].trim_end().to_string();
            if let Some(close) = lower[pos..].find(')') {
                let rest = lower[pos + close + 1..].trim();
                if !rest.is_empty() {
                    base.push(' ');
                    base.push_str(rest);
                }
            }
            base
        }
        None => lower,
    }
}

/// MySQL `information_schema.COLUMNS.DATA_TYPE` vocabulary
pub const MYSQL_TYPE_RULES: &[TypeRule] = &[
    TypeRule::Name("tinyint", ColumnType::TinyInt),
    TypeRule::Name("bool", ColumnType::Boolean),
    TypeRule::Name("boolean", ColumnType::Boolean),
    TypeRule::Name("bit", ColumnType::Boolean),
    TypeRule::Name("smallint", ColumnType::SmallInt),
    TypeRule::Name("mediumint", ColumnType::Integer),
    TypeRule::Name("int", ColumnType::Integer),
    TypeRule::Name("integer", ColumnType::Integer),
    TypeRule::Name("bigint", ColumnType::BigInt),
    TypeRule::Name("float", ColumnType::Float),
    TypeRule::Name("double", ColumnType::Double),
    TypeRule::Name("double precision", ColumnType::Double),
    TypeRule::Name("real", ColumnType::Double),
    TypeRule::Name("decimal", ColumnType::Decimal),
    TypeRule::Name("numeric", ColumnType::Decimal),
    TypeRule::Name("char", ColumnType::Char),
    TypeRule::Name("varchar", ColumnType::Varchar),
    TypeRule::Name("tinytext", ColumnType::Text),
    TypeRule::Name("text", ColumnType::Text),
    TypeRule::Name("mediumtext", ColumnType::Text),
    TypeRule::Name("longtext", ColumnType::Text),
    TypeRule::Name("date", ColumnType::Date),
    TypeRule::Name("year", ColumnType::Date),
    TypeRule::Name("time", ColumnType::Time),
    TypeRule::Name("datetime", ColumnType::Timestamp),
    TypeRule::Name("timestamp", ColumnType::Timestamp),
    TypeRule::Name("binary", ColumnType::Binary),
    TypeRule::Name("varbinary", ColumnType::VarBinary),
    TypeRule::Name("tinyblob", ColumnType::Blob),
    TypeRule::Name("blob", ColumnType::Blob),
    TypeRule::Name("mediumblob", ColumnType::Blob),
    TypeRule::Name("longblob", ColumnType::Blob),
    TypeRule::Name("json", ColumnType::Json),
    // spatial names that would otherwise hit the "int" substring rule
    TypeRule::Name("point", ColumnType::Varchar),
    TypeRule::Name("multipoint", ColumnType::Varchar),
    // COLUMN_TYPE spellings such as "int unsigned" or "bigint unsigned zerofill"
    TypeRule::Contains("bigint", ColumnType::BigInt),
    TypeRule::Contains("smallint", ColumnType::SmallInt),
    TypeRule::Contains("tinyint", ColumnType::TinyInt),
    TypeRule::Contains("int", ColumnType::Integer),
    TypeRule::Contains("json", ColumnType::Json),
];

/// PostgreSQL type OIDs plus `format_type()` spellings
pub const POSTGRES_TYPE_RULES: &[TypeRule] = &[
    TypeRule::Code(16, ColumnType::Boolean),
    TypeRule::Code(17, ColumnType::Binary),
    TypeRule::Code(18, ColumnType::Char),
    TypeRule::Code(20, ColumnType::BigInt),
    TypeRule::Code(21, ColumnType::SmallInt),
    TypeRule::Code(23, ColumnType::Integer),
    TypeRule::Code(25, ColumnType::Text),
    TypeRule::Code(114, ColumnType::Json),
    TypeRule::Code(700, ColumnType::Float),
    TypeRule::Code(701, ColumnType::Double),
    TypeRule::Code(1042, ColumnType::Char),
    TypeRule::Code(1043, ColumnType::Varchar),
    TypeRule::Code(1082, ColumnType::Date),
    TypeRule::Code(1083, ColumnType::Time),
    TypeRule::Code(1114, ColumnType::Timestamp),
    TypeRule::Code(1184, ColumnType::Timestamp),
    TypeRule::Code(1266, ColumnType::Time),
    TypeRule::Code(1700, ColumnType::Decimal),
    TypeRule::Code(3802, ColumnType::Json),
    TypeRule::Name("boolean", ColumnType::Boolean),
    TypeRule::Name("bytea", ColumnType::Binary),
    TypeRule::Name("smallint", ColumnType::SmallInt),
    TypeRule::Name("integer", ColumnType::Integer),
    TypeRule::Name("bigint", ColumnType::BigInt),
    TypeRule::Name("real", ColumnType::Float),
    TypeRule::Name("double precision", ColumnType::Double),
    TypeRule::Name("numeric", ColumnType::Decimal),
    TypeRule::Name("money", ColumnType::Decimal),
    TypeRule::Name("character", ColumnType::Char),
    TypeRule::Name("character varying", ColumnType::Varchar),
    TypeRule::Name("text", ColumnType::Text),
    TypeRule::Name("date", ColumnType::Date),
    TypeRule::Name("json", ColumnType::Json),
    TypeRule::Name("jsonb", ColumnType::Json),
    TypeRule::Name("interval", ColumnType::Varchar),
    TypeRule::Name("point", ColumnType::Varchar),
    TypeRule::Contains("json", ColumnType::Json),
    TypeRule::Contains("bytea", ColumnType::Binary),
    TypeRule::Contains("numeric", ColumnType::Decimal),
    TypeRule::Contains("decimal", ColumnType::Decimal),
    TypeRule::Contains("double", ColumnType::Double),
    TypeRule::Contains("timestamp", ColumnType::Timestamp),
    TypeRule::Contains("time", ColumnType::Time),
    TypeRule::Contains("bool", ColumnType::Boolean),
    TypeRule::Contains("bigint", ColumnType::BigInt),
    TypeRule::Contains("smallint", ColumnType::SmallInt),
    TypeRule::Contains("int", ColumnType::Integer),
    TypeRule::Contains("serial", ColumnType::Integer),
    TypeRule::Contains("text", ColumnType::Text),
];

pub const MYSQL: TypeMapper = TypeMapper::new(MYSQL_TYPE_RULES);
pub const POSTGRES: TypeMapper = TypeMapper::new(POSTGRES_TYPE_RULES);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_names_map_to_canonical_types() {
        assert_eq!(MYSQL.map(None, "INT"), ColumnType::Integer);
        assert_eq!(MYSQL.map(None, "varchar"), ColumnType::Varchar);
        assert_eq!(MYSQL.map(None, "varchar(255)"), ColumnType::Varchar);
        assert_eq!(MYSQL.map(None, "longtext"), ColumnType::Text);
        assert_eq!(MYSQL.map(None, "datetime"), ColumnType::Timestamp);
        assert_eq!(MYSQL.map(None, "json"), ColumnType::Json);
        assert_eq!(MYSQL.map(None, "bigint unsigned"), ColumnType::BigInt);
        assert_eq!(MYSQL.map(None, "int(10) unsigned"), ColumnType::Integer);
        assert_eq!(MYSQL.map(None, "mediumblob"), ColumnType::Blob);
    }

    #[test]
    fn postgres_codes_take_precedence_over_names() {
        assert_eq!(POSTGRES.map(Some(3802), "jsonb"), ColumnType::Json);
        assert_eq!(POSTGRES.map(Some(1043), "character varying(64)"), ColumnType::Varchar);
        assert_eq!(POSTGRES.map(Some(20), "whatever"), ColumnType::BigInt);
        assert_eq!(POSTGRES.map(Some(1184), "timestamp with time zone"), ColumnType::Timestamp);
    }

    #[test]
    fn postgres_names_fall_back_to_substrings() {
        assert_eq!(POSTGRES.map(None, "numeric(10,2)"), ColumnType::Decimal);
        assert_eq!(POSTGRES.map(None, "timestamp(3) without time zone"), ColumnType::Timestamp);
        assert_eq!(POSTGRES.map(None, "time without time zone"), ColumnType::Time);
        assert_eq!(POSTGRES.map(None, "bytea"), ColumnType::Binary);
        assert_eq!(POSTGRES.map(Some(99999), "integer[]"), ColumnType::Integer);
    }

    #[test]
    fn unknown_types_fall_back_to_varchar() {
        for mapper in [MYSQL, POSTGRES] {
            assert_eq!(mapper.map(None, "geometry"), ColumnType::Varchar);
            assert_eq!(mapper.map(Some(-1), ""), ColumnType::Varchar);
            assert_eq!(mapper.map(None, "enum('a','b')"), ColumnType::Varchar);
            assert_eq!(mapper.map(None, "point"), ColumnType::Varchar);
        }
    }

    #[test]
    fn mapping_is_total_over_every_rule_name() {
        for (mapper, rules) in [(MYSQL, MYSQL_TYPE_RULES), (POSTGRES, POSTGRES_TYPE_RULES)] {
            for rule in rules {
                let result = match rule {
                    TypeRule::Code(code, expected) => (mapper.map(Some(*code), ""), *expected),
                    TypeRule::Name(name, expected) => (mapper.map(None, name), *expected),
                    TypeRule::Contains(_, _) => continue,
                };
                assert_eq!(result.0, result.1);
                assert!(ColumnType::ALL.contains(&result.0));
            }
        }
    }
}
