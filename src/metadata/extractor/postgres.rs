// SPDX-License-Identifier: Apache-2.0

//! PostgreSQL catalog extractor
//!
//! Columns, keys and indexes are read from `pg_catalog` directly so that
//! type OIDs, dropped-column gaps and index key order are visible.
//! Index key columns are the attributes of the index relation itself,
//! ordered by attribute number.

use async_trait::async_trait;
use tracing::instrument;

use crate::engine::error::EngineResult;
use crate::engine::traits::CatalogConnection;
use crate::engine::types::EngineType;
use crate::metadata::model::TableMetadata;
use crate::metadata::retry::RetryPolicy;
use crate::metadata::type_mapper;

use super::{column_values, fetch_rows, introspect_table, is_system_table, CatalogQueries, MetadataExtractor};

pub const QUERIES: CatalogQueries = CatalogQueries {
    schemas: "SELECT nspname::text AS schema_name \
              FROM pg_catalog.pg_namespace \
              ORDER BY nspname",
    tables: "SELECT table_name::text AS table_name \
             FROM information_schema.tables \
             WHERE table_schema = $1 AND table_type IN ('BASE TABLE', 'VIEW') \
             ORDER BY table_name",
    table_stats: "SELECT obj_description(c.oid, 'pg_class') AS table_comment, \
                  pg_stat_get_live_tuples(c.oid) AS row_count, \
                  CASE WHEN c.relkind IN ('r', 'p', 'm') \
                       THEN pg_total_relation_size(c.oid) - pg_indexes_size(c.oid) END AS data_size, \
                  CASE WHEN c.relkind IN ('r', 'p', 'm') THEN pg_indexes_size(c.oid) END AS index_size \
                  FROM pg_catalog.pg_class c \
                  JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
                  WHERE n.nspname = $1 AND c.relname = $2 \
                  AND c.relkind IN ('r', 'p', 'v', 'm', 'f')",
    columns: "SELECT a.attname::text AS column_name, \
              pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type, \
              a.atttypid::bigint AS type_code, \
              CASE WHEN a.atttypid IN (1042, 1043) AND a.atttypmod > 4 THEN a.atttypmod - 4 \
                   WHEN a.atttypid = 1700 AND a.atttypmod > 4 THEN ((a.atttypmod - 4) >> 16) & 65535 \
              END AS column_length, \
              CASE WHEN a.atttypid = 1700 AND a.atttypmod > 4 THEN (a.atttypmod - 4) & 65535 \
              END AS column_precision, \
              NOT a.attnotnull AS is_nullable, \
              pg_catalog.pg_get_expr(d.adbin, d.adrelid) AS column_default, \
              pg_catalog.col_description(a.attrelid, a.attnum) AS column_comment, \
              (a.attidentity IN ('a', 'd') \
               OR COALESCE(pg_catalog.pg_get_expr(d.adbin, d.adrelid), '') LIKE 'nextval(%') AS is_auto_increment \
              FROM pg_catalog.pg_attribute a \
              JOIN pg_catalog.pg_class c ON c.oid = a.attrelid \
              JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
              LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum \
              WHERE n.nspname = $1 AND c.relname = $2 \
              AND a.attnum > 0 AND NOT a.attisdropped \
              ORDER BY a.attnum",
    primary_keys: "SELECT a.attname::text AS column_name \
                   FROM pg_catalog.pg_index i \
                   JOIN pg_catalog.pg_class c ON c.oid = i.indrelid \
                   JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
                   JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(i.indkey) \
                   WHERE i.indisprimary AND n.nspname = $1 AND c.relname = $2 \
                   ORDER BY array_position(i.indkey::int2[], a.attnum)",
    indexes: "SELECT ic.relname::text AS index_name, \
              ix.indisunique AS is_unique, \
              a.attname::text AS column_name, \
              pg_catalog.pg_relation_size(ic.oid) AS index_size, \
              CASE WHEN a.attnum = 1 AND s.n_distinct > 0 THEN s.n_distinct::bigint END AS cardinality \
              FROM pg_catalog.pg_index ix \
              JOIN pg_catalog.pg_class ic ON ic.oid = ix.indexrelid \
              JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid \
              JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace \
              JOIN pg_catalog.pg_attribute a ON a.attrelid = ic.oid \
              LEFT JOIN LATERAL ( \
                SELECT st.n_distinct FROM pg_catalog.pg_stats st \
                WHERE st.schemaname = n.nspname AND st.tablename = t.relname AND st.attname = a.attname \
                ORDER BY st.inherited \
                LIMIT 1 \
              ) s ON true \
              WHERE n.nspname = $1 AND t.relname = $2 \
              AND a.attnum > 0 AND a.attnum <= ix.indnkeyatts \
              ORDER BY ic.relname, a.attnum",
};

/// `pg_*` schemas (including `pg_toast` and temp schemas) and `information_schema`
pub fn is_system_schema(name: &str) -> bool {
    name.starts_with("pg_") || name == "information_schema"
}

pub struct PostgresExtractor {
    retry: RetryPolicy,
}

impl PostgresExtractor {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }
}

impl Default for PostgresExtractor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[async_trait]
impl MetadataExtractor for PostgresExtractor {
    fn extractor_id(&self) -> &'static str {
        "postgres"
    }

    fn supports(&self, engine: EngineType) -> bool {
        engine == EngineType::PostgreSql
    }

    async fn get_schemas(&self, conn: &mut dyn CatalogConnection) -> EngineResult<Vec<String>> {
        let rows = fetch_rows(conn, &self.retry, QUERIES.schemas, &[]).await?;
        Ok(column_values(&rows, "schema_name")
            .into_iter()
            .filter(|s| !is_system_schema(s))
            .collect())
    }

    async fn get_tables(
        &self,
        conn: &mut dyn CatalogConnection,
        schema: &str,
    ) -> EngineResult<Vec<String>> {
        let rows = fetch_rows(conn, &self.retry, QUERIES.tables, &[schema]).await?;
        Ok(column_values(&rows, "table_name")
            .into_iter()
            .filter(|t| !is_system_table(t))
            .collect())
    }

    #[instrument(skip(self, conn), fields(extractor = "postgres"))]
    async fn extract_table(
        &self,
        conn: &mut dyn CatalogConnection,
        data_source_id: &str,
        schema: &str,
        table: &str,
    ) -> EngineResult<Option<TableMetadata>> {
        introspect_table(
            conn,
            &self.retry,
            &QUERIES,
            &type_mapper::POSTGRES,
            data_source_id,
            schema,
            table,
        )
        .await
    }
}
