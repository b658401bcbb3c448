//! PostgreSQL implementation of the range store.
//!
//! Every table shares one `range_items` relation: the primary key columns
//! hold the table name and the item's base key, and the item itself is a
//! JSONB document. Secondary indexes are expression indexes over the
//! item's key attributes.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::cursor::ScanPosition;
use super::query::{
    Item, KeySchema, QueryPage, QuerySpec, ScanDirection, SortKeyCondition, TableDefinition,
};
use super::{MAX_BATCH_ITEMS, RangeStore};
use crate::error::GatewayError;

const UPSERT_SQL: &str = "INSERT INTO range_items (table_name, partition_key, sort_key, item) \
     VALUES ($1, $2, $3, $4) \
     ON CONFLICT (table_name, partition_key, sort_key) DO UPDATE SET item = EXCLUDED.item";

/// PostgreSQL-backed range store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresRangeStore {
    pool: PgPool,
    tables: HashMap<String, TableDefinition>,
}

impl PostgresRangeStore {
    /// Creates a store over the given connection pool and tables.
    #[must_use]
    pub fn new(pool: PgPool, tables: Vec<TableDefinition>) -> Self {
        let tables = tables.into_iter().map(|t| (t.name.clone(), t)).collect();
        Self { pool, tables }
    }

    /// Creates the item relation and one expression index per secondary
    /// index when they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreWriteFailed`] on database failure or
    /// when an index attribute name is not a plain identifier.
    pub async fn ensure_schema(&self) -> Result<(), GatewayError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS range_items (\
                table_name TEXT NOT NULL, \
                partition_key TEXT NOT NULL, \
                sort_key BIGINT NOT NULL, \
                item JSONB NOT NULL, \
                PRIMARY KEY (table_name, partition_key, sort_key))",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::StoreWriteFailed(e.to_string()))?;

        for table in self.tables.values() {
            for index in &table.indexes {
                let partition = attr_literal(&index.key.partition_key)
                    .map_err(GatewayError::StoreWriteFailed)?;
                let sort =
                    attr_literal(&index.key.sort_key).map_err(GatewayError::StoreWriteFailed)?;
                let index_name = format!("{}_{}", table.name, index.name).replace('-', "_");
                let name = attr_literal(&index_name).map_err(GatewayError::StoreWriteFailed)?;
                let ddl = format!(
                    "CREATE INDEX IF NOT EXISTS idx_{name} ON range_items \
                     (table_name, (item->>'{partition}'), ((item->>'{sort}')::bigint))"
                );
                sqlx::query(&ddl)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| GatewayError::StoreWriteFailed(e.to_string()))?;
            }
        }

        tracing::info!(tables = self.tables.len(), "range store schema ready");
        Ok(())
    }

    fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.get(name)
    }
}

/// Validates an attribute name for inlining into SQL.
fn attr_literal(name: &str) -> Result<&str, String> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(format!("attribute name '{name}' is not a plain identifier"))
    }
}

/// SQL expressions yielding the partition and sort values of the scanned
/// key schema.
fn key_expressions(
    index: Option<&str>,
    schema: &KeySchema,
) -> Result<(String, String), String> {
    if index.is_none() {
        return Ok(("partition_key".to_string(), "sort_key".to_string()));
    }
    let partition = attr_literal(&schema.partition_key)?;
    let sort = attr_literal(&schema.sort_key)?;
    Ok((
        format!("(item->>'{partition}')"),
        format!("((item->>'{sort}')::bigint)"),
    ))
}

#[async_trait]
impl RangeStore for PostgresRangeStore {
    async fn put(&self, table: &str, item: Item) -> Result<(), GatewayError> {
        let definition = self
            .table(table)
            .ok_or_else(|| GatewayError::StoreWriteFailed(format!("unknown table '{table}'")))?;
        let (partition, sort) = definition
            .key
            .key_of(&item)
            .map_err(|reason| {
                GatewayError::StoreWriteFailed(format!("table '{table}': {reason}"))
            })?;

        sqlx::query(UPSERT_SQL)
            .bind(table)
            .bind(partition)
            .bind(sort)
            .bind(serde_json::Value::Object(item))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                GatewayError::StoreWriteFailed(format!("insert into table '{table}': {e}"))
            })?;
        Ok(())
    }

    async fn batch_put(&self, table: &str, items: Vec<Item>) -> Result<(), GatewayError> {
        if items.len() > MAX_BATCH_ITEMS {
            return Err(GatewayError::StoreWriteFailed(format!(
                "batch of {} items exceeds the limit of {MAX_BATCH_ITEMS}",
                items.len()
            )));
        }
        let definition = self
            .table(table)
            .ok_or_else(|| GatewayError::StoreWriteFailed(format!("unknown table '{table}'")))?;

        let keyed = items
            .into_iter()
            .map(|item| {
                let key = definition.key.key_of(&item).map_err(|reason| {
                    GatewayError::StoreWriteFailed(format!("table '{table}': {reason}"))
                })?;
                Ok((key, item))
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;

        let write_err = |e: sqlx::Error| {
            GatewayError::StoreWriteFailed(format!("batch into table '{table}': {e}"))
        };

        // One transaction per call: a batch lands entirely or not at all.
        let mut tx = self.pool.begin().await.map_err(write_err)?;
        for ((partition, sort), item) in keyed {
            sqlx::query(UPSERT_SQL)
                .bind(table)
                .bind(partition)
                .bind(sort)
                .bind(serde_json::Value::Object(item))
                .execute(&mut *tx)
                .await
                .map_err(write_err)?;
        }
        tx.commit().await.map_err(write_err)?;
        Ok(())
    }

    async fn query(&self, table: &str, spec: &QuerySpec) -> Result<QueryPage, GatewayError> {
        if spec.limit == 0 {
            return Err(GatewayError::QueryFailed(
                "limit must be at least 1".to_string(),
            ));
        }
        let start = spec
            .start
            .as_ref()
            .map(ScanPosition::decode)
            .transpose()
            .map_err(GatewayError::ValidationFailed)?;

        let definition = self
            .table(table)
            .ok_or_else(|| GatewayError::QueryFailed(format!("unknown table '{table}'")))?;
        let schema = definition
            .schema_for(spec.index.as_deref())
            .map_err(GatewayError::QueryFailed)?;
        let (partition_expr, sort_expr) =
            key_expressions(spec.index.as_deref(), schema).map_err(GatewayError::QueryFailed)?;

        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT ");
        qb.push(&sort_expr)
            .push(", partition_key, sort_key, item FROM range_items WHERE table_name = ")
            .push_bind(table)
            .push(" AND ")
            .push(&partition_expr)
            .push(" = ")
            .push_bind(spec.partition.as_str());

        match spec.sort_range {
            Some(SortKeyCondition::Between(lo, hi)) => {
                qb.push(" AND ").push(&sort_expr).push(" BETWEEN ").push_bind(lo);
                qb.push(" AND ").push_bind(hi);
            }
            Some(SortKeyCondition::AtLeast(lo)) => {
                qb.push(" AND ").push(&sort_expr).push(" >= ").push_bind(lo);
            }
            Some(SortKeyCondition::AtMost(hi)) => {
                qb.push(" AND ").push(&sort_expr).push(" <= ").push_bind(hi);
            }
            None => {}
        }

        let (cmp, order) = match spec.direction {
            ScanDirection::Forward => (">", "ASC"),
            ScanDirection::Backward => ("<", "DESC"),
        };
        if let Some(after) = &start {
            qb.push(" AND (")
                .push(&sort_expr)
                .push(", partition_key, sort_key) ")
                .push(cmp)
                .push(" (")
                .push_bind(after.sort)
                .push(", ")
                .push_bind(after.base_partition.clone())
                .push(", ")
                .push_bind(after.base_sort)
                .push(")");
        }

        qb.push(format!(
            " ORDER BY {sort_expr} {order}, partition_key {order}, sort_key {order} LIMIT "
        ));
        qb.push_bind(i64::try_from(spec.limit.saturating_add(1)).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<(i64, String, i64, serde_json::Value)>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GatewayError::QueryFailed(format!("table '{table}': {e}")))?;

        let has_more = rows.len() > spec.limit;
        let mut scanned = rows;
        scanned.truncate(spec.limit);

        let cursor = if has_more {
            scanned
                .last()
                .map(|(sort, base_partition, base_sort, _)| {
                    ScanPosition {
                        sort: *sort,
                        base_partition: base_partition.clone(),
                        base_sort: *base_sort,
                    }
                    .encode()
                })
        } else {
            None
        };

        let items = scanned
            .into_iter()
            .filter_map(|(_, _, _, value)| match value {
                serde_json::Value::Object(item) => Some(item),
                _ => None,
            })
            .filter(|item| spec.filter.as_ref().is_none_or(|f| f.matches(item)))
            .collect();

        Ok(QueryPage { items, cursor })
    }
}
