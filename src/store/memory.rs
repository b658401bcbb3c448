//! In-process range store.
//!
//! Keeps each table in a `BTreeMap` keyed by primary key behind a
//! [`tokio::sync::RwLock`]. Query semantics match the PostgreSQL backend:
//! scan the key range in the requested direction, stop after `limit`
//! candidates, then filter.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::cursor::ScanPosition;
use super::query::{Item, QueryPage, QuerySpec, ScanDirection, TableDefinition};
use super::{MAX_BATCH_ITEMS, RangeStore};
use crate::error::GatewayError;

#[derive(Debug)]
struct MemoryTable {
    definition: TableDefinition,
    items: BTreeMap<(String, i64), Item>,
}

/// Range store held entirely in memory.
#[derive(Debug)]
pub struct MemoryRangeStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryRangeStore {
    /// Creates an empty store with the given tables.
    #[must_use]
    pub fn new(tables: Vec<TableDefinition>) -> Self {
        let tables = tables
            .into_iter()
            .map(|definition| {
                (
                    definition.name.clone(),
                    MemoryTable {
                        definition,
                        items: BTreeMap::new(),
                    },
                )
            })
            .collect();
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Number of items currently stored in `table`.
    pub async fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map_or(0, |t| t.items.len())
    }
}

fn insert(table: &mut MemoryTable, item: Item) -> Result<(), GatewayError> {
    let key = table.definition.key.key_of(&item).map_err(|reason| {
        GatewayError::StoreWriteFailed(format!("table '{}': {reason}", table.definition.name))
    })?;
    table.items.insert(key, item);
    Ok(())
}

#[async_trait]
impl RangeStore for MemoryRangeStore {
    async fn put(&self, table: &str, item: Item) -> Result<(), GatewayError> {
        let mut tables = self.tables.write().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| GatewayError::StoreWriteFailed(format!("unknown table '{table}'")))?;
        insert(target, item)
    }

    async fn batch_put(&self, table: &str, items: Vec<Item>) -> Result<(), GatewayError> {
        if items.len() > MAX_BATCH_ITEMS {
            return Err(GatewayError::StoreWriteFailed(format!(
                "batch of {} items exceeds the limit of {MAX_BATCH_ITEMS}",
                items.len()
            )));
        }
        let mut tables = self.tables.write().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| GatewayError::StoreWriteFailed(format!("unknown table '{table}'")))?;

        // Validate every key first so a bad item leaves the batch unwritten.
        for item in &items {
            target.definition.key.key_of(item).map_err(|reason| {
                GatewayError::StoreWriteFailed(format!("table '{table}': {reason}"))
            })?;
        }
        for item in items {
            insert(target, item)?;
        }
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

        let tables = self.tables.read().await;
        let source = tables
            .get(table)
            .ok_or_else(|| GatewayError::QueryFailed(format!("unknown table '{table}'")))?;
        let schema = source
            .definition
            .schema_for(spec.index.as_deref())
            .map_err(GatewayError::QueryFailed)?;

        let mut candidates: Vec<(ScanPosition, &Item)> = source
            .items
            .iter()
            .filter_map(|((base_partition, base_sort), item)| {
                let (partition, sort) = schema.key_of(item).ok()?;
                if partition != spec.partition {
                    return None;
                }
                if let Some(range) = spec.sort_range
                    && !range.matches(sort)
                {
                    return None;
                }
                let position = ScanPosition {
                    sort,
                    base_partition: base_partition.clone(),
                    base_sort: *base_sort,
                };
                Some((position, item))
            })
            .collect();

        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        if spec.direction == ScanDirection::Backward {
            candidates.reverse();
        }

        let mut scanned = candidates
            .into_iter()
            .filter(|(position, _)| match (&start, spec.direction) {
                (None, _) => true,
                (Some(after), ScanDirection::Forward) => position > after,
                (Some(after), ScanDirection::Backward) => position < after,
            })
            .take(spec.limit + 1)
            .collect::<Vec<_>>();

        let has_more = scanned.len() > spec.limit;
        scanned.truncate(spec.limit);

        let cursor = if has_more {
            scanned.last().map(|(position, _)| position.encode())
        } else {
            None
        };
        let items = scanned
            .into_iter()
            .filter(|(_, item)| spec.filter.as_ref().is_none_or(|f| f.matches(item)))
            .map(|(_, item)| item.clone())
            .collect();

        Ok(QueryPage { items, cursor })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::store::query::{FilterExpr, IndexDefinition, KeySchema, SortKeyCondition};

    fn table() -> TableDefinition {
        TableDefinition {
            name: "logs".to_string(),
            key: KeySchema::new("endpoint", "ts"),
            indexes: vec![IndexDefinition {
                name: "ByDay".to_string(),
                key: KeySchema::new("day", "ts"),
            }],
        }
    }

    fn row(endpoint: &str, day: &str, ts: i64, size: f64) -> Item {
        let Value::Object(map) = json!({ "endpoint": endpoint, "day": day, "ts": ts, "size": size })
        else {
            panic!("expected object");
        };
        map
    }

    async fn seeded() -> MemoryRangeStore {
        let store = MemoryRangeStore::new(vec![table()]);
        let rows = vec![
            row("/a", "2025-01-01", 1, 1.0),
            row("/a", "2025-01-01", 2, 5.0),
            row("/a", "2025-01-02", 3, 2.0),
            row("/b", "2025-01-01", 2, 7.0),
            row("/a", "2025-01-01", 4, 3.0),
        ];
        let Ok(()) = store.batch_put("logs", rows).await else {
            panic!("seed failed");
        };
        store
    }

    fn ts_of(page: &QueryPage) -> Vec<i64> {
        page.items
            .iter()
            .filter_map(|item| item.get("ts").and_then(Value::as_i64))
            .collect()
    }

    #[tokio::test]
    async fn put_overwrites_same_primary_key() {
        let store = MemoryRangeStore::new(vec![table()]);
        let _ = store.put("logs", row("/a", "2025-01-01", 1, 1.0)).await;
        let _ = store.put("logs", row("/a", "2025-01-01", 1, 9.0)).await;
        assert_eq!(store.len("logs").await, 1);
    }

    #[tokio::test]
    async fn put_rejects_item_without_key() {
        let store = MemoryRangeStore::new(vec![table()]);
        let mut item = row("/a", "2025-01-01", 1, 1.0);
        item.remove("ts");
        let result = store.put("logs", item).await;
        assert!(matches!(result, Err(GatewayError::StoreWriteFailed(_))));
    }

    #[tokio::test]
    async fn batch_over_limit_is_rejected() {
        let store = MemoryRangeStore::new(vec![table()]);
        let rows = (0..26).map(|ts| row("/a", "2025-01-01", ts, 0.0)).collect();
        let result = store.batch_put("logs", rows).await;
        assert!(matches!(result, Err(GatewayError::StoreWriteFailed(_))));
        assert_eq!(store.len("logs").await, 0);
    }

    #[tokio::test]
    async fn query_scans_in_both_directions() {
        let store = seeded().await;
        let mut spec = QuerySpec::partition("/a", 10);
        let Ok(forward) = store.query("logs", &spec).await else {
            panic!("query failed");
        };
        assert_eq!(ts_of(&forward), vec![1, 2, 3, 4]);
        assert!(forward.cursor.is_none());

        spec.direction = ScanDirection::Backward;
        let Ok(backward) = store.query("logs", &spec).await else {
            panic!("query failed");
        };
        assert_eq!(ts_of(&backward), vec![4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn query_applies_sort_range() {
        let store = seeded().await;
        let mut spec = QuerySpec::partition("/a", 10);
        spec.sort_range = Some(SortKeyCondition::Between(2, 3));
        let Ok(page) = store.query("logs", &spec).await else {
            panic!("query failed");
        };
        assert_eq!(ts_of(&page), vec![2, 3]);
    }

    #[tokio::test]
    async fn filter_runs_after_limit() {
        let store = seeded().await;
        let mut spec = QuerySpec::partition("/a", 2);
        spec.filter = Some(FilterExpr::at_least("size", 4.0));
        let Ok(page) = store.query("logs", &spec).await else {
            panic!("query failed");
        };
        // Two candidates scanned (ts 1 and 2), only ts 2 passes the filter,
        // and the cursor still reports more data.
        assert_eq!(ts_of(&page), vec![2]);
        assert!(page.cursor.is_some());
    }

    #[tokio::test]
    async fn cursor_pages_without_duplicates() {
        let store = seeded().await;
        let mut spec = QuerySpec::partition("/a", 1);
        spec.direction = ScanDirection::Backward;
        let mut seen = Vec::new();
        loop {
            let Ok(page) = store.query("logs", &spec).await else {
                panic!("query failed");
            };
            seen.extend(ts_of(&page));
            match page.cursor {
                Some(cursor) => spec.start = Some(cursor),
                None => break,
            }
        }
        assert_eq!(seen, vec![4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn index_query_breaks_sort_ties_by_base_key() {
        let store = seeded().await;
        let mut spec = QuerySpec::partition("2025-01-01", 1);
        spec.index = Some("ByDay".to_string());
        let mut endpoints = Vec::new();
        loop {
            let Ok(page) = store.query("logs", &spec).await else {
                panic!("query failed");
            };
            endpoints.extend(
                page.items
                    .iter()
                    .filter_map(|i| i.get("endpoint").and_then(Value::as_str).map(str::to_string)),
            );
            match page.cursor {
                Some(cursor) => spec.start = Some(cursor),
                None => break,
            }
        }
        assert_eq!(endpoints, vec!["/a", "/a", "/b", "/a"]);
    }

    #[tokio::test]
    async fn unknown_index_is_a_query_failure() {
        let store = seeded().await;
        let mut spec = QuerySpec::partition("2025-01-01", 1);
        spec.index = Some("Missing".to_string());
        let result = store.query("logs", &spec).await;
        assert!(matches!(result, Err(GatewayError::QueryFailed(_))));
    }

    #[tokio::test]
    async fn malformed_cursor_is_a_validation_failure() {
        let store = seeded().await;
        let mut spec = QuerySpec::partition("/a", 1);
        spec.start = Some(crate::store::Cursor::new("%%%"));
        let result = store.query("logs", &spec).await;
        assert!(matches!(result, Err(GatewayError::ValidationFailed(_))));
    }
}
