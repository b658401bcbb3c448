//! Query-spec value types for the range store.
//!
//! A [`QuerySpec`] is the only shape in which callers talk to a
//! [`super::RangeStore`]: one partition, an optional sort-key range, an
//! optional non-key filter evaluated after the key scan, a page limit, a
//! scan direction and an optional continuation [`Cursor`].

use serde_json::{Map, Value};

use super::cursor::Cursor;

/// A stored item: a flat JSON document carrying its own key attributes.
pub type Item = Map<String, Value>;

/// Names of the partition and sort attributes of a table or index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    /// String-valued attribute grouping items into partitions.
    pub partition_key: String,
    /// Integer-valued attribute ordering items within a partition.
    pub sort_key: String,
}

impl KeySchema {
    /// Creates a key schema from the two attribute names.
    #[must_use]
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }

    /// Extracts `(partition, sort)` key values from an item.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the partition attribute
    /// is missing or not a string, or the sort attribute is missing or not
    /// an integer.
    pub fn key_of(&self, item: &Item) -> Result<(String, i64), String> {
        let partition = item
            .get(&self.partition_key)
            .and_then(Value::as_str)
            .ok_or_else(|| format!("missing string key attribute '{}'", self.partition_key))?;
        let sort = item
            .get(&self.sort_key)
            .and_then(Value::as_i64)
            .ok_or_else(|| format!("missing integer key attribute '{}'", self.sort_key))?;
        Ok((partition.to_string(), sort))
    }
}

/// A named secondary index over a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Index name used in [`QuerySpec::index`].
    pub name: String,
    /// Key schema of the index.
    pub key: KeySchema,
}

/// A table with its primary key schema and secondary indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Primary key; items sharing it overwrite each other.
    pub key: KeySchema,
    /// Secondary indexes.
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    /// Resolves the key schema a query runs against.
    ///
    /// # Errors
    ///
    /// Returns the unknown index name when `index` names no index of this
    /// table.
    pub fn schema_for(&self, index: Option<&str>) -> Result<&KeySchema, String> {
        match index {
            None => Ok(&self.key),
            Some(name) => self
                .indexes
                .iter()
                .find(|idx| idx.name == name)
                .map(|idx| &idx.key)
                .ok_or_else(|| format!("table '{}' has no index '{name}'", self.name)),
        }
    }
}

/// Range condition on the sort key. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKeyCondition {
    /// `lower <= sort <= upper`.
    Between(i64, i64),
    /// `sort >= lower`.
    AtLeast(i64),
    /// `sort <= upper`.
    AtMost(i64),
}

impl SortKeyCondition {
    /// Builds the condition from optional bounds; `None` when both are absent.
    #[must_use]
    pub const fn from_bounds(lower: Option<i64>, upper: Option<i64>) -> Option<Self> {
        match (lower, upper) {
            (Some(lo), Some(hi)) => Some(Self::Between(lo, hi)),
            (Some(lo), None) => Some(Self::AtLeast(lo)),
            (None, Some(hi)) => Some(Self::AtMost(hi)),
            (None, None) => None,
        }
    }

    /// Returns `true` when `sort` satisfies the condition.
    #[must_use]
    pub const fn matches(&self, sort: i64) -> bool {
        match *self {
            Self::Between(lo, hi) => lo <= sort && sort <= hi,
            Self::AtLeast(lo) => sort >= lo,
            Self::AtMost(hi) => sort <= hi,
        }
    }
}

/// Non-key predicate applied to the candidates of a key scan.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Numeric attribute at `path` is `>= value`.
    NumberAtLeast {
        /// Attribute path, outermost segment first.
        path: Vec<String>,
        /// Inclusive lower bound.
        value: f64,
    },
    /// Numeric attribute at `path` is `<= value`.
    NumberAtMost {
        /// Attribute path, outermost segment first.
        path: Vec<String>,
        /// Inclusive upper bound.
        value: f64,
    },
    /// String attribute at `path` contains `needle`, ignoring case.
    ContainsIgnoreCase {
        /// Attribute path, outermost segment first.
        path: Vec<String>,
        /// Substring to look for.
        needle: String,
    },
    /// Every inner expression holds.
    All(Vec<FilterExpr>),
}

impl FilterExpr {
    /// `path >= value` over a dotted path such as `"properties.mag"`.
    #[must_use]
    pub fn at_least(path: &str, value: f64) -> Self {
        Self::NumberAtLeast {
            path: split_path(path),
            value,
        }
    }

    /// `path <= value` over a dotted path.
    #[must_use]
    pub fn at_most(path: &str, value: f64) -> Self {
        Self::NumberAtMost {
            path: split_path(path),
            value,
        }
    }

    /// Case-insensitive substring match over a dotted path.
    #[must_use]
    pub fn contains(path: &str, needle: &str) -> Self {
        Self::ContainsIgnoreCase {
            path: split_path(path),
            needle: needle.to_lowercase(),
        }
    }

    /// Conjunction of `exprs`; `None` when empty, the sole element when
    /// there is only one.
    #[must_use]
    pub fn all(mut exprs: Vec<Self>) -> Option<Self> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Self::All(exprs)),
        }
    }

    /// Evaluates the predicate against an item. Missing or mistyped
    /// attributes never match.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Self::NumberAtLeast { path, value } => {
                lookup(item, path).and_then(Value::as_f64).is_some_and(|v| v >= *value)
            }
            Self::NumberAtMost { path, value } => {
                lookup(item, path).and_then(Value::as_f64).is_some_and(|v| v <= *value)
            }
            Self::ContainsIgnoreCase { path, needle } => lookup(item, path)
                .and_then(Value::as_str)
                .is_some_and(|s| s.to_lowercase().contains(needle.as_str())),
            Self::All(exprs) => exprs.iter().all(|e| e.matches(item)),
        }
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

fn lookup<'a>(item: &'a Item, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(item.get(first)?, |value, segment| value.get(segment))
}

/// Direction of a key-range scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanDirection {
    /// Ascending sort key.
    Forward,
    /// Descending sort key.
    #[default]
    Backward,
}

/// One range query against a table or one of its indexes.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    /// Secondary index to query instead of the base table.
    pub index: Option<String>,
    /// Partition key value every returned item shares.
    pub partition: String,
    /// Optional sort-key range.
    pub sort_range: Option<SortKeyCondition>,
    /// Optional non-key filter, applied after the scan is limited.
    pub filter: Option<FilterExpr>,
    /// Maximum number of items scanned (not returned) in this page.
    pub limit: usize,
    /// Scan direction along the sort key.
    pub direction: ScanDirection,
    /// Resume strictly after this position.
    pub start: Option<Cursor>,
}

impl QuerySpec {
    /// A query over one partition with every optional part unset.
    #[must_use]
    pub fn partition(partition: impl Into<String>, limit: usize) -> Self {
        Self {
            index: None,
            partition: partition.into(),
            sort_range: None,
            filter: None,
            limit,
            direction: ScanDirection::Forward,
            start: None,
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    /// Items that passed the filter, in scan order.
    pub items: Vec<Item>,
    /// Position to resume from; `None` once the key range is exhausted.
    pub cursor: Option<Cursor>,
}
