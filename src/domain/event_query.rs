//! Normalized parameters of an event listing.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::store::{Cursor, ScanDirection};

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Page size used when the caller gives none.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Ordering along the occurrence timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

impl SortOrder {
    /// Key-range scan direction implementing this order.
    #[must_use]
    pub const fn scan_direction(self) -> ScanDirection {
        match self {
            Self::Asc => ScanDirection::Forward,
            Self::Desc => ScanDirection::Backward,
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("sortOrder must be either 'asc' or 'desc', got '{other}'")),
        }
    }
}

/// Sort dimensions advertised by the listing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    /// The event table's sort key.
    #[default]
    OccurrenceTimestamp,
    /// Magnitude; not a key attribute, so not orderable by a range scan.
    Magnitude,
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OccurrenceTimestamp => f.write_str("occurrenceTimestamp"),
            Self::Magnitude => f.write_str("magnitude"),
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "occurrenceTimestamp" => Ok(Self::OccurrenceTimestamp),
            "magnitude" => Ok(Self::Magnitude),
            other => Err(format!(
                "sort must be either 'occurrenceTimestamp' or 'magnitude', got '{other}'"
            )),
        }
    }
}

/// A validated listing request over earthquake events.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    /// Items scanned per page, `1..=MAX_PAGE_SIZE`.
    pub page_size: u32,
    /// Scan order along the occurrence timestamp.
    pub sort_order: SortOrder,
    /// First day included (UTC).
    pub occur_start_date: Option<NaiveDate>,
    /// Last day included (UTC).
    pub occur_end_date: Option<NaiveDate>,
    /// Case-insensitive substring of the place description.
    pub location: Option<String>,
    /// Inclusive lower magnitude bound.
    pub min_magnitude: Option<f64>,
    /// Inclusive upper magnitude bound.
    pub max_magnitude: Option<f64>,
    /// Continuation token from a previous page.
    pub cursor: Option<Cursor>,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, SortOrder::Desc)
    }
}

impl EventQuery {
    /// A query with only page size and order set.
    #[must_use]
    pub const fn new(page_size: u32, sort_order: SortOrder) -> Self {
        Self {
            page_size,
            sort_order,
            occur_start_date: None,
            occur_end_date: None,
            location: None,
            min_magnitude: None,
            max_magnitude: None,
            cursor: None,
        }
    }

    /// Lower sort-key bound: first millisecond of the start day.
    #[must_use]
    pub fn start_millis(&self) -> Option<i64> {
        self.occur_start_date
            .map(|d| d.and_time(NaiveTime::MIN).and_utc().timestamp_millis())
    }

    /// Upper sort-key bound: last millisecond of the end day.
    #[must_use]
    pub fn end_millis(&self) -> Option<i64> {
        self.occur_end_date.and_then(|d| {
            d.succ_opt()
                .map(|next| next.and_time(NaiveTime::MIN).and_utc().timestamp_millis() - 1)
        })
    }
}
