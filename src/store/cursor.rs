//! Opaque continuation cursors.
//!
//! Callers only ever see a [`Cursor`] as a string to hand back. Inside the
//! store it encodes the last scanned [`ScanPosition`] as URL-safe base64 of
//! a small JSON document.

use std::cmp::Ordering;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Opaque continuation token returned by a range query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wraps a token received from a caller.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Total order position of an item within one scanned partition.
///
/// `sort` is the sort-key value of the scanned table or index; the base
/// table's primary key breaks ties so that positions are unique even when
/// an index sort key repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPosition {
    /// Sort-key value under the scanned key schema.
    #[serde(rename = "s")]
    pub sort: i64,
    /// Base-table partition key.
    #[serde(rename = "p")]
    pub base_partition: String,
    /// Base-table sort key.
    #[serde(rename = "k")]
    pub base_sort: i64,
}

impl Ord for ScanPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort
            .cmp(&other.sort)
            .then_with(|| self.base_partition.cmp(&other.base_partition))
            .then_with(|| self.base_sort.cmp(&other.base_sort))
    }
}

impl PartialOrd for ScanPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl ScanPosition {
    /// Encodes the position into an opaque cursor.
    #[must_use]
    pub fn encode(&self) -> Cursor {
        let json = serde_json::to_vec(self).unwrap_or_default();
        Cursor(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decodes a cursor produced by [`ScanPosition::encode`].
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the token is not valid
    /// base64 or does not carry a position.
    pub fn decode(cursor: &Cursor) -> Result<Self, String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor.as_str())
            .map_err(|e| format!("malformed cursor: {e}"))?;
        serde_json::from_slice(&bytes).map_err(|e| format!("malformed cursor: {e}"))
    }
}
