//! Seismic event records and the feed documents they are derived from.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{Item, KeySchema, TableDefinition};

/// Partition key attribute of the event table.
pub const EVENT_TYPE_ATTR: &str = "eventType";
/// Sort key attribute of the event table (epoch milliseconds).
pub const OCCURRENCE_TIMESTAMP_ATTR: &str = "occurrenceTimestamp";
/// The only event type served by the query surface.
pub const EARTHQUAKE: &str = "earthquake";
/// Dotted path of the magnitude inside a stored event.
pub const MAGNITUDE_PATH: &str = "properties.mag";
/// Dotted path of the human-readable place inside a stored event.
pub const PLACE_PATH: &str = "properties.place";

/// Table definition for event records: partitioned by event type, ordered
/// by occurrence time.
#[must_use]
pub fn event_table(name: &str) -> TableDefinition {
    TableDefinition {
        name: name.to_string(),
        key: KeySchema::new(EVENT_TYPE_ATTR, OCCURRENCE_TIMESTAMP_ATTR),
        indexes: Vec::new(),
    }
}

/// GeoJSON summary document published by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedDocument {
    /// Feed metadata (generation time, count, title).
    #[serde(default)]
    pub metadata: Option<FeedMetadata>,
    /// Events, newest first.
    pub features: Vec<Item>,
}

/// Subset of the feed's metadata block that is logged on ingestion.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedMetadata {
    /// Generation time in epoch milliseconds.
    #[serde(default)]
    pub generated: Option<i64>,
    /// Feed title.
    #[serde(default)]
    pub title: Option<String>,
    /// Number of features in the document.
    #[serde(default)]
    pub count: Option<u64>,
}

/// One stored seismic event.
///
/// Serializes to a single flat document: the derived key attributes next
/// to every original feature field (`type`, `properties`, `geometry`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Externally-assigned event id.
    pub id: String,
    /// Partition key, e.g. `"earthquake"` or `"quarry blast"`.
    pub event_type: String,
    /// Sort key, epoch milliseconds.
    pub occurrence_timestamp: i64,
    /// Remaining feature fields, stored verbatim.
    #[serde(flatten)]
    pub feature: Item,
}

impl EventRecord {
    /// Derives a record from one feed feature.
    ///
    /// `eventType` comes from `properties.type` and `occurrenceTimestamp`
    /// from `properties.time`. Derived fields win over top-level feature
    /// fields of the same name.
    ///
    /// # Errors
    ///
    /// Returns a description of the first missing or mistyped field.
    pub fn from_feature(mut feature: Item) -> Result<Self, String> {
        let properties = feature
            .get("properties")
            .and_then(Value::as_object)
            .ok_or("feature has no properties object")?;
        let event_type = properties
            .get("type")
            .and_then(Value::as_str)
            .ok_or("feature has no string properties.type")?
            .to_string();
        let occurrence_timestamp = properties
            .get("time")
            .and_then(Value::as_i64)
            .ok_or("feature has no integer properties.time")?;
        let id = match feature.remove("id") {
            Some(Value::String(id)) => id,
            _ => return Err("feature has no string id".to_string()),
        };
        feature.remove(EVENT_TYPE_ATTR);
        feature.remove(OCCURRENCE_TIMESTAMP_ATTR);

        Ok(Self {
            id,
            event_type,
            occurrence_timestamp,
            feature,
        })
    }

    /// Flattens the record into a store item.
    #[must_use]
    pub fn into_item(self) -> Item {
        let mut item = self.feature;
        item.insert("id".to_string(), Value::String(self.id));
        item.insert(EVENT_TYPE_ATTR.to_string(), Value::String(self.event_type));
        item.insert(
            OCCURRENCE_TIMESTAMP_ATTR.to_string(),
            Value::from(self.occurrence_timestamp),
        );
        item
    }

    /// Rebuilds a record from a stored item.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error when key attributes are missing.
    pub fn from_item(item: Item) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(item))
    }

    /// Magnitude, when the feed reported one.
    #[must_use]
    pub fn magnitude(&self) -> Option<f64> {
        self.property("mag").and_then(Value::as_f64)
    }

    /// Human-readable place description.
    #[must_use]
    pub fn place(&self) -> Option<&str> {
        self.property("place").and_then(Value::as_str)
    }

    fn property(&self, name: &str) -> Option<&Value> {
        self.feature.get("properties")?.get(name)
    }
}
