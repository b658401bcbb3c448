//! Earthquake listing and ingestion DTOs.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::event_query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::domain::{EventQuery, EventRecord, SortField, SortOrder};
use crate::error::GatewayError;
use crate::service::{EventPage, IngestionReport};
use crate::store::Cursor;

/// Raw query string of `GET /earthquakes-data`.
///
/// Every field is kept as text so that malformed values surface as
/// validation errors in the gateway's error format.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListEventsParams {
    /// Items scanned per page, 1 to 100. Defaults to 10.
    pub page_size: Option<String>,
    /// `occurrenceTimestamp` (default) or `magnitude`.
    pub sort: Option<String>,
    /// `asc` or `desc` (default).
    pub sort_order: Option<String>,
    /// First UTC day included, `YYYY-MM-DD`.
    pub occur_start_date: Option<String>,
    /// Last UTC day included, `YYYY-MM-DD`.
    pub occur_end_date: Option<String>,
    /// Case-insensitive substring of the place description.
    pub location: Option<String>,
    /// Inclusive lower magnitude bound.
    pub min_magnitude: Option<String>,
    /// Inclusive upper magnitude bound.
    pub max_magnitude: Option<String>,
    /// Continuation token from a previous page.
    pub cursor: Option<String>,
}

impl ListEventsParams {
    /// Validates the parameters into an [`EventQuery`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ValidationFailed`] for malformed or
    /// inconsistent values and [`GatewayError::UnsupportedSort`] when
    /// ordering by magnitude is requested.
    pub fn into_query(self) -> Result<EventQuery, GatewayError> {
        let page_size = match present(self.page_size) {
            None => DEFAULT_PAGE_SIZE,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=MAX_PAGE_SIZE).contains(n))
                .ok_or_else(|| {
                    GatewayError::ValidationFailed(format!(
                        "pageSize must be an integer between 1 and {MAX_PAGE_SIZE}"
                    ))
                })?,
        };

        let sort = parse_opt::<SortField>(self.sort)?.unwrap_or_default();
        if sort != SortField::OccurrenceTimestamp {
            return Err(GatewayError::UnsupportedSort(format!(
                "events can only be ordered by occurrenceTimestamp, not {sort}"
            )));
        }
        let sort_order = parse_opt::<SortOrder>(self.sort_order)?.unwrap_or_default();

        let occur_start_date = parse_date("occurStartDate", self.occur_start_date)?;
        let occur_end_date = parse_date("occurEndDate", self.occur_end_date)?;
        if let (Some(start), Some(end)) = (occur_start_date, occur_end_date)
            && start > end
        {
            return Err(GatewayError::ValidationFailed(
                "occurStartDate must not be after occurEndDate".to_string(),
            ));
        }

        let min_magnitude = parse_magnitude("minMagnitude", self.min_magnitude)?;
        let max_magnitude = parse_magnitude("maxMagnitude", self.max_magnitude)?;
        if let (Some(min), Some(max)) = (min_magnitude, max_magnitude)
            && max < min
        {
            return Err(GatewayError::ValidationFailed(
                "maxMagnitude must be greater than or equal to minMagnitude".to_string(),
            ));
        }

        Ok(EventQuery {
            page_size,
            sort_order,
            occur_start_date,
            occur_end_date,
            location: present(self.location),
            min_magnitude,
            max_magnitude,
            cursor: present(self.cursor).map(Cursor::new),
        })
    }
}

/// Treats empty query values as absent.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_opt<T>(value: Option<String>) -> Result<Option<T>, GatewayError>
where
    T: FromStr<Err = String>,
{
    present(value)
        .map(|raw| raw.parse::<T>().map_err(GatewayError::ValidationFailed))
        .transpose()
}

/// Parses a `YYYY-MM-DD` query value.
///
/// # Errors
///
/// Returns [`GatewayError::ValidationFailed`] naming `field`.
pub fn parse_date(field: &str, value: Option<String>) -> Result<Option<NaiveDate>, GatewayError> {
    present(value)
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                GatewayError::ValidationFailed(format!(
                    "{field} must be a date in YYYY-MM-DD format"
                ))
            })
        })
        .transpose()
}

fn parse_magnitude(field: &str, value: Option<String>) -> Result<Option<f64>, GatewayError> {
    present(value)
        .map(|raw| {
            raw.parse::<f64>()
                .ok()
                .filter(|m| m.is_finite() && *m >= 0.0)
                .ok_or_else(|| {
                    GatewayError::ValidationFailed(format!("{field} must be a non-negative number"))
                })
        })
        .transpose()
}

/// One page of earthquake events.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventListResponse {
    /// Stored events: the original feature fields plus `eventType` and
    /// `occurrenceTimestamp`.
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<EventRecord>,
    /// Number of returned items.
    pub size: usize,
    /// Continuation token; `null` once no more events exist.
    #[schema(value_type = Option<String>)]
    pub cursor: Option<Cursor>,
}

impl From<EventPage> for EventListResponse {
    fn from(page: EventPage) -> Self {
        Self {
            items: page.items,
            size: page.size,
            cursor: page.cursor,
        }
    }
}

/// Result of `GET /earthquakes-data/fetch-store`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngestResponse {
    /// Human-readable outcome.
    pub message: String,
    /// Counts of the ingestion run.
    pub report: IngestionReport,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ListEventsParams {
        let mut params = ListEventsParams::default();
        for (key, value) in pairs {
            let value = Some((*value).to_string());
            match *key {
                "pageSize" => params.page_size = value,
                "sort" => params.sort = value,
                "sortOrder" => params.sort_order = value,
                "occurStartDate" => params.occur_start_date = value,
                "occurEndDate" => params.occur_end_date = value,
                "location" => params.location = value,
                "minMagnitude" => params.min_magnitude = value,
                "maxMagnitude" => params.max_magnitude = value,
                "cursor" => params.cursor = value,
                other => panic!("unknown parameter {other}"),
            }
        }
        params
    }

    #[test]
    fn empty_params_use_defaults() {
        let Ok(query) = ListEventsParams::default().into_query() else {
            panic!("defaults should validate");
        };
        assert_eq!(query, EventQuery::default());
    }

    #[test]
    fn full_params_are_carried_over() {
        let Ok(query) = params(&[
            ("pageSize", "25"),
            ("sortOrder", "asc"),
            ("occurStartDate", "2025-01-01"),
            ("occurEndDate", "2025-01-31"),
            ("location", " Alaska "),
            ("minMagnitude", "2.5"),
            ("maxMagnitude", "6"),
            ("cursor", "abc"),
        ])
        .into_query() else {
            panic!("params should validate");
        };
        assert_eq!(query.page_size, 25);
        assert_eq!(query.sort_order, SortOrder::Asc);
        assert_eq!(query.location.as_deref(), Some("Alaska"));
        assert_eq!(query.min_magnitude, Some(2.5));
        assert_eq!(query.max_magnitude, Some(6.0));
        assert_eq!(query.cursor, Some(Cursor::new("abc")));
        assert_eq!(query.occur_end_date, NaiveDate::from_ymd_opt(2025, 1, 31));
    }

    #[test]
    fn page_size_bounds() {
        for bad in ["0", "101", "-1", "ten", "2.5"] {
            assert!(
                matches!(
                    params(&[("pageSize", bad)]).into_query(),
                    Err(GatewayError::ValidationFailed(_))
                ),
                "pageSize={bad} accepted"
            );
        }
        assert!(params(&[("pageSize", "100")]).into_query().is_ok());
        assert!(params(&[("pageSize", "1")]).into_query().is_ok());
    }

    #[test]
    fn magnitude_sort_is_unsupported() {
        assert!(matches!(
            params(&[("sort", "magnitude")]).into_query(),
            Err(GatewayError::UnsupportedSort(_))
        ));
        assert!(matches!(
            params(&[("sort", "depth")]).into_query(),
            Err(GatewayError::ValidationFailed(_))
        ));
        assert!(params(&[("sort", "occurrenceTimestamp")]).into_query().is_ok());
    }

    #[test]
    fn inconsistent_ranges_are_rejected() {
        assert!(
            params(&[("occurStartDate", "2025-02-01"), ("occurEndDate", "2025-01-01")])
                .into_query()
                .is_err()
        );
        assert!(
            params(&[("minMagnitude", "5"), ("maxMagnitude", "4")])
                .into_query()
                .is_err()
        );
        assert!(params(&[("minMagnitude", "-1")]).into_query().is_err());
        assert!(params(&[("occurStartDate", "01/02/2025")]).into_query().is_err());
        assert!(params(&[("sortOrder", "up")]).into_query().is_err());
    }

    #[test]
    fn equal_bounds_are_accepted() {
        assert!(
            params(&[("occurStartDate", "2025-01-01"), ("occurEndDate", "2025-01-01")])
                .into_query()
                .is_ok()
        );
        assert!(
            params(&[("minMagnitude", "3"), ("maxMagnitude", "3")])
                .into_query()
                .is_ok()
        );
    }
}
