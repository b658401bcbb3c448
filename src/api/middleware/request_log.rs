//! Request-log completion hook.
//!
//! Runs around every API route: captures the request, lets the handler
//! produce its response, then hands a [`RequestLogRecord`] to the
//! [`crate::service::RequestLogWriter`]. The response reaches the caller
//! unchanged whether or not the record is persisted.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use axum::body::{Body, BodyDataStream, Bytes, HttpBody};
use axum::extract::{ConnectInfo, MatchedPath, Query, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use axum::http::{HeaderMap, Uri};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use futures_util::{StreamExt, stream};
use serde_json::Value;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::domain::RequestLogRecord;
use crate::domain::request_log::RequestClock;
use crate::store::Item;

const REDACTED: &str = "[REDACTED]";

/// JSON fields never written to the request log.
const SENSITIVE_FIELDS: [&str; 3] = ["password", "accessToken", "refreshToken"];

/// Middleware writing one request-log record per completed call.
pub async fn log_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.request_log.is_enabled() {
        return next.run(request).await;
    }

    let arrived = Utc::now();
    let started = Instant::now();
    let max_body = state.request_log_config.max_body_bytes;

    let (parts, body) = request.into_parts();
    let endpoint_name = parts
        .extensions
        .get::<MatchedPath>()
        .map_or_else(|| parts.uri.path().to_string(), |p| p.as_str().to_string());
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let req_ip = client_ip(&parts.headers, peer);
    let req_path = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());
    let req_method = parts.method.to_string();
    let req_headers = redacted_headers(&parts.headers);
    let req_query_params = query_params(&parts.uri);

    let (body, req_body) = if is_json(&parts.headers) {
        capture(body, max_body, "request").await
    } else {
        (body, None)
    };

    let response = next.run(Request::from_parts(parts, body)).await;
    let elapsed = started.elapsed().as_secs_f64();

    let (parts, body) = response.into_parts();
    let (body, response_data) = if is_json(&parts.headers) {
        capture(body, max_body, "response").await
    } else {
        (body, None)
    };

    let clock = RequestClock::at(arrived, state.request_log_config.timezone);
    state.request_log.record(RequestLogRecord {
        req_id: Uuid::new_v4(),
        req_date: clock.date,
        req_timestamp: clock.timestamp_ms,
        req_readable_timestamp_utc: clock.utc,
        req_readable_timestamp_local: clock.local,
        req_ip,
        req_geo_location: None,
        req_path,
        req_method,
        endpoint_name,
        req_headers,
        req_query_params,
        req_body: req_body.map(redact_json),
        execution_time_in_second: (elapsed * 100.0).round() / 100.0,
        response_status: parts.status.as_u16(),
        response_data: response_data.map(redact_json),
    });

    Response::from_parts(parts, body)
}

/// Reads a JSON body of at most `max` bytes and parses it, returning a
/// body that yields the same bytes to the next reader.
///
/// A body that outgrows `max` or whose stream fails is not parsed; the
/// returned body replays what was read and then continues with the rest
/// of the original stream, including its error.
async fn capture(body: Body, max: usize, side: &'static str) -> (Body, Option<Value>) {
    if body.size_hint().lower() > u64::try_from(max).unwrap_or(u64::MAX) {
        return (body, None);
    }

    let mut stream = body.into_data_stream();
    let mut chunks = Vec::new();
    let mut read = 0_usize;
    while let Some(next) = stream.next().await {
        match next {
            Ok(chunk) => {
                read = read.saturating_add(chunk.len());
                chunks.push(chunk);
                if read > max {
                    return (replay(chunks, None, stream), None);
                }
            }
            Err(e) => {
                tracing::warn!(side, error = %e, "body stream failed, logging without it");
                return (replay(chunks, Some(e), stream), None);
            }
        }
    }

    let mut buffered = Vec::with_capacity(read);
    for chunk in &chunks {
        buffered.extend_from_slice(chunk);
    }
    let bytes = Bytes::from(buffered);
    let parsed = serde_json::from_slice(&bytes).ok();
    (Body::from(bytes), parsed)
}

/// Body yielding `chunks`, then `failure` if any, then the rest of `rest`.
fn replay(chunks: Vec<Bytes>, failure: Option<axum::Error>, rest: BodyDataStream) -> Body {
    let head = chunks.into_iter().map(Ok).chain(failure.map(Err));
    Body::from_stream(stream::iter(head).chain(rest))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

/// First `x-forwarded-for` hop, else the peer address.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn redacted_headers(headers: &HeaderMap) -> Item {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if *name == AUTHORIZATION || *name == COOKIE {
                REDACTED.to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_string(), Value::String(value))
        })
        .collect()
}

fn query_params(uri: &Uri) -> Item {
    Query::<HashMap<String, String>>::try_from_uri(uri)
        .map(|Query(params)| {
            params
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect()
        })
        .unwrap_or_default()
}

/// Masks credentials and tokens in a top-level JSON object.
fn redact_json(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        for field in SENSITIVE_FIELDS {
            if let Some(v) = map.get_mut(field) {
                *v = Value::String(REDACTED.to_string());
            }
        }
    }
    value
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::http::HeaderValue;
    use serde_json::json;

    use super::*;

    #[test]
    fn forwarded_for_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer = Some(SocketAddr::from(([127, 0, 0, 1], 4000)));
        assert_eq!(client_ip(&headers, peer), "203.0.113.7");
        assert_eq!(client_ip(&HeaderMap::new(), peer), "127.0.0.1");
        assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn authorization_is_redacted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        headers.insert("accept", HeaderValue::from_static("application/json"));
        let item = redacted_headers(&headers);
        assert_eq!(item.get("authorization"), Some(&json!(REDACTED)));
        assert_eq!(item.get("accept"), Some(&json!("application/json")));
    }

    #[test]
    fn tokens_and_passwords_are_masked() {
        let body = redact_json(json!({
            "username": "admin",
            "password": "pw",
            "accessToken": "t"
        }));
        assert_eq!(
            body,
            json!({ "username": "admin", "password": REDACTED, "accessToken": REDACTED })
        );
        assert_eq!(redact_json(json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn query_string_is_decoded() {
        let uri: Uri = "/earthquakes-data?pageSize=5&location=New%20Zealand"
            .parse()
            .unwrap_or_default();
        let params = query_params(&uri);
        assert_eq!(params.get("pageSize"), Some(&json!("5")));
        assert_eq!(params.get("location"), Some(&json!("New Zealand")));
    }

    #[tokio::test]
    async fn capture_keeps_body_bytes() {
        let (body, parsed) = capture(Body::from(r#"{"a":1}"#), 1024, "request").await;
        assert_eq!(parsed, Some(json!({ "a": 1 })));
        let Ok(bytes) = axum::body::to_bytes(body, 1024).await else {
            panic!("body lost");
        };
        assert_eq!(bytes, Bytes::from_static(br#"{"a":1}"#));
    }

    #[tokio::test]
    async fn oversized_body_passes_through() {
        let (_, parsed) = capture(Body::from(vec![b'x'; 64]), 16, "request").await;
        assert!(parsed.is_none());
    }

    #[tokio::test]
    async fn streamed_body_beyond_limit_is_replayed_whole() {
        let chunks: Vec<Result<&'static str, std::io::Error>> =
            vec![Ok(r#"{"a":"#), Ok("12345"), Ok("}")];
        let (body, parsed) =
            capture(Body::from_stream(stream::iter(chunks)), 8, "response").await;
        assert!(parsed.is_none());
        let Ok(bytes) = axum::body::to_bytes(body, 1024).await else {
            panic!("body lost");
        };
        assert_eq!(bytes, Bytes::from_static(br#"{"a":12345}"#));
    }

    #[tokio::test]
    async fn failing_stream_keeps_prefix_and_error() {
        let chunks: Vec<Result<&'static str, std::io::Error>> =
            vec![Ok(r#"{"partial""#), Err(std::io::Error::other("reset"))];
        let (body, parsed) =
            capture(Body::from_stream(stream::iter(chunks)), 1024, "response").await;
        assert!(parsed.is_none());

        let mut replayed = body.into_data_stream();
        let Some(Ok(first)) = replayed.next().await else {
            panic!("prefix lost");
        };
        assert_eq!(first, Bytes::from_static(br#"{"partial""#));
        assert!(matches!(replayed.next().await, Some(Err(_))));
    }
}
