//! REST API layer: route handlers, DTOs, middleware and router composition.
//!
//! Every API route passes through the request-log hook; the earthquake
//! routes additionally require a bearer token.

pub mod dto;
pub mod handlers;
pub mod middleware;

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::app_state::AppState;

/// OpenAPI description of the HTTP surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "quake-gateway",
        description = "Ingests the USGS seismic feed and serves paginated earthquake queries."
    ),
    paths(
        handlers::auth::login,
        handlers::auth::refresh_token,
        handlers::earthquakes::fetch_store,
        handlers::earthquakes::list_earthquakes,
        handlers::statistics::api_request_count,
        handlers::system::health_handler,
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Token issuance and refresh"),
        (name = "Earthquakes", description = "Feed ingestion and event queries"),
        (name = "Statistics", description = "API usage counts"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let scheme = SecurityScheme::Http(
            HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("JWT")
                .build(),
        );
        openapi
            .components
            .get_or_insert_with(Default::default)
            .add_security_scheme("bearer", scheme);
    }
}

/// Builds the complete API router with all REST endpoints and the
/// request-log hook.
pub fn build_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(handlers::routes(state))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::log_request,
        ))
}

/// Serves the Swagger UI at `/swagger-ui` and the document at
/// `/api-docs/openapi.json`.
#[cfg(feature = "swagger-ui")]
pub fn docs_router() -> Router<AppState> {
    Router::new().merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use axum::response::Response;
    use chrono::Utc;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::app_state::table_definitions;
    use crate::config::GatewayConfig;
    use crate::domain::FeedDocument;
    use crate::domain::event_record::tests::feature;
    use crate::domain::request_log::RequestClock;
    use crate::error::GatewayError;
    use crate::service::FeedClient;
    use crate::store::{Item, MemoryRangeStore, RangeStore};

    /// Feed of three earthquakes and one quarry blast.
    #[derive(Debug)]
    struct StaticFeed;

    #[async_trait]
    impl FeedClient for StaticFeed {
        async fn fetch(&self, _url: &str) -> Result<FeedDocument, GatewayError> {
            let features: Vec<Item> = vec![
                feature("ak3", "earthquake", 3_000, Some(4.2), "Central Alaska"),
                feature("nv1", "quarry blast", 2_500, Some(1.1), "Nevada"),
                feature("ci2", "earthquake", 2_000, Some(1.4), "Ridgecrest, CA"),
                feature("ak1", "earthquake", 1_000, Some(2.9), "Kodiak, Alaska"),
            ];
            Ok(FeedDocument {
                metadata: None,
                features,
            })
        }
    }

    struct Harness {
        app: Router,
        store: Arc<MemoryRangeStore>,
        config: GatewayConfig,
    }

    fn harness() -> Harness {
        let config = GatewayConfig::default();
        let store = Arc::new(MemoryRangeStore::new(table_definitions(&config)));
        let state = AppState::new(
            &config,
            Arc::clone(&store) as Arc<dyn RangeStore>,
            Arc::new(StaticFeed),
        );
        let app = build_router(&state).with_state(state);
        Harness { app, store, config }
    }

    fn request(
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let Ok(request) = builder.body(body) else {
            panic!("invalid request");
        };
        request
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        let Ok(response) = app.clone().oneshot(request).await else {
            panic!("router failed");
        };
        response
    }

    async fn json_body(response: Response) -> Value {
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body unreadable");
        };
        let Ok(value) = serde_json::from_slice(&bytes) else {
            panic!("body is not JSON");
        };
        value
    }

    async fn login(app: &Router) -> Value {
        let response = send(
            app,
            request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": "admin", "password": "password" })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await
    }

    async fn access_token(app: &Router) -> String {
        let tokens = login(app).await;
        let Some(token) = tokens.get("accessToken").and_then(Value::as_str) else {
            panic!("no access token in {tokens}");
        };
        token.to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let h = harness();
        let response = send(&h.app, request(Method::GET, "/health", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn earthquakes_require_a_valid_bearer() {
        let h = harness();
        let missing = send(&h.app, request(Method::GET, "/earthquakes-data", None, None)).await;
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(missing).await["error"]["code"], 2001);

        let forged = send(
            &h.app,
            request(Method::GET, "/earthquakes-data", Some("abc.def.ghi"), None),
        )
        .await;
        assert_eq!(forged.status(), StatusCode::FORBIDDEN);

        let ingest = send(
            &h.app,
            request(Method::GET, "/earthquakes-data/fetch-store", None, None),
        )
        .await;
        assert_eq!(ingest.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let h = harness();
        let response = send(
            &h.app,
            request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": "admin", "password": "nope" })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_flow() {
        let h = harness();
        let tokens = login(&h.app).await;

        let missing = send(
            &h.app,
            request(Method::POST, "/auth/refresh-token", None, Some(json!({}))),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let invalid = send(
            &h.app,
            request(
                Method::POST,
                "/auth/refresh-token",
                None,
                Some(json!({ "refreshToken": "garbage" })),
            ),
        )
        .await;
        assert_eq!(invalid.status(), StatusCode::FORBIDDEN);

        let refreshed = send(
            &h.app,
            request(
                Method::POST,
                "/auth/refresh-token",
                None,
                Some(json!({ "refreshToken": tokens["refreshToken"] })),
            ),
        )
        .await;
        assert_eq!(refreshed.status(), StatusCode::OK);
        let Some(access) = json_body(refreshed).await["accessToken"]
            .as_str()
            .map(String::from)
        else {
            panic!("no access token");
        };
        let listed = send(
            &h.app,
            request(Method::GET, "/earthquakes-data", Some(&access), None),
        )
        .await;
        assert_eq!(listed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ingest_then_list_newest_first() {
        let h = harness();
        let token = access_token(&h.app).await;

        let ingest = send(
            &h.app,
            request(Method::GET, "/earthquakes-data/fetch-store", Some(&token), None),
        )
        .await;
        assert_eq!(ingest.status(), StatusCode::OK);
        assert_eq!(json_body(ingest).await["report"]["stored"], 4);

        let page = send(
            &h.app,
            request(Method::GET, "/earthquakes-data?pageSize=2", Some(&token), None),
        )
        .await;
        assert_eq!(page.status(), StatusCode::OK);
        let page = json_body(page).await;
        assert_eq!(page["size"], 2);
        assert_eq!(page["items"][0]["id"], "ak3");
        assert_eq!(page["items"][1]["id"], "ci2");
        assert_eq!(page["items"][0]["eventType"], "earthquake");
        let Some(cursor) = page["cursor"].as_str() else {
            panic!("expected a cursor");
        };

        let next = send(
            &h.app,
            request(
                Method::GET,
                &format!("/earthquakes-data?pageSize=2&cursor={cursor}"),
                Some(&token),
                None,
            ),
        )
        .await;
        let next = json_body(next).await;
        assert_eq!(next["size"], 1);
        assert_eq!(next["items"][0]["id"], "ak1");
        assert!(next["cursor"].is_null());
    }

    #[tokio::test]
    async fn filtered_listing() {
        let h = harness();
        let token = access_token(&h.app).await;
        send(
            &h.app,
            request(Method::GET, "/earthquakes-data/fetch-store", Some(&token), None),
        )
        .await;

        let page = send(
            &h.app,
            request(
                Method::GET,
                "/earthquakes-data?location=alaska&minMagnitude=3&sortOrder=asc",
                Some(&token),
                None,
            ),
        )
        .await;
        let page = json_body(page).await;
        assert_eq!(page["size"], 1);
        assert_eq!(page["items"][0]["id"], "ak3");
    }

    #[tokio::test]
    async fn invalid_listing_params() {
        let h = harness();
        let token = access_token(&h.app).await;

        let sorted = send(
            &h.app,
            request(Method::GET, "/earthquakes-data?sort=magnitude", Some(&token), None),
        )
        .await;
        assert_eq!(sorted.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(sorted).await["error"]["code"], 1002);

        let oversized = send(
            &h.app,
            request(Method::GET, "/earthquakes-data?pageSize=500", Some(&token), None),
        )
        .await;
        assert_eq!(oversized.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(oversized).await["error"]["code"], 1001);
    }

    #[tokio::test]
    async fn stats_requires_a_date() {
        let h = harness();
        let missing = send(
            &h.app,
            request(Method::GET, "/earthquakes-data/statistic/api-request-count", None, None),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let malformed = send(
            &h.app,
            request(
                Method::GET,
                "/earthquakes-data/statistic/api-request-count?reqDate=2025-13-01",
                None,
                None,
            ),
        )
        .await;
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn completed_calls_are_logged_and_counted() {
        let h = harness();
        let log_table = h.config.store.request_log_table.clone();

        for _ in 0..2 {
            send(&h.app, request(Method::GET, "/health", None, None)).await;
        }
        send(&h.app, request(Method::GET, "/earthquakes-data", None, None)).await;

        // Records are written on background tasks.
        for _ in 0..100 {
            if h.store.len(&log_table).await >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(h.store.len(&log_table).await, 3);

        let today = RequestClock::at(Utc::now(), h.config.request_log.timezone).date;
        let response = send(
            &h.app,
            request(
                Method::GET,
                &format!("/earthquakes-data/statistic/api-request-count?reqDate={today}"),
                None,
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let stats = json_body(response).await;
        assert_eq!(stats[&today]["/health"], 2);
        assert_eq!(stats[&today]["/earthquakes-data"], 1);
    }

    /// JSON response whose body stream breaks after the first chunk.
    async fn broken_body() -> Response {
        let chunks: Vec<Result<&'static str, std::io::Error>> =
            vec![Ok(r#"{"items":["#), Err(std::io::Error::other("reset"))];
        let Ok(response) = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-handler", "broken")
            .body(Body::from_stream(futures_util::stream::iter(chunks)))
        else {
            panic!("invalid response");
        };
        response
    }

    #[tokio::test]
    async fn failing_response_body_still_reaches_the_caller() {
        let config = GatewayConfig::default();
        let store = Arc::new(MemoryRangeStore::new(table_definitions(&config)));
        let state = AppState::new(
            &config,
            Arc::clone(&store) as Arc<dyn RangeStore>,
            Arc::new(StaticFeed),
        );
        let app = Router::new()
            .route("/broken", axum::routing::get(broken_body))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::log_request,
            ))
            .with_state(state);

        let response = send(&app, request(Method::GET, "/broken", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-handler").and_then(|v| v.to_str().ok()),
            Some("broken")
        );
        assert!(axum::body::to_bytes(response.into_body(), usize::MAX).await.is_err());

        // The call is still logged, without response data.
        let table = config.store.request_log_table.as_str();
        for _ in 0..100 {
            if store.len(table).await >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.len(table).await, 1);
    }

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/auth/refresh-token",
            "/earthquakes-data",
            "/earthquakes-data/fetch-store",
            "/earthquakes-data/statistic/api-request-count",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
