// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Application state, caller identification, route handlers, and router
//! construction.
//!
//! This module is `pub` so that integration tests can build a test router directly
//! without starting the full binary.

use crate::error::{ApiError, ErrorResponse};
use crate::models::config::SearchPolicy;
use crate::models::search::{
    AppliedFilters, BoundingBox, SearchParams, SearchRequest, SearchResponse, SearchResult,
};
use crate::models::version::{HealthResponse, VersionResponse};
use crate::services::engine::EngineClient;
use crate::services::normalizer::normalize;
use crate::services::rate_limit::RateLimiter;
use crate::services::search::plan_search;
use axum::{
    extract::{rejection::QueryRejection, ConnectInfo, FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::any::Any;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application version extracted from `Cargo.toml` at compile time.
/// The patch segment can be overridden via `PLACES_PATCH_VERSION` (see `build.rs`).
pub const VERSION: &str = env!("PLACES_VERSION");

/// Attached to every successful search response
pub const SEARCH_CACHE_CONTROL: &str = "public, max-age=60, stale-while-revalidate=300";

/// Bucket shared by every caller whose address cannot be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Shared application state injected into every route handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// The only holder of the engine admin key. Never exposed to clients.
    pub engine: Arc<EngineClient>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub policy: SearchPolicy,
}

// ---------------------------------------------------------------------------
// Caller identification
// ---------------------------------------------------------------------------

/// Axum extractor that resolves the rate-limit key of the caller.
///
/// * First entry of `X-Forwarded-For`, when present.
/// * Otherwise the peer address from `ConnectInfo`.
/// * Otherwise the shared `"unknown"` bucket.
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(client_key(&parts.headers, peer)))
    }
}

pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

pub async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "places-search".to_string(),
        version: VERSION.to_string(),
    })
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Search places by free text, location and category.
///
/// Rate limiting runs first, then validation, so rejected callers never cost
/// an engine call. Repeated parameters keep their first value.
#[utoipa::path(
    get,
    path = "/api/search/places",
    params(SearchParams),
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 400, description = "Query too long", body = ErrorResponse),
        (status = 405, description = "Method not allowed", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 502, description = "Search engine error", body = ErrorResponse),
        (status = 504, description = "Search engine timeout", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "search"
)]
pub async fn search_places_handler(
    State(state): State<AppState>,
    ClientIp(client): ClientIp,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, ApiError> {
    if !state.rate_limiter.check(&client) {
        return Err(ApiError::RateLimited);
    }

    let Query(pairs) = pairs.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = SearchRequest::from_params(SearchParams::from_pairs(pairs))?;
    let plan = plan_search(&request, &state.policy);

    let result = state.engine.search(&plan.engine_query).await?;
    let hits: Vec<SearchResult> = result.hits.iter().map(normalize).collect();

    let body = SearchResponse {
        hits,
        found: result.found,
        search_time_ms: result.search_time_ms,
        page: request.page,
        query: request.query,
        filters: plan.filters,
    };

    Ok((
        [(
            header::CACHE_CONTROL,
            HeaderValue::from_static(SEARCH_CACHE_CONTROL),
        )],
        Json(body),
    )
        .into_response())
}

pub async fn method_not_allowed_handler() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Render a handler panic as a plain 500 so the process keeps serving.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic payload".to_string());
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(search_places_handler),
    components(schemas(
        SearchResponse,
        SearchResult,
        AppliedFilters,
        BoundingBox,
        ErrorResponse,
        VersionResponse,
        HealthResponse
    )),
    tags((name = "search", description = "Place search"))
)]
pub struct ApiDoc;

/// Build the Axum application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/version", get(version_handler))
        .route("/health", get(health_handler))
        .route(
            "/api/search/places",
            get(search_places_handler).fallback(method_not_allowed_handler),
        )
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::{EngineConfig, RateLimitConfig};
    use crate::services::rate_limit::InMemoryRateLimiter;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    fn create_test_app() -> Router {
        // Port 9 (discard) is never reached by these tests
        let engine = EngineClient::new(EngineConfig {
            host: "127.0.0.1".to_string(),
            port: 9,
            protocol: "http".to_string(),
            api_key: "test-admin-key".to_string(),
            collection: "places".to_string(),
            timeout: Duration::from_millis(200),
        })
        .expect("Failed to build engine client");

        let state = AppState {
            engine: Arc::new(engine),
            rate_limiter: Arc::new(InMemoryRateLimiter::new(RateLimitConfig::default())),
            policy: SearchPolicy::default(),
        };
        create_router(state)
    }

    #[tokio::test]
    async fn test_version_endpoint_response() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/version")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert_eq!(content_type, "application/json");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let version_response: VersionResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(version_response.service, "places-search");
        assert_eq!(version_response.version, VERSION);

        // Check semver format: MAJOR.MINOR.PATCH
        let parts: Vec<&str> = version_response.version.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.parse::<u32>().is_ok()));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_route_returns_404() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/invalid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_get_methods_return_405() {
        for method in ["POST", "PUT", "DELETE", "PATCH"] {
            let response = create_test_app()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri("/api/search/places?q=pizza")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        }
    }

    #[tokio::test]
    async fn test_too_long_query_returns_400() {
        let long = "a".repeat(201);
        let response = create_test_app()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/search/places?q={long}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_openapi_document_lists_search_path() {
        let response = create_test_app()
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(doc["paths"]["/api/search/places"]["get"].is_object());
    }

    #[test]
    fn test_client_key_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        let peer: SocketAddr = "192.0.2.1:5555".parse().unwrap();

        assert_eq!(client_key(&headers, Some(peer)), "203.0.113.7");
    }

    #[test]
    fn test_client_key_falls_back_to_peer_then_unknown() {
        let peer: SocketAddr = "192.0.2.1:5555".parse().unwrap();
        assert_eq!(client_key(&HeaderMap::new(), Some(peer)), "192.0.2.1");
        assert_eq!(client_key(&HeaderMap::new(), None), UNKNOWN_CLIENT);

        let mut empty = HeaderMap::new();
        empty.insert("x-forwarded-for", HeaderValue::from_static(""));
        assert_eq!(client_key(&empty, None), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_panic_response_is_generic_500() {
        let response = panic_response(Box::new("index out of bounds"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
