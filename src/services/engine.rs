// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::error::EngineError;
use crate::models::config::EngineConfig;
use crate::services::query_builder::EngineQuery;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

/// Raw `documents/search` response. Hits stay untyped so that a single
/// malformed document cannot fail decoding of the whole page.
#[derive(Debug, Default, Deserialize)]
pub struct EngineResponse {
    #[serde(default)]
    pub found: u64,
    #[serde(default)]
    pub search_time_ms: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub hits: Vec<Value>,
}

/// Typesense client wrapper for searching the places collection
pub struct EngineClient {
    http: reqwest::Client,
    search_url: Url,
    api_key: String,
    timeout: Duration,
}

impl EngineClient {
    /// Create a new client. No connection is made until the first search.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let search_url = base_url
            .join(&format!("collections/{}/documents/search", config.collection))
            .context("Invalid Typesense collection name")?;

        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        info!(
            engine = %base_url,
            collection = %config.collection,
            timeout_ms = config.timeout.as_millis() as u64,
            "Configured Typesense search engine"
        );

        Ok(Self {
            http,
            search_url,
            api_key: config.api_key,
            timeout: config.timeout,
        })
    }

    /// Run one search. The exchange is bounded by the configured timeout; when
    /// it elapses the request future is dropped, which aborts the HTTP call.
    pub async fn search(&self, query: &EngineQuery) -> Result<EngineResponse, EngineError> {
        let mut url = self.search_url.clone();
        url.query_pairs_mut().extend_pairs(query.to_params());

        debug!(q = %query.query, sort_by = %query.sort_by, "searching places");

        match tokio::time::timeout(self.timeout, self.execute(url)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "search engine timed out, request aborted"
                );
                Err(EngineError::Timeout(self.timeout))
            }
        }
    }

    async fn execute(&self, url: Url) -> Result<EngineResponse, EngineError> {
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            warn!(status = status.as_u16(), %body, "search engine returned an error");
            return Err(EngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::query_builder::{build, QueryInput};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, timeout: Duration) -> EngineConfig {
        let uri = Url::parse(&server.uri()).unwrap();
        EngineConfig {
            host: uri.host_str().unwrap().to_string(),
            port: uri.port().unwrap(),
            protocol: "http".to_string(),
            api_key: "test-admin-key".to_string(),
            collection: "places".to_string(),
            timeout,
        }
    }

    fn query(q: &str) -> EngineQuery {
        build(&QueryInput {
            query: q,
            page: 1,
            limit: 20,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_search_sends_key_and_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/places/documents/search"))
            .and(header(API_KEY_HEADER, "test-admin-key"))
            .and(query_param("q", "ramen"))
            .and(query_param("query_by_weights", "5,3,2,1,1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "found": 1,
                "search_time_ms": 4,
                "page": 1,
                "hits": [{ "document": { "id": "tavvy:1", "name": "Ramen Bar" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EngineClient::new(config_for(&server, Duration::from_secs(5))).unwrap();
        let response = client.search(&query("ramen")).await.unwrap();

        assert_eq!(response.found, 1);
        assert_eq!(response.search_time_ms, 4);
        assert_eq!(response.hits.len(), 1);
    }

    #[tokio::test]
    async fn test_non_success_status_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"message": "Could not parse the filter query."}"#),
            )
            .mount(&server)
            .await;

        let client = EngineClient::new(config_for(&server, Duration::from_secs(5))).unwrap();
        let err = client.search(&query("ramen")).await.unwrap_err();

        match err {
            EngineError::Status { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("Could not parse the filter query"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_engine_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = EngineClient::new(config_for(&server, Duration::from_millis(100))).unwrap();
        let started = std::time::Instant::now();
        let err = client.search(&query("ramen")).await.unwrap_err();

        assert!(matches!(err, EngineError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let client = EngineClient::new(config_for(&server, Duration::from_secs(5))).unwrap();
        let err = client.search(&query("ramen")).await.unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }

    #[test]
    fn test_missing_response_fields_default() {
        let response: EngineResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.found, 0);
        assert!(response.hits.is_empty());
    }
}
