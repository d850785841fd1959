// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Error types for the search engine client and the HTTP surface.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

/// Failure of a single call to the hosted search engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("search engine did not respond within {0:?}")]
    Timeout(Duration),

    #[error("search engine returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("search engine request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode search engine response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// API error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Search engine error (HTTP {status})")]
    Upstream { status: u16, body: String },

    #[error("Search engine timed out")]
    UpstreamTimeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "method_not_allowed",
                "Only GET is supported on this endpoint".to_string(),
                None,
            ),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                "Too many requests. Please wait and try again.".to_string(),
                None,
            ),
            ApiError::Upstream { status, body } => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                format!("Search engine returned HTTP {status}"),
                Some(body),
            ),
            ApiError::UpstreamTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "upstream_timeout",
                "Search engine did not respond in time".to_string(),
                None,
            ),
            ApiError::Internal(detail) => {
                error!(%detail, "internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        });

        let mut response = (status, body).into_response();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
        }
        response
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Timeout(_) => ApiError::UpstreamTimeout,
            EngineError::Status { status, body } => ApiError::Upstream { status, body },
            EngineError::Transport(_) | EngineError::Decode(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}
