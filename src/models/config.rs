// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Runtime configuration, parsed from command line flags and environment variables.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Server configuration for the places search service.
#[derive(Parser, Clone)]
#[command(name = "places-search")]
#[command(author, version, about = "Place search API backed by a hosted Typesense cluster")]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Typesense host name (no protocol, no port)
    #[arg(long, env = "TYPESENSE_HOST")]
    pub typesense_host: String,

    /// Typesense port
    #[arg(long, env = "TYPESENSE_PORT", default_value = "443")]
    pub typesense_port: u16,

    /// Typesense protocol: http or https
    #[arg(long, env = "TYPESENSE_PROTOCOL", default_value = "https")]
    pub typesense_protocol: String,

    /// Typesense admin API key. Server-side only.
    #[arg(long, env = "TYPESENSE_API_KEY", hide_env_values = true)]
    pub typesense_api_key: String,

    /// Collection holding the place documents
    #[arg(long, env = "TYPESENSE_COLLECTION", default_value = "places")]
    pub typesense_collection: String,

    /// Upper bound for a single search engine call, in milliseconds
    #[arg(long, env = "ENGINE_TIMEOUT_MS", default_value = "8000", value_parser = clap::value_parser!(u64).range(1..))]
    pub engine_timeout_ms: u64,

    /// Requests allowed per caller within one window
    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value = "120", value_parser = clap::value_parser!(u32).range(1..))]
    pub rate_limit_max_requests: u32,

    /// Length of the rate limit window, in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
    pub rate_limit_window_secs: u64,

    /// How often expired rate limit entries are swept, in seconds
    #[arg(long, env = "RATE_LIMIT_SWEEP_SECS", default_value = "300", value_parser = clap::value_parser!(u64).range(1..))]
    pub rate_limit_sweep_secs: u64,

    /// Radius applied to "near me" searches that carry coordinates but no radius
    #[arg(long, env = "NEAR_ME_RADIUS_KM", default_value = "25")]
    pub near_me_radius_km: f64,
}

impl ServerConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            host: self.typesense_host.clone(),
            port: self.typesense_port,
            protocol: self.typesense_protocol.clone(),
            api_key: self.typesense_api_key.clone(),
            collection: self.typesense_collection.clone(),
            timeout: Duration::from_millis(self.engine_timeout_ms),
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit_max_requests,
            window: Duration::from_secs(self.rate_limit_window_secs),
            sweep_interval: Duration::from_secs(self.rate_limit_sweep_secs),
        }
    }

    pub fn search_policy(&self) -> SearchPolicy {
        SearchPolicy {
            near_me_radius_km: self.near_me_radius_km,
        }
    }
}

/// Connection settings for the hosted search engine.
#[derive(Clone)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub api_key: String,
    pub collection: String,
    pub timeout: Duration,
}

impl EngineConfig {
    /// Build the engine base URL, e.g. `https://xyz.a1.typesense.net:443/`.
    pub fn base_url(&self) -> Result<Url> {
        if self.protocol != "http" && self.protocol != "https" {
            bail!(
                "TYPESENSE_PROTOCOL must be 'http' or 'https', got: {}",
                self.protocol
            );
        }
        if self.host.trim().is_empty() {
            bail!("TYPESENSE_HOST must not be empty");
        }

        let raw = format!("{}://{}:{}/", self.protocol, self.host.trim(), self.port);
        Url::parse(&raw).with_context(|| format!("Invalid search engine URL: {raw}"))
    }
}

// The API key must never end up in logs, so Debug is written by hand.
impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("api_key", &"<redacted>")
            .field("collection", &self.collection)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Per-caller throttling settings.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 120,
            window: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

/// Tunable search behavior that operators may change without a redeploy.
#[derive(Debug, Clone, Copy)]
pub struct SearchPolicy {
    /// Radius applied when the query says "near me" and no radius was given
    pub near_me_radius_km: f64,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            near_me_radius_km: 25.0,
        }
    }
}
