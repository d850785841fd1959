// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

/// Maximum query length in characters, measured after trimming
pub const MAX_QUERY_LENGTH: usize = 200;
/// Radius filters are clamped to this many kilometers
pub const MAX_RADIUS_KM: f64 = 500.0;
/// Only the first pages are served (shallow pagination)
pub const MAX_PAGE: u32 = 10;
pub const MAX_LIMIT: u32 = 100;
pub const DEFAULT_LIMIT: u32 = 20;

/// Raw query string parameters of `GET /api/search/places`.
///
/// Everything arrives as text so that a malformed number degrades to "absent"
/// instead of rejecting the whole request.
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Free-text place query (max: 200 characters). Empty or `*` browses everything.
    #[param(example = "coffee near me")]
    pub q: Option<String>,
    /// Latitude of the caller
    #[param(example = "25.77")]
    pub lat: Option<String>,
    /// Longitude of the caller
    #[param(example = "-80.19")]
    pub lng: Option<String>,
    /// Radius around `lat`/`lng` in kilometers (max: 500)
    pub radius: Option<String>,
    pub min_lat: Option<String>,
    pub max_lat: Option<String>,
    pub min_lng: Option<String>,
    pub max_lng: Option<String>,
    pub category: Option<String>,
    pub locality: Option<String>,
    /// Region code, e.g. `FL`
    pub region: Option<String>,
    pub country: Option<String>,
    /// Page number (1-10)
    pub page: Option<String>,
    /// Results per page (1-100, default: 20)
    pub limit: Option<String>,
    /// Prefix matching for type-ahead: `true` or `1`
    pub autocomplete: Option<String>,
}

impl SearchParams {
    /// Collect raw query pairs. The first occurrence of a repeated key wins and
    /// unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "q" => &mut params.q,
                "lat" => &mut params.lat,
                "lng" => &mut params.lng,
                "radius" => &mut params.radius,
                "minLat" => &mut params.min_lat,
                "maxLat" => &mut params.max_lat,
                "minLng" => &mut params.min_lng,
                "maxLng" => &mut params.max_lng,
                "category" => &mut params.category,
                "locality" => &mut params.locality,
                "region" => &mut params.region,
                "country" => &mut params.country,
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                "autocomplete" => &mut params.autocomplete,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// Validated and clamped search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Trimmed query with control characters removed
    pub query: String,
    pub geo: Option<GeoPoint>,
    /// Only meaningful together with `geo`
    pub radius_km: Option<f64>,
    pub bounds: Option<BoundingBox>,
    pub category: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub page: u32,
    pub limit: u32,
    pub autocomplete: bool,
}

impl SearchRequest {
    /// Validate raw parameters. Only an over-long query is rejected; every other
    /// value is clamped into range or dropped.
    pub fn from_params(params: SearchParams) -> Result<Self, ApiError> {
        let query = sanitize_query(params.q.as_deref().unwrap_or_default())?;

        let lat = parse_coordinate(params.lat.as_deref(), 90.0);
        let lng = parse_coordinate(params.lng.as_deref(), 180.0);
        let geo = match (lat, lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        };

        let bounds = match (
            parse_coordinate(params.min_lat.as_deref(), 90.0),
            parse_coordinate(params.max_lat.as_deref(), 90.0),
            parse_coordinate(params.min_lng.as_deref(), 180.0),
            parse_coordinate(params.max_lng.as_deref(), 180.0),
        ) {
            (Some(min_lat), Some(max_lat), Some(min_lng), Some(max_lng)) => Some(BoundingBox {
                min_lat,
                max_lat,
                min_lng,
                max_lng,
            }),
            _ => None,
        };

        Ok(Self {
            query,
            geo,
            radius_km: clamp_radius(params.radius.as_deref()),
            bounds,
            category: non_empty(params.category),
            locality: non_empty(params.locality),
            region: non_empty(params.region),
            country: non_empty(params.country),
            page: clamp_int(params.page.as_deref(), 1, 1, MAX_PAGE),
            limit: clamp_int(params.limit.as_deref(), DEFAULT_LIMIT, 1, MAX_LIMIT),
            autocomplete: is_truthy(params.autocomplete.as_deref()),
        })
    }
}

/// Trim, enforce the length limit and strip ASCII control characters.
pub fn sanitize_query(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.chars().count() > MAX_QUERY_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Query exceeds maximum length of {MAX_QUERY_LENGTH} characters"
        )));
    }

    let cleaned: String = trimmed.chars().filter(|c| *c > '\u{1f}').collect();
    Ok(cleaned.trim().to_string())
}

fn parse_float(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_coordinate(raw: Option<&str>, bound: f64) -> Option<f64> {
    parse_float(raw).filter(|v| v.abs() <= bound)
}

fn clamp_radius(raw: Option<&str>) -> Option<f64> {
    parse_float(raw)
        .filter(|r| *r > 0.0)
        .map(|r| r.min(MAX_RADIUS_KM))
}

fn clamp_int(raw: Option<&str>, default: u32, min: u32, max: u32) -> u32 {
    let value = raw
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(i64::from(default));
    value.clamp(i64::from(min), i64::from(max)) as u32
}

fn is_truthy(raw: Option<&str>) -> bool {
    matches!(raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(), Some("true" | "1"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One place in the public response. Shared by web and mobile clients; field
/// names and the `id` prefixes are part of the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// `tavvy:<id>` for internally sourced places, `fsq-<id>` otherwise
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fsq_place_id: Option<String>,
    pub name: String,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
    /// Distance from the requested point in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Engine relevance score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Field name to highlighted snippet. Absent when nothing was highlighted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<BTreeMap<String, String>>,
}

/// The filters that were actually applied, after inference and defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    /// Kilometers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub near_me: bool,
}

/// Search response. Changing this shape requires a new API version.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub hits: Vec<SearchResult>,
    /// Total number of matching places
    pub found: u64,
    /// Engine processing time in milliseconds
    pub search_time_ms: u64,
    pub page: u32,
    pub query: String,
    pub filters: AppliedFilters,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> SearchParams {
        let mut p = SearchParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "q" => p.q = value,
                "lat" => p.lat = value,
                "lng" => p.lng = value,
                "radius" => p.radius = value,
                "minLat" => p.min_lat = value,
                "maxLat" => p.max_lat = value,
                "minLng" => p.min_lng = value,
                "maxLng" => p.max_lng = value,
                "category" => p.category = value,
                "region" => p.region = value,
                "page" => p.page = value,
                "limit" => p.limit = value,
                "autocomplete" => p.autocomplete = value,
                other => panic!("unknown param {other}"),
            }
        }
        p
    }

    fn request(pairs: &[(&str, &str)]) -> SearchRequest {
        SearchRequest::from_params(params(pairs)).unwrap()
    }

    #[test]
    fn test_defaults() {
        let req = request(&[]);
        assert_eq!(req.query, "");
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 20);
        assert!(!req.autocomplete);
        assert!(req.geo.is_none());
        assert!(req.bounds.is_none());
    }

    #[test]
    fn test_page_is_clamped() {
        assert_eq!(request(&[("page", "999")]).page, 10);
        assert_eq!(request(&[("page", "0")]).page, 1);
        assert_eq!(request(&[("page", "-4")]).page, 1);
        assert_eq!(request(&[("page", "abc")]).page, 1);
        assert_eq!(request(&[("page", "7")]).page, 7);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(request(&[("limit", "0")]).limit, 1);
        assert_eq!(request(&[("limit", "1000")]).limit, 100);
        assert_eq!(request(&[("limit", "50")]).limit, 50);
    }

    #[test]
    fn test_radius_is_clamped() {
        assert_eq!(request(&[("radius", "10000")]).radius_km, Some(500.0));
        assert_eq!(request(&[("radius", "12.5")]).radius_km, Some(12.5));
        assert_eq!(request(&[("radius", "0")]).radius_km, None);
        assert_eq!(request(&[("radius", "NaN")]).radius_km, None);
    }

    #[test]
    fn test_query_too_long_is_rejected() {
        let long = "a".repeat(MAX_QUERY_LENGTH + 1);
        let err = SearchRequest::from_params(params(&[("q", &long)])).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_query_length_is_measured_after_trimming() {
        let padded = format!("   {}   ", "a".repeat(MAX_QUERY_LENGTH));
        assert_eq!(request(&[("q", &padded)]).query.len(), MAX_QUERY_LENGTH);
    }

    #[test]
    fn test_control_characters_are_stripped() {
        assert_eq!(request(&[("q", "piz\u{0}za\u{1b}\tbar")]).query, "pizzabar");
    }

    #[test]
    fn test_geo_point_requires_both_coordinates() {
        assert!(request(&[("lat", "25.77")]).geo.is_none());
        assert_eq!(
            request(&[("lat", "25.77"), ("lng", "-80.19")]).geo,
            Some(GeoPoint {
                lat: 25.77,
                lng: -80.19
            })
        );
        assert!(request(&[("lat", "125"), ("lng", "-80.19")]).geo.is_none());
    }

    #[test]
    fn test_bounds_require_all_four_edges() {
        let partial = request(&[("minLat", "25"), ("maxLat", "26"), ("minLng", "-81")]);
        assert!(partial.bounds.is_none());

        let full = request(&[
            ("minLat", "25"),
            ("maxLat", "26"),
            ("minLng", "-81"),
            ("maxLng", "-80"),
        ]);
        assert_eq!(
            full.bounds,
            Some(BoundingBox {
                min_lat: 25.0,
                max_lat: 26.0,
                min_lng: -81.0,
                max_lng: -80.0
            })
        );
    }

    #[test]
    fn test_autocomplete_tokens() {
        assert!(request(&[("autocomplete", "true")]).autocomplete);
        assert!(request(&[("autocomplete", "1")]).autocomplete);
        assert!(request(&[("autocomplete", "TRUE")]).autocomplete);
        assert!(!request(&[("autocomplete", "yes please")]).autocomplete);
        assert!(!request(&[("autocomplete", "0")]).autocomplete);
    }

    #[test]
    fn test_blank_filters_are_dropped() {
        let req = request(&[("category", "  "), ("region", " FL ")]);
        assert!(req.category.is_none());
        assert_eq!(req.region.as_deref(), Some("FL"));
    }

    #[test]
    fn test_from_pairs_keeps_first_repeated_value() {
        let pairs = [
            ("q", "tacos"),
            ("q", "burritos"),
            ("minLat", "25"),
            ("utm_source", "newsletter"),
            ("page", "2"),
            ("page", "9"),
        ]
        .map(|(k, v)| (k.to_string(), v.to_string()));

        let parsed = SearchParams::from_pairs(pairs);
        assert_eq!(parsed.q.as_deref(), Some("tacos"));
        assert_eq!(parsed.min_lat.as_deref(), Some("25"));
        assert_eq!(parsed.page.as_deref(), Some("2"));
        assert!(parsed.lat.is_none());
    }

    #[test]
    fn test_params_deserialize_camel_case() {
        let parsed: SearchParams =
            serde_json::from_str(r#"{"q":"tacos","minLat":"25","maxLng":"-80"}"#).unwrap();
        assert_eq!(parsed.q.as_deref(), Some("tacos"));
        assert_eq!(parsed.min_lat.as_deref(), Some("25"));
        assert_eq!(parsed.max_lng.as_deref(), Some("-80"));
    }

    #[test]
    fn test_response_uses_camel_case_and_omits_absent_fields() {
        let response = SearchResponse {
            hits: vec![],
            found: 0,
            search_time_ms: 3,
            page: 1,
            query: "tacos".to_string(),
            filters: AppliedFilters::default(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["searchTimeMs"], 3);
        assert_eq!(json["filters"], serde_json::json!({ "nearMe": false }));
    }
}
