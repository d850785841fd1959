// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Maps raw Typesense hits onto the public `SearchResult` shape.
//!
//! A malformed field degrades to an absent value. Nothing in here returns an
//! error, so one corrupt document cannot blank out a page of results.

use crate::models::search::SearchResult;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Document ID prefix of places that originate from our own database
pub const INTERNAL_ID_PREFIX: &str = "tavvy:";
/// Public ID prefix of places that originate from Foursquare
pub const PROVIDER_ID_PREFIX: &str = "fsq-";

static CATEGORY_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]\s*,\s*['"]"#).expect("valid category separator regex"));

const LIST_REPR_CHARS: [char; 4] = ['[', ']', '\'', '"'];

static NULL: Value = Value::Null;

pub fn normalize(hit: &Value) -> SearchResult {
    let doc = hit.get("document").unwrap_or(&NULL);

    let raw_id = text(doc, "id").unwrap_or_default();
    let provider_id = text(doc, "fsq_place_id").or_else(|| text(doc, "fsq_id"));
    let (latitude, longitude) = coordinates(doc);

    SearchResult {
        id: namespaced_id(&raw_id, provider_id.as_deref()),
        fsq_place_id: provider_id.or_else(|| {
            let stripped = strip_internal_prefix(&raw_id);
            (!stripped.is_empty()).then(|| stripped.to_string())
        }),
        name: text(doc, "name").unwrap_or_default(),
        categories: categories(doc.get("categories")),
        address: text(doc, "address"),
        locality: text(doc, "locality"),
        region: text(doc, "region"),
        country: text(doc, "country"),
        postcode: text(doc, "postcode"),
        latitude,
        longitude,
        tel: text(doc, "tel"),
        website: text(doc, "website"),
        popularity: doc.get("popularity").and_then(number),
        distance: distance_meters(hit.get("geo_distance_meters")),
        score: relevance_score(hit),
        highlights: highlights(hit),
    }
}

fn strip_internal_prefix(raw_id: &str) -> &str {
    raw_id.strip_prefix(INTERNAL_ID_PREFIX).unwrap_or(raw_id)
}

/// Public ID: `tavvy:<id>` for internal places, `fsq-<id>` for everything else.
/// Clients pick the detail page route from this prefix.
pub fn namespaced_id(raw_id: &str, provider_id: Option<&str>) -> String {
    match raw_id.strip_prefix(INTERNAL_ID_PREFIX) {
        Some(id) => format!("{INTERNAL_ID_PREFIX}{id}"),
        None => format!(
            "{PROVIDER_ID_PREFIX}{}",
            provider_id.unwrap_or_else(|| strip_internal_prefix(raw_id))
        ),
    }
}

/// Repair a category list that reached the index as a Python list repr, e.g.
/// `["['Dining and Drinking > Cafe', ' Coffee', ' and Tea House > Coffee Shop']"]`.
///
/// Entries are joined back together, the outer bracket and quote artifacts are
/// stripped, the text is split on the `', '` separator and every piece is
/// trimmed and unquoted. Well-formed lists only get their entries trimmed.
pub fn repair_categories(entries: &[&str]) -> Vec<String> {
    let joined = entries.join(",");
    let trimmed = joined.trim();

    if !trimmed.starts_with(LIST_REPR_CHARS) {
        return entries
            .iter()
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect();
    }

    let inner = trimmed
        .trim_start_matches(|c: char| c == '[' || c == '\'' || c == '"' || c.is_whitespace())
        .trim_end_matches(|c: char| c == ']' || c == '\'' || c == '"' || c.is_whitespace());

    CATEGORY_SEPARATOR
        .split(inner)
        .map(|piece| {
            piece
                .trim_matches(|c: char| LIST_REPR_CHARS.contains(&c) || c.is_whitespace())
                .to_string()
        })
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn categories(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => {
            let entries: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            repair_categories(&entries)
        }
        Some(Value::String(s)) => repair_categories(&[s.as_str()]),
        _ => Vec::new(),
    }
}

/// Non-empty string field. Numbers are accepted and rendered as text.
fn text(doc: &Value, field: &str) -> Option<String> {
    match doc.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A finite number, whether the engine sent it as a number or as a string.
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn coordinates(doc: &Value) -> (Option<f64>, Option<f64>) {
    let flat = (
        doc.get("latitude").and_then(number),
        doc.get("longitude").and_then(number),
    );
    if flat.0.is_some() && flat.1.is_some() {
        return flat;
    }

    match doc.get("location").and_then(Value::as_array).map(Vec::as_slice) {
        Some([lat, lng]) => (number(lat), number(lng)),
        _ => flat,
    }
}

/// `geo_distance_meters` is either `{"location": 1234}` or a bare number.
fn distance_meters(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Object(fields) => fields
            .get("location")
            .and_then(number)
            .or_else(|| fields.values().find_map(number)),
        other => number(other),
    }
}

fn relevance_score(hit: &Value) -> Option<f64> {
    hit.get("text_match").and_then(number).or_else(|| {
        hit.get("text_match_info")
            .and_then(|info| info.get("score"))
            .and_then(number)
    })
}

/// Field to snippet, only for entries with a non-empty snippet. `None` when
/// nothing qualifies: an empty map would mean something different to clients.
fn highlights(hit: &Value) -> Option<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();

    if let Some(entries) = hit.get("highlights").and_then(Value::as_array) {
        for entry in entries {
            let field = entry.get("field").and_then(Value::as_str);
            let snippet = entry.get("snippet").and_then(Value::as_str);
            if let (Some(field), Some(snippet)) = (field, snippet) {
                if !snippet.trim().is_empty() {
                    map.insert(field.to_string(), snippet.to_string());
                }
            }
        }
    }

    if map.is_empty() {
        if let Some(fields) = hit.get("highlight").and_then(Value::as_object) {
            for (field, entry) in fields {
                if let Some(snippet) = entry.get("snippet").and_then(Value::as_str) {
                    if !snippet.trim().is_empty() {
                        map.insert(field.clone(), snippet.to_string());
                    }
                }
            }
        }
    }

    (!map.is_empty()).then_some(map)
}
