// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Translates a cleaned place query plus filters into a Typesense search request.

use crate::models::search::{BoundingBox, GeoPoint};

/// Searchable fields and their weights. A name match dominates a category or
/// geography match.
pub const FIELD_WEIGHTS: [(&str, u32); 5] = [
    ("name", 5),
    ("categories", 3),
    ("locality", 2),
    ("region", 1),
    ("address", 1),
];

/// Typo correction kicks in when fewer results than this are found
pub const TYPO_TOKENS_THRESHOLD: u32 = 1;
/// Query tokens are dropped when fewer results than this are found
pub const DROP_TOKENS_THRESHOLD: u32 = 1;
pub const HIGHLIGHT_FIELDS: &str = "name";
pub const HIGHLIGHT_AFFIX_NUM_TOKENS: u32 = 4;
pub const WILDCARD: &str = "*";

/// Everything the builder needs for one request.
#[derive(Debug, Clone, Default)]
pub struct QueryInput<'a> {
    pub query: &'a str,
    pub geo: Option<GeoPoint>,
    pub radius_km: Option<f64>,
    pub bounds: Option<BoundingBox>,
    pub category: Option<&'a str>,
    pub locality: Option<&'a str>,
    pub region: Option<&'a str>,
    pub country: Option<&'a str>,
    pub page: u32,
    pub limit: u32,
    pub autocomplete: bool,
}

/// Fully resolved engine parameters. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineQuery {
    pub query: String,
    pub sort_by: String,
    /// Clauses that are AND-combined; empty means no constraint
    pub filters: Vec<String>,
    pub num_typos: u8,
    pub prefix: bool,
    pub page: u32,
    pub per_page: u32,
}

impl EngineQuery {
    pub fn filter_by(&self) -> Option<String> {
        if self.filters.is_empty() {
            None
        } else {
            Some(self.filters.join(" && "))
        }
    }

    /// Render the Typesense `documents/search` query parameters.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let query_by = FIELD_WEIGHTS.map(|(field, _)| field).join(",");
        let weights = FIELD_WEIGHTS.map(|(_, weight)| weight.to_string()).join(",");

        let mut params = vec![
            ("q", self.query.clone()),
            ("query_by", query_by),
            ("query_by_weights", weights),
            ("num_typos", self.num_typos.to_string()),
            ("typo_tokens_threshold", TYPO_TOKENS_THRESHOLD.to_string()),
            ("drop_tokens_threshold", DROP_TOKENS_THRESHOLD.to_string()),
            ("prioritize_exact_match", "true".to_string()),
            ("prioritize_token_position", "true".to_string()),
            ("text_match_type", "max_score".to_string()),
            ("highlight_fields", HIGHLIGHT_FIELDS.to_string()),
            (
                "highlight_affix_num_tokens",
                HIGHLIGHT_AFFIX_NUM_TOKENS.to_string(),
            ),
            ("sort_by", self.sort_by.clone()),
            ("prefix", self.prefix.to_string()),
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];

        if let Some(filter_by) = self.filter_by() {
            params.push(("filter_by", filter_by));
        }

        params
    }
}

pub fn is_wildcard(query: &str) -> bool {
    let trimmed = query.trim();
    trimmed.is_empty() || trimmed == WILDCARD
}

/// Typos allowed for a query, by non-whitespace length. Short tokens like
/// "bbq" must match exactly.
pub fn typo_budget(query: &str) -> u8 {
    match query.chars().filter(|c| !c.is_whitespace()).count() {
        0..=3 => 0,
        4..=5 => 1,
        _ => 2,
    }
}

// ---------------------------------------------------------------------------
// Sort selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    TextMatch,
    Distance,
    Popularity,
}

/// Facts the sort rules are evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct SortContext {
    pub geo: Option<GeoPoint>,
    pub has_bounds: bool,
    pub wildcard: bool,
}

/// One row of the sort decision table.
pub struct SortRule {
    pub name: &'static str,
    pub applies: fn(&SortContext) -> bool,
    pub keys: &'static [SortKey],
}

fn named_search_near_point(ctx: &SortContext) -> bool {
    ctx.geo.is_some() && !ctx.wildcard
}

fn browse_near_point(ctx: &SortContext) -> bool {
    ctx.geo.is_some() && ctx.wildcard
}

fn browse_in_bounds(ctx: &SortContext) -> bool {
    ctx.has_bounds && ctx.wildcard
}

fn always(_: &SortContext) -> bool {
    true
}

/// Evaluated top to bottom, first match wins. The last row always matches.
pub static SORT_RULES: [SortRule; 4] = [
    SortRule {
        name: "relevance_then_distance",
        applies: named_search_near_point,
        keys: &[SortKey::TextMatch, SortKey::Distance, SortKey::Popularity],
    },
    SortRule {
        name: "distance",
        applies: browse_near_point,
        keys: &[SortKey::Distance, SortKey::Popularity],
    },
    SortRule {
        name: "popularity",
        applies: browse_in_bounds,
        keys: &[SortKey::Popularity],
    },
    SortRule {
        name: "relevance",
        applies: always,
        keys: &[SortKey::TextMatch, SortKey::Popularity],
    },
];

pub fn select_sort_rule(ctx: &SortContext) -> &'static SortRule {
    SORT_RULES
        .iter()
        .find(|rule| (rule.applies)(ctx))
        .unwrap_or(&SORT_RULES[SORT_RULES.len() - 1])
}

fn render_sort(keys: &[SortKey], geo: Option<GeoPoint>) -> String {
    keys.iter()
        .filter_map(|key| match key {
            SortKey::TextMatch => Some("_text_match:desc".to_string()),
            SortKey::Distance => geo.map(|p| format!("location({}, {}):asc", p.lat, p.lng)),
            SortKey::Popularity => Some("popularity:desc".to_string()),
        })
        .collect::<Vec<_>>()
        .join(",")
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Exact-match clause. Backticks delimit the value in Typesense, so they are
/// dropped from user input.
fn exact_match(field: &str, value: &str) -> String {
    let value: String = value.chars().filter(|c| *c != '`').collect();
    format!("{field}:=`{value}`")
}

fn build_filters(input: &QueryInput<'_>) -> Vec<String> {
    let mut filters = Vec::new();

    if let (Some(point), Some(radius)) = (input.geo, input.radius_km) {
        filters.push(format!(
            "location:({}, {}, {} km)",
            point.lat, point.lng, radius
        ));
    }

    if let Some(b) = input.bounds {
        filters.push(format!("latitude:[{}..{}]", b.min_lat, b.max_lat));
        filters.push(format!("longitude:[{}..{}]", b.min_lng, b.max_lng));
    }

    let exact = [
        ("categories", input.category),
        ("locality", input.locality),
        ("region", input.region),
        ("country", input.country),
    ];
    for (field, value) in exact {
        if let Some(value) = value {
            filters.push(exact_match(field, value));
        }
    }

    filters
}

/// Build the engine query. Autocomplete only switches on prefix matching; it
/// does not touch sorting, filters or weights.
pub fn build(input: &QueryInput<'_>) -> EngineQuery {
    let wildcard = is_wildcard(input.query);
    let query = if wildcard {
        WILDCARD.to_string()
    } else {
        input.query.trim().to_string()
    };

    let ctx = SortContext {
        geo: input.geo,
        has_bounds: input.bounds.is_some(),
        wildcard,
    };
    let rule = select_sort_rule(&ctx);

    EngineQuery {
        num_typos: typo_budget(&query),
        sort_by: render_sort(rule.keys, input.geo),
        filters: build_filters(input),
        query,
        prefix: input.autocomplete,
        page: input.page,
        per_page: input.limit,
    }
}
