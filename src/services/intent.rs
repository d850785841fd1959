// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Lightweight intent extraction from free-text place queries.
//!
//! Recognizes "near me", a trailing US state (code or full name) and an
//! `<what> in|near <where>` locality, and removes them from the text that is
//! sent to the search engine. Never fails: unrecognized input comes back as is.

use regex::Regex;
use std::sync::LazyLock;

static NEAR_ME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\bnear\s+me\b\s*").expect("valid near-me regex"));

static TRAILING_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*\S)([\s,]+)([A-Za-z]{2})$").expect("valid trailing state regex")
});

static DANGLING_CONNECTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\s,]+(?:in|near)$").expect("valid connector regex")
});

static LOCALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)\s+(?:in|near)\s+(.+)$").expect("valid locality regex")
});

/// US states plus DC, as (code, lowercase name).
const US_STATES: [(&str, &str); 51] = [
    ("AL", "alabama"),
    ("AK", "alaska"),
    ("AZ", "arizona"),
    ("AR", "arkansas"),
    ("CA", "california"),
    ("CO", "colorado"),
    ("CT", "connecticut"),
    ("DE", "delaware"),
    ("DC", "district of columbia"),
    ("FL", "florida"),
    ("GA", "georgia"),
    ("HI", "hawaii"),
    ("ID", "idaho"),
    ("IL", "illinois"),
    ("IN", "indiana"),
    ("IA", "iowa"),
    ("KS", "kansas"),
    ("KY", "kentucky"),
    ("LA", "louisiana"),
    ("ME", "maine"),
    ("MD", "maryland"),
    ("MA", "massachusetts"),
    ("MI", "michigan"),
    ("MN", "minnesota"),
    ("MS", "mississippi"),
    ("MO", "missouri"),
    ("MT", "montana"),
    ("NE", "nebraska"),
    ("NV", "nevada"),
    ("NH", "new hampshire"),
    ("NJ", "new jersey"),
    ("NM", "new mexico"),
    ("NY", "new york"),
    ("NC", "north carolina"),
    ("ND", "north dakota"),
    ("OH", "ohio"),
    ("OK", "oklahoma"),
    ("OR", "oregon"),
    ("PA", "pennsylvania"),
    ("RI", "rhode island"),
    ("SC", "south carolina"),
    ("SD", "south dakota"),
    ("TN", "tennessee"),
    ("TX", "texas"),
    ("UT", "utah"),
    ("VT", "vermont"),
    ("VA", "virginia"),
    ("WA", "washington"),
    ("WV", "west virginia"),
    ("WI", "wisconsin"),
    ("WY", "wyoming"),
];

/// Structured signals pulled out of a raw query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedIntent {
    /// Query text with every recognized phrase removed
    pub query: String,
    pub near_me: bool,
    pub locality: Option<String>,
    /// Two-letter US state code
    pub region: Option<String>,
}

/// Parse a raw query. Steps run in a fixed order and each one only sees the
/// text left over by the previous steps.
pub fn parse(raw: &str) -> ParsedIntent {
    parse_with(raw, true)
}

/// Like [`parse`], but state detection only runs when `detect_region` is set.
/// Callers that already carry an explicit region pass `false` so the state and
/// city words stay in the searched text.
pub fn parse_with(raw: &str, detect_region: bool) -> ParsedIntent {
    let mut working = raw.trim().to_string();

    let near_me = NEAR_ME.is_match(&working);
    if near_me {
        working = NEAR_ME.replace_all(&working, " ").trim().to_string();
    }

    let stripped = if detect_region {
        strip_state_code(&working).or_else(|| strip_state_name(&working))
    } else {
        None
    };
    let region = stripped.map(|(rest, code)| {
        working = rest;
        code
    });
    if region.is_some() {
        working = DANGLING_CONNECTOR.replace(&working, "").trim().to_string();
    }

    let mut locality = None;
    if let Some(caps) = LOCALITY.captures(&working) {
        let head = caps[1].trim().to_string();
        let tail = caps[2].trim().trim_end_matches(',').trim().to_string();
        if !tail.is_empty() {
            locality = Some(tail);
            working = head;
        }
    }

    ParsedIntent {
        query: working.trim().to_string(),
        near_me,
        locality,
        region,
    }
}

/// Look up the code for a two-letter token, case-insensitively.
pub fn state_code(token: &str) -> Option<&'static str> {
    US_STATES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(token))
        .map(|(code, _)| *code)
}

/// Strip a trailing state code such as "FL" or "fl".
///
/// Without an `in`/`near` connector, the word right before the code is a city
/// qualifier when the text is exactly "<what> <city> XX" or the city is set off
/// by a comma ("best pizza miami, FL"). It is removed from the text but not
/// promoted to a locality filter, because a single guessed word is too
/// unreliable for an exact-match filter. Longer names keep every word.
fn strip_state_code(text: &str) -> Option<(String, String)> {
    let caps = TRAILING_CODE.captures(text)?;
    let code = state_code(&caps[3])?;
    let comma_separated = caps[1].ends_with(',') || caps[2].contains(',');
    let head = caps[1].trim_end_matches(',').trim();

    let has_city_qualifier =
        !LOCALITY.is_match(head) && (comma_separated || head.split_whitespace().count() == 2);

    let rest = match head.rsplit_once(char::is_whitespace) {
        Some((before, _city)) if has_city_qualifier => {
            before.trim_end_matches(',').trim().to_string()
        }
        _ => head.to_string(),
    };

    Some((rest, code.to_string()))
}

/// Strip a trailing full state name such as "florida" or "New York".
fn strip_state_name(text: &str) -> Option<(String, String)> {
    let mut by_length: Vec<&(&str, &str)> = US_STATES.iter().collect();
    by_length.sort_by_key(|(_, name)| std::cmp::Reverse(name.len()));

    by_length.into_iter().find_map(|(code, name)| {
        let start = text.len().checked_sub(name.len())?;
        if !text.is_char_boundary(start) || !text[start..].eq_ignore_ascii_case(name) {
            return None;
        }
        let head = &text[..start];
        let at_word_boundary = head.ends_with(|c: char| c.is_whitespace() || c == ',');
        if !at_word_boundary || head.trim().is_empty() {
            return None;
        }
        Some((
            head.trim_end_matches(|c: char| c.is_whitespace() || c == ',')
                .to_string(),
            code.to_string(),
        ))
    })
}
