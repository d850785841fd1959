// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Combines a validated request with the intent parsed from its text into the
//! engine query that will be executed.

use crate::models::config::SearchPolicy;
use crate::models::search::{AppliedFilters, SearchRequest};
use crate::services::intent;
use crate::services::query_builder::{self, EngineQuery, QueryInput};

/// Everything needed to execute one search and describe it back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub engine_query: EngineQuery,
    pub filters: AppliedFilters,
}

/// Plan a search. Caller-supplied locality and region always override the
/// values inferred from the query text. With an explicit region, state words in
/// the text are left alone and searched as typed.
pub fn plan_search(request: &SearchRequest, policy: &SearchPolicy) -> SearchPlan {
    let parsed = intent::parse_with(&request.query, request.region.is_none());

    let locality = request.locality.clone().or(parsed.locality);
    let region = request.region.clone().or(parsed.region);

    // Radius only means something around a point
    let radius_km = request.geo.and_then(|_| {
        request
            .radius_km
            .or_else(|| parsed.near_me.then_some(policy.near_me_radius_km))
    });

    let engine_query = query_builder::build(&QueryInput {
        query: &parsed.query,
        geo: request.geo,
        radius_km,
        bounds: request.bounds,
        category: request.category.as_deref(),
        locality: locality.as_deref(),
        region: region.as_deref(),
        country: request.country.as_deref(),
        page: request.page,
        limit: request.limit,
        autocomplete: request.autocomplete,
    });

    let filters = AppliedFilters {
        lat: request.geo.map(|p| p.lat),
        lng: request.geo.map(|p| p.lng),
        radius: radius_km,
        bounds: request.bounds,
        category: request.category.clone(),
        locality,
        region,
        country: request.country.clone(),
        near_me: parsed.near_me,
    };

    SearchPlan {
        engine_query,
        filters,
    }
}
