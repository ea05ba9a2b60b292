// SPDX-License-Identifier: MIT

//! Route registry: admin-maintained (src, dest, via) records plus fuzzy
//! search used by clients for location suggestions.

use crate::error::{AppError, Result};
use crate::middleware::require_admin;
use crate::models::RouteRecord;
use crate::services::search::fuzzy_score;
use crate::AppState;
use axum::{middleware, routing::post, Json, Router};
use axum::extract::State;
use serde::Deserialize;
use std::sync::Arc;

/// Minimum score for a route to show up in search results.
const ROUTE_MATCH_THRESHOLD: u32 = 40;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/route/add",
            post(add_route).route_layer(middleware::from_fn(require_admin)),
        )
        .route("/route/search", post(search_routes))
}

#[derive(Deserialize)]
struct AddRouteRequest {
    src: String,
    dest: String,
    // Kept optional in serde so a missing key reaches validation and
    // comes back as a 400 in the standard envelope, not a 422.
    via: Option<Vec<String>>,
}

impl AddRouteRequest {
    /// Returns the trimmed (src, dest) pair and the waypoint list. The
    /// `via` array may be empty but must be present.
    fn validate(&self) -> Result<(&str, &str, &[String])> {
        let src = self.src.trim();
        let dest = self.dest.trim();
        if src.is_empty() || dest.is_empty() {
            return Err(AppError::BadRequest(
                "Please provide both src and dest".to_string(),
            ));
        }
        let via = self
            .via
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Please provide a via list".to_string()))?;
        Ok((src, dest, via))
    }
}

/// Idempotent add-or-merge keyed on the (src, dest) pair. Repeating a
/// request changes nothing; new waypoints accumulate onto the existing
/// record.
async fn add_route(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddRouteRequest>,
) -> Result<Json<RouteRecord>> {
    let (src, dest, via) = body.validate()?;
    let route = state.db.upsert_route_merged(src, dest, via).await?;

    Ok(Json(route))
}

#[derive(Deserialize)]
struct SearchRoutesRequest {
    src: Option<String>,
    dest: Option<String>,
}

/// Fuzzy search over the registry. Matches on src and matches on dest are
/// scored independently and concatenated, so a route hitting both queries
/// appears twice.
async fn search_routes(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchRoutesRequest>,
) -> Result<Json<serde_json::Value>> {
    let src_query = body.src.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let dest_query = body.dest.as_deref().map(str::trim).filter(|s| !s.is_empty());
    if src_query.is_none() && dest_query.is_none() {
        return Err(AppError::BadRequest(
            "Please provide a src or dest to search".to_string(),
        ));
    }

    let routes = state.db.list_routes().await?;

    let mut matches: Vec<&RouteRecord> = Vec::new();
    if let Some(query) = src_query {
        matches.extend(
            routes
                .iter()
                .filter(|route| fuzzy_score(query, &route.src) >= ROUTE_MATCH_THRESHOLD),
        );
    }
    if let Some(query) = dest_query {
        matches.extend(
            routes
                .iter()
                .filter(|route| fuzzy_score(query, &route.dest) >= ROUTE_MATCH_THRESHOLD),
        );
    }

    Ok(Json(serde_json::json!({ "routes": matches })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> AddRouteRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_add_route_requires_via_list() {
        let body = parse(r#"{ "src": "Sector 17", "dest": "Elante Mall" }"#);
        assert!(matches!(body.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_add_route_accepts_empty_via_list() {
        let body = parse(r#"{ "src": "Sector 17", "dest": "Elante Mall", "via": [] }"#);
        let (src, dest, via) = body.validate().unwrap();
        assert_eq!(src, "Sector 17");
        assert_eq!(dest, "Elante Mall");
        assert!(via.is_empty());
    }

    #[test]
    fn test_add_route_rejects_blank_endpoints() {
        let body = parse(r#"{ "src": "  ", "dest": "Elante Mall", "via": [] }"#);
        assert!(matches!(body.validate(), Err(AppError::BadRequest(_))));
    }
}
