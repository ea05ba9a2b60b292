// SPDX-License-Identifier: MIT

//! Standalone directory lookup endpoint.

use crate::error::{AppError, Result};
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/directory/lookup", post(lookup))
}

#[derive(Deserialize)]
struct LookupRequest {
    email: String,
}

async fn lookup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LookupRequest>,
) -> Result<Json<serde_json::Value>> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::BadRequest("Please provide an email".to_string()));
    }

    match state.directory.resolve_name(&email).await {
        Some(name) => Ok(Json(serde_json::json!({ "name": name }))),
        None => Err(AppError::NotFound(
            "No directory entry found for this email".to_string(),
        )),
    }
}
