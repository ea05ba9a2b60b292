// SPDX-License-Identifier: MIT

//! OTP issue and verification routes for registration and password reset.

use crate::error::{AppError, Result};
use crate::models::{OtpReason, OtpRecord, SanitizedUser};
use crate::routes::user::issue_session;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/otp/send/{reason}", post(send_otp))
        .route("/otp/verify/{reason}", post(verify_otp))
}

fn parse_reason(raw: &str) -> Result<OtpReason> {
    OtpReason::parse(raw).ok_or_else(|| AppError::BadRequest("Invalid OTP reason".to_string()))
}

#[derive(Deserialize)]
struct SendOtpRequest {
    email: String,
}

/// Issue a 4-digit code for the given reason and email it out.
///
/// Delivery is best-effort; a mail failure is logged and the request
/// still succeeds, the user can ask for another code.
async fn send_otp(
    State(state): State<Arc<AppState>>,
    Path(reason): Path<String>,
    Json(body): Json<SendOtpRequest>,
) -> Result<Json<serde_json::Value>> {
    let reason = parse_reason(&reason)?;
    let email = body.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::BadRequest("Please provide an email".to_string()));
    }

    if state.db.find_user_by_email(&email).await?.is_none() {
        return Err(AppError::NotFound("User doesn't exist".to_string()));
    }

    let code = rand::thread_rng().gen_range(1000..10000).to_string();
    let record = OtpRecord::new(&email, code.clone(), reason, chrono::Utc::now());
    state.db.create_otp(&record).await?;

    state.mailer.send_otp(&email, &code).await;
    tracing::info!(email = %email, reason = reason.as_str(), "OTP issued");

    Ok(Json(
        serde_json::json!({ "message": "OTP sent successfully" }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyOtpRequest {
    email: String,
    otp: String,
    /// Only consulted for the reset-password flow.
    new_password: Option<String>,
}

/// Validate the latest code for the email. Any failure (missing record,
/// wrong code, wrong reason, expired) yields the same error so callers
/// learn nothing about which check tripped.
async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Path(reason): Path<String>,
    jar: CookieJar,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<(CookieJar, Json<serde_json::Value>)> {
    let reason = parse_reason(&reason)?;
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || body.otp.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Please provide all the required fields".to_string(),
        ));
    }

    let invalid = || AppError::BadRequest("Invalid or expired OTP".to_string());

    let latest = state.db.latest_otp(&email).await?.ok_or_else(invalid)?;
    if !latest.matches(body.otp.trim(), reason, chrono::Utc::now()) {
        return Err(invalid());
    }

    let mut user = state
        .db
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("User doesn't exist".to_string()))?;

    match reason {
        OtpReason::Register => {
            user.is_verified = true;
            let pair = issue_session(&state, &mut user).await?;
            state.db.delete_otps(&email, reason.as_str()).await?;

            let jar = super::user::session_cookies(&state.config, &pair, jar);
            tracing::info!(user_id = %user.id, "User verified");

            Ok((
                jar,
                Json(serde_json::json!({ "user": SanitizedUser::from(&user) })),
            ))
        }
        OtpReason::ResetPassword => {
            let new_password = body
                .new_password
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    AppError::BadRequest("Please provide a new password".to_string())
                })?;
            if !(8..=16).contains(&new_password.chars().count()) {
                return Err(AppError::BadRequest(
                    "Password length must be between 8 to 16 characters".to_string(),
                ));
            }

            user.password_hash = bcrypt::hash(new_password, 8).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e))
            })?;
            user.refresh_token = None;
            user.updated_at = chrono::Utc::now().to_rfc3339();
            state.db.upsert_user(&user).await?;
            state.db.delete_otps(&email, reason.as_str()).await?;

            tracing::info!(user_id = %user.id, "Password reset");

            Ok((
                jar,
                Json(serde_json::json!({ "message": "Password reset successfully" })),
            ))
        }
    }
}
