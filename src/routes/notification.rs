// SPDX-License-Identifier: MIT

//! Notification routes. Only the message reason actually dispatches a
//! push today; the other reasons are accepted and acknowledged so clients
//! don't need to special-case them.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::push::MessagePush;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/notification/send/{reason}", post(send_notification))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendNotificationRequest {
    to_user_id: String,
    title: String,
    body: String,
}

async fn send_notification(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(reason): Path<String>,
    Json(body): Json<SendNotificationRequest>,
) -> Result<Json<serde_json::Value>> {
    match reason.as_str() {
        "message" => send_message_push(&state, &auth, body).await,
        // Reserved reasons; acknowledged but not dispatched yet.
        "promotion" | "alert" => Ok(Json(
            serde_json::json!({ "message": "Notification accepted" }),
        )),
        _ => Err(AppError::BadRequest(
            "Invalid notification reason".to_string(),
        )),
    }
}

async fn send_message_push(
    state: &AppState,
    auth: &AuthUser,
    body: SendNotificationRequest,
) -> Result<Json<serde_json::Value>> {
    if body.to_user_id.trim().is_empty() || body.title.trim().is_empty() || body.body.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "Please provide all the required fields".to_string(),
        ));
    }

    let recipient = state
        .db
        .get_user(&body.to_user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    // A recipient without a registered device is not an error; the message
    // itself is delivered in-app.
    let Some(fcm_token) = recipient.fcm_token.as_deref() else {
        tracing::info!(to_user = %recipient.id, "Recipient has no FCM token, skipping push");
        return Ok(Json(
            serde_json::json!({ "message": "Notification skipped (no device token)" }),
        ));
    };

    state
        .push
        .send_message(MessagePush {
            to_user_id: &recipient.id,
            from_user_id: &auth.user_id,
            title: &body.title,
            body: &body.body,
            sender_name: &auth.name,
            sender_avatar: &auth.avatar,
            fcm_token,
        })
        .await?;

    Ok(Json(
        serde_json::json!({ "message": "Notification sent successfully" }),
    ))
}
