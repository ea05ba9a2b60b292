// SPDX-License-Identifier: MIT

//! Push notification dispatch via FCM.
//!
//! Builds the message payload for a conversation event and posts it to the
//! FCM HTTP endpoint with the server key. Without a configured key the
//! service runs disabled and logs instead of sending, which keeps tests and
//! local development offline.

use crate::error::AppError;
use serde::Deserialize;

const FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

/// FCM client.
#[derive(Clone)]
pub struct PushService {
    http: reqwest::Client,
    base_url: String,
    server_key: Option<String>,
}

/// Everything needed to build a new-message notification.
#[derive(Debug, Clone)]
pub struct MessagePush<'a> {
    pub to_user_id: &'a str,
    pub from_user_id: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub sender_name: &'a str,
    pub sender_avatar: &'a str,
    pub fcm_token: &'a str,
}

#[derive(Deserialize)]
struct FcmResponse {
    #[serde(default)]
    success: u32,
    #[serde(default)]
    failure: u32,
}

impl PushService {
    pub fn new(server_key: Option<String>) -> Self {
        if server_key.is_none() {
            tracing::info!("Push service running disabled (no FCM server key)");
        }
        Self {
            http: reqwest::Client::new(),
            base_url: FCM_SEND_URL.to_string(),
            server_key,
        }
    }

    /// Disabled client for tests.
    pub fn new_disabled() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: FCM_SEND_URL.to_string(),
            server_key: None,
        }
    }

    /// Send a new-message notification to one device.
    pub async fn send_message(&self, push: MessagePush<'_>) -> Result<(), AppError> {
        let first_name = push.sender_name.split_whitespace().next().unwrap_or("");
        let payload = serde_json::json!({
            "to": push.fcm_token,
            "notification": {
                "title": push.title,
                "body": push.body,
                "image": push.sender_avatar,
            },
            "data": {
                "reason": format!("New Message from {}", first_name),
                "fromUserId": push.from_user_id,
                "toUserId": push.to_user_id,
                "senderName": push.sender_name,
                "senderAvatar": push.sender_avatar,
                "route": format!("messages/{}", push.from_user_id),
                "timestamp": chrono::Utc::now().timestamp_millis().to_string(),
            },
            "android": {
                "priority": "high",
                "notification": { "sound": "default", "channel_id": "messages" },
            },
            "apns": {
                "payload": { "aps": { "sound": "default", "badge": 1, "content-available": 1 } },
            },
        });

        let Some(server_key) = &self.server_key else {
            tracing::info!(to_user = push.to_user_id, "Push disabled, message not sent");
            return Ok(());
        };

        let response = self
            .http
            .post(&self.base_url)
            .header("Authorization", format!("key={}", server_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("FCM request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "FCM returned status {}",
                response.status()
            )));
        }

        let parsed: FcmResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("FCM response malformed: {}", e)))?;

        if parsed.failure > 0 && parsed.success == 0 {
            return Err(AppError::Internal(anyhow::anyhow!(
                "FCM rejected the message"
            )));
        }

        tracing::info!(to_user = push.to_user_id, "Push notification sent");
        Ok(())
    }
}
