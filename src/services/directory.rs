// SPDX-License-Identifier: MIT

//! Institutional directory lookup.
//!
//! Resolves a display name for an email through an Outlook-style
//! people-suggestions API. The bearer credential lives in the `keys`
//! collection, maintained by an offline refresher; it is read once, cached,
//! and re-read only through `refresh()`.
//!
//! Failure policy: every caller tolerates a miss. Resolution errors are
//! logged and reported as `None`, and registration falls back to a name
//! derived from the email's local part.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::key::DIRECTORY_KEY_ID;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

const SUGGESTIONS_URL: &str = "https://outlook.office.com/search/api/v1/suggestions";

/// Directory client with a cached bearer credential.
#[derive(Clone)]
pub struct DirectoryService {
    http: reqwest::Client,
    db: FirestoreDb,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

#[derive(Deserialize)]
struct SuggestionsResponse {
    #[serde(rename = "Groups", default)]
    groups: Vec<SuggestionGroup>,
}

#[derive(Deserialize)]
struct SuggestionGroup {
    #[serde(rename = "Suggestions", default)]
    suggestions: Vec<Suggestion>,
}

#[derive(Deserialize)]
struct Suggestion {
    #[serde(rename = "DisplayName")]
    display_name: Option<String>,
}

impl DirectoryService {
    pub fn new(db: FirestoreDb) -> Self {
        Self {
            http: reqwest::Client::new(),
            db,
            base_url: SUGGESTIONS_URL.to_string(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Override the endpoint (tests point this at a local server).
    pub fn with_base_url(db: FirestoreDb, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            db,
            base_url,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Current credential, reading from the store on first use.
    async fn bearer_token(&self) -> Result<String, AppError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }
        self.refresh().await
    }

    /// Re-read the credential from the store. Called on first use and
    /// whenever the out-of-band refresher has rotated the token.
    pub async fn refresh(&self) -> Result<String, AppError> {
        let key = self
            .db
            .get_key(DIRECTORY_KEY_ID)
            .await?
            .ok_or_else(|| AppError::NotFound("Directory credential not found".to_string()))?;

        let mut guard = self.token.write().await;
        *guard = Some(key.access_token.clone());
        tracing::info!(updated_at = %key.updated_at, "Directory credential loaded");
        Ok(key.access_token)
    }

    /// Resolve a display name for an email.
    ///
    /// Returns `None` on a directory miss or on any failure; never errors
    /// out of the registration path.
    pub async fn resolve_name(&self, email: &str) -> Option<String> {
        match self.lookup(email).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, email, "Directory lookup failed, falling back");
                None
            }
        }
    }

    async fn lookup(&self, email: &str) -> Result<Option<String>, AppError> {
        let token = self.bearer_token().await?;

        let body = serde_json::json!({
            "AppName": "OWA",
            "Scenario": { "Name": "owa.react.compose" },
            "EntityRequests": [{
                "Query": { "QueryString": email },
                "EntityType": "People",
                "Provenances": ["Directory"],
                "Size": 1,
                "Fields": ["DisplayName", "EmailAddresses"],
            }],
        });

        let response = self
            .http
            .post(&self.base_url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Directory request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Directory returned status {}",
                response.status()
            )));
        }

        let parsed: SuggestionsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Directory response malformed: {}", e)))?;

        Ok(parsed
            .groups
            .into_iter()
            .next()
            .and_then(|g| g.suggestions.into_iter().next())
            .and_then(|s| s.display_name)
            .filter(|name| !name.trim().is_empty()))
    }
}

/// Derive a provisional display name from the email's local part:
/// everything before the first `@` or `.`, whichever comes first.
pub fn temp_name_from_email(email: &str) -> String {
    let split_index = email
        .char_indices()
        .find(|(_, c)| *c == '@' || *c == '.')
        .map(|(i, _)| i);

    match split_index {
        Some(i) => email[..i].to_string(),
        None => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_name_stops_at_first_dot() {
        assert_eq!(temp_name_from_email("alice.bob@cumail.in"), "alice");
    }

    #[test]
    fn test_temp_name_stops_at_at_sign() {
        assert_eq!(temp_name_from_email("alice@cuchd.in"), "alice");
    }

    #[test]
    fn test_temp_name_without_separators() {
        assert_eq!(temp_name_from_email("alice"), "alice");
    }

    #[test]
    fn test_suggestions_response_parsing() {
        let raw = r#"{"Groups":[{"Suggestions":[{"DisplayName":"ALICE BOB","EmailAddresses":["alice.bob@cumail.in"]}]}]}"#;
        let parsed: SuggestionsResponse = serde_json::from_str(raw).unwrap();
        let name = parsed
            .groups
            .into_iter()
            .next()
            .and_then(|g| g.suggestions.into_iter().next())
            .and_then(|s| s.display_name);
        assert_eq!(name.as_deref(), Some("ALICE BOB"));
    }

    #[test]
    fn test_suggestions_response_empty_groups() {
        let parsed: SuggestionsResponse = serde_json::from_str(r#"{"Groups":[]}"#).unwrap();
        assert!(parsed.groups.is_empty());
    }
}
