// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and held in memory; nothing re-reads
//! the environment per request.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// GCP project id for the document store
    pub gcp_project_id: String,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,

    // --- Session tokens ---
    /// HS256 key for short-lived access tokens
    pub access_token_secret: Vec<u8>,
    /// HS256 key for refresh tokens (distinct from the access key)
    pub refresh_token_secret: Vec<u8>,
    /// Access token lifetime in minutes
    pub access_token_ttl_minutes: i64,
    /// Refresh token lifetime in days
    pub refresh_token_ttl_days: i64,

    // --- Outbound mail (optional; console fallback when absent) ---
    pub smtp_host: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,

    // --- Push (optional; disabled when absent) ---
    /// FCM server key for the legacy HTTP send endpoint
    pub fcm_server_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),

            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?
                .into_bytes(),
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SECRET"))?
                .into_bytes(),
            access_token_ttl_minutes: env::var("ACCESS_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            refresh_token_ttl_days: env::var("REFRESH_TOKEN_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),

            smtp_host: non_empty_env("SMTP_HOST"),
            smtp_username: non_empty_env("SMTP_USERNAME"),
            smtp_password: non_empty_env("SMTP_PASSWORD"),
            smtp_from: non_empty_env("SMTP_FROM"),

            fcm_server_key: non_empty_env("FCM_SERVER_KEY"),
        })
    }

    /// Fixed config for tests; no env access, no external services.
    pub fn test_default() -> Self {
        Self {
            port: 8000,
            gcp_project_id: "test-project".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            access_token_secret: b"test_access_key_32_bytes_minimum".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_minimu".to_vec(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 30,
            smtp_host: None,
            smtp_username: None,
            smtp_password: None,
            smtp_from: None,
            fcm_server_key: None,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_test_default() {
        let config = Config::test_default();
        assert_eq!(config.port, 8000);
        assert_ne!(config.access_token_secret, config.refresh_token_secret);
        assert!(config.smtp_host.is_none());
        assert!(config.fcm_server_key.is_none());
    }
}
