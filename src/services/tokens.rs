// SPDX-License-Identifier: MIT

//! Access/refresh token issuance and verification.
//!
//! Two HS256 token families with distinct secrets and lifetimes: the access
//! token carries the user id and email and authenticates requests; the
//! refresh token carries the id only and is honored solely while it matches
//! the copy stored on the user record (single active session).

use crate::config::Config;
use crate::error::AppError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// User id
    pub sub: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Claims carried by a refresh token.
///
/// `jti` makes every issued token unique, so rotation within the same
/// second still produces a distinct token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
}

/// Freshly issued token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Stateless JWT signer/verifier for both token families.
#[derive(Clone)]
pub struct TokenService {
    access_key: Vec<u8>,
    refresh_key: Vec<u8>,
    access_ttl_secs: usize,
    refresh_ttl_secs: usize,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            access_key: config.access_token_secret.clone(),
            refresh_key: config.refresh_token_secret.clone(),
            access_ttl_secs: (config.access_token_ttl_minutes * 60) as usize,
            refresh_ttl_secs: (config.refresh_token_ttl_days * 24 * 60 * 60) as usize,
        }
    }

    fn now() -> Result<usize, AppError> {
        Ok(SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs() as usize)
    }

    /// Issue an access + refresh pair for a user.
    ///
    /// The caller persists the refresh token on the user record, which
    /// invalidates whatever was stored before.
    pub fn issue_pair(&self, user_id: &str, email: &str) -> Result<TokenPair, AppError> {
        let now = Self::now()?;

        let access = encode(
            &Header::new(Algorithm::HS256),
            &AccessClaims {
                sub: user_id.to_string(),
                email: email.to_string(),
                iat: now,
                exp: now + self.access_ttl_secs,
            },
            &EncodingKey::from_secret(&self.access_key),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Token signing failed: {}", e)))?;

        let refresh = encode(
            &Header::new(Algorithm::HS256),
            &RefreshClaims {
                sub: user_id.to_string(),
                iat: now,
                exp: now + self.refresh_ttl_secs,
                jti: uuid::Uuid::new_v4().to_string(),
            },
            &EncodingKey::from_secret(&self.refresh_key),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Token signing failed: {}", e)))?;

        Ok(TokenPair {
            access_token: access,
            refresh_token: refresh,
        })
    }

    /// Decode and verify an access token.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AppError> {
        let key = DecodingKey::from_secret(&self.access_key);
        let validation = Validation::new(Algorithm::HS256);
        decode::<AccessClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Couldn't validate access token".to_string()))
    }

    /// Decode and verify a refresh token signature/expiry. Rotation
    /// equality against the stored token is a separate check.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AppError> {
        let key = DecodingKey::from_secret(&self.refresh_key);
        let validation = Validation::new(Algorithm::HS256);
        let claims = decode::<RefreshClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Refresh token invalid or expired".to_string()))?;

        if claims.sub.is_empty() {
            return Err(AppError::Unauthorized(
                "Refresh token invalid or expired".to_string(),
            ));
        }
        Ok(claims)
    }

    /// Constant-time equality between an incoming refresh token and the one
    /// stored on the user record. A mismatch means the token was already
    /// rotated out (or reused after theft).
    pub fn refresh_matches_stored(incoming: &str, stored: Option<&str>) -> bool {
        match stored {
            Some(stored) => incoming.as_bytes().ct_eq(stored.as_bytes()).into(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&Config::test_default())
    }

    #[test]
    fn test_access_token_roundtrip() {
        let svc = service();
        let pair = svc.issue_pair("user-1", "a@cuchd.in").unwrap();
        let claims = svc.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "a@cuchd.in");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_families_are_distinct() {
        let svc = service();
        let pair = svc.issue_pair("user-1", "a@cuchd.in").unwrap();
        // A refresh token must not pass access verification and vice versa.
        assert!(svc.verify_access(&pair.refresh_token).is_err());
        assert!(svc.verify_refresh(&pair.access_token).is_err());
    }

    #[test]
    fn test_refresh_roundtrip() {
        let svc = service();
        let pair = svc.issue_pair("user-2", "b@cumail.in").unwrap();
        let claims = svc.verify_refresh(&pair.refresh_token).unwrap();
        assert_eq!(claims.sub, "user-2");
    }

    #[test]
    fn test_rotation_mismatch_detected() {
        let svc = service();
        let first = svc.issue_pair("user-3", "c@cuchd.in").unwrap();
        let second = svc.issue_pair("user-3", "c@cuchd.in").unwrap();

        // After rotation the stored token is `second`; the old one no
        // longer matches even though its signature is still valid.
        assert!(TokenService::refresh_matches_stored(
            &second.refresh_token,
            Some(&second.refresh_token)
        ));
        assert!(!TokenService::refresh_matches_stored(
            &first.refresh_token,
            Some(&second.refresh_token)
        ));
        assert!(!TokenService::refresh_matches_stored(
            &first.refresh_token,
            None
        ));
    }

    #[test]
    fn test_garbage_tokens_rejected() {
        let svc = service();
        assert!(svc.verify_access("not.a.jwt").is_err());
        assert!(svc.verify_refresh("").is_err());
    }
}
