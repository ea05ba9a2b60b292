// SPDX-License-Identifier: MIT

//! User account routes: registration, sessions, profile, settings.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Gender, Role, SanitizedUser, User, UserSettings, Visibility};
use crate::services::search::redact_email;
use crate::services::tokens::TokenPair;
use crate::services::{directory, TokenService};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;

/// Symbols the password policy accepts as "special characters".
const PASSWORD_SYMBOLS: &str = "!@#$%^&*";

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/login", post(login))
        .route("/user/refresh-access-token", post(refresh_access_token))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/logout", post(logout))
        .route("/user/change-password", post(change_password))
        .route("/user/update-avatar", patch(update_avatar))
        .route("/user/update-settings", patch(update_settings))
        .route("/user/update-fcm-token", patch(update_fcm_token))
        .route("/user/me", get(get_me))
        .route("/user/{id}", get(get_public_profile))
}

// ─── Registration ────────────────────────────────────────────

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    gender: Gender,
    password: String,
}

/// Password policy: 8-16 characters with at least one letter, one digit,
/// and one symbol from the fixed set.
fn validate_password(password: &str) -> Result<()> {
    let length = password.chars().count();
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

    if !(8..=16).contains(&length) || !has_letter || !has_digit || !has_symbol {
        return Err(AppError::BadRequest(
            "Password must be between 8 to 16 characters and include at least one letter, \
             one number, and one special character"
                .to_string(),
        ));
    }
    Ok(())
}

/// Default avatar by gender; "other" gets a name-based placeholder.
fn avatar_url(gender: Gender, name: &str) -> String {
    let path = match gender {
        Gender::Other => format!(
            "username?username={}",
            name.split_whitespace().collect::<Vec<_>>().join("+")
        ),
        Gender::Male => "public/boy".to_string(),
        Gender::Female => "public/girl".to_string(),
    };
    format!("https://avatar.iran.liara.run/{}", path)
}

/// Create (or re-create) a provisional account.
///
/// A repeated attempt before OTP verification overwrites the existing
/// unverified record in place, so there is always a single record per
/// email. Verification and login happen later through the OTP flow.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SanitizedUser>)> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || body.password.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Please provide all the required fields".to_string(),
        ));
    }
    if !(10..=50).contains(&email.chars().count()) || !User::is_institutional_email(&email) {
        return Err(AppError::BadRequest("Invalid email".to_string()));
    }
    validate_password(&body.password)?;

    let existing = state.db.find_user_by_email(&email).await?;
    if let Some(user) = &existing {
        if user.is_verified {
            return Err(AppError::Conflict("User already exists".to_string()));
        }
    }

    // Directory first; on a miss, derive a provisional name from the email.
    let name = match state.directory.resolve_name(&email).await {
        Some(name) => name,
        None => directory::temp_name_from_email(&email),
    };

    let password_hash = bcrypt::hash(&body.password, 8)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;
    let now = chrono::Utc::now().to_rfc3339();

    let user = match existing {
        Some(mut user) => {
            // Upsert-on-retry: same document, refreshed contents.
            user.name = name;
            user.email = email;
            user.gender = body.gender;
            user.avatar = avatar_url(body.gender, &user.name);
            user.password_hash = password_hash;
            user.created_at = now.clone();
            user.updated_at = now;
            user
        }
        None => User {
            id: uuid::Uuid::new_v4().to_string(),
            avatar: avatar_url(body.gender, &name),
            name,
            email,
            gender: body.gender,
            password_hash,
            role: Role::default(),
            refresh_token: None,
            is_verified: false,
            fcm_token: None,
            settings: UserSettings::default(),
            created_at: now.clone(),
            updated_at: now,
        },
    };

    state.db.upsert_user(&user).await?;
    tracing::info!(email = %user.email, "User registered (pending verification)");

    Ok((StatusCode::CREATED, Json(SanitizedUser::from(&user))))
}

// ─── Sessions ────────────────────────────────────────────────

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Session cookies: HttpOnly + Secure, access and refresh side by side.
pub(super) fn session_cookies(
    config: &crate::config::Config,
    pair: &TokenPair,
    jar: CookieJar,
) -> CookieJar {
    let access = Cookie::build(("accessToken", pair.access_token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::minutes(config.access_token_ttl_minutes))
        .build();
    let refresh = Cookie::build(("refreshToken", pair.refresh_token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(config.refresh_token_ttl_days))
        .build();
    jar.add(access).add(refresh)
}

fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    let expired = |name: &'static str| {
        Cookie::build((name, ""))
            .path("/")
            .http_only(true)
            .secure(true)
            .max_age(time::Duration::ZERO)
            .build()
    };
    jar.add(expired("accessToken")).add(expired("refreshToken"))
}

/// Issue a fresh token pair and persist the refresh token, invalidating
/// any previously stored one (single active session).
pub async fn issue_session(state: &AppState, user: &mut User) -> Result<TokenPair> {
    let pair = state.tokens.issue_pair(&user.id, &user.email)?;
    user.refresh_token = Some(pair.refresh_token.clone());
    user.updated_at = chrono::Utc::now().to_rfc3339();
    state.db.upsert_user(user).await?;
    Ok(pair)
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<serde_json::Value>)> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let email = body.email.trim().to_lowercase();
    let mut user = match state.db.find_user_by_email(&email).await? {
        Some(user) if user.is_verified => user,
        _ => {
            return Err(AppError::NotFound(
                "User doesn't exist or not verified".to_string(),
            ))
        }
    };

    let password_ok = bcrypt::verify(&body.password, &user.password_hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password verify failed: {}", e)))?;
    if !password_ok {
        return Err(AppError::Unauthorized(
            "Invalid user credentials".to_string(),
        ));
    }

    let pair = issue_session(&state, &mut user).await?;
    let jar = session_cookies(&state.config, &pair, jar);

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        jar,
        Json(serde_json::json!({ "user": SanitizedUser::from(&user) })),
    ))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>)> {
    if let Some(mut user) = state.db.get_user(&auth.user_id).await? {
        user.refresh_token = None;
        user.updated_at = chrono::Utc::now().to_rfc3339();
        state.db.upsert_user(&user).await?;
    }

    tracing::info!(user_id = %auth.user_id, "User logged out");

    Ok((
        clear_session_cookies(jar),
        Json(serde_json::json!({ "message": "User logged out successfully" })),
    ))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

/// Rotate the session: verify the incoming refresh token, require it to
/// match the stored one, then issue and persist a new pair.
async fn refresh_access_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<(CookieJar, Json<serde_json::Value>)> {
    // Cookie takes precedence over the request body.
    let incoming = jar
        .get("refreshToken")
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|Json(b)| b.refresh_token))
        .ok_or_else(|| AppError::Unauthorized("Unauthorized access".to_string()))?;

    let claims = state.tokens.verify_refresh(&incoming)?;

    let mut user = state
        .db
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if !TokenService::refresh_matches_stored(&incoming, user.refresh_token.as_deref()) {
        return Err(AppError::Unauthorized(
            "Refresh token invalid or expired".to_string(),
        ));
    }

    let pair = issue_session(&state, &mut user).await?;
    let jar = session_cookies(&state.config, &pair, jar);

    tracing::debug!(user_id = %user.id, "Session refreshed");

    Ok((
        jar,
        Json(serde_json::json!({ "user": SanitizedUser::from(&user) })),
    ))
}

// ─── Password ────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    if body.old_password.is_empty() || body.new_password.is_empty() {
        return Err(AppError::BadRequest(
            "Please provide all the required fields".to_string(),
        ));
    }
    let new_len = body.new_password.chars().count();
    if !(8..=16).contains(&new_len) {
        return Err(AppError::BadRequest(
            "Password length must be between 8 to 16 characters".to_string(),
        ));
    }

    let mut user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let old_ok = bcrypt::verify(&body.old_password, &user.password_hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password verify failed: {}", e)))?;
    if !old_ok {
        return Err(AppError::BadRequest("Old password is incorrect".to_string()));
    }

    user.password_hash = bcrypt::hash(&body.new_password, 8)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;
    user.updated_at = chrono::Utc::now().to_rfc3339();
    state.db.upsert_user(&user).await?;

    Ok(Json(
        serde_json::json!({ "message": "Password updated successfully" }),
    ))
}

// ─── Profile ─────────────────────────────────────────────────

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SanitizedUser>> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(SanitizedUser::from(&user)))
}

/// Public profile; the email is redacted unless the viewer is looking at
/// themselves.
async fn get_public_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<SanitizedUser>> {
    let user = state
        .db
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let mut view = SanitizedUser::from(&user);
    if auth.user_id != user.id {
        view.email = redact_email(&view.email);
    }

    Ok(Json(view))
}

// ─── Settings ────────────────────────────────────────────────

#[derive(Deserialize)]
struct UpdateAvatarRequest {
    /// URL of the already-uploaded avatar; blob hosting is external.
    avatar: String,
}

async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<UpdateAvatarRequest>,
) -> Result<Json<SanitizedUser>> {
    if body.avatar.trim().is_empty() {
        return Err(AppError::BadRequest("Please provide an avatar".to_string()));
    }

    let mut user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    user.avatar = body.avatar.trim().to_string();
    user.updated_at = chrono::Utc::now().to_rfc3339();
    state.db.upsert_user(&user).await?;

    Ok(Json(SanitizedUser::from(&user)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSettingsRequest {
    post_visibility: Visibility,
}

/// Default-visibility preference. Scoped settings require the matching
/// attribute: employee-only needs the employee role, female-only needs
/// gender female.
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<SanitizedUser>> {
    let mut user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if body.post_visibility == Visibility::EmployeeOnly && user.role != Role::Employee {
        return Err(AppError::BadRequest(
            "You are not allowed to set post visibility to employee-only".to_string(),
        ));
    }
    if body.post_visibility == Visibility::FemaleOnly && user.gender != Gender::Female {
        return Err(AppError::BadRequest(
            "You are not allowed to set post visibility to female-only".to_string(),
        ));
    }

    if user.settings.post_visibility != body.post_visibility {
        user.settings.post_visibility = body.post_visibility;
        user.updated_at = chrono::Utc::now().to_rfc3339();
        state.db.upsert_user(&user).await?;
    }

    Ok(Json(SanitizedUser::from(&user)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateFcmTokenRequest {
    fcm_token: String,
}

async fn update_fcm_token(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<UpdateFcmTokenRequest>,
) -> Result<Json<serde_json::Value>> {
    if body.fcm_token.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Please provide an FCM token".to_string(),
        ));
    }

    let mut user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    user.fcm_token = Some(body.fcm_token);
    user.updated_at = chrono::Utc::now().to_rfc3339();
    state.db.upsert_user(&user).await?;

    Ok(Json(
        serde_json::json!({ "message": "FCM token updated successfully" }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_policy_accepts_valid() {
        assert!(validate_password("Abcd123!").is_ok());
        assert!(validate_password("x1!x1!x1!x1!x1!x").is_ok());
    }

    #[test]
    fn test_password_policy_rejects_short_and_long() {
        assert!(validate_password("Ab1!").is_err());
        assert!(validate_password("Abcdefgh12345!!!!«").is_err());
    }

    #[test]
    fn test_password_policy_requires_all_classes() {
        assert!(validate_password("abcdefg1").is_err()); // no symbol
        assert!(validate_password("abcdefg!").is_err()); // no digit
        assert!(validate_password("12345678!").is_err()); // no letter
    }

    #[test]
    fn test_session_cookies_are_scoped_and_protected() {
        let config = crate::config::Config::test_default();
        let pair = TokenPair {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
        };
        let jar = session_cookies(&config, &pair, CookieJar::new());

        for name in ["accessToken", "refreshToken"] {
            let cookie = jar.get(name).unwrap();
            assert_eq!(cookie.path(), Some("/"));
            assert_eq!(cookie.http_only(), Some(true));
            assert_eq!(cookie.secure(), Some(true));
            assert!(cookie.max_age().unwrap() > time::Duration::ZERO);
        }
        assert!(
            jar.get("refreshToken").unwrap().max_age().unwrap()
                > jar.get("accessToken").unwrap().max_age().unwrap()
        );
    }

    #[test]
    fn test_clearing_expires_both_cookies() {
        let cleared = clear_session_cookies(CookieJar::new());
        assert_eq!(
            cleared.get("accessToken").unwrap().max_age(),
            Some(time::Duration::ZERO)
        );
        assert_eq!(
            cleared.get("refreshToken").unwrap().max_age(),
            Some(time::Duration::ZERO)
        );
    }

    #[test]
    fn test_avatar_url_branches() {
        assert_eq!(
            avatar_url(Gender::Male, "ALICE"),
            "https://avatar.iran.liara.run/public/boy"
        );
        assert_eq!(
            avatar_url(Gender::Female, "ALICE"),
            "https://avatar.iran.liara.run/public/girl"
        );
        assert_eq!(
            avatar_url(Gender::Other, "ALICE BOB"),
            "https://avatar.iran.liara.run/username?username=ALICE+BOB"
        );
    }
}
