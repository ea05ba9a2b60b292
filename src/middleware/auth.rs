// SPDX-License-Identifier: MIT

//! Access-token authentication middleware.

use crate::error::AppError;
use crate::models::{Gender, Role, Visibility};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Authenticated viewer context, loaded from the user record on every
/// request so role/gender/settings changes take effect immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub role: Role,
    pub gender: Gender,
    pub post_visibility: Visibility,
}

/// Middleware that requires a valid access token.
///
/// The token is taken from the `accessToken` cookie first, then from the
/// `Authorization: Bearer` header.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = if let Some(cookie) = jar.get("accessToken") {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(h) if h.starts_with("Bearer ") => h[7..].to_string(),
            _ => {
                return Err(AppError::Unauthorized(
                    "Couldn't find access token".to_string(),
                ))
            }
        }
    };

    let claims = state.tokens.verify_access(&token)?;

    let user = state
        .db
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid access token".to_string()))?;

    let auth_user = AuthUser {
        user_id: user.id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        avatar: user.avatar.clone(),
        role: user.role,
        gender: user.gender,
        post_visibility: user.settings.post_visibility,
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Middleware for admin-only routes; layered on top of `require_auth`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let is_admin = request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.role == Role::Admin)
        .unwrap_or(false);

    if !is_admin {
        return Err(AppError::Unauthorized("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}
