// SPDX-License-Identifier: MIT

//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// Institutional email domains accepted for registration.
pub const ALLOWED_DOMAINS: [&str; 2] = ["cuchd.in", "cumail.in"];

/// Gender recorded at registration; drives avatar defaults and the
/// female-only visibility scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Account role. Employees unlock the employee-only scope; admins may
/// manage the route registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Employee,
    Admin,
}

/// Who may see a post (or a user's default for new posts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "female-only")]
    FemaleOnly,
    #[serde(rename = "employee-only")]
    EmployeeOnly,
}

/// Per-user preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub post_visibility: Visibility,
}

/// User document stored in the `users` collection (doc id = `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Uuid, also used as the document id
    pub id: String,
    /// Display name resolved from the directory (or derived from the email)
    pub name: String,
    /// Institutional email, lowercased; unique across users
    pub email: String,
    pub gender: Gender,
    /// Avatar URL
    pub avatar: String,
    /// Bcrypt hash; never leaves the server
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    /// Single active session: the only refresh token currently honored
    pub refresh_token: Option<String>,
    /// Login is refused until OTP verification sets this
    #[serde(default)]
    pub is_verified: bool,
    /// Push delivery target, if the client registered one
    pub fcm_token: Option<String>,
    #[serde(default)]
    pub settings: UserSettings,
    /// RFC 3339
    pub created_at: String,
    pub updated_at: String,
}

/// Client-facing view of a user with credentials stripped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub gender: Gender,
    pub avatar: String,
    pub role: Role,
    pub is_verified: bool,
    pub settings: UserSettings,
}

impl From<&User> for SanitizedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            gender: user.gender,
            avatar: user.avatar.clone(),
            role: user.role,
            is_verified: user.is_verified,
            settings: user.settings.clone(),
        }
    }
}

impl User {
    /// Whether the email belongs to one of the recognized institutional
    /// domains.
    pub fn is_institutional_email(email: &str) -> bool {
        match email.rsplit_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !local.contains(char::is_whitespace)
                    && ALLOWED_DOMAINS.contains(&domain)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_institutional_email_domains() {
        assert!(User::is_institutional_email("a.b12345@cuchd.in"));
        assert!(User::is_institutional_email("someone@cumail.in"));
        assert!(!User::is_institutional_email("someone@gmail.com"));
        assert!(!User::is_institutional_email("no-at-sign.cuchd.in"));
        assert!(!User::is_institutional_email("@cuchd.in"));
        assert!(!User::is_institutional_email("with space@cumail.in"));
    }

    #[test]
    fn test_visibility_serde_names() {
        let json = serde_json::to_string(&Visibility::FemaleOnly).unwrap();
        assert_eq!(json, "\"female-only\"");
        let back: Visibility = serde_json::from_str("\"employee-only\"").unwrap();
        assert_eq!(back, Visibility::EmployeeOnly);
    }
}
