// SPDX-License-Identifier: MIT

//! One-time codes for email verification and password reset.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// How long a code stays valid after issue.
pub const OTP_TTL_MINUTES: i64 = 5;

/// Why a code was issued. Codes never validate across reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtpReason {
    #[serde(rename = "register")]
    Register,
    #[serde(rename = "reset-password")]
    ResetPassword,
}

impl OtpReason {
    /// Parse the `{reason}` path segment.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "register" => Some(OtpReason::Register),
            "reset-password" => Some(OtpReason::ResetPassword),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OtpReason::Register => "register",
            OtpReason::ResetPassword => "reset-password",
        }
    }
}

/// OTP document stored in the `otps` collection (doc id = `id`).
///
/// Records are left to expire after a failed or abandoned flow; successful
/// verification deletes every record for the (email, reason) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRecord {
    /// Uuid, also used as the document id
    pub id: String,
    pub email: String,
    /// 4-digit numeric code
    pub code: String,
    pub reason: OtpReason,
    /// RFC 3339; validity requires `now < expires_at`
    pub expires_at: String,
    /// RFC 3339; recency tiebreaker for validation
    pub created_at: String,
}

impl OtpRecord {
    /// Build a fresh record for an email/reason pair.
    pub fn new(email: &str, code: String, reason: OtpReason, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            code,
            reason,
            expires_at: (now + Duration::minutes(OTP_TTL_MINUTES)).to_rfc3339(),
            created_at: now.to_rfc3339(),
        }
    }

    /// Validate a submitted code against this record.
    ///
    /// The caller must pass the most recently created record for the email.
    /// Every check contributes to a single yes/no so callers cannot tell
    /// which one failed. A code exactly at its expiry instant is rejected.
    pub fn matches(&self, code: &str, reason: OtpReason, now: DateTime<Utc>) -> bool {
        let code_ok = self.code.as_bytes().ct_eq(code.as_bytes()).into();
        let reason_ok = self.reason == reason;
        let unexpired = match DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expires_at) => now < expires_at.with_timezone(&Utc),
            Err(_) => false,
        };
        code_ok && reason_ok && unexpired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(now: DateTime<Utc>) -> OtpRecord {
        OtpRecord::new("test@cuchd.in", "1234".to_string(), OtpReason::Register, now)
    }

    #[test]
    fn test_valid_code_accepted() {
        let now = Utc::now();
        let rec = record(now);
        assert!(rec.matches("1234", OtpReason::Register, now + Duration::minutes(1)));
    }

    #[test]
    fn test_wrong_code_rejected() {
        let now = Utc::now();
        let rec = record(now);
        assert!(!rec.matches("4321", OtpReason::Register, now));
    }

    #[test]
    fn test_reason_scoping() {
        // A register code never validates for reset-password, even with a
        // matching code and email.
        let now = Utc::now();
        let rec = record(now);
        assert!(!rec.matches("1234", OtpReason::ResetPassword, now));
    }

    #[test]
    fn test_expiry_is_strict() {
        let now = Utc::now();
        let rec = record(now);
        let at_expiry = now + Duration::minutes(OTP_TTL_MINUTES);
        assert!(!rec.matches("1234", OtpReason::Register, at_expiry));
        assert!(!rec.matches("1234", OtpReason::Register, at_expiry + Duration::seconds(1)));
        assert!(rec.matches("1234", OtpReason::Register, at_expiry - Duration::seconds(1)));
    }

    #[test]
    fn test_reason_parse() {
        assert_eq!(OtpReason::parse("register"), Some(OtpReason::Register));
        assert_eq!(
            OtpReason::parse("reset-password"),
            Some(OtpReason::ResetPassword)
        );
        assert_eq!(OtpReason::parse("promotion"), None);
    }
}
