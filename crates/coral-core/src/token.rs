//! Access token state.
//!
//! An [`AccessToken`] is the bearer credential obtained from the login
//! service. It is stored whole and replaced whole: the authorization grant
//! resets it before an exchange and overwrites it on success, so a reader
//! never observes a half-updated credential.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A bearer credential with an absolute expiry instant.
///
/// The default value carries no credential and is never valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// Token type as reported by the login service, typically `"Bearer"`.
    pub token_type: String,
    /// The opaque token string.
    pub token: String,
    /// Absolute expiry, derived from the issue instant plus the server's
    /// `expires_in` lifetime.
    pub expires_at: DateTime<Utc>,
}

impl Default for AccessToken {
    fn default() -> Self {
        Self {
            token_type: String::new(),
            token: String::new(),
            expires_at: DateTime::<Utc>::MIN_UTC,
        }
    }
}

impl AccessToken {
    /// Build a token expiring `expires_in` seconds from now.
    #[must_use]
    pub fn new(token_type: impl Into<String>, token: impl Into<String>, expires_in: i64) -> Self {
        Self {
            token_type: token_type.into(),
            token: token.into(),
            expires_at: Utc::now() + Duration::seconds(expires_in),
        }
    }

    /// Whether the token can still be presented: non-empty and not expired.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.token.is_empty() && Utc::now() < self.expires_at
    }

    /// How long until expiry. Zero or negative once expired.
    #[must_use]
    pub fn expires_in(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Clear the credential wholesale.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The `Authorization` header value for this token.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_token_is_invalid() {
        let token = AccessToken::default();
        assert!(!token.is_valid());
        assert!(token.token.is_empty());
    }

    #[test]
    fn fresh_token_is_valid() {
        let token = AccessToken::new("Bearer", "abc123", 3600);
        assert!(token.is_valid());
        assert!(token.expires_in() > Duration::seconds(3590));
    }

    #[test]
    fn expired_token_is_invalid() {
        let token = AccessToken::new("Bearer", "abc123", -1);
        assert!(!token.is_valid());
    }

    #[test]
    fn empty_token_with_future_expiry_is_invalid() {
        let token = AccessToken {
            token_type: "Bearer".to_owned(),
            token: String::new(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert!(!token.is_valid());
    }

    #[test]
    fn reset_clears_wholesale() {
        let mut token = AccessToken::new("Bearer", "abc123", 3600);
        token.reset();
        assert_eq!(token, AccessToken::default());
        assert!(!token.is_valid());
    }

    #[test]
    fn authorization_header_format() {
        let token = AccessToken::new("Bearer", "abc123", 60);
        assert_eq!(token.authorization_header(), "Bearer abc123");
    }
}
