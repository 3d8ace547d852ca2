//! OAuth access tokens.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Seconds shaved off `expires_in` so a token is never used right at expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Credential returned by a provider's token endpoint.
///
/// Lives only in the visitor's session; it is never refreshed or persisted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// Usually "bearer".
    pub token_type: String,
    /// Kept as returned; this service does not refresh tokens.
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Creates a token from token endpoint response data.
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        Self::issued_at(
            Utc::now(),
            access_token,
            token_type,
            refresh_token,
            expires_in_secs,
        )
    }

    /// Creates a token as if it had been issued at `now`.
    pub fn issued_at(
        now: DateTime<Utc>,
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        // An `expires_in` too large for chrono means the token never expires.
        let expires_at = expires_in_secs
            .and_then(|secs| secs.checked_sub(EXPIRY_SKEW_SECS))
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime));

        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            refresh_token,
            expires_at,
        }
    }

    /// Returns true if the token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Tokens without an expiry never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn expiry_includes_skew() {
        let token = AccessToken::issued_at(noon(), "abc", "bearer", None, Some(3600));
        assert_eq!(
            token.expires_at,
            Some(noon() + Duration::seconds(3600 - EXPIRY_SKEW_SECS))
        );
    }

    #[test]
    fn expired_after_deadline() {
        let token = AccessToken::issued_at(noon(), "abc", "bearer", None, Some(3600));
        assert!(!token.is_expired_at(noon() + Duration::minutes(30)));
        assert!(token.is_expired_at(noon() + Duration::minutes(59)));
        assert!(token.is_expired_at(noon() + Duration::hours(2)));
    }

    #[test]
    fn no_expiry_never_expires() {
        let token = AccessToken::issued_at(noon(), "abc", "bearer", None, None);
        assert!(!token.is_expired_at(noon() + Duration::days(365)));
    }

    #[test]
    fn huge_expires_in_means_no_expiry() {
        for secs in [1_000_000_000_000_000, i64::MAX, i64::MIN] {
            let token = AccessToken::issued_at(noon(), "abc", "bearer", None, Some(secs));
            assert_eq!(token.expires_at, None, "expires_in = {secs}");
        }
        let token = AccessToken::new("abc", "bearer", None, Some(1_000_000_000_000_000));
        assert!(!token.is_expired());
    }

    #[test]
    fn fresh_token_is_not_expired() {
        let token = AccessToken::new("abc", "bearer", Some("refresh".to_string()), Some(3600));
        assert!(!token.is_expired());
    }

    #[test]
    fn debug_redacts_secrets() {
        let token = AccessToken::new("super-secret", "bearer", Some("also-secret".to_string()), None);
        let debug = format!("{:?}", token);
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("also-secret"));
        assert!(debug.contains("bearer"));
    }
}
