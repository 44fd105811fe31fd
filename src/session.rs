use crate::error::ApiError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use chrono::{DateTime, Utc};
use std::fmt;

/// Access/refresh pair issued by `POST /api/token/`.
///
/// Passed explicitly to every authenticated call.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub access: String,
    pub refresh: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

impl Session {
    pub fn new(username: impl Into<String>, access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access)
    }

    /// `exp` claim of the access token. `None` when the token is not a readable JWT.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let payload = self.access.split('.').nth(1)?;
        let bytes = BASE64_URL.decode(payload.trim_end_matches('=')).ok()?;
        let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        let exp = claims.get("exp")?.as_i64()?;
        DateTime::from_timestamp(exp, 0)
    }

    /// Tokens without a readable expiry are left for the server to judge.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|exp| exp <= now).unwrap_or(false)
    }

    /// Fail early with `Unauthenticated` instead of sending a request that will bounce.
    pub fn ensure_active(&self) -> Result<(), ApiError> {
        if self.access.trim().is_empty() || self.is_expired_at(Utc::now()) {
            return Err(ApiError::Unauthenticated);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(exp: i64) -> String {
        let header = BASE64_URL.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = BASE64_URL.encode(format!(r#"{{"token_type":"access","exp":{},"user_id":1}}"#, exp));
        format!("{}.{}.signature", header, claims)
    }

    #[test]
    fn reads_expiry_from_access_token() {
        let session = Session::new("ana", jwt(1_700_000_000), "r");
        let exp = session.expires_at().unwrap();
        assert_eq!(exp.timestamp(), 1_700_000_000);
        assert!(session.is_expired_at(DateTime::from_timestamp(1_700_000_001, 0).unwrap()));
        assert!(!session.is_expired_at(DateTime::from_timestamp(1_699_999_000, 0).unwrap()));
    }

    #[test]
    fn opaque_tokens_are_not_considered_expired() {
        let session = Session::new("ana", "opaque-token", "r");
        assert_eq!(session.expires_at(), None);
        assert!(session.ensure_active().is_ok());
    }

    #[test]
    fn expired_or_blank_session_is_unauthenticated() {
        let expired = Session::new("ana", jwt(1_000), "r");
        assert!(matches!(expired.ensure_active(), Err(ApiError::Unauthenticated)));
        let blank = Session::new("ana", "  ", "r");
        assert!(blank.ensure_active().unwrap_err().is_unauthenticated());
    }

    #[test]
    fn debug_hides_tokens() {
        let session = Session::new("ana", "secret-access", "secret-refresh");
        let printed = format!("{:?}", session);
        assert!(!printed.contains("secret"));
        assert_eq!(session.bearer(), "Bearer secret-access");
    }
}
