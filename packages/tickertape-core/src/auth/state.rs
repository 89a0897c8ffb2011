//! The persisted auth session record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The one mutable record of a session. Lives in memory inside the client
/// and round-trips through the state store verbatim.
///
/// An empty `access_token` means "no session"; only then is `expires_at`
/// meaningless. The refresh token outlives access-token refreshes because
/// refresh responses do not always carry a new one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AuthState {
    pub refresh_token: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub redirect_uri: String,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            refresh_token: String::new(),
            access_token: String::new(),
            expires_at: DateTime::UNIX_EPOCH,
            redirect_uri: String::new(),
        }
    }
}

// Token values stay out of Debug output.
impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("refresh_token", &redact(&self.refresh_token))
            .field("access_token", &redact(&self.access_token))
            .field("expires_at", &self.expires_at)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "" } else { "[redacted]" }
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// A token is usable strictly before its (skew-adjusted) expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Abandon any prior session and remember the redirect URI for the
    /// exchange and refresh calls that follow.
    pub fn reset_for_authorization(&mut self, redirect_uri: &str, now: DateTime<Utc>) {
        self.refresh_token.clear();
        self.access_token.clear();
        self.expires_at = now;
        self.redirect_uri = redirect_uri.to_string();
    }
}

/// Non-mutating view of the session, as reported by
/// [`BrokerClient::token_status`](crate::BrokerClient::token_status).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// No access token in memory or in the store.
    NoToken,
    /// A token exists but its validity window has passed.
    Expired,
    /// A token exists and is usable until `expires_at`.
    Valid { expires_at: DateTime<Utc> },
}

impl TokenStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenStatus::Valid { .. })
    }
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenStatus::NoToken => write!(f, "no token"),
            TokenStatus::Expired => write!(f, "token expired"),
            TokenStatus::Valid { .. } => write!(f, "token valid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn populated() -> AuthState {
        AuthState {
            refresh_token: "RT1".into(),
            access_token: "AT1".into(),
            expires_at: Utc::now() + Duration::seconds(1180),
            redirect_uri: "https://cb".into(),
        }
    }

    #[test]
    fn default_state_is_unauthenticated() {
        let state = AuthState::default();
        assert!(!state.is_authenticated());
        assert!(state.is_expired(Utc::now()));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let state = populated();
        assert!(!state.is_expired(state.expires_at - Duration::seconds(1)));
        assert!(state.is_expired(state.expires_at));
        assert!(state.is_expired(state.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn reset_clears_tokens_and_keeps_redirect() {
        let mut state = populated();
        let now = Utc::now();
        state.reset_for_authorization("https://other", now);

        assert!(!state.is_authenticated());
        assert!(state.refresh_token.is_empty());
        assert_eq!(state.expires_at, now);
        assert_eq!(state.redirect_uri, "https://other");
    }

    #[test]
    fn serde_round_trip_is_field_for_field() {
        let state = populated();
        let blob = serde_json::to_string(&state).unwrap();
        let back: AuthState = serde_json::from_str(&blob).unwrap();
        assert_eq!(state, back);
    }

    #[test]
    fn debug_redacts_tokens() {
        let rendered = format!("{:?}", populated());
        assert!(rendered.contains("[redacted]"));
        assert!(!rendered.contains("AT1"));
        assert!(!rendered.contains("RT1"));
        assert!(rendered.contains("https://cb"));
    }

    #[test]
    fn status_display_matches_diagnostics() {
        assert_eq!(TokenStatus::NoToken.to_string(), "no token");
        assert_eq!(TokenStatus::Expired.to_string(), "token expired");
        let valid = TokenStatus::Valid {
            expires_at: Utc::now(),
        };
        assert_eq!(valid.to_string(), "token valid");
        assert!(valid.is_valid());
    }
}
