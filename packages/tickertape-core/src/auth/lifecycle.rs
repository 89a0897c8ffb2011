//! OAuth2 token lifecycle: acquire, persist, validate, refresh.
//!
//! All of the session state lives behind one async mutex. The expiry check,
//! the refresh POST, and the persist that follows run inside a single
//! critical section, so concurrent callers that observe an expired token
//! collapse into one refresh and all wait on its result.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::auth::state::{AuthState, TokenStatus};
use crate::client::REQUEST_TIMEOUT;
use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::store::{StateStore, StoreError};

/// Store key for the serialized auth state blob
pub(crate) const STATE_KEY: &str = "broker_auth";

const SECURITY_AUTHORIZE_PATH: &str = "/security/authorize";
const AUTHORIZE_PATH: &str = "/authorize";

/// Seconds subtracted from a token's stated lifetime. Absorbs clock drift
/// and request latency so a token is never used right at its true expiry.
const EXPIRY_SKEW_SECS: i64 = 20;

/// Token grant response, for both the code exchange and the refresh.
/// `refresh_token` is absent on refresh responses; everything else is
/// required and a response missing any of it is a decode failure.
#[derive(Deserialize)]
struct AccessTokenResponse {
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
    access_token: String,
    #[allow(dead_code)]
    token_type: String,
    userid: String,
}

impl std::fmt::Debug for AccessTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenResponse")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("expires_in", &self.expires_in)
            .field("access_token", &"[redacted]")
            .field("userid", &self.userid)
            .finish()
    }
}

/// The token lifecycle state machine. Owned by the client; one per session.
pub(crate) struct TokenManager {
    http: reqwest::Client,
    config: Arc<BrokerConfig>,
    store: Arc<dyn StateStore>,
    state: Mutex<AuthState>,
}

impl TokenManager {
    pub fn new(http: reqwest::Client, config: Arc<BrokerConfig>, store: Arc<dyn StateStore>) -> Self {
        Self {
            http,
            config,
            store,
            state: Mutex::new(AuthState::default()),
        }
    }

    /// Abandon any prior session and return the authorization URL for the
    /// caller to present to the end user out of band.
    pub async fn start_auth(&self, redirect_uri: &str) -> Result<String, BrokerError> {
        let redirect_uri = redirect_uri.trim();
        if redirect_uri.is_empty() {
            return Err(BrokerError::InvalidArgument("redirect_uri"));
        }

        let mut state = self.state.lock().await;
        state.reset_for_authorization(redirect_uri, Utc::now());
        self.persist(&state)?;

        tracing::info!("authorization flow started");
        Ok(format!(
            "{}{}?client_id={}&redirect_uri={}&response_type=code",
            self.config.base_url,
            AUTHORIZE_PATH,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(redirect_uri),
        ))
    }

    /// Exchange the authorization code for a token grant and persist it.
    pub async fn finish_auth(&self, code: &str) -> Result<(), BrokerError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(BrokerError::InvalidArgument("code"));
        }

        let mut state = self.state.lock().await;
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", state.redirect_uri.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("response_type", "token"),
        ];
        let grant = self.token_request(&form).await?;

        state.access_token = grant.access_token;
        state.refresh_token = grant.refresh_token.unwrap_or_default();
        state.expires_at = expiry_from(grant.expires_in, Utc::now());
        tracing::info!(userid = %grant.userid, "authorization complete");

        self.persist(&state)
    }

    /// Ensure there is a usable access token, refreshing it if the validity
    /// window has passed, and hand it to the request builder. This is the
    /// only path that reads the token.
    pub async fn ensure_valid_token(&self) -> Result<String, BrokerError> {
        let mut state = self.state.lock().await;
        if !state.is_authenticated() {
            self.load_from_store(&mut state)?;
            if !state.is_authenticated() {
                return Err(BrokerError::NoAccessToken);
            }
        }

        if !state.is_expired(Utc::now()) {
            return Ok(state.access_token.clone());
        }

        tracing::debug!("access token expired, refreshing");
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", state.redirect_uri.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", state.refresh_token.as_str()),
            ("response_type", "token"),
        ];
        let grant = self.token_request(&form).await?;

        state.access_token = grant.access_token;
        state.expires_at = expiry_from(grant.expires_in, Utc::now());
        // Refresh responses are not guaranteed to rotate the refresh token.
        if let Some(rotated) = grant.refresh_token.filter(|t| !t.is_empty()) {
            state.refresh_token = rotated;
        }

        self.persist(&state)?;
        Ok(state.access_token.clone())
    }

    /// Diagnostic status query. Loads from the store when memory is empty
    /// but never refreshes.
    pub async fn token_status(&self) -> Result<TokenStatus, BrokerError> {
        let mut state = self.state.lock().await;
        if !state.is_authenticated() {
            self.load_from_store(&mut state)?;
        }

        if !state.is_authenticated() {
            Ok(TokenStatus::NoToken)
        } else if state.is_expired(Utc::now()) {
            Ok(TokenStatus::Expired)
        } else {
            Ok(TokenStatus::Valid {
                expires_at: state.expires_at,
            })
        }
    }

    /// One form-encoded POST to the authorize endpoint. No mutation happens
    /// here; callers apply the grant only after it decodes cleanly.
    async fn token_request(&self, form: &[(&str, &str)]) -> Result<AccessTokenResponse, BrokerError> {
        let url = format!("{}{}", self.config.base_url, SECURITY_AUTHORIZE_PATH);
        let response = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .form(form)
            .send()
            .await
            .map_err(BrokerError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "token request rejected");
            return Err(BrokerError::UpstreamRejected { status });
        }

        let body = response.text().await.map_err(BrokerError::Transport)?;
        serde_json::from_str(&body).map_err(BrokerError::Decode)
    }

    fn load_from_store(&self, state: &mut AuthState) -> Result<(), BrokerError> {
        if let Some(blob) = self.store.retrieve(STATE_KEY)? {
            *state = serde_json::from_str(&blob)
                .map_err(|e| BrokerError::Persistence(StoreError::Corrupt(e)))?;
            tracing::debug!("auth state loaded from store");
        }
        Ok(())
    }

    fn persist(&self, state: &AuthState) -> Result<(), BrokerError> {
        let blob = serde_json::to_string(state)
            .map_err(|e| BrokerError::Persistence(StoreError::Corrupt(e)))?;
        self.store.save(STATE_KEY, &blob)?;
        Ok(())
    }
}

fn expiry_from(expires_in: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::seconds(expires_in - EXPIRY_SKEW_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_subtracts_the_skew() {
        let now = Utc::now();
        assert_eq!(expiry_from(1200, now), now + Duration::seconds(1180));
    }

    #[test]
    fn tiny_lifetimes_expire_immediately() {
        let now = Utc::now();
        assert!(expiry_from(5, now) < now);
        assert_eq!(expiry_from(20, now), now);
    }

    #[test]
    fn grant_decodes_without_refresh_token() {
        let grant: AccessTokenResponse = serde_json::from_str(
            r#"{"expires_in":1200,"access_token":"AT2","token_type":"AccessToken","userid":"u"}"#,
        )
        .unwrap();
        assert!(grant.refresh_token.is_none());
        assert_eq!(grant.access_token, "AT2");
        assert_eq!(grant.expires_in, 1200);
    }

    #[test]
    fn grant_requires_the_documented_fields() {
        // access_token missing
        let err = serde_json::from_str::<AccessTokenResponse>(
            r#"{"expires_in":1200,"token_type":"AccessToken","userid":"u"}"#,
        );
        assert!(err.is_err());

        // expires_in missing
        let err = serde_json::from_str::<AccessTokenResponse>(
            r#"{"access_token":"AT1","token_type":"AccessToken","userid":"u"}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn grant_debug_redacts_tokens() {
        let grant: AccessTokenResponse = serde_json::from_str(
            r#"{"refresh_token":"RT1","expires_in":1200,"access_token":"AT1","token_type":"AccessToken","userid":"u"}"#,
        )
        .unwrap();
        let rendered = format!("{grant:?}");
        assert!(rendered.contains("[redacted]"));
        assert!(!rendered.contains("AT1"));
        assert!(!rendered.contains("RT1"));
    }
}
