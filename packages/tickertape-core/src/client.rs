//! The broker API client.
//!
//! Owns the HTTP transport, the configuration, and the token lifecycle.
//! Every authenticated request goes through [`BrokerClient::authorized_get`],
//! which validates (and if needed refreshes) the token before the request is
//! built; callers never see the access token itself.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::auth::{TokenManager, TokenStatus};
use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::market::bars;
use crate::market::{BarStreamOptions, DailyBar, SymbolInfo};
use crate::store::StateStore;

/// Fixed API version query parameter sent on every authenticated request
pub const API_VERSION: &str = "20160101";

/// Per-request timeout for the non-streaming calls. Bar streams are bounded
/// by the caller instead.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Date segment format of the bar chart path, `MM-DD-YYYY`
const BAR_DATE_FORMAT: &str = "%m-%d-%Y";

pub struct BrokerClient {
    http: reqwest::Client,
    config: Arc<BrokerConfig>,
    tokens: TokenManager,
}

impl BrokerClient {
    /// Build a client around a validated configuration and a state store.
    ///
    /// The transport performs one round trip per call: redirects are
    /// disabled and nothing is retried.
    pub fn new(config: BrokerConfig, store: Arc<dyn StateStore>) -> Result<Self, BrokerError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tickertape/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(BrokerError::Transport)?;

        let config = Arc::new(config);
        let tokens = TokenManager::new(http.clone(), Arc::clone(&config), store);

        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    /// Start the authorization-code flow. Discards any existing session and
    /// returns the URL the end user must visit to authorize this client.
    pub async fn start_auth(&self, redirect_uri: &str) -> Result<String, BrokerError> {
        self.tokens.start_auth(redirect_uri).await
    }

    /// Complete the authorization-code flow with the code from the redirect.
    pub async fn finish_auth(&self, code: &str) -> Result<(), BrokerError> {
        self.tokens.finish_auth(code).await
    }

    /// Report the session status without refreshing anything.
    pub async fn token_status(&self) -> Result<TokenStatus, BrokerError> {
        self.tokens.token_status().await
    }

    /// Check that an access token is available, refreshing an expired one.
    /// The request methods call this themselves; it is exposed so callers
    /// can validate a session up front.
    pub async fn ensure_valid_token(&self) -> Result<(), BrokerError> {
        self.tokens.ensure_valid_token().await.map(|_| ())
    }

    /// Fetch metadata for one symbol.
    pub async fn symbol_info(&self, symbol: &str) -> Result<SymbolInfo, BrokerError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(BrokerError::InvalidArgument("symbol"));
        }

        let response = self
            .authorized_get(&format!("/data/symbol/{symbol}"), Some(REQUEST_TIMEOUT))
            .await?;
        let body = response.text().await.map_err(BrokerError::Transport)?;
        serde_json::from_str(&body).map_err(|e| {
            // Raw capture for schema drift diagnosis; metadata is not secret.
            tracing::debug!(payload = %body, "symbol info decode failure");
            BrokerError::Decode(e)
        })
    }

    /// Collect daily bars for `symbol` starting on `start`, newest last.
    ///
    /// The stream is read until the server closes it or a bound in
    /// `options` trips; dropping the returned future cancels the stream.
    pub async fn daily_bars_starting_on(
        &self,
        symbol: &str,
        start: NaiveDate,
        options: BarStreamOptions,
    ) -> Result<Vec<DailyBar>, BrokerError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(BrokerError::InvalidArgument("symbol"));
        }

        let path = format!(
            "/stream/barchart/{}/1/Daily/{}",
            symbol,
            start.format(BAR_DATE_FORMAT)
        );
        let response = self.authorized_get(&path, None).await?;
        bars::collect(response, options).await
    }

    /// Build and send an authenticated GET: validate the token, append the
    /// `access_token` and `APIVersion` query parameters, perform exactly one
    /// round trip, and reject non-2xx statuses.
    async fn authorized_get(
        &self,
        path: &str,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, BrokerError> {
        let token = self.tokens.ensure_valid_token().await?;

        let url = format!("{}{}", self.config.base_url, path);
        let mut request = self
            .http
            .get(&url)
            .query(&[("access_token", token.as_str()), ("APIVersion", API_VERSION)]);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(BrokerError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, path, "api request rejected");
            return Err(BrokerError::UpstreamRejected { status });
        }
        Ok(response)
    }
}

impl std::fmt::Debug for BrokerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_date_segment_is_month_first() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(date.format(BAR_DATE_FORMAT).to_string(), "01-15-2024");
    }
}
