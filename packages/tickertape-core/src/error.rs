//! Error taxonomy for broker API operations.

use crate::store::StoreError;

/// Errors surfaced by the auth lifecycle and authenticated API calls.
///
/// Every variant is retriable by the caller except [`InvalidArgument`],
/// which requires corrected input. Nothing is retried internally.
///
/// [`InvalidArgument`]: BrokerError::InvalidArgument
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// A required input was empty after trimming whitespace.
    #[error("argument empty: {0}")]
    InvalidArgument(&'static str),

    /// No access token in memory or in the store; the authorization-code
    /// flow has to be run first.
    #[error("no access token, authorization flow must be completed first")]
    NoAccessToken,

    /// The API answered with a non-2xx status.
    #[error("api rejected request with status {status}")]
    UpstreamRejected { status: reqwest::StatusCode },

    /// The request never completed (connection, DNS, timeout).
    #[error("transport failure")]
    Transport(#[source] reqwest::Error),

    /// The response body was not the JSON shape the API documents.
    #[error("malformed api response")]
    Decode(#[source] serde_json::Error),

    /// The auth state store failed. When this happens after a token grant
    /// the in-memory session stays usable; it is only lost on restart.
    #[error("auth state store failure")]
    Persistence(#[from] StoreError),
}
