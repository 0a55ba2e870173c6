//! Error types for the client core.
//!
//! # Design
//! - Constant-message errors with structured context.
//! - `Unauthorized` is the distinguishable signal raised after a forced logout; callers match on
//!   it to avoid raising a second notification.
//! - Storage and URL failures are infrastructure errors and are never rendered as alerts.

use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors produced by the Nestegg client core.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("network request failed")]
    Network {
        /// Endpoint path that was being called.
        endpoint: String,
        /// Underlying transport error.
        source: reqwest::Error,
    },
    /// An authenticated call was rejected; the session has already been cleared.
    #[error("session expired")]
    Unauthorized,
    /// The server answered with a non-success status.
    #[error("server rejected request")]
    Server {
        /// HTTP status returned by the server.
        status: StatusCode,
        /// Human-readable detail extracted from the error body.
        detail: Option<String>,
    },
    /// A response body could not be decoded.
    #[error("failed to decode response")]
    Decode {
        /// Endpoint path that returned the body.
        endpoint: String,
        /// Underlying transport/serde error.
        source: reqwest::Error,
    },
    /// The payload editor did not contain valid JSON.
    #[error("invalid JSON payload")]
    InvalidJson {
        /// Underlying parse error.
        source: serde_json::Error,
    },
    /// Building an endpoint URL failed.
    #[error("invalid endpoint URL")]
    InvalidUrl {
        /// Path that was being joined onto the base URL.
        path: String,
        /// Underlying URL parse error.
        source: url::ParseError,
    },
    /// Constructing the HTTP client failed.
    #[error("failed to build HTTP client")]
    HttpClient {
        /// Underlying transport error.
        source: reqwest::Error,
    },
    /// Reading or writing the persisted session failed.
    #[error("session storage failure")]
    Storage {
        /// Operation that failed.
        operation: &'static str,
        /// File involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The persisted session document was malformed.
    #[error("session storage is corrupt")]
    StorageFormat {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Whether the error belongs to the local infrastructure rather than the remote API.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. }
                | Self::HttpClient { .. }
                | Self::Storage { .. }
                | Self::StorageFormat { .. }
        )
    }
}
