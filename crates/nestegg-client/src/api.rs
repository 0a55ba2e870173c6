//! HTTP transport for the calculation API.
//!
//! # Design
//! - One method per endpoint; non-success statuses become [`ClientError::Server`] with the
//!   server's `detail` already rendered to a readable line.
//! - Authenticated calls report a 401 as [`Authorized::Expired`] instead of an error so the
//!   caller can run the forced-logout path exactly once.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::models::{CalculationRecord, Credentials, ErrorBody, LoginForm, TokenResponse};
use crate::payload::CalculationKind;

/// Header carrying the per-process trace identifier.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

const REGISTER_PATH: &str = "/register";
const LOGIN_PATH: &str = "/login";
const HISTORY_PATH: &str = "/history";

/// Outcome of a bearer-authenticated call.
#[derive(Clone, Debug, PartialEq)]
pub enum Authorized<T> {
    /// The call succeeded.
    Ok(T),
    /// The server answered 401; the session is no longer valid.
    Expired,
}

/// Thin client over the four API endpoints.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Build a client with the configured timeout and a fresh trace identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpClient`] if the underlying client cannot be constructed.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Self::with_trace_id(config, &Uuid::new_v4().to_string())
    }

    /// Build a client that tags every request with `trace_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpClient`] if the identifier is not a valid header value or
    /// the underlying client cannot be constructed.
    pub fn with_trace_id(config: ClientConfig, trace_id: &str) -> ClientResult<Self> {
        let mut default_headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(trace_id) {
            default_headers.insert(HEADER_REQUEST_ID, value);
        } else {
            tracing::warn!(trace_id, "trace identifier is not a valid header value; omitting");
        }

        let http = Client::builder()
            .timeout(config.http_timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|source| ClientError::HttpClient { source })?;
        Ok(Self { http, config })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create an account. The request body is JSON `{email, password}`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] when no response arrives and [`ClientError::Server`]
    /// for non-success statuses.
    pub async fn register(&self, credentials: &Credentials) -> ClientResult<()> {
        let url = self.config.endpoint(REGISTER_PATH)?;
        let response = send(self.http.post(url).json(credentials), REGISTER_PATH).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(rejection(response).await)
        }
    }

    /// Exchange credentials for a bearer token. The request body is form-encoded with the
    /// email sent as `username`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] when no response arrives, [`ClientError::Server`] for
    /// non-success statuses and [`ClientError::Decode`] for an unexpected success body.
    pub async fn login(&self, credentials: &Credentials) -> ClientResult<TokenResponse> {
        let url = self.config.endpoint(LOGIN_PATH)?;
        let form = LoginForm::from(credentials);
        let response = send(self.http.post(url).form(&form), LOGIN_PATH).await?;
        if response.status().is_success() {
            decode(response, LOGIN_PATH).await
        } else {
            Err(rejection(response).await)
        }
    }

    /// Submit a calculation payload, unmodified, to the variant's endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`], [`ClientError::Server`] or [`ClientError::Decode`].
    pub async fn calculate(
        &self,
        kind: CalculationKind,
        payload: &Value,
        token: Option<&str>,
    ) -> ClientResult<Authorized<Value>> {
        let path = kind.endpoint_path();
        let url = self.config.endpoint(&path)?;
        self.send_authorized(self.http.post(url).json(payload), token, &path)
            .await
    }

    /// Fetch the signed-in user's stored calculations, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`], [`ClientError::Server`] or [`ClientError::Decode`].
    pub async fn history(
        &self,
        token: Option<&str>,
    ) -> ClientResult<Authorized<Vec<CalculationRecord>>> {
        let url = self.config.endpoint(HISTORY_PATH)?;
        self.send_authorized(self.http.get(url), token, HISTORY_PATH)
            .await
    }

    /// Attach the bearer token when present, send, and decode a success body.
    async fn send_authorized<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        token: Option<&str>,
        endpoint: &str,
    ) -> ClientResult<Authorized<T>> {
        let request = match token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        };
        let response = send(request, endpoint).await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::debug!(endpoint, "authenticated call rejected with 401");
            return Ok(Authorized::Expired);
        }
        if status.is_success() {
            decode(response, endpoint).await.map(Authorized::Ok)
        } else {
            Err(rejection(response).await)
        }
    }
}

async fn send(request: RequestBuilder, endpoint: &str) -> ClientResult<Response> {
    tracing::debug!(endpoint, "sending request");
    request
        .send()
        .await
        .map_err(|source| ClientError::Network {
            endpoint: endpoint.to_string(),
            source,
        })
}

async fn decode<T: DeserializeOwned>(response: Response, endpoint: &str) -> ClientResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|source| ClientError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
}

/// Turn a non-success response into [`ClientError::Server`].
async fn rejection(response: Response) -> ClientError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();
    let detail = serde_json::from_slice::<ErrorBody>(&bytes)
        .ok()
        .and_then(|body| body.detail)
        .map(|detail| detail.describe())
        .filter(|detail| !detail.trim().is_empty());
    tracing::debug!(status = %status, detail = ?detail, "request rejected");
    ClientError::Server { status, detail }
}
