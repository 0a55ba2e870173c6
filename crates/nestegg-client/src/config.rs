//! Client configuration: where the API lives and where the session is kept.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{ClientError, ClientResult};

/// Default API origin used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
/// Fixed API prefix every endpoint hangs off.
pub const DEFAULT_API_PREFIX: &str = "/blackrock/challenge/v1";
/// How long a notification stays visible before it auto-dismisses.
pub const DEFAULT_ALERT_TTL: Duration = Duration::from_secs(5);
/// Default transport timeout for a single request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const SESSION_FILE: &str = "session.json";
const APP_DIR: &str = "nestegg";

/// Settings shared by the transport, the session store and the view model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// API origin (scheme, host, port).
    pub base_url: Url,
    /// Path prefix prepended to every endpoint.
    pub api_prefix: String,
    /// File holding the persisted bearer token.
    pub token_path: PathBuf,
    /// Lifetime of a transient notification.
    pub alert_ttl: Duration,
    /// Transport timeout applied to each request.
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Build a configuration for the given origin with every other field defaulted.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            token_path: default_token_path(),
            alert_ttl: DEFAULT_ALERT_TTL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Replace the API prefix, normalising slashes.
    #[must_use]
    pub fn with_api_prefix(mut self, prefix: &str) -> Self {
        self.api_prefix = normalize_prefix(prefix);
        self
    }

    /// Replace the session file location.
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Replace the notification lifetime.
    #[must_use]
    pub const fn with_alert_ttl(mut self, ttl: Duration) -> Self {
        self.alert_ttl = ttl;
        self
    }

    /// Replace the transport timeout.
    #[must_use]
    pub const fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Resolve an endpoint path (e.g. `/history`) against the origin and prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the joined path is not a valid URL.
    pub fn endpoint(&self, path: &str) -> ClientResult<Url> {
        let full = format!("{}{}", normalize_prefix(&self.api_prefix), path);
        self.base_url
            .join(&full)
            .map_err(|source| ClientError::InvalidUrl { path: full, source })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .unwrap_or_else(|_| unreachable!("default base URL is a valid literal"));
        Self::new(base_url)
    }
}

/// Normalise a prefix to `/segment/...` without a trailing slash; empty stays empty.
#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Default session file: `$XDG_CONFIG_HOME/nestegg`, then `$HOME/.config/nestegg`, then the
/// working directory.
#[must_use]
pub fn default_token_path() -> PathBuf {
    token_path_from(
        env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        env::var_os("HOME").map(PathBuf::from),
    )
}

fn token_path_from(xdg_config: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = xdg_config.filter(|dir| !dir.as_os_str().is_empty()) {
        return dir.join(APP_DIR).join(SESSION_FILE);
    }
    if let Some(home) = home.filter(|dir| !dir.as_os_str().is_empty()) {
        return home.join(".config").join(APP_DIR).join(SESSION_FILE);
    }
    PathBuf::from(".nestegg-session.json")
}
