//! Application wiring, the CLI error type and the mapping from view alerts to exit codes.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use nestegg_client::config::default_token_path;
use nestegg_client::view::Alert;
use nestegg_client::{
    Action, AlertLevel, ApiClient, App, ClientConfig, ClientError, FileTokenStore, ViewState,
};
use url::Url;

use crate::cli::{Cli, OutputFormat};

/// Shown when a command needs a session and none is stored.
pub(crate) const NOT_SIGNED_IN: &str = "not signed in; run `nestegg login` first";

/// CLI-level error type to distinguish user-facing failures from infrastructure ones.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ClientError> for CliError {
    fn from(error: ClientError) -> Self {
        Self::Failure(error.into())
    }
}

/// Application handle and output preferences shared by command handlers.
#[derive(Clone)]
pub(crate) struct CliContext {
    pub(crate) app: App,
    pub(crate) output: OutputFormat,
}

impl CliContext {
    /// Build the application from global flags.
    pub(crate) fn from_cli(cli: &Cli, trace_id: &str) -> CliResult<Self> {
        let token_path = cli.token_file.clone().unwrap_or_else(default_token_path);
        let config = ClientConfig::new(cli.api_url.clone())
            .with_api_prefix(&cli.api_prefix)
            .with_token_path(token_path)
            .with_http_timeout(Duration::from_secs(cli.timeout))
            .with_alert_ttl(Duration::from_secs(cli.alert_ttl));
        Self::from_config(config, cli.output, trace_id)
    }

    /// Build the application over a file-backed token store at `config.token_path`.
    pub(crate) fn from_config(
        config: ClientConfig,
        output: OutputFormat,
        trace_id: &str,
    ) -> CliResult<Self> {
        let store = Arc::new(FileTokenStore::new(config.token_path.clone()));
        let api = ApiClient::with_trace_id(config, trace_id).map_err(|err| {
            CliError::failure(anyhow::Error::new(err).context("failed to build HTTP client"))
        })?;
        Ok(Self {
            app: App::new(api, store),
            output,
        })
    }

    /// Dispatch `action` and settle the notification it raised.
    ///
    /// A danger notification becomes a validation error; a success notification is returned
    /// for the caller to print.
    pub(crate) async fn perform(&self, action: Action) -> CliResult<Option<String>> {
        let before = self.app.view().alerts_raised();
        self.app.dispatch(action).await?;
        settle(&self.app.view(), before)
    }
}

/// Inspect the alert raised after `before`, if any.
pub(crate) fn settle(view: &ViewState, before: u64) -> CliResult<Option<String>> {
    match view.alert.as_ref().filter(|alert| alert.serial > before) {
        Some(Alert {
            level: AlertLevel::Danger,
            message,
            ..
        }) => Err(CliError::validation(message.clone())),
        Some(alert) => Ok(Some(alert.message.clone())),
        None => Ok(None),
    }
}

pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    Url::parse(input).map_err(|err| format!("invalid URL '{input}': {err}"))
}
