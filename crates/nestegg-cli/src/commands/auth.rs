//! Account commands: register, login and logout.

use anyhow::Context;
use nestegg_client::{Action, Credentials, Screen};

use crate::client::{CliContext, CliError, CliResult};
use crate::output::render_notice;

const SIGNED_IN: &str = "Signed in.";
const SIGNED_OUT: &str = "Signed out.";

pub(crate) async fn handle_register(
    ctx: &CliContext,
    email: String,
    password: Option<String>,
) -> CliResult<()> {
    let credentials = collect_credentials(email, password)?;
    let notice = ctx.perform(Action::Register(credentials)).await?;
    render_notice(notice.as_deref(), ctx.output);
    Ok(())
}

pub(crate) async fn handle_login(
    ctx: &CliContext,
    email: String,
    password: Option<String>,
) -> CliResult<()> {
    let credentials = collect_credentials(email, password)?;
    ctx.perform(Action::Login(credentials)).await?;
    if ctx.app.view().screen == Screen::Home {
        render_notice(Some(SIGNED_IN), ctx.output);
    }
    Ok(())
}

pub(crate) async fn handle_logout(ctx: &CliContext) -> CliResult<()> {
    ctx.perform(Action::Logout).await?;
    render_notice(Some(SIGNED_OUT), ctx.output);
    Ok(())
}

/// Trim the email and prompt for the password on the terminal when it was not supplied.
pub(crate) fn collect_credentials(
    email: String,
    password: Option<String>,
) -> CliResult<Credentials> {
    let email = email.trim().to_string();
    if email.is_empty() {
        return Err(CliError::validation("email must not be empty"));
    }
    let password = match password {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ")
            .context("failed to read password")
            .map_err(CliError::failure)?,
    };
    if password.is_empty() {
        return Err(CliError::validation("password must not be empty"));
    }
    Ok(Credentials::new(email, password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use anyhow::Result;
    use httpmock::prelude::*;
    use nestegg_client::{ClientConfig, FileTokenStore, TokenStore};
    use serde_json::json;
    use tempfile::TempDir;
    use url::Url;

    const PREFIX: &str = "/blackrock/challenge/v1";

    fn context(server: &MockServer, dir: &TempDir) -> Result<CliContext> {
        let config = ClientConfig::new(Url::parse(&server.base_url())?)
            .with_token_path(dir.path().join("session.json"));
        CliContext::from_config(config, OutputFormat::Table, "trace")
            .map_err(|err| anyhow::anyhow!(err.display_message()))
    }

    #[test]
    fn credentials_are_trimmed_and_validated() -> Result<()> {
        let credentials = collect_credentials("  a@b.com ".into(), Some("x".into()))
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;
        assert_eq!(credentials.email, "a@b.com");

        let err = collect_credentials("   ".into(), Some("x".into())).err();
        assert!(matches!(err, Some(CliError::Validation(_))));
        let err = collect_credentials("a@b.com".into(), Some(String::new())).err();
        assert!(matches!(err, Some(CliError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn login_writes_session_file() -> Result<()> {
        let server = MockServer::start_async().await;
        let login = server.mock(|when, then| {
            when.method(POST).path(format!("{PREFIX}/login"));
            then.status(200).json_body(json!({"access_token": "T"}));
        });
        server.mock(|when, then| {
            when.method(GET).path(format!("{PREFIX}/history"));
            then.status(200).json_body(json!([]));
        });
        let dir = TempDir::new()?;
        let ctx = context(&server, &dir)?;

        handle_login(&ctx, "a@b.com".into(), Some("x".into()))
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        login.assert();
        let store = FileTokenStore::new(dir.path().join("session.json"));
        assert_eq!(store.load()?, Some("T".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_login_exits_with_validation_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path(format!("{PREFIX}/login"));
            then.status(401)
                .json_body(json!({"detail": "Incorrect email or password"}));
        });
        let dir = TempDir::new()?;
        let ctx = context(&server, &dir)?;

        let err = handle_login(&ctx, "a@b.com".into(), Some("bad".into()))
            .await
            .err();
        assert!(matches!(
            &err,
            Some(CliError::Validation(message)) if message == "Incorrect email or password"
        ));
        assert_eq!(err.map(|err| err.exit_code()), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn logout_removes_session_file() -> Result<()> {
        let server = MockServer::start_async().await;
        let dir = TempDir::new()?;
        let store = FileTokenStore::new(dir.path().join("session.json"));
        store.save("T")?;
        let ctx = context(&server, &dir)?;

        handle_logout(&ctx)
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;
        assert_eq!(store.load()?, None);
        assert_eq!(ctx.app.view().screen, Screen::Auth);
        Ok(())
    }
}
