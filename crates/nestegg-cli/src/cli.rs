//! Command-line parsing and dispatch for the Nestegg terminal client.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use nestegg_client::CalculationKind;
use nestegg_client::config::{DEFAULT_API_PREFIX, DEFAULT_BASE_URL};
use nestegg_telemetry::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, TelemetryError, build_sha, init_logging,
};
use url::Url;
use uuid::Uuid;

use crate::client::{CliContext, CliError, CliResult, parse_url};
use crate::commands::auth::{handle_login, handle_logout, handle_register};
use crate::commands::calc::{handle_calc, handle_template};
use crate::commands::history::{handle_history, handle_show, handle_status};
use crate::commands::shell::handle_shell;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ALERT_TTL_SECS: u64 = 5;

/// Parses CLI arguments, installs logging and executes the requested command.
/// Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    if let Err(err) = install_logging(&cli) {
        eprintln!("error: {}", err.display_message());
        return err.exit_code();
    }

    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();
    tracing::debug!(
        command = command_name,
        trace_id = %trace_id,
        build = build_sha(),
        "starting command"
    );

    let result = match CliContext::from_cli(&cli, &trace_id) {
        Ok(ctx) => dispatch(cli.command, &ctx).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.display_message();
            tracing::debug!(command = command_name, exit_code, "command failed");
            eprintln!("error: {message}");
            exit_code
        }
    }
}

async fn dispatch(command: Command, ctx: &CliContext) -> CliResult<()> {
    match command {
        Command::Status => handle_status(ctx).await,
        Command::Register(args) => handle_register(ctx, args.email, args.password).await,
        Command::Login(args) => handle_login(ctx, args.email, args.password).await,
        Command::Logout => handle_logout(ctx).await,
        Command::Calc(args) => handle_calc(ctx, args.kind, args.file.as_deref()).await,
        Command::History => handle_history(ctx).await,
        Command::Show(args) => handle_show(ctx, args.index).await,
        Command::Template => {
            handle_template();
            Ok(())
        }
        Command::Shell => handle_shell(ctx).await,
    }
}

fn install_logging(cli: &Cli) -> CliResult<()> {
    let config = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: option_env!("NESTEGG_BUILD_SHA").unwrap_or("dev"),
    };
    init_logging(&config).map_err(|err| {
        CliError::failure(anyhow::Error::new(err).context("failed to initialise logging"))
    })
}

#[derive(Parser)]
#[command(
    name = "nestegg",
    about = "Terminal client for the Nestegg retirement-returns calculator"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "NESTEGG_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_BASE_URL
    )]
    pub(crate) api_url: Url,
    #[arg(
        long,
        global = true,
        env = "NESTEGG_API_PREFIX",
        default_value = DEFAULT_API_PREFIX
    )]
    pub(crate) api_prefix: String,
    #[arg(
        long,
        global = true,
        env = "NESTEGG_TOKEN_FILE",
        help = "Session file holding the bearer token"
    )]
    pub(crate) token_file: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "NESTEGG_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long,
        global = true,
        env = "NESTEGG_ALERT_TTL_SECS",
        default_value_t = DEFAULT_ALERT_TTL_SECS,
        help = "Seconds a notification stays visible in the shell"
    )]
    pub(crate) alert_ttl: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "NESTEGG_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL
    )]
    pub(crate) log_level: String,
    #[arg(
        long,
        global = true,
        env = "NESTEGG_LOG_FORMAT",
        value_parser = parse_log_format,
        help = "Log format: pretty or json (defaults to pretty in debug builds, json otherwise)"
    )]
    pub(crate) log_format: Option<LogFormat>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Show the current screen and session, plus history when signed in.
    Status,
    /// Create an account.
    Register(CredentialArgs),
    /// Sign in and store the session token.
    Login(CredentialArgs),
    /// Sign out and forget the session token.
    Logout,
    /// Submit a calculation payload.
    Calc(CalcArgs),
    /// List stored calculations, newest first.
    History,
    /// Show the payload and result of one history entry.
    Show(ShowArgs),
    /// Print the default calculation payload.
    Template,
    /// Start an interactive session.
    Shell,
}

#[derive(Args)]
pub(crate) struct CredentialArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long, help = "Prompted for when omitted")]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct CalcArgs {
    #[arg(value_parser = parse_kind, help = "Calculation type: nps or index")]
    pub(crate) kind: CalculationKind,
    #[arg(
        short = 'f',
        long,
        help = "JSON payload file (defaults to the built-in template)"
    )]
    pub(crate) file: Option<PathBuf>,
}

#[derive(Args)]
pub(crate) struct ShowArgs {
    #[arg(help = "Row number from `nestegg history`")]
    pub(crate) index: usize,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub(crate) fn parse_kind(input: &str) -> Result<CalculationKind, String> {
    input.parse()
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse().map_err(|_: TelemetryError| {
        format!("unknown log format '{input}' (expected pretty or json)")
    })
}

pub(crate) const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Status => "status",
        Command::Register(_) => "register",
        Command::Login(_) => "login",
        Command::Logout => "logout",
        Command::Calc(_) => "calc",
        Command::History => "history",
        Command::Show(_) => "show",
        Command::Template => "template",
        Command::Shell => "shell",
    }
}
