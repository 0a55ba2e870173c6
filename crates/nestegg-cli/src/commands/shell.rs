//! Interactive shell driving one long-lived application.
//!
//! Every line maps to one action against the same [`nestegg_client::App`], so `view <n>` resolves
//! against the history already on screen instead of fetching it again.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use nestegg_client::{Action, AuthTab, CalculationKind};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::OutputFormat;
use crate::client::{CliContext, CliError, CliResult, NOT_SIGNED_IN};
use crate::commands::auth::{handle_login, handle_logout, handle_register};
use crate::commands::calc::{read_payload, submit};
use crate::commands::history::show_details;
use crate::output::{render_history, render_status};

const PROMPT: &str = "nestegg> ";

const HELP: &str = "\
commands:
  login <email> [password]      sign in (password prompted when omitted)
  register <email> [password]   create an account
  logout                        sign out
  tab <login|register>          switch the auth form
  calc <nps|index> [file]       submit the editor, or a payload file
  history                       reload the history table
  view <n>                      show row n of the history table
  close                         close the detail view
  status                        show screen, session and history
  help                          show this list
  quit                          leave the shell
";

/// One parsed shell line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ShellCommand {
    Login {
        email: String,
        password: Option<String>,
    },
    Register {
        email: String,
        password: Option<String>,
    },
    Logout,
    Tab(AuthTab),
    Calc {
        kind: CalculationKind,
        path: Option<PathBuf>,
    },
    History,
    View(usize),
    Close,
    Status,
    Help,
    Quit,
    Empty,
}

pub(crate) async fn handle_shell(ctx: &CliContext) -> CliResult<()> {
    report(ctx.perform(Action::Load).await.map(|_| ()));
    if ctx.output == OutputFormat::Table {
        report(render_status(&ctx.app.view(), &ctx.app.records(), ctx.output));
        println!("type `help` for commands");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines
            .next_line()
            .await
            .context("failed to read from stdin")
            .map_err(CliError::failure)?
        else {
            break;
        };
        ctx.app.expire_alert(Instant::now());
        match parse_line(&line) {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => report(execute(ctx, command).await),
            Err(message) => eprintln!("error: {message}"),
        }
    }
    Ok(())
}

/// Parse one input line. Command names are case-insensitive.
pub(crate) fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(ShellCommand::Empty);
    };
    let args: Vec<&str> = words.collect();
    let head = head.to_ascii_lowercase();

    let command = match (head.as_str(), args.as_slice()) {
        ("login", [email]) => ShellCommand::Login {
            email: (*email).to_string(),
            password: None,
        },
        ("login", [email, password]) => ShellCommand::Login {
            email: (*email).to_string(),
            password: Some((*password).to_string()),
        },
        ("register", [email]) => ShellCommand::Register {
            email: (*email).to_string(),
            password: None,
        },
        ("register", [email, password]) => ShellCommand::Register {
            email: (*email).to_string(),
            password: Some((*password).to_string()),
        },
        ("login" | "register", _) => return Err(format!("usage: {head} <email> [password]")),
        ("logout", []) => ShellCommand::Logout,
        ("tab", [name]) => ShellCommand::Tab(parse_tab(name)?),
        ("calc", [kind]) => ShellCommand::Calc {
            kind: kind.parse()?,
            path: None,
        },
        ("calc", [kind, path]) => ShellCommand::Calc {
            kind: kind.parse()?,
            path: Some(PathBuf::from(path)),
        },
        ("calc", _) => return Err("usage: calc <nps|index> [file]".to_string()),
        ("history", []) => ShellCommand::History,
        ("view", [index]) => ShellCommand::View(
            index
                .parse()
                .map_err(|_| format!("'{index}' is not a row number"))?,
        ),
        ("close", []) => ShellCommand::Close,
        ("status", []) => ShellCommand::Status,
        ("help" | "?", []) => ShellCommand::Help,
        ("quit" | "exit", []) => ShellCommand::Quit,
        (command, _) => {
            return Err(format!("unrecognised command '{command}'; type `help`"));
        }
    };
    Ok(command)
}

async fn execute(ctx: &CliContext, command: ShellCommand) -> CliResult<()> {
    match command {
        ShellCommand::Login { email, password } => handle_login(ctx, email, password).await,
        ShellCommand::Register { email, password } => {
            handle_register(ctx, email, password).await
        }
        ShellCommand::Logout => handle_logout(ctx).await,
        ShellCommand::Tab(tab) => {
            ctx.perform(Action::SwitchTab(tab)).await?;
            println!("showing {} form", tab.as_str());
            Ok(())
        }
        ShellCommand::Calc { kind, path } => {
            require_session(ctx)?;
            let text = path.as_deref().map(read_payload).transpose()?;
            submit(ctx, kind, text).await
        }
        ShellCommand::History => {
            require_session(ctx)?;
            ctx.perform(Action::RefreshHistory).await?;
            render_history(&ctx.app.view().history, &ctx.app.records(), ctx.output)
        }
        ShellCommand::View(index) => show_details(ctx, index).await,
        ShellCommand::Close => ctx.perform(Action::CloseDetails).await.map(|_| ()),
        ShellCommand::Status => render_status(&ctx.app.view(), &ctx.app.records(), ctx.output),
        ShellCommand::Help => {
            print!("{HELP}");
            Ok(())
        }
        ShellCommand::Quit | ShellCommand::Empty => Ok(()),
    }
}

fn parse_tab(name: &str) -> Result<AuthTab, String> {
    match name.to_ascii_lowercase().as_str() {
        "login" => Ok(AuthTab::Login),
        "register" => Ok(AuthTab::Register),
        other => Err(format!("unknown form '{other}' (expected login or register)")),
    }
}

fn require_session(ctx: &CliContext) -> CliResult<()> {
    if ctx.app.session().is_authenticated() {
        Ok(())
    } else {
        Err(CliError::validation(NOT_SIGNED_IN))
    }
}

/// Print a failed command and keep the shell running.
fn report(outcome: CliResult<()>) {
    if let Err(err) = outcome {
        eprintln!("error: {}", err.display_message());
    }
}

fn prompt() -> CliResult<()> {
    let mut stdout = io::stdout();
    write!(stdout, "{PROMPT}")
        .and_then(|()| stdout.flush())
        .context("failed to write prompt")
        .map_err(CliError::failure)
}
