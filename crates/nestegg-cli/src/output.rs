//! Renderers for the view model.

use anyhow::anyhow;
use nestegg_client::view::{Badge, BadgeTone, DetailModal};
use nestegg_client::{CalculationRecord, HistoryView, Screen, ViewState};
use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

#[derive(Serialize)]
struct StatusReport<'a> {
    screen: &'static str,
    form: &'static str,
    signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    alert: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<&'a [CalculationRecord]>,
}

pub(crate) fn render_status(
    view: &ViewState,
    records: &[CalculationRecord],
    format: OutputFormat,
) -> CliResult<()> {
    let signed_in = view.logout_visible();
    let alert = view.alert.as_ref().map(|alert| alert.message.as_str());
    match format {
        OutputFormat::Json => {
            let report = StatusReport {
                screen: screen_name(view.screen),
                form: view.auth_tab.as_str(),
                signed_in,
                alert,
                history: signed_in.then_some(records),
            };
            println!("{}", to_json_text(&report)?);
        }
        OutputFormat::Table => {
            println!("screen: {}", screen_name(view.screen));
            if signed_in {
                println!("session: signed in");
            } else {
                println!("session: signed out");
                println!("form: {}", view.auth_tab.as_str());
            }
            if let Some(message) = alert {
                println!("alert: {message}");
            }
            if signed_in {
                println!();
                print!("{}", history_table(&view.history));
            }
        }
    }
    Ok(())
}

pub(crate) fn render_history(
    history: &HistoryView,
    records: &[CalculationRecord],
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json_text(&records)?),
        OutputFormat::Table => print!("{}", history_table(history)),
    }
    Ok(())
}

pub(crate) fn render_detail(
    modal: &DetailModal,
    record: &CalculationRecord,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let detail = json!({
                "index": modal.index,
                "investment_type": record.investment_type,
                "created_at": record.created_at,
                "payload": record.payload,
                "result": record.result,
            });
            println!("{}", to_json_text(&detail)?);
        }
        OutputFormat::Table => print!("{}", detail_text(modal)),
    }
    Ok(())
}

/// Print the pretty-printed calculation result; the notice only goes to table output.
pub(crate) fn render_result(result: &str, notice: Option<&str>, format: OutputFormat) {
    if format == OutputFormat::Table {
        if let Some(notice) = notice {
            println!("{notice}");
        }
    }
    println!("{result}");
}

pub(crate) fn render_notice(notice: Option<&str>, format: OutputFormat) {
    match (notice, format) {
        (Some(message), OutputFormat::Table) => println!("{message}"),
        (Some(message), OutputFormat::Json) => println!("{}", json!({ "message": message })),
        (None, _) => {}
    }
}

/// History as a fixed-width table, or its placeholder line.
pub(crate) fn history_table(history: &HistoryView) -> String {
    let HistoryView::Populated(rows) = history else {
        return history
            .placeholder()
            .map(|text| format!("{text}\n"))
            .unwrap_or_default();
    };
    let mut out = format!("{:<4} {:<17} {:<10} {:>14}\n", "#", "CREATED", "TYPE", "TOTAL");
    for row in rows {
        out.push_str(&format!(
            "{:<4} {:<17} {:<10} {:>14}\n",
            row.index,
            row.created,
            badge_text(&row.badge),
            row.total
        ));
    }
    out
}

/// `[NPS]` for the success tone, `<INDEX>` for the warning tone.
fn badge_text(badge: &Badge) -> String {
    match badge.tone {
        BadgeTone::Success => format!("[{}]", badge.label),
        BadgeTone::Warning => format!("<{}>", badge.label),
    }
}

pub(crate) fn detail_text(modal: &DetailModal) -> String {
    format!(
        "calculation #{}\n\npayload:\n{}\n\nresult:\n{}\n",
        modal.index, modal.payload, modal.result
    )
}

const fn screen_name(screen: Screen) -> &'static str {
    match screen {
        Screen::Auth => "auth",
        Screen::Home => "home",
    }
}

fn to_json_text<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}
