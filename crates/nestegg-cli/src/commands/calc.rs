//! Calculation commands.

use std::fs;
use std::path::Path;

use anyhow::Context;
use nestegg_client::payload::default_payload_text;
use nestegg_client::{Action, CalculationKind};

use crate::client::{CliContext, CliError, CliResult, NOT_SIGNED_IN};
use crate::output::render_result;

pub(crate) async fn handle_calc(
    ctx: &CliContext,
    kind: CalculationKind,
    file: Option<&Path>,
) -> CliResult<()> {
    let text = match file {
        Some(path) => read_payload(path)?,
        None => default_payload_text(),
    };
    if !ctx.app.restore_session()? {
        return Err(CliError::validation(NOT_SIGNED_IN));
    }
    submit(ctx, kind, Some(text)).await
}

/// Submit the editor content, optionally replacing it first, and print the result.
pub(crate) async fn submit(
    ctx: &CliContext,
    kind: CalculationKind,
    text: Option<String>,
) -> CliResult<()> {
    if let Some(text) = text {
        ctx.perform(Action::EditPayload(text)).await?;
    }
    let notice = ctx.perform(Action::SubmitCalculation(kind)).await?;
    if let Some(result) = ctx.app.view().result_panel {
        render_result(&result, notice.as_deref(), ctx.output);
    }
    Ok(())
}

pub(crate) fn handle_template() {
    println!("{}", default_payload_text());
}

pub(crate) fn read_payload(path: &Path) -> CliResult<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read payload file {}", path.display()))
        .map_err(CliError::failure)
}
