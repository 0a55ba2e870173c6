//! Status, history and detail commands.

use anyhow::anyhow;
use nestegg_client::view::HISTORY_FAILED;
use nestegg_client::{Action, HistoryView, Screen};

use crate::client::{CliContext, CliError, CliResult, NOT_SIGNED_IN};
use crate::output::{render_detail, render_history, render_status};

pub(crate) async fn handle_status(ctx: &CliContext) -> CliResult<()> {
    ctx.perform(Action::Load).await?;
    render_status(&ctx.app.view(), &ctx.app.records(), ctx.output)
}

pub(crate) async fn handle_history(ctx: &CliContext) -> CliResult<()> {
    load_signed_in(ctx).await?;
    show_history(ctx)
}

pub(crate) async fn handle_show(ctx: &CliContext, index: usize) -> CliResult<()> {
    load_signed_in(ctx).await?;
    show_details(ctx, index).await
}

/// Render the current history table; a failed fetch is reported as an error.
pub(crate) fn show_history(ctx: &CliContext) -> CliResult<()> {
    let view = ctx.app.view();
    if view.history == HistoryView::Failed {
        return Err(CliError::failure(anyhow!(HISTORY_FAILED)));
    }
    render_history(&view.history, &ctx.app.records(), ctx.output)
}

/// Open the detail view for a cached record. Out-of-range positions print nothing.
pub(crate) async fn show_details(ctx: &CliContext, index: usize) -> CliResult<()> {
    ctx.perform(Action::ViewDetails(index)).await?;
    let Some(modal) = ctx.app.view().modal.filter(|modal| modal.index == index) else {
        tracing::debug!(index, "no cached record at position");
        return Ok(());
    };
    let records = ctx.app.records();
    match records.get(modal.index) {
        Some(record) => render_detail(&modal, record, ctx.output),
        None => Ok(()),
    }
}

async fn load_signed_in(ctx: &CliContext) -> CliResult<()> {
    ctx.perform(Action::Load).await?;
    if ctx.app.view().screen == Screen::Auth {
        return Err(CliError::validation(NOT_SIGNED_IN));
    }
    Ok(())
}
