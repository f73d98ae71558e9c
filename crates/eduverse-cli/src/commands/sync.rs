//! Sync command handler

use anyhow::{bail, Result};

use eduverse_core::SyncSummary;

use super::Context;
use crate::output::Output;

/// Publish every stored draft
///
/// Each draft is attempted once; failures stay stored and are listed.
pub async fn sync(ctx: &Context, output: &Output) -> Result<()> {
    let sync = ctx.authed_sync().await?;

    output.message(&format!("Publishing drafts to {}...", ctx.config.api_url));
    let reports = sync.sync_drafts().await?;
    output.print_sync_reports(&reports);

    let summary = SyncSummary::from_reports(&reports);
    if summary.failed > 0 {
        bail!(
            "{} of {} draft(s) failed to publish and were kept locally",
            summary.failed,
            reports.len()
        );
    }
    Ok(())
}
