//! File command handlers

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::Context;
use crate::editor::confirm;
use crate::output::{human_size, Output};

pub async fn list(ctx: &Context, output: &Output) -> Result<()> {
    let session = ctx.session().await?;
    let files = session.client().list_files().await?;
    output.print_files(&files);
    Ok(())
}

/// Upload a local file, optionally attached to a published note
pub async fn upload(
    ctx: &Context,
    path: PathBuf,
    note_id: Option<i64>,
    output: &Output,
) -> Result<()> {
    let session = ctx.session().await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Path has no file name")?;
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;

    let file = session
        .client()
        .upload_file(&file_name, bytes, note_id)
        .await
        .context("Upload failed")?;
    output.print_file(&file);
    Ok(())
}

pub async fn delete(ctx: &Context, id: i64, force: bool, output: &Output) -> Result<()> {
    if !force && output.should_prompt() && !confirm(&format!("Delete file #{}?", id))? {
        output.message("Cancelled.");
        return Ok(());
    }

    let session = ctx.session().await?;
    session.client().delete_file(id).await?;
    output.success(&format!("Deleted file #{}", id));
    Ok(())
}

/// Download a file to `out`, or to `file-<id>` in the current directory
pub async fn download(
    ctx: &Context,
    id: i64,
    out: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let session = ctx.session().await?;
    let bytes = session.client().download_file(id).await?;

    let path = out.unwrap_or_else(|| PathBuf::from(format!("file-{}", id)));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;

    output.success(&format!(
        "Saved {} to {}",
        human_size(bytes.len() as u64),
        path.display()
    ));
    Ok(())
}
