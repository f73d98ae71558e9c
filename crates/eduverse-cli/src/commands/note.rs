//! Note command handlers
//!
//! Notes are referred to by server id (`12` or `#12`) once published, and
//! by draft key while they only exist locally.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};

use eduverse_core::models::NoteUpdate;
use eduverse_core::{Note, NoteContent, NoteEntry, NoteKind, NoteListing};

use super::{load_draft, Context, NoteRef};
use crate::editor::{confirm, edit_with_hints};
use crate::output::{Output, OutputFormat};

/// Save a new note as a local draft
pub async fn draft(
    ctx: &Context,
    title: String,
    body: Option<String>,
    kind: NoteKind,
    public: bool,
    output: &Output,
) -> Result<()> {
    let body = match body {
        Some(b) => b,
        None => {
            let hint = format!("New {} note: {}", kind, title);
            edit_with_hints(&[hint.as_str(), "These comment lines are removed when you save"], "")
                .context("Failed to edit note")?
        }
    };

    let mut note = Note::new(title, kind);
    note.set_content(checked_content(kind, body)?);
    note.is_public = public;

    let sync = ctx.note_sync().await?;
    let record = sync
        .save_draft(&note)
        .await
        .context("Failed to save draft")?;

    output.print_draft(&record);
    Ok(())
}

/// List drafts and published notes together, or only the server's
pub async fn list(
    ctx: &Context,
    kind: Option<NoteKind>,
    remote_only: bool,
    output: &Output,
) -> Result<()> {
    let mut listing = if remote_only {
        let session = ctx.session().await?;
        let notes = match kind {
            Some(kind) => session.client().list_notes_by_kind(kind).await?,
            None => session.client().list_notes().await?,
        };
        NoteListing {
            entries: notes.into_iter().map(NoteEntry::Published).collect(),
            skipped: Vec::new(),
        }
    } else {
        ctx.note_sync().await?.list_all().await?
    };

    if let Some(kind) = kind {
        listing.entries.retain(|entry| entry.note().kind == kind);
    }

    output.print_listing(&listing);
    Ok(())
}

/// Show one note
pub async fn show(ctx: &Context, reference: String, output: &Output) -> Result<()> {
    let note = fetch(ctx, &NoteRef::parse(&reference)).await?;
    output.print_note(&note);
    Ok(())
}

/// Publish a stored draft, or a new note given on the command line
pub async fn publish(
    ctx: &Context,
    key: Option<String>,
    title: Option<String>,
    body: Option<String>,
    public: bool,
    output: &Output,
) -> Result<()> {
    let sync = ctx.authed_sync().await?;

    if let Some(key) = key {
        let record = load_draft(&sync, &key).await?;
        let report = sync.migrate_draft(&record).await;
        output.print_sync_reports(std::slice::from_ref(&report));
        if !report.is_published() {
            bail!("Draft {} was not published; it is still stored locally", key);
        }
        return Ok(());
    }

    let Some(title) = title else {
        bail!("Give a draft key, or --title (and optionally --body) for a new note");
    };
    let body = match body {
        Some(b) => b,
        None => {
            let hint = format!("Publishing: {}", title);
            edit_with_hints(&[hint.as_str()], "").context("Failed to edit note")?
        }
    };

    let mut note = Note::text(title, body);
    note.is_public = public;
    let published = sync.publish_note(&note).await.context("Publish failed")?;

    match output.format {
        OutputFormat::Human => output.success(&format!(
            "Published \"{}\" as #{}",
            published.title,
            published.id.unwrap_or_default()
        )),
        _ => output.print_note(&published),
    }
    Ok(())
}

/// Edit a note's body (and optionally title) in $EDITOR
pub async fn edit(
    ctx: &Context,
    reference: String,
    title: Option<String>,
    output: &Output,
) -> Result<()> {
    match NoteRef::parse(&reference) {
        NoteRef::Published(id) => {
            let session = ctx.session().await?;
            let note = session.client().get_note(id).await?;
            let content = edit_body(&note)?;

            if content == note.content && title.is_none() {
                output.message("No changes.");
                return Ok(());
            }

            let update = NoteUpdate {
                title,
                content: Some(content),
                ..NoteUpdate::default()
            };
            let updated = session.client().update_note(id, &update).await?;
            output.success(&format!("Updated note #{}", id));
            if output.is_json() {
                output.print_note(&updated);
            }
        }
        NoteRef::Draft(key) => {
            let sync = ctx.note_sync().await?;
            let mut record = load_draft(&sync, &key).await?;
            let content = edit_body(&record.note)?;

            if content == record.note.content && title.is_none() {
                output.message("No changes.");
                return Ok(());
            }

            record.note.set_content(content);
            if let Some(title) = title {
                record.note.set_title(title);
            }
            let saved = sync.drafts().save_as(&key, &record.note).await?;
            output.print_draft(&saved);
        }
    }
    Ok(())
}

/// Delete a published note or a draft
pub async fn delete(ctx: &Context, reference: String, force: bool, output: &Output) -> Result<()> {
    let reference = NoteRef::parse(&reference);
    let label = match reference {
        NoteRef::Published(id) => format!("note #{}", id),
        NoteRef::Draft(ref key) => format!("draft {}", key),
    };

    if !force && output.should_prompt() && !confirm(&format!("Delete {}?", label))? {
        output.message("Cancelled.");
        return Ok(());
    }

    match reference {
        NoteRef::Published(id) => {
            let session = ctx.session().await?;
            session.client().delete_note(id).await?;
        }
        NoteRef::Draft(key) => {
            super::draft::remove(ctx, &key).await?;
        }
    }

    output.success(&format!("Deleted {}", label));
    Ok(())
}

/// Render a drawing note as SVG
pub async fn svg(
    ctx: &Context,
    reference: String,
    width: u32,
    height: u32,
    out: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let note = fetch(ctx, &NoteRef::parse(&reference)).await?;
    let svg = render_svg(&note, width, height)?;

    match out {
        Some(path) => {
            write_file(&path, svg.as_bytes())?;
            output.success(&format!("Wrote {}", path.display()));
        }
        None => print!("{}", svg),
    }
    Ok(())
}

/// Upload an audio file and create an audio note for it
pub async fn audio(
    ctx: &Context,
    path: PathBuf,
    title: Option<String>,
    duration: f64,
    public: bool,
    output: &Output,
) -> Result<()> {
    let session = ctx.session().await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Audio path has no file name")?;
    let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {:?}", path))?;

    let file = session
        .client()
        .upload_file(&file_name, bytes, None)
        .await
        .context("Upload failed")?;
    let title = title.unwrap_or_else(|| file_name.clone());
    let note = session
        .client()
        .create_audio_note(&title, file.id, duration, public)
        .await?;

    match output.format {
        OutputFormat::Human => output.success(&format!(
            "Created audio note #{} from {}",
            note.id.unwrap_or_default(),
            file_name
        )),
        _ => output.print_note(&note),
    }
    Ok(())
}

async fn fetch(ctx: &Context, reference: &NoteRef) -> Result<Note> {
    match reference {
        NoteRef::Published(id) => {
            let session = ctx.session().await?;
            Ok(session.client().get_note(*id).await?)
        }
        NoteRef::Draft(key) => {
            let sync = ctx.note_sync().await?;
            Ok(load_draft(&sync, key).await?.note)
        }
    }
}

/// Structured kinds must decode before they are stored
fn checked_content(kind: NoteKind, body: String) -> Result<String> {
    NoteContent::decode(kind, &body)
        .with_context(|| format!("Content is not a valid {} note", kind))?;
    Ok(body)
}

fn edit_body(note: &Note) -> Result<String> {
    if !note.is_editable() {
        bail!("Note \"{}\" is {} and cannot be edited", note.title, note.status);
    }
    if !matches!(note.kind, NoteKind::Text | NoteKind::Mixed) {
        bail!("Only text and mixed notes can be edited here (this one is {})", note.kind);
    }
    let hint = format!("Editing: {}", note.title);
    edit_with_hints(
        &[hint.as_str(), "These comment lines are removed when you save"],
        &note.content,
    )
    .context("Failed to edit note")
}

fn render_svg(note: &Note, width: u32, height: u32) -> Result<String> {
    match note.decode_content()? {
        NoteContent::Drawing(drawing) => Ok(drawing.to_svg(width, height)),
        other => bail!(
            "\"{}\" is a {} note, not a drawing",
            note.title,
            other.kind()
        ),
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {:?}", path))
}
