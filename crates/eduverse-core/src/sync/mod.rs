//! Draft / published note synchronization
//!
//! Notes live in two places: unsent drafts in the local key-value store,
//! and published notes on the server. [`NoteSync`] is the only component
//! that moves a note from one to the other.
//!
//! ## Migration
//!
//! A draft is migrated by publishing it and, once the server has
//! confirmed, deleting the local copy. Drafts are migrated one at a time
//! in listing order; each produces its own [`DraftSyncReport`]. A failed
//! publish leaves the draft untouched.
//!
//! ## Usage
//!
//! ```ignore
//! let sync = NoteSync::new(store, client, "@eduverse_drafts");
//! sync.save_draft(&Note::text("Physics", "F = ma")).await?;
//! for report in sync.sync_drafts().await? {
//!     println!("{}: {}", report.title, report.outcome);
//! }
//! ```

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{ApiError, NoteRemote};
use crate::drafts::{DraftListing, DraftStore, SkippedDraft};
use crate::models::{DraftRecord, NewNote, Note, NoteEntry};
use crate::storage::{KeyValueStore, StorageError};

/// Merged listing of drafts and published notes
#[derive(Debug, Clone, Default, Serialize)]
pub struct NoteListing {
    /// Newest first
    pub entries: Vec<NoteEntry>,
    /// Draft keys that could not be read
    pub skipped: Vec<SkippedDraft>,
}

impl NoteListing {
    pub fn draft_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_draft()).count()
    }

    pub fn published_count(&self) -> usize {
        self.entries.len() - self.draft_count()
    }
}

/// What happened to one draft during a sync
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Published and removed from local storage
    Published { note: Note },
    /// Published, but the local copy could not be deleted
    Retained { note: Note, reason: String },
    /// Not published; the draft is unchanged
    Failed { reason: String },
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Published { note } => match note.id {
                Some(id) => write!(f, "published as #{}", id),
                None => write!(f, "published"),
            },
            SyncOutcome::Retained { reason, .. } => {
                write!(f, "published, local copy kept ({})", reason)
            }
            SyncOutcome::Failed { reason } => write!(f, "failed ({})", reason),
        }
    }
}

/// Per-draft sync result
#[derive(Debug, Clone, Serialize)]
pub struct DraftSyncReport {
    pub key: String,
    pub title: String,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

impl DraftSyncReport {
    /// The server accepted the note
    pub fn is_published(&self) -> bool {
        !matches!(self.outcome, SyncOutcome::Failed { .. })
    }
}

/// Totals over a batch of sync reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub published: usize,
    pub retained: usize,
    pub failed: usize,
}

impl SyncSummary {
    pub fn from_reports(reports: &[DraftSyncReport]) -> Self {
        reports
            .iter()
            .fold(Self::default(), |mut summary, report| {
                match report.outcome {
                    SyncOutcome::Published { .. } => summary.published += 1,
                    SyncOutcome::Retained { .. } => summary.retained += 1,
                    SyncOutcome::Failed { .. } => summary.failed += 1,
                }
                summary
            })
    }
}

/// Coordinates the local draft store with the remote note service
pub struct NoteSync<S, R> {
    drafts: DraftStore<S>,
    remote: R,
}

impl<S: KeyValueStore, R: NoteRemote> NoteSync<S, R> {
    /// `prefix` is the draft namespace, e.g. `@eduverse_drafts`
    pub fn new(store: S, remote: R, prefix: impl Into<String>) -> Self {
        Self {
            drafts: DraftStore::new(store, prefix),
            remote,
        }
    }

    pub fn drafts(&self) -> &DraftStore<S> {
        &self.drafts
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Store a note locally as a draft
    pub async fn save_draft(&self, note: &Note) -> Result<DraftRecord, StorageError> {
        self.drafts.save(note).await
    }

    /// All readable drafts, newest first, plus the keys that were skipped
    pub async fn list_drafts(&self) -> Result<DraftListing, StorageError> {
        self.drafts.list().await
    }

    /// Delete a draft; an absent key is not an error
    pub async fn delete_draft(&self, key: &str) -> Result<(), StorageError> {
        self.drafts.delete(key).await
    }

    /// Publish a note; local storage is not touched
    pub async fn publish_note(&self, note: &Note) -> Result<Note, ApiError> {
        let published = self.remote.create_note(&NewNote::from(note)).await?;
        info!("Published '{}' as {:?}", published.title, published.id);
        Ok(published)
    }

    /// Published notes; an unreachable server yields an empty list
    pub async fn list_published(&self) -> Vec<Note> {
        match self.remote.list_notes().await {
            Ok(notes) => notes,
            Err(e) => {
                warn!("Could not fetch published notes: {}", e);
                Vec::new()
            }
        }
    }

    /// Drafts and published notes together, newest first
    pub async fn list_all(&self) -> Result<NoteListing, StorageError> {
        let (drafts, published) = tokio::join!(self.list_drafts(), self.list_published());
        let DraftListing { drafts, skipped } = drafts?;

        let mut entries: Vec<NoteEntry> = drafts
            .into_iter()
            .map(NoteEntry::Draft)
            .chain(published.into_iter().map(NoteEntry::Published))
            .collect();
        entries.sort_by_key(|entry| std::cmp::Reverse(entry.sort_timestamp()));

        Ok(NoteListing { entries, skipped })
    }

    /// Publish one draft and delete it once the server has accepted it
    pub async fn migrate_draft(&self, draft: &DraftRecord) -> DraftSyncReport {
        let outcome = match self.publish_note(&draft.note).await {
            Ok(note) => match self.drafts.delete(&draft.key).await {
                Ok(()) => SyncOutcome::Published { note },
                Err(e) => {
                    warn!("Published {} but could not delete it: {}", draft.key, e);
                    SyncOutcome::Retained {
                        note,
                        reason: e.to_string(),
                    }
                }
            },
            Err(e) => {
                warn!("Failed to publish {}: {}", draft.key, e);
                SyncOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        DraftSyncReport {
            key: draft.key.clone(),
            title: draft.note.title.clone(),
            outcome,
        }
    }

    /// Migrate every draft, one at a time, in listing order
    pub async fn sync_drafts(&self) -> Result<Vec<DraftSyncReport>, StorageError> {
        let listing = self.list_drafts().await?;
        if listing.drafts.is_empty() {
            debug!("No drafts to sync");
            return Ok(Vec::new());
        }

        let mut reports = Vec::with_capacity(listing.drafts.len());
        for draft in &listing.drafts {
            reports.push(self.migrate_draft(draft).await);
        }

        let summary = SyncSummary::from_reports(&reports);
        info!(
            "Synced drafts: {} published, {} retained, {} failed",
            summary.published, summary.retained, summary.failed
        );
        Ok(reports)
    }
}
