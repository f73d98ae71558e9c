//! Local draft store
//!
//! Unsent notes are kept in the key-value store under
//! `<prefix>_<id-or-timestamp>`. Each value is the note's JSON plus a
//! `savedAt` timestamp and an `isLocal` marker.
//!
//! Records that fail to decode are never silently discarded: `list`
//! returns them as [`SkippedDraft`] entries next to the valid drafts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{timestamp, DraftRecord, Note, NoteStatus};
use crate::storage::{KeyValueStore, StorageError, StorageResult};

/// A stored key whose value could not be decoded as a draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDraft {
    pub key: String,
    pub reason: String,
}

/// Result of listing drafts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DraftListing {
    /// Valid drafts, newest first
    pub drafts: Vec<DraftRecord>,
    /// Keys that held malformed records
    pub skipped: Vec<SkippedDraft>,
}

/// On-disk layout of a draft record
#[derive(Serialize, Deserialize)]
struct StoredDraft {
    #[serde(flatten)]
    note: Note,
    #[serde(rename = "savedAt", with = "timestamp::required")]
    saved_at: DateTime<Utc>,
    #[serde(rename = "isLocal", default)]
    is_local: bool,
}

/// Drafts namespace within a key-value store
pub struct DraftStore<S> {
    store: S,
    prefix: String,
}

impl<S: KeyValueStore> DraftStore<S> {
    /// Create a draft store; `prefix` is the namespace without the trailing `_`
    pub fn new(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The underlying key-value store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Storage key for a note: its server id if it has one, otherwise now in millis
    pub fn key_for(&self, note: &Note) -> String {
        match note.id {
            Some(id) => format!("{}_{}", self.prefix, id),
            None => format!("{}_{}", self.prefix, Utc::now().timestamp_millis()),
        }
    }

    /// Whether `key` belongs to this namespace
    pub fn owns_key(&self, key: &str) -> bool {
        key.strip_prefix(&self.prefix)
            .is_some_and(|rest| rest.starts_with('_'))
    }

    /// Save a note as a draft under a freshly derived key
    pub async fn save(&self, note: &Note) -> StorageResult<DraftRecord> {
        let key = self.key_for(note);
        self.save_as(&key, note).await
    }

    /// Save a note under an explicit key, replacing what was there
    pub async fn save_as(&self, key: &str, note: &Note) -> StorageResult<DraftRecord> {
        let mut note = note.clone();
        note.status = NoteStatus::Draft;

        let stored = StoredDraft {
            note,
            saved_at: Utc::now(),
            is_local: true,
        };
        let json = serde_json::to_string(&stored).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;

        self.store.set(key, &json).await?;
        debug!("Saved draft {}", key);

        Ok(DraftRecord {
            key: key.to_string(),
            saved_at: stored.saved_at,
            note: stored.note,
        })
    }

    /// Load one draft; malformed records are reported as errors here
    pub async fn get(&self, key: &str) -> StorageResult<Option<Result<DraftRecord, SkippedDraft>>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        Ok(Some(decode(key, &raw)))
    }

    /// List all drafts, newest first, reporting malformed records
    pub async fn list(&self) -> StorageResult<DraftListing> {
        let namespace = format!("{}_", self.prefix);
        let keys = self.store.keys_with_prefix(&namespace).await?;
        let values = self.store.get_many(&keys).await?;

        let mut listing = DraftListing::default();
        for (key, value) in values {
            // Removed between the key scan and the read
            let Some(raw) = value else { continue };

            match decode(&key, &raw) {
                Ok(draft) => listing.drafts.push(draft),
                Err(skipped) => {
                    warn!("Skipping malformed draft {}: {}", skipped.key, skipped.reason);
                    listing.skipped.push(skipped);
                }
            }
        }

        listing.drafts.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(listing)
    }

    /// Delete a draft; deleting an absent key succeeds
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        self.store.remove(key).await?;
        debug!("Deleted draft {}", key);
        Ok(())
    }
}

fn decode(key: &str, raw: &str) -> Result<DraftRecord, SkippedDraft> {
    serde_json::from_str::<StoredDraft>(raw)
        .map(|stored| DraftRecord {
            key: key.to_string(),
            saved_at: stored.saved_at,
            note: stored.note,
        })
        .map_err(|e| SkippedDraft {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteKind;
    use crate::storage::MemoryStore;

    const PREFIX: &str = "@eduverse_drafts";

    fn drafts() -> DraftStore<MemoryStore> {
        DraftStore::new(MemoryStore::new(), PREFIX)
    }

    #[tokio::test]
    async fn test_save_then_list_round_trips() {
        let drafts = drafts();
        let note = Note::text("Physics", "notes");

        let saved = drafts.save(&note).await.unwrap();
        assert!(saved.key.starts_with("@eduverse_drafts_"));

        let listing = drafts.list().await.unwrap();
        assert_eq!(listing.drafts.len(), 1);
        let draft = &listing.drafts[0];
        assert_eq!(draft.key, saved.key);
        assert_eq!(draft.note.title, "Physics");
        assert_eq!(draft.note.content, "notes");
        assert_eq!(draft.note.kind, NoteKind::Text);
        assert_eq!(draft.note.status, NoteStatus::Draft);
        assert!(listing.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_key_uses_note_id_when_present() {
        let drafts = drafts();
        let mut note = Note::text("Edited offline", "");
        note.id = Some(42);

        let saved = drafts.save(&note).await.unwrap();
        assert_eq!(saved.key, "@eduverse_drafts_42");

        // Saving again overwrites the same record
        note.set_content("second pass");
        drafts.save(&note).await.unwrap();
        let listing = drafts.list().await.unwrap();
        assert_eq!(listing.drafts.len(), 1);
        assert_eq!(listing.drafts[0].note.content, "second pass");
    }

    #[tokio::test]
    async fn test_stored_layout() {
        let drafts = drafts();
        let saved = drafts.save(&Note::text("Layout", "x")).await.unwrap();

        let raw = drafts.store().get(&saved.key).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["title"], "Layout");
        assert_eq!(value["note_type"], "text");
        assert_eq!(value["isLocal"], true);
        assert!(value["savedAt"].is_string());
    }

    #[tokio::test]
    async fn test_list_sorted_newest_first() {
        let drafts = drafts();
        drafts
            .save_as("@eduverse_drafts_1", &Note::text("older", ""))
            .await
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        drafts
            .save_as("@eduverse_drafts_2", &Note::text("newer", ""))
            .await
            .unwrap();

        let titles: Vec<_> = drafts
            .list()
            .await
            .unwrap()
            .drafts
            .into_iter()
            .map(|d| d.note.title)
            .collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn test_corrupted_record_is_reported_not_returned() {
        let drafts = drafts();
        drafts.save(&Note::text("valid", "")).await.unwrap();
        drafts
            .store()
            .set("@eduverse_drafts_broken", "{not json")
            .await
            .unwrap();

        let listing = drafts.list().await.unwrap();
        assert_eq!(listing.drafts.len(), 1);
        assert_eq!(listing.drafts[0].note.title, "valid");
        assert_eq!(listing.skipped.len(), 1);
        assert_eq!(listing.skipped[0].key, "@eduverse_drafts_broken");
    }

    #[tokio::test]
    async fn test_other_namespaces_are_ignored() {
        let drafts = drafts();
        drafts.store().set("@token", "abc").await.unwrap();
        drafts
            .store()
            .set("@eduverse_draftsXYZ", "{}")
            .await
            .unwrap();

        let listing = drafts.list().await.unwrap();
        assert!(listing.drafts.is_empty());
        assert!(listing.skipped.is_empty());
        assert!(!drafts.owns_key("@eduverse_draftsXYZ"));
        assert!(drafts.owns_key("@eduverse_drafts_1"));
    }

    #[tokio::test]
    async fn test_delete_then_list_never_returns_key() {
        let drafts = drafts();
        let saved = drafts.save(&Note::text("gone", "")).await.unwrap();

        drafts.delete(&saved.key).await.unwrap();
        drafts.delete(&saved.key).await.unwrap();

        let listing = drafts.list().await.unwrap();
        assert!(listing.drafts.iter().all(|d| d.key != saved.key));
    }

    #[tokio::test]
    async fn test_get_reports_malformed() {
        let drafts = drafts();
        drafts
            .store()
            .set("@eduverse_drafts_bad", "[]")
            .await
            .unwrap();

        assert!(matches!(
            drafts.get("@eduverse_drafts_bad").await.unwrap(),
            Some(Err(_))
        ));
        assert!(drafts.get("@eduverse_drafts_none").await.unwrap().is_none());
    }
}
