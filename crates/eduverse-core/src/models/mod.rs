//! Data models for EduVerse
//!
//! Defines the note entity shared by the draft store and the remote API,
//! the listing entry that merges both sources, and the other server
//! entities (users, rooms, files).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub mod content;
pub mod timestamp;

pub use content::{AudioContent, ContentError, DrawingContent, NoteContent, Stroke};

/// Note kind; determines how `content` is encoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    #[default]
    Text,
    Drawing,
    Audio,
    Mixed,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Text => "text",
            NoteKind::Drawing => "drawing",
            NoteKind::Audio => "audio",
            NoteKind::Mixed => "mixed",
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(NoteKind::Text),
            "drawing" => Ok(NoteKind::Drawing),
            "audio" => Ok(NoteKind::Audio),
            "mixed" => Ok(NoteKind::Mixed),
            other => Err(format!(
                "unknown note kind '{}' (expected text, drawing, audio, or mixed)",
                other
            )),
        }
    }
}

/// Lifecycle status of a note
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    Draft,
    #[default]
    Published,
    Archived,
}

impl fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NoteStatus::Draft => "draft",
            NoteStatus::Published => "published",
            NoteStatus::Archived => "archived",
        };
        f.write_str(s)
    }
}

/// A user note, either a local draft or a server-published record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    /// Server identifier; absent until the note is published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    /// Raw content; decode with [`Note::decode_content`]
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(rename = "note_type", default)]
    pub kind: NoteKind,
    #[serde(default)]
    pub status: NoteStatus,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl Note {
    /// Create a new, unpublished note
    pub fn new(title: impl Into<String>, kind: NoteKind) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            title: title.into(),
            content: String::new(),
            kind,
            status: NoteStatus::Draft,
            is_public: false,
            created_at: Some(now),
            updated_at: Some(now),
            user_id: None,
        }
    }

    /// Create a text note with content
    pub fn text(title: impl Into<String>, content: impl Into<String>) -> Self {
        let mut note = Self::new(title, NoteKind::Text);
        note.content = content.into();
        note
    }

    /// Create a note from typed content; the kind follows the content
    pub fn with_content(title: impl Into<String>, content: &NoteContent) -> Self {
        let mut note = Self::new(title, content.kind());
        note.content = content.encode();
        note
    }

    /// Update the title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Some(Utc::now());
    }

    /// Replace the raw content
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.updated_at = Some(Utc::now());
    }

    /// Decode `content` according to `kind`
    pub fn decode_content(&self) -> Result<NoteContent, ContentError> {
        NoteContent::decode(self.kind, &self.content)
    }

    pub fn is_draft(&self) -> bool {
        self.status == NoteStatus::Draft
    }

    pub fn is_published(&self) -> bool {
        self.status == NoteStatus::Published
    }

    /// Drafts and published notes can be edited; archived ones cannot
    pub fn is_editable(&self) -> bool {
        matches!(self.status, NoteStatus::Draft | NoteStatus::Published)
    }

    /// Best-available timestamp of a published note
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

/// Body of `POST /notes/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub note_type: NoteKind,
    pub is_public: bool,
}

impl From<&Note> for NewNote {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            note_type: note.kind,
            is_public: note.is_public,
        }
    }
}

/// Body of `PUT /notes/{id}`; unset fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NoteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_type: Option<NoteKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

/// A locally stored, unpublished note
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DraftRecord {
    /// Storage key (`<prefix>_<id-or-timestamp>`)
    pub key: String,
    pub saved_at: DateTime<Utc>,
    pub note: Note,
}

/// One row of the merged drafts + published listing
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum NoteEntry {
    Draft(DraftRecord),
    Published(Note),
}

impl NoteEntry {
    pub fn note(&self) -> &Note {
        match self {
            NoteEntry::Draft(draft) => &draft.note,
            NoteEntry::Published(note) => note,
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, NoteEntry::Draft(_))
    }

    /// Save time for drafts; update then create time for published notes
    pub fn sort_timestamp(&self) -> DateTime<Utc> {
        match self {
            NoteEntry::Draft(draft) => draft.saved_at,
            NoteEntry::Published(note) => note
                .last_modified()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        }
    }
}

/// Access token returned by `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// User profile from `GET /auth/me`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub subscription_tier: Option<String>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /auth/register`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// A collaboration room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_room_type")]
    pub room_type: String,
    #[serde(default = "default_max_participants")]
    pub max_participants: u32,
    #[serde(default)]
    pub settings: serde_json::Value,
    #[serde(default)]
    pub owner_id: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub participant_count: u32,
}

/// Body of `POST /rooms/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewRoom {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub room_type: String,
    pub max_participants: u32,
}

impl NewRoom {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            room_type: default_room_type(),
            max_participants: default_max_participants(),
        }
    }
}

/// A member of a room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub id: i64,
    pub room_id: i64,
    pub user_id: i64,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub username: Option<String>,
}

/// An uploaded file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub id: i64,
    pub filename: String,
    pub original_filename: String,
    pub file_size: u64,
    pub mime_type: String,
    pub file_type: String,
    #[serde(default)]
    pub note_id: Option<i64>,
    pub user_id: i64,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_path: String,
}

fn default_true() -> bool {
    true
}

fn default_room_type() -> String {
    "public".to_string()
}

fn default_max_participants() -> u32 {
    10
}

fn default_role() -> String {
    "participant".to_string()
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
