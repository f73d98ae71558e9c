//! EduVerse Core Library
//!
//! This crate provides the client-side core of EduVerse, a note-taking and
//! study-assistant service: notes kept as local drafts until they are
//! published, an AI assistant proxy, collaboration rooms with chat, and
//! file uploads.
//!
//! # Architecture
//!
//! - **Local drafts**: unsent notes live in a key-value store
//!   (SQLite on disk, or in memory)
//! - **Server**: published notes, rooms, files and AI requests go through
//!   the REST client; room chat uses a WebSocket
//!
//! The two note sources are never merged in place. `NoteSync` lists them
//! side by side and moves drafts to the server.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = SqliteStore::open(&config)?;
//! let api = ApiClient::new(ClientConfig::from_config(&config))?;
//! let session = Session::require(&api, &store).await?;
//!
//! let sync = NoteSync::new(store, session.into_client(), &config.drafts_prefix);
//! sync.save_draft(&Note::text("Physics", "F = ma")).await?;
//! let reports = sync.sync_drafts().await?;
//! ```
//!
//! # Modules
//!
//! - `sync`: draft / published coordination (main entry point)
//! - `models`: notes, typed note content, and server entities
//! - `drafts`: draft records in the key-value store
//! - `storage`: key-value store trait and backends
//! - `api`: REST client and AI reply decoding
//! - `session`: token persistence
//! - `rooms`: room chat socket
//! - `config`: application configuration

pub mod api;
pub mod config;
pub mod drafts;
pub mod models;
pub mod rooms;
pub mod session;
pub mod storage;
pub mod sync;

pub use api::{AiReply, ApiClient, ApiError, ClientConfig, NoteRemote};
pub use config::Config;
pub use drafts::{DraftListing, DraftStore, SkippedDraft};
pub use models::{
    DraftRecord, Note, NoteContent, NoteEntry, NoteKind, NoteStatus, Room, User,
};
pub use rooms::{connect_room, ChatMessage, RoomError, RoomEvent, RoomHandle};
pub use session::{Session, SessionError, TokenClaims};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StorageError};
pub use sync::{DraftSyncReport, NoteListing, NoteSync, SyncOutcome, SyncSummary};
