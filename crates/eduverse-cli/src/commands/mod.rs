//! Command handlers
//!
//! Each submodule handles one top-level command. `Context` carries what
//! they share: the loaded config, the local store, and the API client.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use tracing::debug;

use eduverse_core::{ApiClient, ClientConfig, Config, DraftRecord, NoteSync, Session, SqliteStore};

pub mod ai;
pub mod auth;
pub mod config;
pub mod draft;
pub mod file;
pub mod note;
pub mod room;
pub mod status;
pub mod sync;

/// Coordinator over the on-disk store and the REST client
pub type CliSync = NoteSync<Arc<SqliteStore>, ApiClient>;

/// Shared state for command handlers
pub struct Context {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    store: Arc<SqliteStore>,
    api: ApiClient,
}

impl Context {
    /// Open the local store and build an unauthenticated client
    pub fn open(config: Config, config_path: Option<PathBuf>) -> Result<Self> {
        let store = SqliteStore::open(&config)
            .with_context(|| format!("Failed to open local store in {:?}", config.data_dir))?;
        let api = ApiClient::new(ClientConfig::from_config(&config))
            .context("Invalid api_url in configuration")?;
        debug!("Using API at {} and store in {:?}", api.base_url(), config.data_dir);

        Ok(Self {
            config,
            config_path,
            store: Arc::new(store),
            api,
        })
    }

    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    /// The client without credentials
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The stored session; errors when not logged in
    pub async fn session(&self) -> Result<Session> {
        Ok(Session::require(&self.api, self.store.as_ref()).await?)
    }

    /// Authenticated client if a token is stored, anonymous otherwise
    pub async fn client(&self) -> Result<ApiClient> {
        Ok(Session::restore(&self.api, self.store.as_ref())
            .await?
            .map(Session::into_client)
            .unwrap_or_else(|| self.api.clone()))
    }

    /// Note coordinator
    ///
    /// Drafts work offline, so a missing login is not an error here.
    pub async fn note_sync(&self) -> Result<CliSync> {
        let client = self.client().await?;
        Ok(NoteSync::new(
            self.store.clone(),
            client,
            self.config.drafts_prefix.clone(),
        ))
    }

    /// Note coordinator for commands that publish; requires a login
    pub async fn authed_sync(&self) -> Result<CliSync> {
        let session = self.session().await?;
        Ok(NoteSync::new(
            self.store.clone(),
            session.into_client(),
            self.config.drafts_prefix.clone(),
        ))
    }
}

/// Load one draft by key, failing on a missing or unreadable record
pub async fn load_draft(sync: &CliSync, key: &str) -> Result<DraftRecord> {
    if !sync.drafts().owns_key(key) {
        bail!(
            "'{}' is not a draft key (draft keys start with {}_)",
            key,
            sync.drafts().prefix()
        );
    }
    match sync.drafts().get(key).await? {
        Some(Ok(record)) => Ok(record),
        Some(Err(skipped)) => bail!("Draft {} is unreadable: {}", key, skipped.reason),
        None => bail!("No draft with key {}", key),
    }
}

/// How a note is referred to on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteRef {
    /// Server id, written `12` or `#12`
    Published(i64),
    /// Local draft key
    Draft(String),
}

impl NoteRef {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.trim_start_matches('#').parse::<i64>() {
            Ok(id) => NoteRef::Published(id),
            Err(_) => NoteRef::Draft(trimmed.to_string()),
        }
    }
}
