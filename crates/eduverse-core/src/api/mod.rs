//! Remote API client
//!
//! Async client for the EduVerse REST backend (`/api/v1`). The client is
//! built from an explicit [`ClientConfig`]; there is no process-wide
//! client or token. Logging in yields a new client carrying the token
//! (see [`ApiClient::with_token`]).
//!
//! Every request is logged at debug level; failures are logged at warn
//! level with the server's `detail` message.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{
    FileRecord, NewNote, NewRoom, Note, NoteKind, NoteUpdate, Participant, Registration, Room,
    Token, User,
};

pub mod ai;
pub mod error;

pub use ai::{AiReply, ModelCatalog};
pub use error::ApiError;

use ai::Prompt;

/// Connection settings for an [`ApiClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL including the version prefix, e.g. `http://localhost:8000/api/v1`
    pub base_url: String,
    pub timeout: Duration,
    /// Bearer token sent with every request when present
    pub token: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            token: None,
        }
    }

    /// Settings from the application configuration (no token)
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.api_url.clone(),
            timeout: config.timeout(),
            token: None,
        }
    }
}

/// Plain acknowledgement returned by join/leave endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub room_id: Option<i64>,
}

/// The operations the note synchronization coordinator needs from the server
#[async_trait]
pub trait NoteRemote: Send + Sync {
    /// Create a published note
    async fn create_note(&self, note: &NewNote) -> Result<Note, ApiError>;

    /// All published notes of the current user
    async fn list_notes(&self) -> Result<Vec<Note>, ApiError>;
}

#[async_trait]
impl<T: NoteRemote + ?Sized> NoteRemote for Arc<T> {
    async fn create_note(&self, note: &NewNote) -> Result<Note, ApiError> {
        (**self).create_note(note).await
    }

    async fn list_notes(&self) -> Result<Vec<Note>, ApiError> {
        (**self).list_notes().await
    }
}

/// REST client for the EduVerse backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Build a client; fails if the base URL is not an http(s) URL
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let parsed = Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl {
                url: config.base_url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("eduverse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ApiError::Transport {
                url: config.base_url.clone(),
                source,
            })?;

        Ok(Self { http, config })
    }

    /// A copy of this client that authenticates with `token`
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        let mut config = self.config.clone();
        config.token = Some(token.into());
        Self {
            http: self.http.clone(),
            config,
        }
    }

    /// A copy of this client without credentials
    pub fn without_token(&self) -> Self {
        let mut config = self.config.clone();
        config.token = None;
        Self {
            http: self.http.clone(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.config.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.config.token.is_some()
    }

    /// Absolute URL for an endpoint path such as `/notes/`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    // ==================== Auth ====================

    /// Exchange credentials for an access token
    pub async fn login(&self, username: &str, password: &str) -> Result<Token, ApiError> {
        let form = Form::new()
            .text("username", username.to_string())
            .text("password", password.to_string());
        self.send_form(Method::POST, "/auth/login", form).await
    }

    /// Profile of the authenticated user
    pub async fn me(&self) -> Result<User, ApiError> {
        self.get_json("/auth/me").await
    }

    pub async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        self.send_json(Method::POST, "/auth/register", registration)
            .await
    }

    // ==================== Notes ====================

    pub async fn list_notes(&self) -> Result<Vec<Note>, ApiError> {
        self.get_json("/notes/").await
    }

    /// Published notes of one kind
    pub async fn list_notes_by_kind(&self, kind: NoteKind) -> Result<Vec<Note>, ApiError> {
        self.get_json(&format!("/notes/?note_type={}", kind.as_str()))
            .await
    }

    pub async fn get_note(&self, id: i64) -> Result<Note, ApiError> {
        self.get_json(&format!("/notes/{}", id)).await
    }

    pub async fn create_note(&self, note: &NewNote) -> Result<Note, ApiError> {
        self.send_json(Method::POST, "/notes/", note).await
    }

    pub async fn update_note(&self, id: i64, update: &NoteUpdate) -> Result<Note, ApiError> {
        self.send_json(Method::PUT, &format!("/notes/{}", id), update)
            .await
    }

    pub async fn delete_note(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("/notes/{}", id))
            .await
    }

    /// Create an audio note that references an uploaded file
    pub async fn create_audio_note(
        &self,
        title: &str,
        file_id: i64,
        duration: f64,
        is_public: bool,
    ) -> Result<Note, ApiError> {
        let form = Form::new()
            .text("title", title.to_string())
            .text("file_id", file_id.to_string())
            .text("duration", duration.to_string())
            .text("is_public", is_public.to_string());
        self.send_form(Method::POST, "/notes/audio", form).await
    }

    // ==================== Files ====================

    pub async fn list_files(&self) -> Result<Vec<FileRecord>, ApiError> {
        self.get_json("/files/").await
    }

    /// Upload a file, optionally attaching it to a note
    pub async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        note_id: Option<i64>,
    ) -> Result<FileRecord, ApiError> {
        let mut form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));
        if let Some(note_id) = note_id {
            form = form.text("note_id", note_id.to_string());
        }
        self.send_form(Method::POST, "/files/upload", form).await
    }

    pub async fn delete_file(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("/files/{}", id))
            .await
    }

    /// Raw bytes of an uploaded file
    pub async fn download_file(&self, id: i64) -> Result<Vec<u8>, ApiError> {
        let url = self.url(&format!("/files/download/{}", id));
        let response = self.execute(Method::GET, &url, |req| req).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(&url, e))?;
        Ok(bytes.to_vec())
    }

    // ==================== AI ====================

    pub async fn ai_chat(
        &self,
        message: &str,
        model: &str,
        temperature: f32,
    ) -> Result<AiReply, ApiError> {
        let prompt = Prompt {
            message: Some(message),
            topic: None,
            problem: None,
            model,
            temperature,
        };
        self.send_prompt("/ai/chat", &prompt).await
    }

    pub async fn ai_explain(
        &self,
        topic: &str,
        model: &str,
        temperature: f32,
    ) -> Result<AiReply, ApiError> {
        let prompt = Prompt {
            message: None,
            topic: Some(topic),
            problem: None,
            model,
            temperature,
        };
        self.send_prompt("/ai/explain", &prompt).await
    }

    pub async fn ai_solve_math(
        &self,
        problem: &str,
        model: &str,
        temperature: f32,
    ) -> Result<AiReply, ApiError> {
        let prompt = Prompt {
            message: None,
            topic: None,
            problem: Some(problem),
            model,
            temperature,
        };
        self.send_prompt("/ai/solve-math", &prompt).await
    }

    /// Models the AI proxy accepts
    pub async fn ai_models(&self) -> Result<ModelCatalog, ApiError> {
        self.get_json("/ai/models").await
    }

    // ==================== Rooms ====================

    pub async fn list_rooms(&self) -> Result<Vec<Room>, ApiError> {
        self.get_json("/rooms/").await
    }

    pub async fn create_room(&self, room: &NewRoom) -> Result<Room, ApiError> {
        self.send_json(Method::POST, "/rooms/", room).await
    }

    pub async fn get_room(&self, id: i64) -> Result<Room, ApiError> {
        self.get_json(&format!("/rooms/{}", id)).await
    }

    pub async fn room_participants(&self, id: i64) -> Result<Vec<Participant>, ApiError> {
        self.get_json(&format!("/rooms/{}/participants", id)).await
    }

    pub async fn join_room(&self, id: i64) -> Result<Ack, ApiError> {
        self.post_no_body(&format!("/rooms/{}/join", id)).await
    }

    pub async fn leave_room(&self, id: i64) -> Result<Ack, ApiError> {
        self.post_no_body(&format!("/rooms/{}/leave", id)).await
    }

    // ==================== Transport ====================

    /// Send a request and map non-success statuses to errors
    async fn execute(
        &self,
        method: Method,
        url: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, ApiError> {
        debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = build(request).send().await.map_err(|e| {
            let error = ApiError::from_reqwest(url, e);
            warn!("{} {} failed: {}", method, url, error);
            error
        })?;

        let status = response.status();
        if status.is_success() {
            debug!("{} {} -> {}", method, url, status.as_u16());
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_status(status, &body);
        warn!("{} {} -> {}: {}", method, url, status.as_u16(), error);
        Err(error)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self.execute(Method::GET, &url, |req| req).await?;
        decode_body(&url, response).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self.execute(method, &url, |req| req.json(body)).await?;
        decode_body(&url, response).await
    }

    async fn send_form<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self
            .execute(method, &url, move |req| req.multipart(form))
            .await?;
        decode_body(&url, response).await
    }

    async fn post_no_body<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self.execute(Method::POST, &url, |req| req).await?;
        decode_body(&url, response).await
    }

    async fn send_empty(&self, method: Method, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        self.execute(method, &url, |req| req).await?;
        Ok(())
    }

    async fn send_prompt(&self, path: &str, prompt: &Prompt<'_>) -> Result<AiReply, ApiError> {
        let value: Value = self.send_json(Method::POST, path, prompt).await?;
        Ok(AiReply::decode(value))
    }
}

#[async_trait]
impl NoteRemote for ApiClient {
    async fn create_note(&self, note: &NewNote) -> Result<Note, ApiError> {
        ApiClient::create_note(self, note).await
    }

    async fn list_notes(&self) -> Result<Vec<Note>, ApiError> {
        ApiClient::list_notes(self).await
    }
}

/// Decode a JSON response body; an empty body reads as `null`
async fn decode_body<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, ApiError> {
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::from_reqwest(url, e))?;
    let body = if body.trim().is_empty() { "null" } else { &body };

    serde_json::from_str(body).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
