//! Room chat socket
//!
//! Connects to `/rooms/ws/{room_id}` and exchanges JSON text frames.
//! The connection runs in its own task; callers talk to it through a
//! [`RoomHandle`]. There is no reconnection: when the socket closes the
//! task reports [`RoomStatus::Disconnected`] and ends.

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use crate::api::ClientConfig;

mod message;

pub use message::{ChatMessage, RoomEvent};

/// Errors from room connections
#[derive(Error, Debug)]
pub enum RoomError {
    #[error("invalid room URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("room socket error: {0}")]
    Socket(#[from] tungstenite::Error),

    #[error("malformed room frame: {0}")]
    Frame(#[source] serde_json::Error),

    #[error("room connection is closed")]
    Closed,
}

/// Commands sent to the room task
#[derive(Debug, Clone)]
pub enum RoomCommand {
    /// Send a chat message
    Send(ChatMessage),
    /// Close the socket and end the task
    Close,
}

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// Events emitted by the room task
#[derive(Debug, Clone)]
pub enum RoomTaskEvent {
    /// A frame arrived from the room
    Event(RoomEvent),
    /// Connection status changed
    StatusChanged(RoomStatus),
    /// Error occurred
    Error(String),
}

/// Handle to control the room task
pub struct RoomHandle {
    /// Send commands to the room task
    pub command_tx: mpsc::Sender<RoomCommand>,
    /// Receive events from the room task
    pub event_rx: mpsc::Receiver<RoomTaskEvent>,
    /// Watch connection status
    pub status_rx: watch::Receiver<RoomStatus>,
}

impl RoomHandle {
    /// Queue a chat message
    pub async fn send(&self, message: ChatMessage) -> Result<(), RoomError> {
        self.command_tx
            .send(RoomCommand::Send(message))
            .await
            .map_err(|_| RoomError::Closed)
    }

    /// Ask the task to close the socket
    pub async fn close(&self) {
        let _ = self.command_tx.send(RoomCommand::Close).await;
    }

    pub fn status(&self) -> RoomStatus {
        *self.status_rx.borrow()
    }

    /// Next event; `None` once the task has ended
    pub async fn next_event(&mut self) -> Option<RoomTaskEvent> {
        self.event_rx.recv().await
    }
}

/// WebSocket URL for a room: the API base with a ws(s) scheme
pub fn room_url(base_url: &str, room_id: i64, token: &str) -> Result<Url, RoomError> {
    let invalid = |reason: String| RoomError::InvalidUrl {
        url: base_url.to_string(),
        reason,
    };

    let mut url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    };
    url.set_scheme(scheme)
        .map_err(|_| invalid(format!("cannot use scheme '{}'", scheme)))?;

    let path = format!("{}/rooms/ws/{}", url.path().trim_end_matches('/'), room_id);
    url.set_path(&path);
    url.set_query(None);
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// Connect to a room in a background task
///
/// The URL is checked before the task starts; connection failures are
/// reported through the handle's events.
pub fn connect_room(
    config: &ClientConfig,
    room_id: i64,
    token: &str,
) -> Result<RoomHandle, RoomError> {
    let url = room_url(&config.base_url, room_id, token)?;

    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (status_tx, status_rx) = watch::channel(RoomStatus::Connecting);

    tokio::spawn(room_task(url, room_id, command_rx, event_tx, status_tx));

    Ok(RoomHandle {
        command_tx,
        event_rx,
        status_rx,
    })
}

async fn room_task(
    url: Url,
    room_id: i64,
    mut command_rx: mpsc::Receiver<RoomCommand>,
    event_tx: mpsc::Sender<RoomTaskEvent>,
    status_tx: watch::Sender<RoomStatus>,
) {
    let _ = event_tx
        .send(RoomTaskEvent::StatusChanged(RoomStatus::Connecting))
        .await;

    if let Err(e) = connect_and_chat(&url, room_id, &mut command_rx, &event_tx, &status_tx).await {
        warn!("Room {} connection error: {}", room_id, e);
        let _ = event_tx.send(RoomTaskEvent::Error(e.to_string())).await;
    }

    let _ = status_tx.send(RoomStatus::Disconnected);
    let _ = event_tx
        .send(RoomTaskEvent::StatusChanged(RoomStatus::Disconnected))
        .await;
    info!("Left room {}", room_id);
}

/// Run the socket until it closes or a `Close` command arrives
async fn connect_and_chat(
    url: &Url,
    room_id: i64,
    command_rx: &mut mpsc::Receiver<RoomCommand>,
    event_tx: &mpsc::Sender<RoomTaskEvent>,
    status_tx: &watch::Sender<RoomStatus>,
) -> Result<(), RoomError> {
    debug!("Connecting to room {}", room_id);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();

    let _ = status_tx.send(RoomStatus::Connected);
    let _ = event_tx
        .send(RoomTaskEvent::StatusChanged(RoomStatus::Connected))
        .await;
    info!("Joined room {}", room_id);

    loop {
        tokio::select! {
            cmd = command_rx.recv() => {
                match cmd {
                    Some(RoomCommand::Send(message)) => {
                        let frame = message.to_frame()?;
                        write.send(Message::Text(frame)).await?;
                    }
                    Some(RoomCommand::Close) | None => {
                        write.close().await.ok();
                        return Ok(());
                    }
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match RoomEvent::decode(&text) {
                        Ok(event) => {
                            let _ = event_tx.send(RoomTaskEvent::Event(event)).await;
                        }
                        Err(e) => warn!("Ignoring room frame: {}", e),
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Err(e)) => return Err(e.into()),
                    _ => {}
                }
            }
        }
    }
}
