//! Room socket frames
//!
//! Frames are JSON text messages in one of two layouts:
//!
//! - envelope: `{"event": <name>, "data": <payload>}`
//! - flat: `{"type": "chat" | "system" | ..., <fields>}`, which is what the
//!   EduVerse backend broadcasts and what it reads from clients
//!
//! Both are decoded. Chat sent to the server uses the flat layout
//! ([`ChatMessage::to_frame`]); [`RoomEvent::encode`] writes the envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RoomError;
use crate::models::timestamp;

const EVENT_MESSAGE: &str = "message";
const EVENT_JOINED: &str = "participant_joined";
const EVENT_LEFT: &str = "participant_left";
const EVENT_SYSTEM: &str = "system";

const FLAT_CHAT: &str = "chat";
const FLAT_SYSTEM: &str = "system";

/// A chat line sent to or received from a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: String,
    /// Message type, `text` for ordinary chat
    #[serde(rename = "type", default = "default_message_type")]
    pub kind: String,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Sender's display name, when the server includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ChatMessage {
    /// A text message stamped with the current time
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: default_message_type(),
            timestamp: Some(Utc::now()),
            user: None,
        }
    }
}

impl ChatMessage {
    /// Flat `chat` frame, the layout the server reads from clients
    ///
    /// `kind` is not sent; the server treats every chat frame as text.
    pub fn to_frame(&self) -> Result<String, RoomError> {
        let frame = Flat {
            kind: FLAT_CHAT,
            body: ChatFrame {
                message: self.content.clone(),
                user: self.user.clone(),
                timestamp: self.timestamp,
            },
        };
        serde_json::to_string(&frame).map_err(RoomError::Frame)
    }
}

fn default_message_type() -> String {
    "text".to_string()
}

/// Server notice such as a user connecting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SystemNotice {
    message: String,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

/// A decoded room frame
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    Message(ChatMessage),
    /// Participant payload, passed through as sent
    ParticipantJoined(Value),
    ParticipantLeft(Value),
    System {
        message: String,
        timestamp: Option<DateTime<Utc>>,
    },
    /// An event this client does not know
    Unknown { event: String, data: Value },
}

/// Wire envelope
#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Flat frame: a `type` tag next to the payload's own fields
#[derive(Debug, Serialize)]
struct Flat<T> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    body: T,
}

/// Fields of a flat `chat` frame
#[derive(Debug, Serialize, Deserialize)]
struct ChatFrame {
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

impl RoomEvent {
    /// Name used in the `event` field
    pub fn name(&self) -> &str {
        match self {
            RoomEvent::Message(_) => EVENT_MESSAGE,
            RoomEvent::ParticipantJoined(_) => EVENT_JOINED,
            RoomEvent::ParticipantLeft(_) => EVENT_LEFT,
            RoomEvent::System { .. } => EVENT_SYSTEM,
            RoomEvent::Unknown { event, .. } => event.as_str(),
        }
    }

    /// Decode a text frame in either layout
    pub fn decode(text: &str) -> Result<Self, RoomError> {
        let value: Value = serde_json::from_str(text).map_err(RoomError::Frame)?;
        if value.get("event").is_some() {
            let frame: Frame = serde_json::from_value(value).map_err(RoomError::Frame)?;
            return Self::from_envelope(frame);
        }

        let kind = value.get("type").and_then(Value::as_str).map(str::to_string);
        match kind {
            Some(kind) => Self::from_flat(kind, value),
            None => Err(RoomError::Frame(serde::de::Error::custom(
                "frame has neither `event` nor `type`",
            ))),
        }
    }

    fn from_envelope(frame: Frame) -> Result<Self, RoomError> {
        let event = match frame.event.as_str() {
            EVENT_MESSAGE => {
                RoomEvent::Message(serde_json::from_value(frame.data).map_err(RoomError::Frame)?)
            }
            EVENT_JOINED => RoomEvent::ParticipantJoined(frame.data),
            EVENT_LEFT => RoomEvent::ParticipantLeft(frame.data),
            EVENT_SYSTEM => {
                let notice: SystemNotice =
                    serde_json::from_value(frame.data).map_err(RoomError::Frame)?;
                RoomEvent::System {
                    message: notice.message,
                    timestamp: notice.timestamp,
                }
            }
            _ => RoomEvent::Unknown {
                event: frame.event,
                data: frame.data,
            },
        };
        Ok(event)
    }

    /// `chat` and `system` map onto the typed events; other types such as
    /// `draw` and `cursor` keep the whole frame as `Unknown` data
    fn from_flat(kind: String, value: Value) -> Result<Self, RoomError> {
        let event = match kind.as_str() {
            FLAT_CHAT => {
                let chat: ChatFrame = serde_json::from_value(value).map_err(RoomError::Frame)?;
                RoomEvent::Message(ChatMessage {
                    content: chat.message,
                    kind: default_message_type(),
                    timestamp: chat.timestamp,
                    user: chat.user,
                })
            }
            FLAT_SYSTEM => {
                let notice: SystemNotice =
                    serde_json::from_value(value).map_err(RoomError::Frame)?;
                RoomEvent::System {
                    message: notice.message,
                    timestamp: notice.timestamp,
                }
            }
            _ => RoomEvent::Unknown {
                event: kind,
                data: value,
            },
        };
        Ok(event)
    }

    /// Encode as a text frame
    pub fn encode(&self) -> Result<String, RoomError> {
        let data = match self {
            RoomEvent::Message(message) => serde_json::to_value(message),
            RoomEvent::ParticipantJoined(data)
            | RoomEvent::ParticipantLeft(data)
            | RoomEvent::Unknown { data, .. } => Ok(data.clone()),
            RoomEvent::System { message, timestamp } => serde_json::to_value(SystemNotice {
                message: message.clone(),
                timestamp: *timestamp,
            }),
        }
        .map_err(RoomError::Frame)?;

        let frame = Frame {
            event: self.name().to_string(),
            data,
        };
        serde_json::to_string(&frame).map_err(RoomError::Frame)
    }
}
