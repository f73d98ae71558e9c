//! AI assistant replies
//!
//! The `/ai/*` endpoints do not share a response shape: chat proxies an
//! OpenAI-style completion, explain returns `{explanation}`, solve-math
//! returns `{solution}`. [`AiReply::decode`] probes the known shapes in a
//! fixed order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Object fields probed for reply text, in priority order
const TEXT_FIELDS: &[&str] = &["solution", "explanation", "response", "message", "content"];

/// Display text for a reply that carried nothing
const NO_RESPONSE: &str = "(no response)";

/// A decoded AI reply
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AiReply {
    /// `choices[0].message.content` of a chat completion
    ChatCompletion(String),
    /// One of the known text fields of an object reply
    Field { field: &'static str, text: String },
    /// The body was a bare JSON string
    Plain(String),
    /// An object with none of the known fields
    Unrecognized(Value),
    /// Null, empty, or a scalar with no text
    Empty,
}

impl AiReply {
    /// Decode a reply body
    pub fn decode(body: Value) -> Self {
        if let Some(text) = completion_text(&body) {
            return AiReply::ChatCompletion(text.to_string());
        }

        if let Value::Object(map) = &body {
            let found = TEXT_FIELDS.iter().find_map(|&field| {
                map.get(field)
                    .and_then(non_empty_str)
                    .map(|text| (field, text.to_string()))
            });
            return match found {
                Some((field, text)) => AiReply::Field { field, text },
                None => AiReply::Unrecognized(body),
            };
        }

        match body {
            Value::String(s) if !s.is_empty() => AiReply::Plain(s),
            Value::Array(_) => AiReply::Unrecognized(body),
            _ => AiReply::Empty,
        }
    }

    /// Text to show the user
    pub fn text(&self) -> String {
        match self {
            AiReply::ChatCompletion(text) | AiReply::Plain(text) => text.clone(),
            AiReply::Field { text, .. } => text.clone(),
            AiReply::Unrecognized(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            AiReply::Empty => NO_RESPONSE.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AiReply::Empty)
    }
}

fn completion_text(body: &Value) -> Option<&str> {
    body.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")
        .and_then(non_empty_str)
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

/// Body of `GET /ai/models`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalog {
    /// Model id to display name
    #[serde(default)]
    pub models: BTreeMap<String, String>,
    /// Server-side default model id
    #[serde(default)]
    pub default: Option<String>,
}

/// Body of the AI prompt endpoints
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Prompt<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<&'a str>,
    pub model: &'a str,
    pub temperature: f32,
}
