//! API error types

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Errors returned by [`super::ApiClient`]
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request did not complete within the configured timeout
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Connection-level failure (DNS, refused, TLS, reset)
    #[error("could not reach {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// 401 or 403; the session token is missing, invalid or expired
    #[error("not authorized: {detail}")]
    Unauthorized { detail: String },

    /// 404
    #[error("not found: {detail}")]
    NotFound { detail: String },

    /// Any other non-success status
    #[error("server returned {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The response body did not match the expected shape
    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// The configured base URL cannot be used
    #[error("invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ApiError {
    /// Classify a reqwest send/read failure
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
            }
        } else if source.is_decode() {
            ApiError::Decode {
                url: url.to_string(),
                reason: source.to_string(),
            }
        } else {
            ApiError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }

    /// Map a non-success status and its body to an error
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = extract_detail(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized { detail },
            StatusCode::NOT_FOUND => ApiError::NotFound { detail },
            _ => ApiError::Status {
                status: status.as_u16(),
                detail,
            },
        }
    }

    /// Whether re-authenticating could fix this error
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pull a readable message out of a FastAPI error body
///
/// `detail` is either a string or a list of validation errors with `msg`.
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}
