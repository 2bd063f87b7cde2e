use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No response at all: connect failure, timeout, reset.
    Transport,
    /// A response arrived but its body could not be decoded.
    Malformed,
    /// Well-formed body carrying `success: false`.
    Rejected,
    /// Non-2xx HTTP status.
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("backend rejected request: {}", .0.as_deref().unwrap_or("no reason given"))]
    Rejected(Option<String>),
    #[error("backend returned status {status}: {}", .message.as_deref().unwrap_or("no reason given"))]
    Status { status: u16, message: Option<String> },
}

impl BackendError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BackendError::Transport(_) => ErrorCode::Transport,
            BackendError::Malformed(_) => ErrorCode::Malformed,
            BackendError::Rejected(_) => ErrorCode::Rejected,
            BackendError::Status { .. } => ErrorCode::Status,
        }
    }

    /// Backend-supplied reason, when the failure carried one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            BackendError::Rejected(message) | BackendError::Status { message, .. } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }

    /// Short text suitable for a notification, prefixed with the operation that failed.
    pub fn user_message(&self, operation: &str) -> String {
        match self {
            BackendError::Transport(_) => {
                format!("{operation} failed: backend unreachable")
            }
            BackendError::Malformed(_) => {
                format!("{operation} failed: unexpected response from backend")
            }
            BackendError::Status { status: 429, .. } => {
                format!("{operation} failed: rate limited, try again shortly")
            }
            _ => match self.backend_message() {
                Some(reason) => format!("{operation} failed: {reason}"),
                None => format!("{operation} failed"),
            },
        }
    }
}
