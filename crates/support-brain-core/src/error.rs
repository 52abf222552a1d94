//! Error types

use reqwest::StatusCode;
use thiserror::Error;

/// Answer service error with classification
///
/// The coordinator treats every kind the same way (one fallback message); the
/// kind only feeds the diagnostic log.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Transport, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Timeout, message)
    }

    pub fn status(status: StatusCode, body: &str) -> Self {
        let message = if body.is_empty() {
            format!("answer service returned {status}")
        } else {
            format!("answer service returned {status}: {body}")
        };
        Self::new(ServiceErrorKind::Status(status.as_u16()), message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::MalformedBody, message)
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if err.is_decode() {
            Self::malformed(err.to_string())
        } else {
            Self::transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Connection refused, DNS, reset
    Transport,
    /// Only possible when a request timeout is configured
    Timeout,
    /// Non-2xx response
    Status(u16),
    /// Body did not decode as an answer
    MalformedBody,
}

/// Rejected conversation transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("message text is empty")]
    EmptyMessage,
}
