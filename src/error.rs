// src/error.rs
// Error taxonomy shared by the tool server and the client

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Caller-visible error classes carried in a failed `ToolResult`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller-supplied arguments failed the tool's schema or shape checks
    InvalidArgument,
    /// Image payload is empty, unreadable, undecodable or too large
    InvalidImage,
    /// Network failure, timeout or non-success status from the backend
    BackendUnavailable,
    /// Backend answered, but with no usable completion text
    EmptyResponse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "InvalidArgument"),
            Self::InvalidImage => write!(f, "InvalidImage"),
            Self::BackendUnavailable => write!(f, "BackendUnavailable"),
            Self::EmptyResponse => write!(f, "EmptyResponse"),
        }
    }
}

/// Main error type for the Lingshu library
#[derive(Error, Debug)]
pub enum LingshuError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("empty response: {0}")]
    EmptyResponse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("MCP transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Result using LingshuError
pub type Result<T> = std::result::Result<T, LingshuError>;

impl LingshuError {
    /// Public error class, if this error can surface from a tool invocation
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::InvalidArgument(_) => Some(ErrorKind::InvalidArgument),
            Self::InvalidImage(_) => Some(ErrorKind::InvalidImage),
            Self::BackendUnavailable(_) | Self::Transport(_) => Some(ErrorKind::BackendUnavailable),
            Self::EmptyResponse(_) => Some(ErrorKind::EmptyResponse),
            Self::Config(_) | Self::Io(_) | Self::Json(_) => None,
        }
    }
}
