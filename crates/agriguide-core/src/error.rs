//! Error types for the AgriGuide core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session {0} belongs to another user")]
    SessionConflict(String),

    #[error("Post not found: {0}")]
    PostNotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Phone number {0} is already registered")]
    PhoneNumberTaken(String),

    #[error("Audio file not found: {0}")]
    AudioNotFound(String),

    #[error("Audio encoding error: {0}")]
    AudioError(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Upstream returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("No response generated")]
    EmptyResponse,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::StorageError(e.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::UpstreamError(format!("invalid base64 audio payload: {}", e))
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::ConfigError(e.to_string())
    }
}
