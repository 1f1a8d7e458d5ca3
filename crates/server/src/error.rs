//! Server-facing error type: everything that can go wrong setting up or
//! driving a session, mapped to an HTTP status for the REST/WS surface.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("session config invalid: {0}")]
    Config(#[from] boardroom_config::ConfigError),
    #[error("unknown persona: {0}")]
    UnknownPersona(String),
    #[error("session already ended")]
    SessionEnded,
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Config(_) | ServerError::UnknownPersona(_) => StatusCode::BAD_REQUEST,
            ServerError::SessionEnded => StatusCode::GONE,
        }
    }
}
