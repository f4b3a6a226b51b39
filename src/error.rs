// src/error.rs
use reqwest::StatusCode;

/// Why a single feed fetch attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("client is offline")]
    Offline,
}

impl FetchError {
    /// Transport/timeout and status failures are retried; malformed payloads and
    /// offline are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Status(_))
    }
}
