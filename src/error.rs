use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failures talking to the source-control hosting API.
#[derive(Debug, Error)]
pub enum HostingError {
    #[error("hosting API not configured: {0}")]
    Config(String),
    #[error("hosting API rejected the credentials ({status}): {message}")]
    Auth { status: u16, message: String },
    #[error("hosting API rate limit exceeded ({status}): {message}")]
    RateLimited { status: u16, message: String },
    #[error("not found on hosting API ({status}): {message}")]
    NotFound { status: u16, message: String },
    #[error("failed to reach hosting API: {0}")]
    Transport(String),
    #[error("hosting API responded with {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("hosting API returned an unexpected payload: {0}")]
    InvalidResponse(String),
}

impl HostingError {
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => HostingError::Auth { status, message },
            403 | 429 => HostingError::RateLimited { status, message },
            404 => HostingError::NotFound { status, message },
            _ => HostingError::Upstream { status, message },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            HostingError::Auth { status, .. }
            | HostingError::RateLimited { status, .. }
            | HostingError::NotFound { status, .. }
            | HostingError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures producing a changelog from the text-generation backend.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("language model not configured: {0}")]
    Config(String),
    #[error("language model call timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("language model responded with {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("failed to reach language model: {0}")]
    Transport(String),
    #[error("language model output violates the changelog schema: {0}")]
    Schema(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Hosting(#[from] HostingError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error("draft cache error: {0}")]
    Cache(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
