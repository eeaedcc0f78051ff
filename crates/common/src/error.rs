//! Error types shared across Framebooth crates.

use std::path::PathBuf;

/// Top-level error type for Framebooth operations.
#[derive(Debug, thiserror::Error)]
pub enum BoothError {
    #[error("Layout error: {message}")]
    Layout { message: String },

    #[error("Asset error: {message}")]
    Asset { message: String },

    #[error("Compose error: {message}")]
    Compose { message: String },

    #[error("Synthesis error: {message}")]
    Synthesis { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error("Export already in progress: {message}")]
    Busy { message: String },

    #[error("Export cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using BoothError.
pub type BoothResult<T> = Result<T, BoothError>;

impl BoothError {
    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout {
            message: msg.into(),
        }
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset {
            message: msg.into(),
        }
    }

    pub fn compose(msg: impl Into<String>) -> Self {
        Self::Compose {
            message: msg.into(),
        }
    }

    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy {
            message: msg.into(),
        }
    }
}
