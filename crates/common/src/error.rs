//! Error types shared across Handwave crates.

/// Top-level error type for Handwave operations.
#[derive(Debug, thiserror::Error)]
pub enum HandwaveError {
    #[error("Detector error: {message}")]
    Detector { message: String },

    #[error("Initialization error: {message}")]
    Initialization { message: String },

    #[error("Feed error: {message}")]
    Feed { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using HandwaveError.
pub type HandwaveResult<T> = Result<T, HandwaveError>;

impl HandwaveError {
    pub fn detector(msg: impl Into<String>) -> Self {
        Self::Detector {
            message: msg.into(),
        }
    }

    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization {
            message: msg.into(),
        }
    }

    pub fn feed(msg: impl Into<String>) -> Self {
        Self::Feed {
            message: msg.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error must end the session rather than a single frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Initialization { .. } | Self::Config { .. })
    }
}
