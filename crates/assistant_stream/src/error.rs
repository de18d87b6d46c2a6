use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("chat id is required")]
    MissingChatId,

    #[error("message is required")]
    MissingMessage,

    #[error("invalid authorization header")]
    InvalidToken,

    #[error("conversation request failed: HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("conversation request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("conversation request timed out after {0:?}")]
    Timeout(Duration),

    #[error("conversation stream interrupted: {0}")]
    Body(#[source] reqwest::Error),
}

impl StreamError {
    /// Server errors and transport failures before the body starts.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Status { status, .. } => *status >= 500,
            StreamError::Transport(_) | StreamError::Timeout(_) => true,
            _ => false,
        }
    }
}
