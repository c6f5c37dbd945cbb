// Error types module

use thiserror::Error;

/// Centralized error taxonomy for a viewer load attempt
///
/// Each variant maps to one degradation path. No variant is fatal to the
/// viewer: the pipeline always ends in rendered pages or a textual message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ViewerError {
    /// Identity could not be established (network error, cancelled consent,
    /// malformed token). Degrades to the guest identity.
    #[error("Authentication error: {0}")]
    AuthFailure(String),

    /// The document store answered with a non-success status.
    #[error("Access denied (HTTP {status}) for document {file_id}")]
    AccessDenied { file_id: String, status: u16 },

    /// No complete HTTP response was obtained (connect, DNS, timeout, body).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Document bytes could not be parsed.
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    /// Progress or access-request notification could not be delivered.
    #[error("Logging failure: {0}")]
    Logging(String),

    /// Rasterizing or encoding a page failed.
    #[error("Render error: {0}")]
    Render(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading the fallback document or writing the viewer output failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The controller attempted a lifecycle step out of order.
    #[error("{0}")]
    InvalidTransition(String),
}

impl ViewerError {
    /// Whether a failed Drive fetch silently substitutes the fallback
    /// document instead of showing the denial flow.
    pub fn falls_back_to_sample(&self) -> bool {
        matches!(self, ViewerError::AuthFailure(_) | ViewerError::Transport(_))
    }
}

impl From<std::io::Error> for ViewerError {
    fn from(err: std::io::Error) -> Self {
        ViewerError::Io(err.to_string())
    }
}

impl From<crate::render::RenderError> for ViewerError {
    fn from(err: crate::render::RenderError) -> Self {
        match err {
            crate::render::RenderError::Parse(msg) => ViewerError::Parse(msg),
            other => ViewerError::Render(other.to_string()),
        }
    }
}

impl From<crate::viewer::TransitionError> for ViewerError {
    fn from(err: crate::viewer::TransitionError) -> Self {
        ViewerError::InvalidTransition(err.to_string())
    }
}

impl From<crate::watermark::WatermarkError> for ViewerError {
    fn from(err: crate::watermark::WatermarkError) -> Self {
        ViewerError::Render(err.to_string())
    }
}
