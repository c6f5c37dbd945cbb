//! Watermark error types.

use std::fmt;

/// Errors that can occur while stamping a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkError {
    /// The embedded font could not be loaded
    FontError(String),

    /// Failed to render the stamp text
    RenderError(String),

    /// Invalid configuration (color, pitch, opacity)
    ConfigError(String),
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FontError(msg) => write!(f, "Failed to load watermark font: {}", msg),
            Self::RenderError(msg) => write!(f, "Failed to render text watermark: {}", msg),
            Self::ConfigError(msg) => write!(f, "Watermark configuration error: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {}
