// Fallback document shown when the requested one is unavailable

use crate::error::ViewerError;
use bytes::Bytes;
use std::path::PathBuf;

/// Sample PDF compiled into the binary.
pub const SAMPLE_PDF: &[u8] = include_bytes!("../../assets/sample.pdf");

#[derive(Debug, Clone, Default)]
pub struct FallbackDocument {
    path: Option<PathBuf>,
}

impl FallbackDocument {
    /// `path` replaces the bundled sample when set.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub async fn load(&self) -> Result<Bytes, ViewerError> {
        match &self.path {
            None => Ok(Bytes::from_static(SAMPLE_PDF)),
            Some(path) => tokio::fs::read(path).await.map(Bytes::from).map_err(|e| {
                ViewerError::Io(format!(
                    "Failed to read fallback document {}: {}",
                    path.display(),
                    e
                ))
            }),
        }
    }
}
