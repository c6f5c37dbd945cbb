//! Document source resolution.
//!
//! A configured source is one of: a Drive share URL or bare Drive file id
//! (fetched with the reader's bearer token), any other HTTP(S) URL or a local
//! path (loaded directly), or nothing at all (the fallback document).
//!
//! Drive fetch outcomes are classified strictly:
//!
//! | Outcome                                   | Resolution            |
//! |-------------------------------------------|-----------------------|
//! | no bearer token                           | fallback document     |
//! | any HTTP response with a non-2xx status   | [`Resolution::Denied`] |
//! | no complete response (connect, timeout..) | fallback document     |
//!
//! Transport errors are logged and never reach the reader.

pub mod fallback;

pub use fallback::{FallbackDocument, SAMPLE_PDF};

use crate::config::{DocumentConfig, EndpointsConfig};
use crate::error::ViewerError;
use bytes::Bytes;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

static DRIVE_ID_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn drive_id_pattern() -> Option<&'static Regex> {
    DRIVE_ID_PATTERN
        .get_or_init(|| Regex::new(r"[-\w]{25,}").ok())
        .as_ref()
}

/// Pull the Drive file id out of a share URL or a bare id.
pub fn extract_drive_file_id(reference: &str) -> Option<String> {
    drive_id_pattern()?
        .find(reference.trim())
        .map(|m| m.as_str().to_string())
}

fn is_drive_url(value: &str) -> bool {
    value.contains("drive.google.com") || value.contains("docs.google.com")
}

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLocation {
    /// Drive file fetched with the reader's bearer token
    Drive { file_id: String },
    /// HTTP(S) URL loaded without credentials
    Url(String),
    /// Local file
    Path(PathBuf),
    /// No source configured
    Fallback,
}

impl DocumentLocation {
    pub fn parse(source: &str) -> Self {
        let source = source.trim();
        if source.is_empty() {
            return DocumentLocation::Fallback;
        }

        let is_url = source.starts_with("http://") || source.starts_with("https://");
        if is_url && !is_drive_url(source) {
            return DocumentLocation::Url(source.to_string());
        }

        match extract_drive_file_id(source) {
            Some(file_id) if is_url || file_id == source => DocumentLocation::Drive { file_id },
            _ if is_url => DocumentLocation::Url(source.to_string()),
            _ => DocumentLocation::Path(PathBuf::from(source)),
        }
    }

    /// Drive file id, if this is a Drive document.
    pub fn file_id(&self) -> Option<&str> {
        match self {
            DocumentLocation::Drive { file_id } => Some(file_id),
            _ => None,
        }
    }

    /// Human-readable reference used in progress reports (`pdfUrl`).
    pub fn reference(&self) -> String {
        match self {
            DocumentLocation::Drive { file_id } => {
                format!("https://drive.google.com/file/d/{}/view", file_id)
            }
            DocumentLocation::Url(url) => url.clone(),
            DocumentLocation::Path(path) => path.display().to_string(),
            DocumentLocation::Fallback => "sample.pdf".to_string(),
        }
    }
}

/// Why the fallback document is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    NoSource,
    NoBearer,
    Transport,
    Requested,
}

/// Outcome of resolving a document source.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The requested document
    Loaded {
        location: DocumentLocation,
        bytes: Bytes,
    },
    /// The fallback document
    Fallback { reason: FallbackReason, bytes: Bytes },
    /// The document store refused the reader
    Denied { file_id: String, status: u16 },
}

/// Fetches documents from Drive, URLs or disk.
pub struct SourceResolver {
    client: reqwest::Client,
    documents_endpoint: String,
    fallback: FallbackDocument,
}

impl SourceResolver {
    pub fn new(document: &DocumentConfig, endpoints: &EndpointsConfig) -> Result<Self, ViewerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(document.fetch_timeout_seconds))
            .build()
            .map_err(|e| ViewerError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            documents_endpoint: endpoints.documents.trim_end_matches('/').to_string(),
            fallback: FallbackDocument::new(document.fallback_path.clone()),
        })
    }

    /// Load the fallback document.
    pub async fn load_fallback(&self, reason: FallbackReason) -> Result<Resolution, ViewerError> {
        let bytes = self.fallback.load().await?;
        tracing::info!(reason = ?reason, bytes = bytes.len(), "Loading fallback document");
        Ok(Resolution::Fallback { reason, bytes })
    }

    /// Resolve `location` for a reader holding `bearer`.
    ///
    /// Errors are limited to direct URL or path loads that fail and to an
    /// unreadable fallback; Drive failures always resolve.
    pub async fn resolve(
        &self,
        location: &DocumentLocation,
        bearer: Option<&str>,
    ) -> Result<Resolution, ViewerError> {
        match location {
            DocumentLocation::Fallback => self.load_fallback(FallbackReason::NoSource).await,
            DocumentLocation::Drive { file_id } => match bearer {
                None => self.load_fallback(FallbackReason::NoBearer).await,
                Some(bearer) => match self.fetch_drive(file_id, bearer).await {
                    Ok(bytes) => Ok(Resolution::Loaded {
                        location: location.clone(),
                        bytes,
                    }),
                    Err(e) if e.falls_back_to_sample() => {
                        tracing::warn!(file_id = %file_id, error = %e, "Document fetch failed, using fallback");
                        self.load_fallback(FallbackReason::Transport).await
                    }
                    Err(ViewerError::AccessDenied { file_id, status }) => {
                        tracing::warn!(file_id = %file_id, status = status, "Document access denied");
                        Ok(Resolution::Denied { file_id, status })
                    }
                    Err(e) => Err(e),
                },
            },
            DocumentLocation::Url(url) => {
                let bytes = self.fetch_url(url).await?;
                Ok(Resolution::Loaded {
                    location: location.clone(),
                    bytes,
                })
            }
            DocumentLocation::Path(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    ViewerError::Io(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Ok(Resolution::Loaded {
                    location: location.clone(),
                    bytes: Bytes::from(bytes),
                })
            }
        }
    }

    /// `GET {documents}/{file_id}?alt=media` with the bearer token.
    pub async fn fetch_drive(&self, file_id: &str, bearer: &str) -> Result<Bytes, ViewerError> {
        let url = format!(
            "{}/{}?alt=media",
            self.documents_endpoint,
            urlencoding::encode(file_id)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ViewerError::AccessDenied {
                file_id: file_id.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        tracing::debug!(file_id = %file_id, bytes = bytes.len(), "Fetched document");
        Ok(bytes)
    }

    async fn fetch_url(&self, url: &str) -> Result<Bytes, ViewerError> {
        let response = self.client.get(url).send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ViewerError::Transport(format!("HTTP {} from {}", status, url)));
        }

        response.bytes().await.map_err(transport_error)
    }
}

fn transport_error(e: reqwest::Error) -> ViewerError {
    if e.is_timeout() {
        ViewerError::Transport("Request timed out".to_string())
    } else if e.is_connect() {
        ViewerError::Transport(format!("Connection failed: {}", e))
    } else {
        ViewerError::Transport(format!("Request failed: {}", e))
    }
}
