// Configuration module

pub mod overrides;

pub use overrides::QueryOverrides;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::watermark::WatermarkConfig;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Environment variable '{0}' is referenced but not set")]
    MissingEnv(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub protection: ProtectionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_scope() -> String {
    "https://www.googleapis.com/auth/drive.readonly openid email".to_string()
}

fn default_authorization_endpoint() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_endpoint() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_userinfo_endpoint() -> String {
    "https://openidconnect.googleapis.com/v1/userinfo".to_string()
}

fn default_identity_timeout() -> u64 {
    10
}

/// OAuth client settings for the identity flows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// OAuth client id
    #[serde(default)]
    pub client_id: String,

    /// Client secret, needed only for the authorization-code exchange
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Where the identity provider sends the reader back after consent
    #[serde(default)]
    pub redirect_uri: String,

    /// Requested scopes (default: Drive read-only plus openid email)
    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default = "default_authorization_endpoint")]
    pub authorization_endpoint: String,

    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,

    #[serde(default = "default_userinfo_endpoint")]
    pub userinfo_endpoint: String,

    /// Timeout for token exchange and userinfo calls in seconds (default: 10)
    #[serde(default = "default_identity_timeout")]
    pub timeout_seconds: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            redirect_uri: String::new(),
            scope: default_scope(),
            authorization_endpoint: default_authorization_endpoint(),
            token_endpoint: default_token_endpoint(),
            userinfo_endpoint: default_userinfo_endpoint(),
            timeout_seconds: default_identity_timeout(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    30
}

/// Which document to show and what to fall back to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Drive share URL, bare Drive file id, HTTP(S) URL or local path.
    /// Empty means "show the fallback document".
    #[serde(default)]
    pub source: String,

    /// Replaces the bundled sample PDF when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_path: Option<PathBuf>,

    /// Ask the script endpoint for an access decision before fetching
    #[serde(default)]
    pub access_check: bool,

    /// Timeout for fetching document bytes in seconds (default: 30)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            fallback_path: None,
            access_check: false,
            fetch_timeout_seconds: default_fetch_timeout(),
        }
    }
}

fn default_documents_endpoint() -> String {
    "https://www.googleapis.com/drive/v3/files".to_string()
}

fn default_endpoint_timeout() -> u64 {
    10
}

/// Remote endpoints for document bytes and the access/logging script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Base of `GET {documents}/{fileId}?alt=media`
    #[serde(default = "default_documents_endpoint")]
    pub documents: String,

    /// Script endpoint handling checkAccess, requestAccess and progress posts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Timeout for script endpoint calls in seconds (default: 10)
    #[serde(default = "default_endpoint_timeout")]
    pub timeout_seconds: u64,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            documents: default_documents_endpoint(),
            script: None,
            timeout_seconds: default_endpoint_timeout(),
        }
    }
}

fn default_zoom() -> f32 {
    1.2
}

fn default_max_concurrent_pages() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Scale factor applied to native page size (default: 1.2)
    #[serde(default = "default_zoom")]
    pub zoom: f32,

    /// Pages rendered, stamped and encoded at the same time
    /// (default: available CPUs)
    #[serde(default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            zoom: default_zoom(),
            max_concurrent_pages: default_max_concurrent_pages(),
        }
    }
}

/// Name of the page counter in progress payloads
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PageField {
    #[default]
    PagesRead,
    PageViewed,
}

/// How progress payloads refer to the document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentReference {
    #[default]
    FileId,
    PdfUrl,
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Send progress reports to the script endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Pending reports kept before new ones are dropped (default: 64)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub page_field: PageField,

    #[serde(default)]
    pub reference: DocumentReference,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: default_queue_capacity(),
            page_field: PageField::default(),
            reference: DocumentReference::default(),
        }
    }
}

fn default_blocked_keys() -> Vec<char> {
    vec!['c', 'x', 's', 'p']
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Keys suppressed when pressed with Ctrl or Meta (default: c, x, s, p)
    #[serde(default = "default_blocked_keys")]
    pub blocked_keys: Vec<char>,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blocked_keys: default_blocked_keys(),
        }
    }
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("viewer")
}

fn default_title() -> String {
    "Document Viewer".to_string()
}

fn default_ad_slot_text() -> Option<String> {
    Some("Ad Placeholder".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving page images and index.html (default: ./viewer)
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    #[serde(default = "default_title")]
    pub title: String,

    /// Placeholder text after each page; null disables ad slots
    #[serde(default = "default_ad_slot_text")]
    pub ad_slot_text: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            title: default_title(),
            ad_slot_text: default_ad_slot_text(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; RUST_LOG takes precedence (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, ConfigError> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            if std::env::var(var_name).is_err() {
                return Err(ConfigError::MissingEnv(var_name.to_string()));
            }
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        // An empty document deserializes to null; treat it as all defaults
        if substituted.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !self.render.zoom.is_finite() || self.render.zoom <= 0.0 || self.render.zoom > 8.0 {
            return invalid(format!(
                "render.zoom must be within (0, 8], got {}",
                self.render.zoom
            ));
        }

        if !is_http_url(&self.endpoints.documents) {
            return invalid(format!(
                "endpoints.documents must be an http(s) URL, got '{}'",
                self.endpoints.documents
            ));
        }

        if let Some(script) = &self.endpoints.script {
            if !is_http_url(script) {
                return invalid(format!(
                    "endpoints.script must be an http(s) URL, got '{}'",
                    script
                ));
            }
        }

        for (name, url) in [
            ("identity.authorization_endpoint", &self.identity.authorization_endpoint),
            ("identity.token_endpoint", &self.identity.token_endpoint),
            ("identity.userinfo_endpoint", &self.identity.userinfo_endpoint),
        ] {
            if !is_http_url(url) {
                return invalid(format!("{} must be an http(s) URL, got '{}'", name, url));
            }
        }

        if self.document.access_check && self.endpoints.script.is_none() {
            return invalid("document.access_check requires endpoints.script".to_string());
        }

        if self.render.max_concurrent_pages == 0 {
            return invalid("render.max_concurrent_pages must be greater than zero".to_string());
        }

        if self.progress.queue_capacity == 0 {
            return invalid("progress.queue_capacity must be greater than zero".to_string());
        }

        if let Some(key) = self
            .protection
            .blocked_keys
            .iter()
            .find(|k| !k.is_ascii_alphanumeric())
        {
            return invalid(format!(
                "protection.blocked_keys must be ASCII letters or digits, got '{}'",
                key
            ));
        }

        self.watermark.validate().map_err(ConfigError::Invalid)?;

        Ok(())
    }

    /// Fold query-parameter overrides into this configuration.
    ///
    /// `pdf` replaces the document source and `wm` the watermark text, which
    /// is then stamped literally. The identity parameters are consumed by the
    /// identity flows instead.
    pub fn apply_overrides(&mut self, overrides: &QueryOverrides) {
        if let Some(pdf) = &overrides.pdf {
            self.document.source = pdf.clone();
        }
        if let Some(wm) = &overrides.wm {
            self.watermark.text = Some(wm.clone());
            self.watermark.literal = true;
        }
    }
}
