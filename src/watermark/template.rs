//! Stamp text resolution.
//!
//! Without a fixed text the stamp reads `{identity}{separator}{timestamp}`,
//! with the guest label standing in for an unknown identity. A fixed text
//! (config `watermark.text` or the `wm` query override) may reference:
//!
//! - `{{email}}` - reader identity, or the guest label
//! - `{{date}}` - local date (YYYY-MM-DD)
//! - `{{datetime}}` - local timestamp in the configured format
//! - `{{timestamp}}` - Unix timestamp
//!
//! Unknown variables are left untouched. Text marked `literal` is stamped
//! as given.

use super::config::WatermarkConfig;
use chrono::{DateTime, Local};
use regex::Regex;
use std::sync::OnceLock;

static TEMPLATE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn template_pattern() -> Option<&'static Regex> {
    TEMPLATE_PATTERN
        .get_or_init(|| Regex::new(r"\{\{\s*([a-z]+)\s*\}\}").ok())
        .as_ref()
}

/// Values available to the stamp text.
#[derive(Debug, Clone)]
pub struct StampContext<'a> {
    pub identity: Option<&'a str>,
    pub now: DateTime<Local>,
}

impl<'a> StampContext<'a> {
    pub fn new(identity: Option<&'a str>) -> Self {
        Self {
            identity,
            now: Local::now(),
        }
    }

    pub fn at(identity: Option<&'a str>, now: DateTime<Local>) -> Self {
        Self { identity, now }
    }
}

/// Produce the text stamped onto one page.
pub fn resolve_stamp_text(config: &WatermarkConfig, context: &StampContext<'_>) -> String {
    let identity = context
        .identity
        .filter(|s| !s.is_empty())
        .unwrap_or(&config.guest_label);
    let datetime = context.now.format(&config.timestamp_format).to_string();

    let Some(fixed) = config.text.as_deref() else {
        return format!("{}{}{}", identity, config.separator, datetime);
    };
    if config.literal {
        return fixed.to_string();
    }

    let Some(pattern) = template_pattern() else {
        return fixed.to_string();
    };

    pattern
        .replace_all(fixed, |caps: &regex::Captures| match &caps[1] {
            "email" => identity.to_string(),
            "date" => context.now.format("%Y-%m-%d").to_string(),
            "datetime" => datetime.clone(),
            "timestamp" => context.now.timestamp().to_string(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}
