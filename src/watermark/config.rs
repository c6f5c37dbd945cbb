//! Watermark configuration types.
//!
//! A single tiled text stamp is applied to every rendered page. The stamp
//! text is either the reader's identity followed by a local timestamp, or a
//! fixed string supplied by configuration or the `wm` query override.
//!
//! ```yaml
//! watermark:
//!   font_size: 20
//!   color: "#000000"
//!   opacity: 0.22
//!   angle_radians: -0.35
//!   pitch_x: 240
//!   pitch_y: 140
//! ```

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

// Default values
fn default_font_size() -> f32 {
    20.0
}

fn default_color() -> String {
    "#000000".to_string()
}

fn default_opacity() -> f32 {
    0.22
}

fn default_angle_radians() -> f32 {
    -0.35
}

fn default_pitch_x() -> u32 {
    240
}

fn default_pitch_y() -> u32 {
    140
}

fn default_separator() -> String {
    "  |  ".to_string()
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

fn default_guest_label() -> String {
    "Guest".to_string()
}

/// Tiled text watermark configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatermarkConfig {
    /// Fixed stamp text. When absent the stamp is `{identity}{separator}{timestamp}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Stamp `text` verbatim, without `{{...}}` substitution. The `wm`
    /// override always sets this.
    #[serde(default)]
    pub literal: bool,

    /// Font size in pixels (default: 20)
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    /// Text color as hex string (default: "#000000")
    #[serde(default = "default_color")]
    pub color: String,

    /// Opacity from 0.0 (transparent) to 1.0 (opaque) (default: 0.22)
    #[serde(default = "default_opacity")]
    pub opacity: f32,

    /// Stamp rotation in radians; negative tilts the text upward to the right
    /// (default: -0.35)
    #[serde(default = "default_angle_radians")]
    pub angle_radians: f32,

    /// Horizontal cell pitch in pixels (default: 240)
    #[serde(default = "default_pitch_x")]
    pub pitch_x: u32,

    /// Vertical cell pitch in pixels (default: 140)
    #[serde(default = "default_pitch_y")]
    pub pitch_y: u32,

    /// Separator between identity and timestamp (default: "  |  ")
    #[serde(default = "default_separator")]
    pub separator: String,

    /// chrono format string for the local timestamp
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// Label used when no identity is known (default: "Guest")
    #[serde(default = "default_guest_label")]
    pub guest_label: String,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: None,
            literal: false,
            font_size: default_font_size(),
            color: default_color(),
            opacity: default_opacity(),
            angle_radians: default_angle_radians(),
            pitch_x: default_pitch_x(),
            pitch_y: default_pitch_y(),
            separator: default_separator(),
            timestamp_format: default_timestamp_format(),
            guest_label: default_guest_label(),
        }
    }
}

impl WatermarkConfig {
    /// Validate numeric ranges, the color string and the timestamp format.
    pub fn validate(&self) -> Result<(), String> {
        if self.pitch_x == 0 || self.pitch_y == 0 {
            return Err("watermark pitch must be greater than zero".to_string());
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(format!(
                "watermark opacity must be within 0.0..=1.0, got {}",
                self.opacity
            ));
        }
        if self.font_size <= 0.0 || !self.font_size.is_finite() {
            return Err(format!(
                "watermark font_size must be positive, got {}",
                self.font_size
            ));
        }
        if !self.angle_radians.is_finite() {
            return Err("watermark angle_radians must be finite".to_string());
        }
        super::text_renderer::parse_hex_color(&self.color).map_err(|e| e.to_string())?;
        // chrono panics when formatting with an unknown specifier
        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(format!(
                "watermark timestamp_format is not a valid strftime pattern: '{}'",
                self.timestamp_format
            ));
        }
        Ok(())
    }
}
