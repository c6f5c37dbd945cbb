//! Tiled text watermarks for rendered pages.
//!
//! Every rendered page is stamped exactly once with a rotated,
//! semi-transparent line of text repeated in a fixed-pitch grid. The stamp
//! carries the reader's identity and a local timestamp so that a leaked
//! screenshot can be traced back to a session.
//!
//! # Configuration Example
//!
//! ```yaml
//! watermark:
//!   opacity: 0.22
//!   angle_radians: -0.35
//!   pitch_x: 240
//!   pitch_y: 140
//! ```
//!
//! The "exactly once" rule is carried by the types: [`Watermarker::apply`]
//! consumes a [`RenderedPage`] and returns a [`WatermarkedPage`], which has no
//! way back to an unstamped surface.

pub mod compositor;
pub mod config;
pub mod error;
pub mod position;
pub mod template;
pub mod text_renderer;

pub use compositor::{Compositor, WatermarkLayer};
pub use config::WatermarkConfig;
pub use error::WatermarkError;
pub use position::{
    calculate_tile_centers, tile_count, ImageDimensions, PlacementPosition, TilePitch,
    WatermarkDimensions,
};
pub use template::{resolve_stamp_text, StampContext};
pub use text_renderer::{measure_text, parse_hex_color, render_text, Color, TextRenderOptions};

use crate::render::RenderedPage;
use image::RgbaImage;

/// A page surface that has received its watermark.
#[derive(Debug)]
pub struct WatermarkedPage {
    /// 1-based page index.
    pub index: u32,
    pub surface: RgbaImage,
    /// Number of stamps drawn on the surface.
    pub tiles: usize,
    /// Text that was stamped.
    pub text: String,
}

/// Stamps pages according to a [`WatermarkConfig`].
#[derive(Debug, Clone)]
pub struct Watermarker {
    config: WatermarkConfig,
    color: Color,
}

impl Watermarker {
    pub fn new(config: WatermarkConfig) -> Result<Self, WatermarkError> {
        config.validate().map_err(WatermarkError::ConfigError)?;
        let color = parse_hex_color(&config.color)?;
        Ok(Self { config, color })
    }

    pub fn pitch(&self) -> TilePitch {
        TilePitch::new(self.config.pitch_x, self.config.pitch_y)
    }

    /// Render the rotated stamp image for `text`.
    pub fn render_stamp(&self, text: &str) -> Result<RgbaImage, WatermarkError> {
        render_text(&TextRenderOptions {
            text: text.to_string(),
            font_size: self.config.font_size,
            color: self.color,
            opacity: self.config.opacity,
            rotation_radians: Some(self.config.angle_radians),
        })
    }

    /// Tile `stamp` over `surface` and return the number of stamps drawn.
    pub fn stamp_surface(&self, surface: &mut RgbaImage, stamp: &RgbaImage) -> usize {
        let dims = ImageDimensions {
            width: surface.width(),
            height: surface.height(),
        };
        Compositor::tiled(stamp, &dims, &self.pitch()).apply(surface)
    }

    /// Stamp a freshly rendered page.
    pub fn apply(
        &self,
        page: RenderedPage,
        context: &StampContext<'_>,
    ) -> Result<WatermarkedPage, WatermarkError> {
        let text = resolve_stamp_text(&self.config, context);
        let stamp = self.render_stamp(&text)?;

        let RenderedPage { index, mut surface } = page;
        let tiles = self.stamp_surface(&mut surface, &stamp);

        tracing::debug!(page = index, tiles = tiles, "Watermark applied");

        Ok(WatermarkedPage {
            index,
            surface,
            tiles,
            text,
        })
    }
}
