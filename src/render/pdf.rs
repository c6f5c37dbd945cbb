//! hayro-backed document engine (pure Rust, no external renderer process).

use super::{Document, DocumentEngine, PageSize, RenderError};
use bytes::Bytes;
use hayro::{render, Pdf, RenderSettings};
use hayro_interpret::InterpreterSettings;
use image::{ImageFormat, RgbaImage};
use std::sync::Arc;

/// Parses documents with hayro.
#[derive(Debug, Clone, Copy, Default)]
pub struct HayroEngine;

impl DocumentEngine for HayroEngine {
    fn open(&self, bytes: Bytes) -> Result<Arc<dyn Document>, RenderError> {
        let data = Arc::new(bytes.to_vec());
        let pdf = Pdf::new(data.clone()).map_err(|e| RenderError::Parse(format!("{:?}", e)))?;

        let sizes = pdf
            .pages()
            .iter()
            .map(|page| {
                let (width, height) = page.render_dimensions();
                PageSize::new(width, height)
            })
            .collect::<Vec<_>>();

        tracing::debug!(pages = sizes.len(), bytes = data.len(), "Parsed PDF");

        Ok(Arc::new(HayroDocument { data, sizes }))
    }
}

/// Parsed document. hayro pages borrow from their `Pdf`, so each render
/// re-opens the shared bytes; the cross-reference parse is cheap next to
/// rasterization.
struct HayroDocument {
    data: Arc<Vec<u8>>,
    sizes: Vec<PageSize>,
}

impl Document for HayroDocument {
    fn page_count(&self) -> u32 {
        self.sizes.len() as u32
    }

    fn page_size(&self, index: u32) -> Result<PageSize, RenderError> {
        index
            .checked_sub(1)
            .and_then(|i| self.sizes.get(i as usize))
            .copied()
            .ok_or(RenderError::PageOutOfRange {
                index,
                count: self.page_count(),
            })
    }

    fn rasterize(&self, index: u32, zoom: f32) -> Result<RgbaImage, RenderError> {
        let page_error = |message: String| RenderError::Page { index, message };

        let pdf = Pdf::new(self.data.clone()).map_err(|e| RenderError::Parse(format!("{:?}", e)))?;
        let pages = pdf.pages();
        let page = pages
            .iter()
            .nth(index.saturating_sub(1) as usize)
            .ok_or(RenderError::PageOutOfRange {
                index,
                count: self.page_count(),
            })?;

        let render_settings = RenderSettings {
            x_scale: zoom,
            y_scale: zoom,
            ..Default::default()
        };
        let pixmap = render(page, &InterpreterSettings::default(), &render_settings);

        let png = pixmap.take_png();
        let image = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .map_err(|e| page_error(format!("PNG decoding failed: {}", e)))?;

        Ok(image.to_rgba8())
    }
}
