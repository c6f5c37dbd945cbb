//! Page rasterization.
//!
//! Parsing and drawing are delegated to a [`DocumentEngine`]; the default is
//! the pure-Rust hayro renderer in [`pdf`]. A parsed document is wrapped in a
//! [`DocumentHandle`], which hands out per-page render operations that run on
//! tokio's blocking pool so pages can complete in any order.
//!
//! Every page surface is sized `round(native_w * zoom)` x
//! `round(native_h * zoom)` regardless of how the engine rounds internally.

pub mod pdf;

pub use pdf::HayroEngine;

use bytes::Bytes;
use image::{Rgba, RgbaImage};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while parsing or drawing a document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Failed to render page {index}: {message}")]
    Page { index: u32, message: String },

    #[error("Page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: u32, count: u32 },

    #[error("Render task failed: {0}")]
    Task(String),
}

/// Native page size in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Pixel size of the surface at `zoom`.
    pub fn surface_size(&self, zoom: f32) -> (u32, u32) {
        (
            (self.width * zoom).round().max(1.0) as u32,
            (self.height * zoom).round().max(1.0) as u32,
        )
    }
}

/// A parsed multi-page document.
#[cfg_attr(test, mockall::automock)]
pub trait Document: Send + Sync {
    fn page_count(&self) -> u32;

    /// Native size of a 1-based page.
    fn page_size(&self, index: u32) -> Result<PageSize, RenderError>;

    /// Rasterize a 1-based page at `zoom`.
    fn rasterize(&self, index: u32, zoom: f32) -> Result<RgbaImage, RenderError>;
}

/// Parses raw bytes into a [`Document`].
pub trait DocumentEngine: Send + Sync {
    fn open(&self, bytes: Bytes) -> Result<Arc<dyn Document>, RenderError>;
}

/// A rasterized page that has not been watermarked yet.
#[derive(Debug)]
pub struct RenderedPage {
    /// 1-based page index.
    pub index: u32,
    pub surface: RgbaImage,
}

/// Owning reference to a parsed document.
#[derive(Clone)]
pub struct DocumentHandle {
    document: Arc<dyn Document>,
    page_count: u32,
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("page_count", &self.page_count)
            .finish()
    }
}

impl DocumentHandle {
    /// Parse `bytes` with `engine`. Documents without pages are a parse failure.
    pub fn open(engine: &dyn DocumentEngine, bytes: Bytes) -> Result<Self, RenderError> {
        let document = engine.open(bytes)?;
        Self::from_document(document)
    }

    pub fn from_document(document: Arc<dyn Document>) -> Result<Self, RenderError> {
        let page_count = document.page_count();
        if page_count == 0 {
            return Err(RenderError::Parse("document has no pages".to_string()));
        }
        Ok(Self {
            document,
            page_count,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Page indices in document order.
    pub fn page_indices(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.page_count
    }

    /// Render one page on the blocking pool.
    pub async fn render_page(&self, index: u32, zoom: f32) -> Result<RenderedPage, RenderError> {
        if index == 0 || index > self.page_count {
            return Err(RenderError::PageOutOfRange {
                index,
                count: self.page_count,
            });
        }

        let document = Arc::clone(&self.document);
        tokio::task::spawn_blocking(move || render_blocking(document.as_ref(), index, zoom))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))?
    }
}

fn render_blocking(
    document: &dyn Document,
    index: u32,
    zoom: f32,
) -> Result<RenderedPage, RenderError> {
    let (width, height) = document.page_size(index)?.surface_size(zoom);
    let raster = document.rasterize(index, zoom)?;
    Ok(RenderedPage {
        index,
        surface: fit_surface(raster, width, height),
    })
}

/// Place `raster` on a white surface of exactly `width` x `height`.
fn fit_surface(raster: RgbaImage, width: u32, height: u32) -> RgbaImage {
    if raster.dimensions() == (width, height) {
        return raster;
    }
    let mut surface = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut surface, &raster, 0, 0);
    surface
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_size_rounds() {
        let letter = PageSize::new(612.0, 792.0);
        assert_eq!(letter.surface_size(1.2), (734, 950));
        assert_eq!(letter.surface_size(1.3), (796, 1030));

        let a4 = PageSize::new(595.28, 841.89);
        assert_eq!(a4.surface_size(1.2), (714, 1010));
    }

    #[test]
    fn test_fit_surface_pads_short_raster() {
        let raster = RgbaImage::from_pixel(733, 949, Rgba([0, 0, 0, 255]));
        let surface = fit_surface(raster, 734, 950);
        assert_eq!(surface.dimensions(), (734, 950));
        assert_eq!(*surface.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*surface.get_pixel(733, 949), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_fit_surface_crops_long_raster() {
        let raster = RgbaImage::from_pixel(800, 1000, Rgba([0, 0, 0, 255]));
        assert_eq!(fit_surface(raster, 734, 950).dimensions(), (734, 950));
    }

    #[test]
    fn test_zero_page_document_is_parse_failure() {
        let mut document = MockDocument::new();
        document.expect_page_count().return_const(0u32);

        let result = DocumentHandle::from_document(Arc::new(document));
        assert!(matches!(result, Err(RenderError::Parse(_))));
    }

    #[tokio::test]
    async fn test_render_page_uses_rounded_surface_size() {
        let mut document = MockDocument::new();
        document.expect_page_count().return_const(3u32);
        document
            .expect_page_size()
            .returning(|_| Ok(PageSize::new(612.0, 792.0)));
        document
            .expect_rasterize()
            .returning(|_, _| Ok(RgbaImage::new(734, 950)));

        let handle = DocumentHandle::from_document(Arc::new(document)).unwrap();
        let page = handle.render_page(2, 1.2).await.unwrap();
        assert_eq!(page.index, 2);
        assert_eq!(page.surface.dimensions(), (734, 950));
    }

    #[tokio::test]
    async fn test_render_page_out_of_range() {
        let mut document = MockDocument::new();
        document.expect_page_count().return_const(2u32);

        let handle = DocumentHandle::from_document(Arc::new(document)).unwrap();
        assert_eq!(
            handle.render_page(0, 1.2).await.unwrap_err(),
            RenderError::PageOutOfRange { index: 0, count: 2 }
        );
        assert_eq!(
            handle.render_page(3, 1.2).await.unwrap_err(),
            RenderError::PageOutOfRange { index: 3, count: 2 }
        );
    }
}
