//! Tile placement for page watermarks.
//!
//! The page surface is divided into cells of a fixed pitch starting at the
//! origin. One stamp is centered in every cell whose origin lies inside the
//! surface, so the last row and column may overhang the surface edge.
//!
//! ```ignore
//! use pagewarden::watermark::position::{calculate_tile_centers, ImageDimensions, TilePitch};
//!
//! let page = ImageDimensions { width: 500, height: 300 };
//! let centers = calculate_tile_centers(&page, &TilePitch::new(240, 140));
//! assert_eq!(centers.len(), 3 * 3);
//! assert_eq!(centers[0], PlacementPosition::new(120, 70));
//! ```

/// Dimensions of the target surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Dimensions of a rendered stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkDimensions {
    pub width: u32,
    pub height: u32,
}

/// Cell size of the tiling grid in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePitch {
    pub x: u32,
    pub y: u32,
}

impl TilePitch {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A point on the surface; may be negative or beyond the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Number of stamps a surface receives: `ceil(W/px) * ceil(H/py)`.
///
/// Zero when either pitch component is zero.
pub fn tile_count(image: &ImageDimensions, pitch: &TilePitch) -> usize {
    if pitch.x == 0 || pitch.y == 0 {
        return 0;
    }
    let columns = image.width.div_ceil(pitch.x) as usize;
    let rows = image.height.div_ceil(pitch.y) as usize;
    columns * rows
}

/// Centers of every grid cell, row-major from the origin.
///
/// Cells start at `(0, 0)` and step by the pitch while the cell origin is
/// inside the surface.
pub fn calculate_tile_centers(image: &ImageDimensions, pitch: &TilePitch) -> Vec<PlacementPosition> {
    if pitch.x == 0 || pitch.y == 0 {
        return Vec::new();
    }

    let mut centers = Vec::with_capacity(tile_count(image, pitch));
    let half_x = (pitch.x / 2) as i32;
    let half_y = (pitch.y / 2) as i32;

    let mut y = 0u32;
    while y < image.height {
        let mut x = 0u32;
        while x < image.width {
            centers.push(PlacementPosition::new(x as i32 + half_x, y as i32 + half_y));
            x += pitch.x;
        }
        y += pitch.y;
    }

    centers
}

/// Top-left corner that centers a stamp on `center`.
pub fn origin_for_center(
    center: PlacementPosition,
    watermark: &WatermarkDimensions,
) -> PlacementPosition {
    PlacementPosition::new(
        center.x - (watermark.width / 2) as i32,
        center.y - (watermark.height / 2) as i32,
    )
}
