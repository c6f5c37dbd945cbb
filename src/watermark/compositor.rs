//! Watermark compositor for blending stamps onto page surfaces.
//!
//! A page receives one layer per grid cell; every layer shares the same
//! pre-rendered stamp. Layers that overhang the surface are clipped.

use super::position::{
    calculate_tile_centers, origin_for_center, ImageDimensions, PlacementPosition, TilePitch,
    WatermarkDimensions,
};
use image::{Rgba, RgbaImage};

/// A stamp placed at a position on the target surface.
#[derive(Clone, Copy)]
pub struct WatermarkLayer<'a> {
    pub image: &'a RgbaImage,
    /// Top-left corner of the stamp; may be negative.
    pub position: PlacementPosition,
    /// Extra opacity applied on top of the stamp's own alpha.
    pub opacity: f32,
}

impl std::fmt::Debug for WatermarkLayer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkLayer")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .field("position", &self.position)
            .field("opacity", &self.opacity)
            .finish()
    }
}

/// Ordered set of layers applied to one surface.
#[derive(Debug)]
pub struct Compositor<'a> {
    layers: Vec<WatermarkLayer<'a>>,
}

impl<'a> Compositor<'a> {
    /// Build one layer per grid cell, centering `stamp` in each cell.
    pub fn tiled(stamp: &'a RgbaImage, surface: &ImageDimensions, pitch: &TilePitch) -> Self {
        let dims = WatermarkDimensions {
            width: stamp.width(),
            height: stamp.height(),
        };
        let layers = calculate_tile_centers(surface, pitch)
            .into_iter()
            .map(|center| WatermarkLayer {
                image: stamp,
                position: origin_for_center(center, &dims),
                opacity: 1.0,
            })
            .collect();
        Self { layers }
    }

    /// Apply all layers in insertion order and return how many were drawn.
    pub fn apply(&self, target: &mut RgbaImage) -> usize {
        for layer in &self.layers {
            blend_layer(target, layer);
        }
        self.layers.len()
    }
}

/// Blend a single layer onto the target, clipped to the target bounds.
fn blend_layer(target: &mut RgbaImage, layer: &WatermarkLayer<'_>) {
    let target_width = target.width() as i32;
    let target_height = target.height() as i32;

    let x_start = layer.position.x.max(0);
    let y_start = layer.position.y.max(0);
    let x_end = (layer.position.x + layer.image.width() as i32).min(target_width);
    let y_end = (layer.position.y + layer.image.height() as i32).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let wx = (tx - layer.position.x) as u32;
            let wy = (ty - layer.position.y) as u32;

            let stamp_pixel = layer.image.get_pixel(wx, wy);
            if stamp_pixel[3] == 0 {
                continue;
            }
            let target_pixel = target.get_pixel(tx as u32, ty as u32);
            let blended = blend_pixels(*target_pixel, *stamp_pixel, layer.opacity);
            target.put_pixel(tx as u32, ty as u32, blended);
        }
    }
}

/// Porter-Duff "over" with an additional opacity on the foreground.
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    let bg_alpha = background[3] as f32 / 255.0;
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
