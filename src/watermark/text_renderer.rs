//! Stamp text rendering.
//!
//! Renders the watermark text once into a transparent RGBA stamp which the
//! compositor then tiles across each page surface. Rotation follows the
//! canvas convention: positive angles turn clockwise on a y-down surface, so
//! the default `-0.35` rad tilts the text upward to the right.
//!
//! The font is DejaVu Sans, embedded in the binary, so stamps render the same
//! on every host.

use super::WatermarkError;
use ab_glyph::{Font, FontRef, GlyphId, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::sync::OnceLock;

const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");

static DEFAULT_FONT: OnceLock<Result<FontRef<'static>, String>> = OnceLock::new();

fn default_font() -> Result<&'static FontRef<'static>, WatermarkError> {
    DEFAULT_FONT
        .get_or_init(|| FontRef::try_from_slice(EMBEDDED_FONT_DATA).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| WatermarkError::FontError(e.clone()))
}

/// RGB color parsed from a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }
}

/// Options for rendering one stamp.
#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    pub text: String,
    /// Font size in pixels.
    pub font_size: f32,
    pub color: Color,
    /// Opacity (0.0 to 1.0), baked into the stamp's alpha channel.
    pub opacity: f32,
    /// Rotation in radians, canvas convention. None means upright.
    pub rotation_radians: Option<f32>,
}

impl Default for TextRenderOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 20.0,
            color: Color::black(),
            opacity: 0.22,
            rotation_radians: None,
        }
    }
}

/// Parse `#RGB` or `#RRGGBB` into a [`Color`].
pub fn parse_hex_color(hex: &str) -> Result<Color, WatermarkError> {
    let digits = hex
        .strip_prefix('#')
        .ok_or_else(|| WatermarkError::ConfigError("Color must start with '#'".to_string()))?;

    let channel = |s: &str| {
        u8::from_str_radix(s, 16)
            .map_err(|_| WatermarkError::ConfigError(format!("Invalid hex digits '{}'", s)))
    };

    match digits.len() {
        // Each short digit doubles: 0xF -> 0xFF
        3 => Ok(Color::new(
            channel(&digits[0..1])? * 17,
            channel(&digits[1..2])? * 17,
            channel(&digits[2..3])? * 17,
        )),
        6 => Ok(Color::new(
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        )),
        n => Err(WatermarkError::ConfigError(format!(
            "Color must be #RGB or #RRGGBB format, got {} characters",
            n
        ))),
    }
}

fn advance_width<F: Font>(font: &ab_glyph::PxScaleFont<&F>, text: &str) -> f32 {
    let mut width = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    for c in text.chars() {
        let id = font.glyph_id(c);
        if let Some(prev) = prev {
            width += font.kern(prev, id);
        }
        width += font.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Width and height in pixels of the upright text, including a small padding.
pub fn measure_text(text: &str, font_size: f32) -> Result<(u32, u32), WatermarkError> {
    let font = default_font()?;
    let scaled = font.as_scaled(PxScale::from(font_size));

    let padding = 2;
    Ok((
        advance_width(&scaled, text).ceil() as u32 + padding,
        scaled.height().ceil() as u32 + padding,
    ))
}

/// Render the stamp to a transparent RGBA image.
///
/// With a rotation the returned image is the rotated bounding box, and the
/// text's center coincides with the image center.
pub fn render_text(options: &TextRenderOptions) -> Result<RgbaImage, WatermarkError> {
    if options.text.is_empty() {
        return Err(WatermarkError::RenderError(
            "Cannot render empty text".to_string(),
        ));
    }

    let font = default_font()?;
    let scale = PxScale::from(options.font_size);
    let scaled = font.as_scaled(scale);

    let (width, height) = measure_text(&options.text, options.font_size)?;
    let mut image = RgbaImage::new(width.max(1), height.max(1));

    let alpha = options.opacity.clamp(0.0, 1.0) * 255.0;
    let baseline_y = 1.0 + scaled.ascent();
    let mut cursor_x = 1.0f32;
    let mut prev: Option<GlyphId> = None;

    for c in options.text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            cursor_x += scaled.kern(prev, id);
        }

        let glyph = id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
                    return;
                }
                let top = Rgba([
                    options.color.r,
                    options.color.g,
                    options.color.b,
                    (coverage * alpha) as u8,
                ]);
                let existing = *image.get_pixel(x as u32, y as u32);
                image.put_pixel(x as u32, y as u32, over(existing, top));
            });
        }

        cursor_x += scaled.h_advance(id);
        prev = Some(id);
    }

    match options.rotation_radians {
        Some(radians) if radians != 0.0 => Ok(rotate_image(&image, radians)),
        _ => Ok(image),
    }
}

/// Porter-Duff "over" of two straight-alpha pixels.
fn over(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let top_alpha = top[3] as f32 / 255.0;
    let bottom_alpha = bottom[3] as f32 / 255.0;
    let out_alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |t: u8, b: u8| -> u8 {
        let value = (t as f32 * top_alpha + b as f32 * bottom_alpha * (1.0 - top_alpha)) / out_alpha;
        value.clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(top[0], bottom[0]),
        channel(top[1], bottom[1]),
        channel(top[2], bottom[2]),
        (out_alpha * 255.0) as u8,
    ])
}

/// Rotate about the image center into a canvas sized to the rotated bounds.
///
/// Sampling is bilinear over the inverse rotation.
fn rotate_image(image: &RgbaImage, radians: f32) -> RgbaImage {
    let (sin, cos) = radians.sin_cos();
    let src_w = image.width() as f32;
    let src_h = image.height() as f32;

    let dst_w = (src_w * cos.abs() + src_h * sin.abs()).ceil().max(1.0) as u32;
    let dst_h = (src_w * sin.abs() + src_h * cos.abs()).ceil().max(1.0) as u32;
    let mut rotated = RgbaImage::new(dst_w, dst_h);

    let (src_cx, src_cy) = (src_w / 2.0, src_h / 2.0);
    let (dst_cx, dst_cy) = (dst_w as f32 / 2.0, dst_h as f32 / 2.0);

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let rx = dx as f32 + 0.5 - dst_cx;
            let ry = dy as f32 + 0.5 - dst_cy;

            let sx = rx * cos + ry * sin + src_cx - 0.5;
            let sy = -rx * sin + ry * cos + src_cy - 0.5;

            if sx < 0.0 || sy < 0.0 || sx >= src_w - 1.0 || sy >= src_h - 1.0 {
                continue;
            }

            let x0 = sx.floor() as u32;
            let y0 = sy.floor() as u32;
            let fx = sx - x0 as f32;
            let fy = sy - y0 as f32;

            let p00 = image.get_pixel(x0, y0);
            let p10 = image.get_pixel(x0 + 1, y0);
            let p01 = image.get_pixel(x0, y0 + 1);
            let p11 = image.get_pixel(x0 + 1, y0 + 1);

            let sample = |c: usize| -> u8 {
                let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
                    + p10[c] as f32 * fx * (1.0 - fy)
                    + p01[c] as f32 * (1.0 - fx) * fy
                    + p11[c] as f32 * fx * fy;
                v.clamp(0.0, 255.0) as u8
            };

            rotated.put_pixel(dx, dy, Rgba([sample(0), sample(1), sample(2), sample(3)]));
        }
    }

    rotated
}
