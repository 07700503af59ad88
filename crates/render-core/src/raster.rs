//! Raster-surface rendering
//!
//! Decodes an image template, blends anti-aliased glyphs straight into the
//! pixels and encodes the result as PNG. Coordinate math uses dimensions
//! from a cheap header probe; when the header cannot be read the surface
//! falls back to a fixed default canvas size, while a template that fails
//! full decoding is a hard error.

use crate::coords::raster_position;
use crate::font::RasterFont;
use crate::image::get_dimensions;
use crate::layout;
use crate::{RenderError, Result, TextStyle};
use ab_glyph::{point, Font, PxScale, ScaleFont};
use std::io::Cursor;

/// Canvas width assumed when the template header is unreadable
pub const DEFAULT_RASTER_WIDTH: u32 = 2000;
/// Canvas height assumed when the template header is unreadable
pub const DEFAULT_RASTER_HEIGHT: u32 = 1414;

/// A decoded raster template ready for text drawing
#[derive(Debug, Clone)]
pub struct RasterSurface {
    image: image::RgbaImage,
    width: u32,
    height: u32,
}

impl RasterSurface {
    /// Decode template bytes.
    ///
    /// Dimensions for coordinate math come from the file header so they are
    /// available even when the probe and the decoder disagree; an
    /// unreadable header only warns, an undecodable image fails.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (width, height) = match get_dimensions(data) {
            Ok(dims) => (dims.width, dims.height),
            Err(e) => {
                tracing::warn!("template header unreadable, using default canvas size: {e}");
                (DEFAULT_RASTER_WIDTH, DEFAULT_RASTER_HEIGHT)
            }
        };

        let decoded = image::load_from_memory(data)
            .map_err(|e| RenderError::ImageError(format!("template decode failed: {e}")))?;

        Ok(Self {
            image: decoded.to_rgba8(),
            width,
            height,
        })
    }

    /// Width used for coordinate math
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height used for coordinate math
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Draw a name centered on the anchor point, blending glyph coverage
    /// onto the template pixels. The anchor marks the optical middle of
    /// the text, so the baseline shifts by half the em span.
    pub fn draw_name(
        &mut self,
        text: &str,
        x_rel: f32,
        y_rel: f32,
        style: &TextStyle,
        font: &RasterFont,
    ) {
        if text.is_empty() {
            return;
        }

        let (anchor_x, anchor_y) =
            raster_position(x_rel, y_rel, self.width as f32, self.height as f32);

        let total_width = layout::text_width(font, text, style.font_size, style.letter_spacing);
        let start_x = layout::centered_start(anchor_x, total_width);

        let scaled = font.font().as_scaled(PxScale::from(style.font_size));
        let baseline_y = anchor_y + (scaled.ascent() + scaled.descent()) / 2.0;

        let color = style.color.to_rgb8();
        let (img_width, img_height) = self.image.dimensions();
        let image = &mut self.image;

        let mut caret_x = start_x;
        for c in text.chars() {
            let mut glyph = scaled.scaled_glyph(c);
            glyph.position = point(caret_x, baseline_y);
            let advance = scaled.h_advance(glyph.id);

            if let Some(outlined) = scaled.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let px = gx as i32 + bounds.min.x as i32;
                    let py = gy as i32 + bounds.min.y as i32;
                    if px < 0 || py < 0 {
                        return;
                    }
                    let (px, py) = (px as u32, py as u32);
                    if px >= img_width || py >= img_height {
                        return;
                    }
                    let sa = coverage.clamp(0.0, 1.0);
                    if sa == 0.0 {
                        return;
                    }
                    let inv = 1.0 - sa;
                    let dst = image.get_pixel_mut(px, py);
                    dst.0[0] = (color[0] as f32 * sa + dst.0[0] as f32 * inv) as u8;
                    dst.0[1] = (color[1] as f32 * sa + dst.0[1] as f32 * inv) as u8;
                    dst.0[2] = (color[2] as f32 * sa + dst.0[2] as f32 * inv) as u8;
                    dst.0[3] = dst.0[3].max((sa * 255.0) as u8);
                });
            }

            caret_x += advance + style.letter_spacing;
        }
    }

    /// Encode the composited surface as PNG
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buffer, image::ImageFormat::Png)
            .map_err(|e| RenderError::ImageError(e.to_string()))?;
        Ok(buffer.into_inner())
    }
}
