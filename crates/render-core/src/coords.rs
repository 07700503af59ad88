//! Coordinate mapping and colors
//!
//! Callers express positions as fractions of the surface size measured from
//! the top-left corner. Raster surfaces share that origin, so the mapping is
//! a plain scale. PDF pages put the origin at the bottom-left, so the
//! document mapping flips the Y axis exactly once here; nothing downstream
//! flips again.

/// Clamp a position fraction to the unit range. NaN maps to zero.
pub fn clamp01(v: f32) -> f32 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

/// Absolute pixel position on a top-left-origin raster surface.
pub fn raster_position(x_rel: f32, y_rel: f32, width: f32, height: f32) -> (f32, f32) {
    (clamp01(x_rel) * width, clamp01(y_rel) * height)
}

/// Absolute point position on a bottom-left-origin document page.
pub fn document_position(x_rel: f32, y_rel: f32, width: f32, height: f32) -> (f32, f32) {
    (clamp01(x_rel) * width, height * (1.0 - clamp01(y_rel)))
}

/// RGB color with components in range 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new color with RGB components (0.0-1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create a color from 8-bit RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Parse a `#RRGGBB` or `#RGB` hex color. Anything malformed falls
    /// back to black rather than failing the render.
    pub fn from_hex(hex: &str) -> Self {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return Self::black();
        }
        let expanded: String = match digits.len() {
            6 => digits.to_string(),
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            _ => return Self::black(),
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16);
        match (channel(0), channel(2), channel(4)) {
            (Ok(r), Ok(g), Ok(b)) => Self::from_rgb(r, g, b),
            _ => Self::black(),
        }
    }

    /// 8-bit channels for raster drawing.
    pub fn to_rgb8(self) -> [u8; 3] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
        ]
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// White color
    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}
