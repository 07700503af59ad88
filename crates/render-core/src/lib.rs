//! # render-core
//!
//! Low-level certificate rendering. A certificate template is either a
//! raster image (PNG/JPEG) or an existing PDF document; this crate draws a
//! recipient name onto either kind of surface and produces the finished
//! bytes.
//!
//! ## Features
//!
//! - Load PDF templates and draw centered, letter-spaced text with native
//!   PDF operators (embedded TrueType fonts or the builtin standard fonts)
//! - Decode raster templates and blend anti-aliased glyphs directly into
//!   the pixels
//! - Wrap a rendered raster image as a single-page PDF
//!
//! ## Example
//!
//! ```no_run
//! use render_core::{Color, DocumentSurface, PdfFont, TextStyle};
//!
//! # fn main() -> render_core::Result<()> {
//! let template = std::fs::read("certificate.pdf")?;
//! let mut doc = DocumentSurface::load(&template)?;
//! let mut font = PdfFont::resolve(None, "serif");
//! let style = TextStyle {
//!     color: Color::from_hex("#1a1a2e"),
//!     font_size: 48.0,
//!     letter_spacing: 0.0,
//! };
//! doc.draw_name("Alice Example", 0, 0.5, 0.62, &style, &mut font)?;
//! std::fs::write("out.pdf", doc.to_bytes()?)?;
//! # Ok(())
//! # }
//! ```

pub mod coords;
pub mod document;
pub mod font;
pub mod image;
pub mod layout;
pub mod raster;
pub mod text;

pub use coords::{clamp01, document_position, raster_position, Color};
pub use crate::image::{png_to_single_page_pdf, ImageFormat, ImageXObject};
pub use document::DocumentSurface;
pub use font::{BuiltinFont, FontData, PdfFont, RasterFont, CUSTOM_FONT_NAME};
pub use layout::GlyphMetrics;
pub use raster::{RasterSurface, DEFAULT_RASTER_HEIGHT, DEFAULT_RASTER_WIDTH};
pub use text::TextRenderContext;

use thiserror::Error;

/// Errors that can occur during rendering operations
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Font error: {0}")]
    FontError(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for render operations
pub type Result<T> = std::result::Result<T, RenderError>;

/// Style applied to one text drawing pass, shared by both surface kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub font_size: f32,
    pub letter_spacing: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: Color::black(),
            font_size: 48.0,
            letter_spacing: 0.0,
        }
    }
}
