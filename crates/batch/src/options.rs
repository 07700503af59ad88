//! Batch configuration and render dispatch
//!
//! Callers describe what they want with loosely-typed form fields. This
//! module turns those into a validated plan: what kind of template was
//! uploaded, which rendering path to take and which file extension the
//! outputs get.

use crate::{BatchError, Result};
use serde::Deserialize;

/// What kind of template the caller uploaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Paginated PDF document
    Document,
    /// PNG or JPEG image
    RasterImage,
}

impl TemplateKind {
    /// Classify a template from its declared content type, falling back
    /// to magic bytes when the declaration is missing or generic.
    pub fn detect(data: &[u8], content_type: &str) -> Result<Self> {
        let declared = content_type.to_ascii_lowercase();
        if declared == "application/pdf" || data.starts_with(b"%PDF") {
            return Ok(Self::Document);
        }
        if declared.starts_with("image/") || looks_like_image(data) {
            return Ok(Self::RasterImage);
        }
        Err(BatchError::ConfigError(format!(
            "unsupported template type: {content_type}"
        )))
    }
}

fn looks_like_image(data: &[u8]) -> bool {
    data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) || data.starts_with(&[0xFF, 0xD8, 0xFF])
}

/// Requested output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pdf,
    Png,
}

impl OutputFormat {
    /// Tolerant parse of a form field, anything unrecognized means PDF.
    pub fn from_param(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            _ => Self::Pdf,
        }
    }
}

/// Requested rendering mode
///
/// `Auto` picks the natural path for the template kind. Forcing `Pdf`
/// only makes sense for document templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Auto,
    Image,
    Pdf,
}

impl Mode {
    pub fn from_param(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "image" => Self::Image,
            "pdf" => Self::Pdf,
            _ => Self::Auto,
        }
    }
}

/// Everything a batch render needs besides the template, font and rows
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    pub output_format: OutputFormat,
    pub mode: Mode,
    pub page_index: usize,
    pub x_rel: f32,
    pub y_rel: f32,
    pub color: String,
    pub font_size: f32,
    pub font_family: String,
    pub font_weight: u16,
    pub letter_spacing: f32,
    pub filename_prefix: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Pdf,
            mode: Mode::Auto,
            page_index: 0,
            x_rel: 0.5,
            y_rel: 0.5,
            color: "#000000".to_string(),
            font_size: 48.0,
            font_family: "sans-serif".to_string(),
            font_weight: 700,
            letter_spacing: 0.0,
            filename_prefix: "CERT_".to_string(),
        }
    }
}

/// The resolved rendering path for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPlan {
    /// Draw directly onto the PDF template
    Document,
    /// Draw onto the image, emit PNG
    RasterImage,
    /// Draw onto the image, wrap the PNG as a one-page PDF
    RasterWrapped,
}

impl RenderPlan {
    /// Pick the rendering path for a template kind, mode and output
    /// format. Document templates always render as documents no matter
    /// what mode or format was asked for.
    pub fn resolve(kind: TemplateKind, mode: Mode, output: OutputFormat) -> Result<Self> {
        match (kind, mode, output) {
            (TemplateKind::Document, _, _) => Ok(Self::Document),
            (TemplateKind::RasterImage, Mode::Pdf, _) => Err(BatchError::ConfigError(
                "mode 'pdf' requires a PDF template".to_string(),
            )),
            (TemplateKind::RasterImage, _, OutputFormat::Png) => Ok(Self::RasterImage),
            (TemplateKind::RasterImage, _, OutputFormat::Pdf) => Ok(Self::RasterWrapped),
        }
    }

    /// File extension for archive entries produced by this plan
    pub fn extension(self) -> &'static str {
        match self {
            Self::Document | Self::RasterWrapped => "pdf",
            Self::RasterImage => "png",
        }
    }
}
