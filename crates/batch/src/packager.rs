//! Batch rendering into a zip archive
//!
//! One template, many rows. The template and font are loaded once, each
//! row is rendered onto a fresh clone of the decoded template and the
//! results are collected into an in-memory zip.

use crate::options::{RenderOptions, RenderPlan, TemplateKind};
use crate::rows::Row;
use crate::slug::filename_base;
use crate::{BatchError, Result};
use render_core::{
    clamp01, png_to_single_page_pdf, Color, DocumentSurface, PdfFont, RasterFont, RasterSurface,
    TextStyle,
};
use std::collections::HashSet;
use std::io::Write;

/// Template and font decoded once for the whole batch
enum LoadedTemplate {
    Document { surface: DocumentSurface, font: PdfFont },
    RasterImage { surface: RasterSurface, font: RasterFont },
    RasterWrapped { surface: RasterSurface, font: RasterFont },
}

/// Render one certificate per row and pack them into a zip buffer.
///
/// Rows whose name cell is empty or whitespace are skipped without an
/// error. Filenames that collide after slugging get a numeric suffix so
/// no archive entry is ever overwritten.
pub fn render_archive(
    template: &[u8],
    content_type: &str,
    rows: &[Row],
    name_column: &str,
    options: &RenderOptions,
    font_bytes: Option<&[u8]>,
) -> Result<Vec<u8>> {
    if template.is_empty() {
        return Err(BatchError::ConfigError(
            "template file is required".to_string(),
        ));
    }
    if name_column.trim().is_empty() {
        return Err(BatchError::ConfigError("nameColumn is required".to_string()));
    }

    let kind = TemplateKind::detect(template, content_type)?;
    let plan = RenderPlan::resolve(kind, options.mode, options.output_format)?;

    let style = TextStyle {
        color: Color::from_hex(&options.color),
        font_size: options.font_size,
        letter_spacing: options.letter_spacing,
    };
    let x_rel = clamp01(options.x_rel);
    let y_rel = clamp01(options.y_rel);

    let mut loaded = match plan {
        RenderPlan::Document => LoadedTemplate::Document {
            surface: DocumentSurface::load(template)?,
            font: PdfFont::resolve(font_bytes, &options.font_family),
        },
        RenderPlan::RasterImage => LoadedTemplate::RasterImage {
            surface: RasterSurface::decode(template)?,
            font: RasterFont::resolve(font_bytes, &options.font_family, options.font_weight)?,
        },
        RenderPlan::RasterWrapped => LoadedTemplate::RasterWrapped {
            surface: RasterSurface::decode(template)?,
            font: RasterFont::resolve(font_bytes, &options.font_family, options.font_weight)?,
        },
    };

    let mut rendered = 0usize;
    let mut zip_data = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut zip_data));
        let zip_options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
        let mut used_names: HashSet<String> = HashSet::new();

        for row in rows {
            let Some(name) = row
                .get(name_column)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
            else {
                continue;
            };

            let bytes = match &mut loaded {
                LoadedTemplate::Document { surface, font } => {
                    let mut copy = surface.clone();
                    copy.draw_name(name, options.page_index, x_rel, y_rel, &style, font)?;
                    copy.to_bytes()?
                }
                LoadedTemplate::RasterImage { surface, font } => {
                    render_raster(surface, name, x_rel, y_rel, &style, font)?
                }
                LoadedTemplate::RasterWrapped { surface, font } => {
                    let png = render_raster(surface, name, x_rel, y_rel, &style, font)?;
                    png_to_single_page_pdf(&png)?
                }
            };

            let base = filename_base(&options.filename_prefix, name);
            let filename = unique_filename(&mut used_names, &base, plan.extension());
            zip.start_file(&filename, zip_options)?;
            zip.write_all(&bytes)?;
            rendered += 1;
        }

        zip.finish()?;
    }

    tracing::info!(rows = rows.len(), rendered, "batch render finished");
    Ok(zip_data)
}

fn render_raster(
    surface: &RasterSurface,
    name: &str,
    x_rel: f32,
    y_rel: f32,
    style: &TextStyle,
    font: &RasterFont,
) -> render_core::Result<Vec<u8>> {
    let mut copy = surface.clone();
    copy.draw_name(name, x_rel, y_rel, style, font);
    copy.to_png_bytes()
}

/// First free filename for a base: `base.ext`, then `base_2.ext` and up.
fn unique_filename(used: &mut HashSet<String>, base: &str, extension: &str) -> String {
    let mut candidate = format!("{base}.{extension}");
    let mut n = 1u32;
    while used.contains(&candidate) {
        n += 1;
        candidate = format!("{base}_{n}.{extension}");
    }
    used.insert(candidate.clone());
    candidate
}
