//! Text operator generation for the document surface
//!
//! Builds raw content-stream operators. Positions arrive already mapped to
//! PDF user space; encoding (hex for embedded fonts, literal strings for
//! builtin fonts) happens in the font layer, so this module only assembles
//! the BT/ET blocks.

use crate::coords::Color;

/// Context for rendering text runs
#[derive(Debug, Clone)]
pub struct TextRenderContext {
    /// Resource name of the font on the target page (e.g. "F1")
    pub font_resource: String,
    /// Font size in points
    pub font_size: f32,
    /// Fill color
    pub color: Color,
}

/// Generate operators for one positioned text run.
///
/// `encoded` must already be a valid show-text token, either `<hex>` or
/// `(literal)`.
pub fn generate_text_operators(
    encoded: &str,
    x: f32,
    y: f32,
    ctx: &TextRenderContext,
) -> Vec<u8> {
    let mut operations = String::new();

    operations.push_str("BT\n");
    operations.push_str(&format!(
        "{} {} {} rg\n",
        ctx.color.r, ctx.color.g, ctx.color.b
    ));
    operations.push_str(&format!("/{} {} Tf\n", ctx.font_resource, ctx.font_size));
    operations.push_str(&format!("{x} {y} Td\n"));
    operations.push_str(&format!("{encoded} Tj\n"));
    operations.push_str("ET\n");

    operations.into_bytes()
}

/// Generate operators for a sequence of individually positioned runs on a
/// shared baseline. Used for letter-spaced text, where every character is
/// placed at its own x offset.
pub fn generate_positioned_runs(
    runs: &[(String, f32)],
    baseline_y: f32,
    ctx: &TextRenderContext,
) -> Vec<u8> {
    let mut operations = Vec::new();
    for (encoded, x) in runs {
        operations.extend_from_slice(&generate_text_operators(encoded, *x, baseline_y, ctx));
    }
    operations
}
