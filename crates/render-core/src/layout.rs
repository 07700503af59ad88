//! Text measurement and glyph placement
//!
//! Both surface kinds measure text in their own units (points for PDF
//! pages, pixels for raster images) but share the same spacing and
//! centering rules, so the math lives here behind a small width trait.

/// Advance widths for a resolved font at a given size. The unit is
/// whatever the surface draws in; layout only adds and subtracts.
pub trait GlyphMetrics {
    /// Native advance width of a whole string, no extra spacing.
    fn text_advance(&self, text: &str, size: f32) -> f32;

    /// Native advance width of a single character.
    fn char_advance(&self, c: char, size: f32) -> f32;
}

/// Total width of a string including letter spacing. Spacing is inserted
/// between characters only, so the final glyph contributes no trailing
/// gap. An empty string measures zero.
pub fn text_width<F: GlyphMetrics + ?Sized>(
    font: &F,
    text: &str,
    size: f32,
    letter_spacing: f32,
) -> f32 {
    let native = font.text_advance(text, size);
    if letter_spacing == 0.0 {
        return native;
    }
    let count = text.chars().count();
    native + letter_spacing * count.saturating_sub(1) as f32
}

/// Per-character offsets from a zero origin, each glyph advancing by its
/// own width plus the letter spacing. Used when the surface has to place
/// one glyph at a time.
pub fn glyph_positions<F: GlyphMetrics + ?Sized>(
    font: &F,
    text: &str,
    size: f32,
    letter_spacing: f32,
) -> Vec<(char, f32)> {
    let mut positions = Vec::with_capacity(text.chars().count());
    let mut cursor = 0.0f32;
    for c in text.chars() {
        positions.push((c, cursor));
        cursor += font.char_advance(c, size) + letter_spacing;
    }
    positions
}

/// Left edge of text centered on an anchor point.
pub fn centered_start(anchor_x: f32, total_width: f32) -> f32 {
    anchor_x - total_width / 2.0
}
