//! Font handling for both surface kinds
//!
//! An uploaded TrueType file becomes a [`FontData`] and is embedded into
//! PDF output as a Type0 composite font with Identity-H encoding. When no
//! file is uploaded (or the upload cannot be parsed) the document surface
//! falls back to one of the builtin standard fonts, which need metrics but
//! no embedded program. The raster surface needs real outlines to draw
//! pixels, so its fallback probes well-known system font locations instead.

use crate::layout::GlyphMetrics;
use crate::{RenderError, Result};
use ab_glyph::{Font, ScaleFont};
use lopdf::{Dictionary, Object, Stream};
use std::collections::HashSet;
use std::path::PathBuf;

/// Identifier under which an uploaded font is registered. The caller's
/// family hint only matters for fallback selection; once a file embeds
/// successfully it is always addressed by this name.
pub const CUSTOM_FONT_NAME: &str = "CustomFont";

/// An uploaded TrueType font prepared for embedding
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font identifier, used as the PDF BaseFont name
    pub name: String,
    /// Raw TTF bytes
    data: Vec<u8>,
    /// Characters drawn so far, for width and ToUnicode tables
    used_chars: HashSet<char>,
    /// Parsed font face
    face: Option<ttf_parser::Face<'static>>,
}

/// PDF objects generated for font embedding
pub struct FontObjects {
    /// Type0 font dictionary
    pub type0_font: Dictionary,
    /// CIDFont Type2 dictionary
    pub cid_font: Dictionary,
    /// Font descriptor dictionary
    pub font_descriptor: Dictionary,
    /// Font file stream (TTF data)
    pub font_file_stream: Stream,
    /// ToUnicode CMap stream
    pub tounicode_stream: Stream,
}

impl FontData {
    /// Parse TTF bytes into font data ready for embedding.
    pub fn from_ttf(name: &str, ttf_data: &[u8]) -> Result<Self> {
        let data = ttf_data.to_vec();

        // The face borrows the byte buffer for its whole lifetime; fonts
        // live as long as the batch, so leaking one copy is fine.
        let static_data: &'static [u8] = Box::leak(data.clone().into_boxed_slice());

        let face = ttf_parser::Face::parse(static_data, 0)
            .map_err(|e| RenderError::FontParseError(format!("{e:?}")))?;

        Ok(Self {
            name: name.to_string(),
            data,
            used_chars: HashSet::new(),
            face: Some(face),
        })
    }

    /// Record characters about to be drawn so the width and ToUnicode
    /// tables cover them.
    pub fn add_chars(&mut self, text: &str) {
        for c in text.chars() {
            self.used_chars.insert(c);
        }
    }

    /// Glyph ID for a character
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.face
            .as_ref()
            .and_then(|face| face.glyph_index(c).map(|id| id.0))
    }

    /// Glyph advance width in font units
    pub fn glyph_advance(&self, c: char) -> Option<u16> {
        self.face.as_ref().and_then(|face| {
            let glyph_id = face.glyph_index(c)?;
            face.glyph_hor_advance(glyph_id)
        })
    }

    /// Font units per em
    pub fn units_per_em(&self) -> u16 {
        self.face
            .as_ref()
            .map(|face| face.units_per_em())
            .unwrap_or(1000)
    }

    /// Font ascender in font units
    pub fn ascender(&self) -> i16 {
        self.face
            .as_ref()
            .map(|face| face.ascender())
            .unwrap_or(800)
    }

    /// Font descender in font units
    pub fn descender(&self) -> i16 {
        self.face
            .as_ref()
            .map(|face| face.descender())
            .unwrap_or(-200)
    }

    /// Text width in font units
    pub fn text_width(&self, text: &str) -> u32 {
        text.chars()
            .filter_map(|c| self.glyph_advance(c))
            .map(|w| w as u32)
            .sum()
    }

    /// Text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        let width = self.text_width(text);
        let units_per_em = self.units_per_em() as f32;
        (width as f32 / units_per_em) * font_size
    }

    /// Single character width in points for a given font size
    pub fn char_width_points(&self, c: char, font_size: f32) -> f32 {
        let advance = self.glyph_advance(c).unwrap_or(0) as f32;
        (advance / self.units_per_em() as f32) * font_size
    }

    /// Generate all PDF objects needed to embed this font
    pub fn to_pdf_objects(&self) -> Result<FontObjects> {
        let font_name = Object::Name(self.name.clone().into());

        let tounicode_content = self.generate_tounicode_cmap();
        let tounicode_stream = Stream::new(
            Dictionary::from_iter(vec![
                ("Type", "CMap".into()),
                ("Length", (tounicode_content.len() as i32).into()),
            ]),
            tounicode_content.as_bytes().to_vec(),
        );

        let font_file_stream = Stream::new(
            Dictionary::from_iter(vec![
                ("Type", "FontDescriptor".into()),
                ("Subtype", "TrueType".into()),
                ("Length1", (self.data.len() as i32).into()),
            ]),
            self.data.clone(),
        );

        let units_per_em = self.units_per_em() as i32;
        let ascender = self.ascender();
        let descender = self.descender();

        let font_bbox = vec![
            0.into(),
            descender.into(),
            units_per_em.into(),
            ascender.into(),
        ];

        let font_descriptor = Dictionary::from_iter(vec![
            ("Type", "FontDescriptor".into()),
            ("FontName", font_name.clone()),
            ("Flags", 4.into()), // Symbolic font
            ("FontBBox", font_bbox.into()),
            ("ItalicAngle", 0.into()),
            ("Ascent", ascender.into()),
            ("Descent", descender.into()),
            ("CapHeight", ascender.into()),
            ("StemV", 80.into()),
            ("FontFile2", Object::Reference((0, 0))), // Set when embedding
        ]);

        let widths_array = self.generate_widths_array();

        let cid_system_info = Dictionary::from_iter(vec![
            ("Registry", "Adobe".into()),
            ("Ordering", "Identity".into()),
            ("Supplement", 0.into()),
        ]);

        let cid_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "CIDFontType2".into()),
            ("BaseFont", font_name.clone()),
            ("CIDSystemInfo", cid_system_info.into()),
            ("FontDescriptor", Object::Reference((0, 0))), // Set when embedding
            ("W", widths_array.into()),
            ("DW", 1000.into()),
        ]);

        let type0_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type0".into()),
            ("BaseFont", font_name),
            ("Encoding", "Identity-H".into()),
            ("DescendantFonts", vec![Object::Reference((0, 0))].into()), // Set when embedding
            ("ToUnicode", Object::Reference((0, 0))), // Set when embedding
        ]);

        Ok(FontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_stream,
            tounicode_stream,
        })
    }

    /// Encode text as a hex string for the PDF Tj operator. Identity-H
    /// encoding means the code values are raw glyph IDs.
    pub fn encode_text_hex(&self, text: &str) -> String {
        let mut result = String::new();
        for c in text.chars() {
            let gid = self.glyph_id(c).unwrap_or(0);
            result.push_str(&format!("{gid:04X}"));
        }
        format!("<{result}>")
    }

    /// Generate the /W array for glyph widths
    fn generate_widths_array(&self) -> Vec<Object> {
        let mut widths = Vec::new();
        let face = match &self.face {
            Some(f) => f,
            None => return widths,
        };

        let mut gids: Vec<u16> = self
            .used_chars
            .iter()
            .filter_map(|&c| self.glyph_id(c))
            .collect();
        gids.sort();
        gids.dedup();

        // Individual mapping format: [gid1 [width1] gid2 [width2] ...].
        // Less compact than ranges but correct for any GID distribution.
        for gid in gids {
            let glyph_id = ttf_parser::GlyphId(gid);
            let advance = face.glyph_hor_advance(glyph_id).unwrap_or(1000);
            widths.push(gid.into());
            widths.push(vec![advance.into()].into());
        }

        widths
    }

    /// Generate ToUnicode CMap stream content
    fn generate_tounicode_cmap(&self) -> String {
        let mut cmap = String::new();

        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");

        cmap.push_str("1 begincodespacerange\n");
        cmap.push_str("<0000> <FFFF>\n");
        cmap.push_str("endcodespacerange\n");

        let mut char_list: Vec<char> = self.used_chars.iter().copied().collect();
        char_list.sort_by_key(|c| *c as u32);

        if !char_list.is_empty() {
            // PDF spec recommends limiting bfchar sections to 100 entries
            for chunk in char_list.chunks(100) {
                cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
                for c in chunk {
                    let gid = self.glyph_id(*c).unwrap_or(0);
                    let unicode = *c as u32;
                    cmap.push_str(&format!("<{gid:04X}> <{unicode:04X}>\n"));
                }
                cmap.push_str("endbfchar\n");
            }
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\n");
        cmap.push_str("end\n");

        cmap
    }
}

/// Builtin standard fonts
///
/// These are the viewer-provided fonts every PDF reader ships. They carry
/// no font program, so widths come from the banded tables below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFont {
    Helvetica,
    TimesRoman,
    Courier,
}

impl BuiltinFont {
    /// PDF BaseFont name
    pub fn base_font(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::TimesRoman => "Times-Roman",
            Self::Courier => "Courier",
        }
    }

    /// Map a CSS-style family hint onto the closest standard font.
    pub fn from_family_hint(family: &str) -> Self {
        let fam = family.to_lowercase();
        if fam.contains("courier") || fam.contains("mono") {
            return Self::Courier;
        }
        // "sans-serif" contains "serif", so sans wins first
        if fam.contains("sans") {
            return Self::Helvetica;
        }
        if fam.contains("times") || fam.contains("serif") {
            return Self::TimesRoman;
        }
        Self::Helvetica
    }

    /// Character width in 1000-unit glyph space. Unmappable characters
    /// measure zero because the standard fonts cannot draw them.
    pub fn char_width_1000(&self, c: char) -> f32 {
        let byte = char_to_winansi(c);
        if byte < 32 {
            return 0.0;
        }
        match self {
            Self::Courier => 600.0,
            Self::Helvetica => helvetica_width(byte),
            Self::TimesRoman => times_width(byte),
        }
    }

    /// Single character width in points for a given font size
    pub fn char_width_points(&self, c: char, font_size: f32) -> f32 {
        self.char_width_1000(c) * font_size / 1000.0
    }

    /// Text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        text.chars()
            .map(|c| self.char_width_points(c, font_size))
            .sum()
    }

    /// Encode text as a PDF literal string in WinAnsi bytes. Delimiters
    /// are backslash-escaped and high bytes use octal escapes so the
    /// operator stream stays ASCII. Unmappable characters are dropped.
    pub fn encode_text_literal(&self, text: &str) -> String {
        let mut result = String::from("(");
        for c in text.chars() {
            let byte = char_to_winansi(c);
            match byte {
                0 => {}
                b'(' | b')' | b'\\' => {
                    result.push('\\');
                    result.push(byte as char);
                }
                0x20..=0x7E => result.push(byte as char),
                _ => result.push_str(&format!("\\{byte:03o}")),
            }
        }
        result.push(')');
        result
    }

    /// Font dictionary for page resources. Standard fonts are referenced
    /// by name only.
    pub fn to_font_dict(&self) -> Dictionary {
        Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type1".into()),
            ("BaseFont", Object::Name(self.base_font().into())),
            ("Encoding", "WinAnsiEncoding".into()),
        ])
    }
}

/// Approximate Helvetica advance widths at 1000 units per em, indexed by
/// WinAnsi byte.
fn helvetica_width(byte: u8) -> f32 {
    match byte {
        32 => 278.0,                          // space
        33..=47 => 333.0,                     // punctuation
        48..=57 => 556.0,                     // digits
        58..=64 => 333.0,                     // more punctuation
        73 | 74 => 278.0,                     // I J (narrow uppercase)
        77 => 833.0,                          // M (wide)
        65..=90 => 667.0,                     // uppercase A-Z (average)
        91..=96 => 333.0,                     // brackets etc.
        102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
        109 | 119 => 833.0,                   // m w (wide)
        97..=122 => 556.0,                    // lowercase a-z (average)
        _ => 556.0,
    }
}

/// Approximate Times-Roman advance widths at 1000 units per em.
fn times_width(byte: u8) -> f32 {
    match byte {
        32 => 250.0,
        33..=47 => 333.0,
        48..=57 => 500.0,
        58..=64 => 333.0,
        73 | 74 => 333.0,
        77 => 889.0,
        65..=90 => 667.0,
        91..=96 => 333.0,
        102 | 105 | 106 | 108 | 116 => 278.0,
        109 | 119 => 722.0,
        97..=122 => 500.0,
        _ => 500.0,
    }
}

/// Map a single Unicode char to its WinAnsi (Windows-1252) byte, or 0 if
/// unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007F => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// A font resolved for the document surface
#[derive(Debug, Clone)]
pub enum PdfFont {
    /// Uploaded TrueType font, embedded into the output
    Embedded(FontData),
    /// Viewer-provided standard font
    Builtin(BuiltinFont),
}

impl PdfFont {
    /// Resolve uploaded font bytes or a family hint into a usable font.
    ///
    /// A bad upload never fails the batch: it logs a warning and falls
    /// back to Helvetica, so every certificate still renders.
    pub fn resolve(font_bytes: Option<&[u8]>, family_hint: &str) -> Self {
        match font_bytes {
            Some(data) if !data.is_empty() => {
                match FontData::from_ttf(CUSTOM_FONT_NAME, data) {
                    Ok(font) => Self::Embedded(font),
                    Err(e) => {
                        tracing::warn!(
                            "uploaded font could not be parsed, using Helvetica: {e}"
                        );
                        Self::Builtin(BuiltinFont::Helvetica)
                    }
                }
            }
            _ => Self::Builtin(BuiltinFont::from_family_hint(family_hint)),
        }
    }

    /// Encode text as a show-text token for the Tj operator.
    pub fn encode_text(&self, text: &str) -> String {
        match self {
            Self::Embedded(font) => font.encode_text_hex(text),
            Self::Builtin(font) => font.encode_text_literal(text),
        }
    }
}

impl GlyphMetrics for PdfFont {
    fn text_advance(&self, text: &str, size: f32) -> f32 {
        match self {
            Self::Embedded(font) => font.text_width_points(text, size),
            Self::Builtin(font) => font.text_width_points(text, size),
        }
    }

    fn char_advance(&self, c: char, size: f32) -> f32 {
        match self {
            Self::Embedded(font) => font.char_width_points(c, size),
            Self::Builtin(font) => font.char_width_points(c, size),
        }
    }
}

/// A font resolved for the raster surface
pub struct RasterFont {
    font: ab_glyph::FontVec,
}

impl RasterFont {
    /// Resolve uploaded font bytes or a family hint into outlines for
    /// pixel drawing.
    ///
    /// As on the document surface a bad upload only warns before falling
    /// back, but here the fallback needs an actual font file; a machine
    /// with no usable system font is an error.
    pub fn resolve(font_bytes: Option<&[u8]>, family_hint: &str, weight: u16) -> Result<Self> {
        if let Some(data) = font_bytes {
            if !data.is_empty() {
                match ab_glyph::FontVec::try_from_vec(data.to_vec()) {
                    Ok(font) => return Ok(Self { font }),
                    Err(e) => {
                        tracing::warn!(
                            "uploaded font could not be parsed, using a system font: {e}"
                        );
                    }
                }
            }
        }

        let path = system_font_path(family_hint, weight).ok_or_else(|| {
            RenderError::FontError("no usable system font for raster text".to_string())
        })?;
        let data = std::fs::read(&path)?;
        let font = ab_glyph::FontVec::try_from_vec(data)
            .map_err(|e| RenderError::FontParseError(format!("{}: {e}", path.display())))?;
        Ok(Self { font })
    }

    /// The underlying outline font
    pub fn font(&self) -> &ab_glyph::FontVec {
        &self.font
    }
}

impl GlyphMetrics for RasterFont {
    fn text_advance(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.char_advance(c, size)).sum()
    }

    fn char_advance(&self, c: char, size: f32) -> f32 {
        let scaled = self.font.as_scaled(ab_glyph::PxScale::from(size));
        scaled.h_advance(scaled.glyph_id(c))
    }
}

/// Probe well-known system font locations for the family hint, preferring
/// the Liberation faces and falling back to DejaVu. Bold candidates are
/// tried first when the requested weight is 600 or more.
fn system_font_path(family_hint: &str, weight: u16) -> Option<PathBuf> {
    const LIBERATION: &str = "/usr/share/fonts/truetype/liberation";
    const DEJAVU: &str = "/usr/share/fonts/truetype/dejavu";

    let fam = family_hint.to_lowercase();
    let bold = weight >= 600;

    let mut candidates: Vec<String> = Vec::new();
    if fam.contains("courier") || fam.contains("mono") {
        if bold {
            candidates.push(format!("{LIBERATION}/LiberationMono-Bold.ttf"));
            candidates.push(format!("{DEJAVU}/DejaVuSansMono-Bold.ttf"));
        }
        candidates.push(format!("{LIBERATION}/LiberationMono-Regular.ttf"));
        candidates.push(format!("{DEJAVU}/DejaVuSansMono.ttf"));
    } else if !fam.contains("sans") && (fam.contains("times") || fam.contains("serif")) {
        if bold {
            candidates.push(format!("{LIBERATION}/LiberationSerif-Bold.ttf"));
            candidates.push(format!("{DEJAVU}/DejaVuSerif-Bold.ttf"));
        }
        candidates.push(format!("{LIBERATION}/LiberationSerif-Regular.ttf"));
        candidates.push(format!("{DEJAVU}/DejaVuSerif.ttf"));
    } else {
        if bold {
            candidates.push(format!("{LIBERATION}/LiberationSans-Bold.ttf"));
            candidates.push(format!("{DEJAVU}/DejaVuSans-Bold.ttf"));
        }
        candidates.push(format!("{LIBERATION}/LiberationSans-Regular.ttf"));
        candidates.push(format!("{DEJAVU}/DejaVuSans.ttf"));
    }

    candidates
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}
