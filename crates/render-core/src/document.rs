//! Document-surface rendering
//!
//! Wraps a loaded PDF template. Drawing a name embeds (or references) the
//! resolved font on the target page, appends text operators to the page's
//! content stream and leaves everything else in the file untouched.
//! Surfaces are cheap to clone, so batch callers render each copy onto its
//! own clone of the pristine template.

use crate::coords::document_position;
use crate::font::{FontData, FontObjects, PdfFont};
use crate::layout;
use crate::text::{self, TextRenderContext};
use crate::{RenderError, Result, TextStyle};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// A loaded PDF template
#[derive(Debug, Clone)]
pub struct DocumentSurface {
    inner: Document,
}

impl DocumentSurface {
    /// Load a PDF template from memory.
    pub fn load(data: &[u8]) -> Result<Self> {
        let inner =
            Document::load_mem(data).map_err(|e| RenderError::OpenError(e.to_string()))?;
        if inner.get_pages().is_empty() {
            return Err(RenderError::OpenError("document has no pages".to_string()));
        }
        Ok(Self { inner })
    }

    /// Number of pages in the template
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Clamp a zero-based requested index into the valid range and return
    /// the one-based page number used internally. An index past the last
    /// page lands on the last page rather than failing.
    pub fn clamp_page_index(&self, index: usize) -> u32 {
        let count = self.page_count();
        (index.min(count - 1) + 1) as u32
    }

    /// Page size in points, from the inherited MediaBox.
    pub fn page_size(&self, page: u32) -> Result<(f32, f32)> {
        let page_id = self.page_id(page)?;
        let media_box = self.get_inherited_media_box(page_id)?;
        extract_box_size(&media_box)
    }

    /// Draw a name centered on the anchor point of the given page.
    ///
    /// The anchor y lands roughly on the optical middle of the text, so
    /// the baseline sits half the font size below the mapped point. With
    /// letter spacing each character becomes its own positioned run;
    /// without it the whole name is a single run.
    pub fn draw_name(
        &mut self,
        text: &str,
        page_index: usize,
        x_rel: f32,
        y_rel: f32,
        style: &TextStyle,
        font: &mut PdfFont,
    ) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        let page = self.clamp_page_index(page_index);
        let (page_width, page_height) = self.page_size(page)?;
        let (anchor_x, anchor_y) = document_position(x_rel, y_rel, page_width, page_height);

        let total_width = layout::text_width(font, text, style.font_size, style.letter_spacing);
        let start_x = layout::centered_start(anchor_x, total_width);
        let baseline_y = anchor_y - style.font_size / 2.0;

        let font_resource = self.register_font(page, font, text)?;
        let ctx = TextRenderContext {
            font_resource,
            font_size: style.font_size,
            color: style.color,
        };

        let operators = if style.letter_spacing == 0.0 {
            text::generate_text_operators(&font.encode_text(text), start_x, baseline_y, &ctx)
        } else {
            let runs: Vec<(String, f32)> =
                layout::glyph_positions(font, text, style.font_size, style.letter_spacing)
                    .into_iter()
                    .map(|(c, offset)| (font.encode_text(&c.to_string()), start_x + offset))
                    .collect();
            text::generate_positioned_runs(&runs, baseline_y, &ctx)
        };

        self.append_to_content_stream(page, &operators)
    }

    /// Serialize the document.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| RenderError::SaveError(e.to_string()))?;
        Ok(buffer)
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.inner
            .get_pages()
            .get(&page)
            .copied()
            .ok_or_else(|| RenderError::ParseError(format!("page {page} not found")))
    }

    /// Get MediaBox, following the parent inheritance chain if needed.
    fn get_inherited_media_box(&self, page_id: ObjectId) -> Result<Vec<Object>> {
        let mut current_id = page_id;

        // Follow parent chain up to 10 levels (safety limit)
        for _ in 0..10 {
            let obj = self.inner.get_object(current_id)?;
            let dict = obj.as_dict().map_err(|_| {
                RenderError::ParseError("Object is not a dictionary".to_string())
            })?;

            if let Ok(media_box) = dict.get(b"MediaBox").or_else(|_| dict.get(b"CropBox")) {
                let media_box_array = match media_box {
                    Object::Array(arr) => arr.clone(),
                    Object::Reference(ref_id) => {
                        let referred = self.inner.get_object(*ref_id)?;
                        referred
                            .as_array()
                            .map_err(|_| {
                                RenderError::ParseError(
                                    "MediaBox reference is not an array".to_string(),
                                )
                            })?
                            .clone()
                    }
                    _ => {
                        return Err(RenderError::ParseError(
                            "MediaBox is not an array".to_string(),
                        ))
                    }
                };
                return Ok(media_box_array);
            }

            if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
                current_id = *parent_id;
                continue;
            }

            break;
        }

        // Fallback: assume A4 page size
        Ok(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(595.28),
            Object::Real(841.89),
        ])
    }

    /// Embed the font (or reference a builtin one) and register it in the
    /// page's font resources, returning the chosen resource name.
    fn register_font(&mut self, page: u32, font: &mut PdfFont, text: &str) -> Result<String> {
        let font_id = match font {
            PdfFont::Embedded(data) => {
                data.add_chars(text);
                self.embed_font_object(data)?
            }
            PdfFont::Builtin(builtin) => self.inner.add_object(builtin.to_font_dict()),
        };
        self.add_font_to_page_resources(page, font_id)
    }

    /// Add all objects for an embedded Type0 font and wire up the
    /// cross-references between them.
    fn embed_font_object(&mut self, font: &FontData) -> Result<ObjectId> {
        let FontObjects {
            mut type0_font,
            mut cid_font,
            mut font_descriptor,
            font_file_stream,
            tounicode_stream,
        } = font.to_pdf_objects()?;

        let font_file_id = self.inner.add_object(font_file_stream);
        font_descriptor.set("FontFile2", Object::Reference(font_file_id));
        let descriptor_id = self.inner.add_object(font_descriptor);

        cid_font.set("FontDescriptor", Object::Reference(descriptor_id));
        let cid_font_id = self.inner.add_object(cid_font);

        let tounicode_id = self.inner.add_object(tounicode_stream);
        type0_font.set(
            "DescendantFonts",
            Object::Array(vec![Object::Reference(cid_font_id)]),
        );
        type0_font.set("ToUnicode", Object::Reference(tounicode_id));

        Ok(self.inner.add_object(type0_font))
    }

    /// Register a font object in the page's Resources, picking a resource
    /// name the template does not already use.
    fn add_font_to_page_resources(&mut self, page: u32, font_id: ObjectId) -> Result<String> {
        let page_id = self.page_id(page)?;

        let page_dict = self
            .inner
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| RenderError::ParseError("Page object is not a dictionary".to_string()))?
            .clone();

        let mut resources = match page_dict.get(b"Resources") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(Object::Reference(ref_id)) => self
                .inner
                .get_object(*ref_id)?
                .as_dict()
                .map(|d| d.clone())
                .unwrap_or_else(|_| Dictionary::new()),
            _ => Dictionary::new(),
        };

        let mut font_dict = match resources.get(b"Font") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(Object::Reference(ref_id)) => self
                .inner
                .get_object(*ref_id)?
                .as_dict()
                .map(|d| d.clone())
                .unwrap_or_else(|_| Dictionary::new()),
            _ => Dictionary::new(),
        };

        let mut n = 1;
        let resource_name = loop {
            let candidate = format!("F{n}");
            if !font_dict.has(candidate.as_bytes()) {
                break candidate;
            }
            n += 1;
        };

        font_dict.set(resource_name.as_bytes(), Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(font_dict));

        let mut new_page_dict = page_dict;
        new_page_dict.set("Resources", Object::Dictionary(resources));
        self.inner.objects.insert(page_id, new_page_dict.into());

        Ok(resource_name)
    }

    /// Append operators to a page's content stream, preserving whatever
    /// content the template already draws there.
    fn append_to_content_stream(&mut self, page: u32, content: &[u8]) -> Result<()> {
        let page_id = self.page_id(page)?;

        let (existing_content, page_dict_clone) = {
            let page_obj = self.inner.get_object(page_id)?;
            let page_dict = page_obj.as_dict().map_err(|_| {
                RenderError::ParseError("Page object is not a dictionary".to_string())
            })?;

            let page_dict_clone = page_dict.clone();

            let existing_content = match page_dict.get(b"Contents") {
                Ok(contents) => match contents {
                    Object::Stream(stream) => stream
                        .decompressed_content()
                        .unwrap_or_else(|_| stream.content.clone()),
                    Object::Reference(ref_id) => {
                        if let Ok(Object::Stream(stream)) = self.inner.get_object(*ref_id) {
                            stream
                                .decompressed_content()
                                .unwrap_or_else(|_| stream.content.clone())
                        } else {
                            Vec::new()
                        }
                    }
                    Object::Array(arr) => {
                        // Concatenate an array of streams or references
                        let mut combined = Vec::new();
                        for obj in arr {
                            match obj {
                                Object::Reference(ref_id) => {
                                    if let Ok(Object::Stream(stream)) =
                                        self.inner.get_object(*ref_id)
                                    {
                                        let data = stream
                                            .decompressed_content()
                                            .unwrap_or_else(|_| stream.content.clone());
                                        combined.extend_from_slice(&data);
                                    }
                                }
                                Object::Stream(stream) => {
                                    let data = stream
                                        .decompressed_content()
                                        .unwrap_or_else(|_| stream.content.clone());
                                    combined.extend_from_slice(&data);
                                }
                                _ => {}
                            }
                        }
                        combined
                    }
                    _ => Vec::new(),
                },
                Err(_) => Vec::new(),
            };

            (existing_content, page_dict_clone)
        };

        let mut new_content = existing_content;
        // Operator streams need whitespace between the template's last
        // operator and ours
        if !new_content.is_empty() && !new_content.ends_with(b"\n") {
            new_content.push(b'\n');
        }
        new_content.extend_from_slice(content);

        let new_stream = Stream::new(Dictionary::new(), new_content);
        let stream_id = self.inner.add_object(new_stream);

        let mut new_page_dict = page_dict_clone;
        new_page_dict.set(b"Contents", Object::Reference(stream_id));
        self.inner.objects.insert(page_id, new_page_dict.into());

        Ok(())
    }
}

/// Width and height from a box array, accepting integer or real entries.
fn extract_box_size(box_array: &[Object]) -> Result<(f32, f32)> {
    if box_array.len() < 4 {
        return Err(RenderError::ParseError("Invalid MediaBox format".to_string()));
    }

    let value = |obj: &Object| -> Result<f32> {
        obj.as_f32()
            .ok()
            .or_else(|| obj.as_i64().ok().map(|v| v as f32))
            .ok_or_else(|| RenderError::ParseError("Invalid MediaBox value".to_string()))
    };

    let x1 = value(&box_array[0])?;
    let y1 = value(&box_array[1])?;
    let x2 = value(&box_array[2])?;
    let y2 = value(&box_array[3])?;

    Ok((x2 - x1, y2 - y1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_box_size_real_values() {
        let media_box = vec![
            Object::Real(0.0),
            Object::Real(0.0),
            Object::Real(595.28),
            Object::Real(841.89),
        ];
        let (w, h) = extract_box_size(&media_box).unwrap();
        assert_eq!(w, 595.28);
        assert_eq!(h, 841.89);
    }

    #[test]
    fn test_box_size_mixed_integer_and_real() {
        let media_box = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(612.0),
            Object::Integer(792),
        ];
        let (w, h) = extract_box_size(&media_box).unwrap();
        assert_eq!(w, 612.0);
        assert_eq!(h, 792.0);
    }

    #[test]
    fn test_box_size_offset_origin() {
        let media_box = vec![
            Object::Integer(10),
            Object::Integer(20),
            Object::Integer(410),
            Object::Integer(320),
        ];
        let (w, h) = extract_box_size(&media_box).unwrap();
        assert_eq!(w, 400.0);
        assert_eq!(h, 300.0);
    }

    #[test]
    fn test_box_size_too_short() {
        let media_box = vec![Object::Integer(0), Object::Integer(0)];
        assert!(extract_box_size(&media_box).is_err());
    }
}
