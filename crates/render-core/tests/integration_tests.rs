//! Integration tests for render-core
//!
//! These tests verify end-to-end rendering against real PDF documents
//! built with lopdf.

use lopdf::dictionary;
use render_core::{DocumentSurface, PdfFont, TextStyle};

/// Create a minimal valid PDF for testing
///
/// This creates a simple one-page PDF with the given dimensions.
fn create_test_pdf(width: f32, height: f32) -> Vec<u8> {
    let mut doc = lopdf::Document::new();

    let pages_id = doc.add_object(lopdf::Object::Dictionary(dictionary! {
        "Type" => "Pages",
        "Count" => 1,
        "Kids" => vec![], // Will be updated below
    }));

    let contents_id = doc.add_object(lopdf::Object::Stream(lopdf::Stream::new(
        dictionary! {},
        vec![],
    )));

    let page_id = doc.add_object(lopdf::Object::Dictionary(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Resources" => dictionary! {},
        "Contents" => contents_id,
    }));

    let mut pages_dict = doc.get_object(pages_id).unwrap().as_dict().unwrap().clone();
    pages_dict.set("Kids", lopdf::Object::Array(vec![page_id.into()]));
    doc.objects.insert(pages_id, pages_dict.into());

    let catalog_id = doc.add_object(lopdf::Object::Dictionary(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    }));

    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Create a PDF whose single page has no MediaBox anywhere in the tree
fn create_test_pdf_without_media_box() -> Vec<u8> {
    let mut doc = lopdf::Document::new();

    let pages_id = doc.add_object(lopdf::Object::Dictionary(dictionary! {
        "Type" => "Pages",
        "Count" => 1,
        "Kids" => vec![],
    }));

    let page_id = doc.add_object(lopdf::Object::Dictionary(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Resources" => dictionary! {},
    }));

    let mut pages_dict = doc.get_object(pages_id).unwrap().as_dict().unwrap().clone();
    pages_dict.set("Kids", lopdf::Object::Array(vec![page_id.into()]));
    doc.objects.insert(pages_id, pages_dict.into());

    let catalog_id = doc.add_object(lopdf::Object::Dictionary(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    }));

    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Create a PDF with multiple pages for testing
fn create_test_pdf_with_pages(page_count: usize) -> Vec<u8> {
    let mut doc = lopdf::Document::new();

    let pages_id = doc.add_object(lopdf::Object::Dictionary(dictionary! {
        "Type" => "Pages",
        "Count" => page_count as i32,
        "Kids" => vec![],
    }));

    let mut page_ids = Vec::new();
    for _ in 0..page_count {
        let contents_id = doc.add_object(lopdf::Object::Stream(lopdf::Stream::new(
            dictionary! {},
            vec![],
        )));

        let page_id = doc.add_object(lopdf::Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.28.into(), 841.89.into()],
            "Resources" => dictionary! {},
            "Contents" => contents_id,
        }));
        page_ids.push(page_id);
    }

    let mut pages_dict = doc.get_object(pages_id).unwrap().as_dict().unwrap().clone();
    pages_dict.set(
        "Kids",
        lopdf::Object::Array(page_ids.into_iter().map(|id| id.into()).collect()),
    );
    doc.objects.insert(pages_id, pages_dict.into());

    let catalog_id = doc.add_object(lopdf::Object::Dictionary(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    }));

    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Create a PDF whose page already draws something and already uses the
/// font resource name F1
fn create_test_pdf_with_existing_content() -> Vec<u8> {
    let mut doc = lopdf::Document::new();

    let pages_id = doc.add_object(lopdf::Object::Dictionary(dictionary! {
        "Type" => "Pages",
        "Count" => 1,
        "Kids" => vec![],
    }));

    let contents_id = doc.add_object(lopdf::Object::Stream(lopdf::Stream::new(
        dictionary! {},
        b"q 1 0 0 1 0 0 cm Q".to_vec(),
    )));

    let page_id = doc.add_object(lopdf::Object::Dictionary(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Resources" => dictionary! {
            "Font" => dictionary! {
                "F1" => dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                },
            },
        },
        "Contents" => contents_id,
    }));

    let mut pages_dict = doc.get_object(pages_id).unwrap().as_dict().unwrap().clone();
    pages_dict.set("Kids", lopdf::Object::Array(vec![page_id.into()]));
    doc.objects.insert(pages_id, pages_dict.into());

    let catalog_id = doc.add_object(lopdf::Object::Dictionary(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    }));

    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Read back the decoded content stream of a page as text
fn page_content(data: &[u8], page_number: u32) -> String {
    let doc = lopdf::Document::load_mem(data).expect("Failed to re-open PDF");
    let page_id = *doc
        .get_pages()
        .get(&page_number)
        .expect("Page not found in saved PDF");
    let content = doc
        .get_page_content(page_id)
        .expect("Failed to read page content");
    String::from_utf8_lossy(&content).into_owned()
}

/// Extract (x, y) pairs from every Td operator in a content stream
fn td_positions(content: &str) -> Vec<(f32, f32)> {
    content
        .lines()
        .filter(|line| line.trim_end().ends_with(" Td"))
        .map(|line| {
            let mut parts = line.split_whitespace();
            let x: f32 = parts.next().unwrap().parse().unwrap();
            let y: f32 = parts.next().unwrap().parse().unwrap();
            (x, y)
        })
        .collect()
}

/// TTF bytes from a font installed on the system, if any
fn system_font_bytes() -> Option<Vec<u8>> {
    [
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    ]
    .iter()
    .find_map(|path| std::fs::read(path).ok())
}

#[test]
fn test_load_and_save_roundtrip() {
    let pdf_data = create_test_pdf(595.28, 841.89);

    let mut surface = DocumentSurface::load(&pdf_data).expect("Failed to open PDF");
    assert_eq!(surface.page_count(), 1);

    let saved = surface.to_bytes().expect("Failed to save PDF");
    let reloaded = DocumentSurface::load(&saved).expect("Failed to re-open PDF");
    assert_eq!(reloaded.page_count(), 1);
}

#[test]
fn test_load_rejects_garbage() {
    assert!(DocumentSurface::load(b"definitely not a pdf").is_err());
    assert!(DocumentSurface::load(&[]).is_err());
}

#[test]
fn test_draw_name_with_builtin_font() {
    let pdf_data = create_test_pdf(595.28, 841.89);

    let mut surface = DocumentSurface::load(&pdf_data).expect("Failed to open PDF");
    let mut font = PdfFont::resolve(None, "sans-serif");
    surface
        .draw_name("Alice", 0, 0.5, 0.5, &TextStyle::default(), &mut font)
        .expect("Failed to draw name");

    let saved = surface.to_bytes().expect("Failed to save PDF");
    let content = page_content(&saved, 1);

    assert!(content.contains("BT"));
    assert!(content.contains("(Alice) Tj"));
    assert!(content.contains("/F1 48 Tf"));

    // The font resource must resolve to the Helvetica base font
    let doc = lopdf::Document::load_mem(&saved).unwrap();
    let page_id = *doc.get_pages().get(&1).unwrap();
    let page_dict = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let resources = page_dict.get(b"Resources").unwrap().as_dict().unwrap();
    let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
    let font_ref = fonts.get(b"F1").unwrap().as_reference().unwrap();
    let font_dict = doc.get_object(font_ref).unwrap().as_dict().unwrap();
    assert_eq!(font_dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
}

#[test]
fn test_draw_name_is_centered_on_anchor() {
    let pdf_data = create_test_pdf(595.28, 841.89);

    let mut surface = DocumentSurface::load(&pdf_data).expect("Failed to open PDF");
    let mut font = PdfFont::resolve(None, "sans-serif");
    surface
        .draw_name("Alice", 0, 0.5, 0.5, &TextStyle::default(), &mut font)
        .expect("Failed to draw name");

    let saved = surface.to_bytes().expect("Failed to save PDF");
    let positions = td_positions(&page_content(&saved, 1));
    assert_eq!(positions.len(), 1);
    let (x, y) = positions[0];

    // Helvetica "Alice" at 48pt is 2335 units wide, so 112.08pt. The run
    // starts half that before the page center and the baseline sits half
    // the font size below it.
    assert!((x - (297.64 - 56.04)).abs() < 0.05, "x was {x}");
    assert!((y - (420.945 - 24.0)).abs() < 0.05, "y was {y}");
}

#[test]
fn test_page_index_is_clamped_to_last_page() {
    let pdf_data = create_test_pdf(595.28, 841.89);

    let mut surface = DocumentSurface::load(&pdf_data).expect("Failed to open PDF");
    let mut font = PdfFont::resolve(None, "sans-serif");
    surface
        .draw_name("Bob", 5, 0.5, 0.9, &TextStyle::default(), &mut font)
        .expect("Failed to draw on clamped page");

    let saved = surface.to_bytes().expect("Failed to save PDF");
    assert!(page_content(&saved, 1).contains("Tj"));
}

#[test]
fn test_missing_media_box_falls_back_to_a4() {
    let pdf_data = create_test_pdf_without_media_box();

    let surface = DocumentSurface::load(&pdf_data).expect("Failed to open PDF");
    let (w, h) = surface.page_size(1).expect("Failed to read page size");
    assert!((w - 595.28).abs() < 0.01);
    assert!((h - 841.89).abs() < 0.01);
}

#[test]
fn test_letter_spacing_produces_one_run_per_character() {
    let pdf_data = create_test_pdf(595.28, 841.89);

    let style = TextStyle {
        letter_spacing: 2.0,
        ..TextStyle::default()
    };
    let mut surface = DocumentSurface::load(&pdf_data).expect("Failed to open PDF");
    let mut font = PdfFont::resolve(None, "sans-serif");
    surface
        .draw_name("Bob", 0, 0.5, 0.5, &style, &mut font)
        .expect("Failed to draw name");

    let saved = surface.to_bytes().expect("Failed to save PDF");
    let content = page_content(&saved, 1);
    assert_eq!(content.matches(" Tj").count(), 3);

    let positions = td_positions(&content);
    assert_eq!(positions.len(), 3);
    // All runs share the baseline and advance to the right
    assert!(positions.windows(2).all(|w| w[0].1 == w[1].1));
    assert!(positions.windows(2).all(|w| w[0].0 < w[1].0));
    // Spacing widens the gap past the bare glyph advance
    let bare_b = 667.0 / 1000.0 * 48.0;
    assert!((positions[1].0 - positions[0].0) - bare_b > 1.9);
}

#[test]
fn test_existing_content_and_resources_are_preserved() {
    let pdf_data = create_test_pdf_with_existing_content();

    let mut surface = DocumentSurface::load(&pdf_data).expect("Failed to open PDF");
    let mut font = PdfFont::resolve(None, "sans-serif");
    surface
        .draw_name("Carol", 0, 0.5, 0.2, &TextStyle::default(), &mut font)
        .expect("Failed to draw name");

    let saved = surface.to_bytes().expect("Failed to save PDF");
    let content = page_content(&saved, 1);

    // The template's own drawing comes first, ours after it
    assert!(content.contains("q 1 0 0 1 0 0 cm Q"));
    assert!(content.contains("(Carol) Tj"));
    let template_at = content.find("1 0 0 1").unwrap();
    let ours_at = content.find("BT").unwrap();
    assert!(template_at < ours_at);

    // F1 was taken by the template, so the new font picks F2
    assert!(content.contains("/F2 48 Tf"));
}

#[test]
fn test_draw_targets_requested_page_only() {
    let pdf_data = create_test_pdf_with_pages(2);

    let mut surface = DocumentSurface::load(&pdf_data).expect("Failed to open PDF");
    assert_eq!(surface.page_count(), 2);

    let mut font = PdfFont::resolve(None, "sans-serif");
    surface
        .draw_name("Dana", 1, 0.5, 0.5, &TextStyle::default(), &mut font)
        .expect("Failed to draw name");

    let saved = surface.to_bytes().expect("Failed to save PDF");
    assert!(!page_content(&saved, 1).contains("Tj"));
    assert!(page_content(&saved, 2).contains("(Dana) Tj"));
}

#[test]
fn test_empty_name_leaves_document_untouched() {
    let pdf_data = create_test_pdf(595.28, 841.89);

    let mut surface = DocumentSurface::load(&pdf_data).expect("Failed to open PDF");
    let mut font = PdfFont::resolve(None, "sans-serif");
    surface
        .draw_name("", 0, 0.5, 0.5, &TextStyle::default(), &mut font)
        .expect("Empty draw should succeed");

    let saved = surface.to_bytes().expect("Failed to save PDF");
    assert!(!page_content(&saved, 1).contains("BT"));
}

#[test]
fn test_draw_name_with_embedded_font() {
    let Some(ttf) = system_font_bytes() else {
        return;
    };
    let pdf_data = create_test_pdf(595.28, 841.89);

    let mut surface = DocumentSurface::load(&pdf_data).expect("Failed to open PDF");
    let mut font = PdfFont::resolve(Some(&ttf), "sans-serif");
    assert!(matches!(font, PdfFont::Embedded(_)));

    surface
        .draw_name("Eve", 0, 0.5, 0.5, &TextStyle::default(), &mut font)
        .expect("Failed to draw name");

    let saved = surface.to_bytes().expect("Failed to save PDF");
    let content = page_content(&saved, 1);

    // Identity-H text comes out as a hex string run
    assert!(content.contains("> Tj"));
    assert!(!content.contains("(Eve)"));

    // The embedded font chain must be present in the saved file
    let needle = b"Type0";
    assert!(saved.windows(needle.len()).any(|w| w == needle));
    let descriptor = b"FontFile2";
    assert!(saved.windows(descriptor.len()).any(|w| w == descriptor));
}

#[test]
fn test_invalid_font_bytes_fall_back_to_builtin() {
    let pdf_data = create_test_pdf(595.28, 841.89);

    let mut surface = DocumentSurface::load(&pdf_data).expect("Failed to open PDF");
    let mut font = PdfFont::resolve(Some(b"not a font"), "sans-serif");
    assert!(matches!(font, PdfFont::Builtin(_)));

    surface
        .draw_name("Frank", 0, 0.5, 0.5, &TextStyle::default(), &mut font)
        .expect("Failed to draw name");

    let saved = surface.to_bytes().expect("Failed to save PDF");
    assert!(page_content(&saved, 1).contains("(Frank) Tj"));
}
