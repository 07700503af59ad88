//! Image handling for templates and PDF embedding
//!
//! Raster templates arrive as PNG or JPEG. This module detects the format,
//! reads dimensions from the header without a full decode (the raster
//! surface uses that as a cheap probe), and converts finished images into
//! PDF image XObjects, including the single-page wrap used when a raster
//! render is delivered as a PDF.

use crate::{RenderError, Result};
use image::{DynamicImage, ImageDecoder, ImageReader};
use lopdf::{Dictionary, Document, Object, Stream};
use std::io::Cursor;

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        RenderError::ImageError(err.to_string())
    }
}

/// Detected image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Detect image format from magic bytes
pub fn detect_format(data: &[u8]) -> Result<ImageFormat> {
    if data.len() < 8 {
        return Err(RenderError::ImageError("Image data too short".to_string()));
    }

    // JPEG starts with FF D8 FF
    if data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        return Ok(ImageFormat::Jpeg);
    }

    // PNG starts with 89 50 4E 47 0D 0A 1A 0A
    if data[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Ok(ImageFormat::Png);
    }

    Err(RenderError::ImageError("Unknown image format".to_string()))
}

/// Image dimensions
#[derive(Debug, Clone, Copy)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// JPEG info including dimensions and color components
#[derive(Debug, Clone, Copy)]
struct JpegInfo {
    width: u32,
    height: u32,
    num_components: u8,
}

/// Read image dimensions from the file header without decoding pixels.
pub fn get_dimensions(data: &[u8]) -> Result<ImageDimensions> {
    let format = detect_format(data)?;

    match format {
        ImageFormat::Jpeg => {
            let info = get_jpeg_info(data)?;
            Ok(ImageDimensions {
                width: info.width,
                height: info.height,
            })
        }
        ImageFormat::Png => get_png_dimensions(data),
    }
}

/// Scan for an SOF marker and read the frame header.
///
/// SOF segment layout: marker (2) + length (2) + precision (1) +
/// height (2) + width (2) + component count (1).
fn get_jpeg_info(data: &[u8]) -> Result<JpegInfo> {
    let mut i = 2;
    while i + 10 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];

        // SOF markers, excluding DHT/JPG/DAC which share the range
        if (0xC0..=0xCF).contains(&marker) && marker != 0xC4 && marker != 0xC8 && marker != 0xCC {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            let num_components = data[i + 9];
            return Ok(JpegInfo {
                width,
                height,
                num_components,
            });
        }

        // Skip to next marker
        if i + 4 < data.len() {
            let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            if length < 2 {
                break;
            }
            i += 2 + length;
        } else {
            break;
        }
    }

    Err(RenderError::ImageError(
        "Could not parse JPEG info".to_string(),
    ))
}

/// Read width and height from the IHDR chunk at byte 8.
fn get_png_dimensions(data: &[u8]) -> Result<ImageDimensions> {
    if data.len() < 24 {
        return Err(RenderError::ImageError("PNG data too short".to_string()));
    }

    if &data[12..16] != b"IHDR" {
        return Err(RenderError::ImageError(
            "Invalid PNG: IHDR not found".to_string(),
        ));
    }

    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);

    Ok(ImageDimensions { width, height })
}

/// Image XObject for PDF embedding
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Color space ("DeviceRGB", "DeviceGray")
    pub color_space: String,
    /// Bits per component
    pub bits_per_component: u8,
    /// PDF filter ("DCTDecode" for JPEG, "FlateDecode" for PNG)
    pub filter: String,
    /// Raw image data (compressed)
    pub data: Vec<u8>,
}

impl ImageXObject {
    /// Create an XObject from JPEG data.
    ///
    /// JPEG bytes embed directly with the DCTDecode filter.
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        let info = get_jpeg_info(data)?;

        let color_space = if info.num_components == 1 {
            "DeviceGray".to_string()
        } else {
            "DeviceRGB".to_string()
        };

        Ok(Self {
            width: info.width,
            height: info.height,
            color_space,
            bits_per_component: 8,
            filter: "DCTDecode".to_string(),
            data: data.to_vec(),
        })
    }

    /// Create an XObject from PNG data.
    ///
    /// PNG pixels are decoded and re-encoded with FlateDecode. Alpha
    /// channels are blended onto a white background because PDF image
    /// XObjects have no alpha of their own.
    pub fn from_png(data: &[u8]) -> Result<Self> {
        let cursor = Cursor::new(data);
        let reader = ImageReader::new(cursor).with_guessed_format()?;
        let decoder = reader.into_decoder()?;

        let dims = decoder.dimensions();
        let color_type = decoder.color_type();

        let image = DynamicImage::from_decoder(decoder)?;

        let (raw_data, color_space) = match color_type {
            image::ColorType::L8 | image::ColorType::L16 => {
                let gray = image.to_luma8();
                (gray.into_raw(), "DeviceGray".to_string())
            }
            image::ColorType::La8 | image::ColorType::La16 => {
                let la = image.to_luma_alpha8();
                let mut gray_data = Vec::with_capacity((dims.0 * dims.1) as usize);
                for pixel in la.pixels() {
                    let alpha = pixel[1] as f32 / 255.0;
                    let gray = (pixel[0] as f32 * alpha + 255.0 * (1.0 - alpha)) as u8;
                    gray_data.push(gray);
                }
                (gray_data, "DeviceGray".to_string())
            }
            image::ColorType::Rgba8 | image::ColorType::Rgba16 => {
                let rgba = image.to_rgba8();
                let mut rgb_data = Vec::with_capacity((dims.0 * dims.1 * 3) as usize);
                for pixel in rgba.pixels() {
                    let alpha = pixel[3] as f32 / 255.0;
                    let r = (pixel[0] as f32 * alpha + 255.0 * (1.0 - alpha)) as u8;
                    let g = (pixel[1] as f32 * alpha + 255.0 * (1.0 - alpha)) as u8;
                    let b = (pixel[2] as f32 * alpha + 255.0 * (1.0 - alpha)) as u8;
                    rgb_data.push(r);
                    rgb_data.push(g);
                    rgb_data.push(b);
                }
                (rgb_data, "DeviceRGB".to_string())
            }
            _ => {
                let rgb = image.to_rgb8();
                (rgb.into_raw(), "DeviceRGB".to_string())
            }
        };

        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        std::io::Write::write_all(&mut encoder, &raw_data)?;
        let data = encoder.finish()?;

        Ok(Self {
            width: dims.0,
            height: dims.1,
            color_space,
            bits_per_component: 8,
            filter: "FlateDecode".to_string(),
            data,
        })
    }

    /// Convert to a lopdf Stream object
    pub fn to_pdf_stream(&self) -> Stream {
        let mut dict = Dictionary::new();

        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", self.width as i64);
        dict.set("Height", self.height as i64);
        dict.set(
            "ColorSpace",
            Object::Name(self.color_space.as_bytes().to_vec()),
        );
        dict.set("BitsPerComponent", self.bits_per_component as i64);
        dict.set("Filter", Object::Name(self.filter.as_bytes().to_vec()));
        dict.set("Length", self.data.len() as i64);

        Stream::new(dict, self.data.clone())
    }
}

/// Generate operators to draw an image at a position
///
/// # Arguments
/// * `image_name` - Image resource name (e.g., "Im1")
/// * `x`, `y` - Position in points, PDF coordinates
/// * `width`, `height` - Display size in points
pub fn generate_image_operators(
    image_name: &str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Vec<u8> {
    // q                        - Save graphics state
    // width 0 0 height x y cm  - Concatenate transformation matrix
    // /Im1 Do                  - Draw image
    // Q                        - Restore graphics state
    format!("q\n{width} 0 0 {height} {x} {y} cm\n/{image_name} Do\nQ\n").into_bytes()
}

/// Wrap an image as the sole content of a fresh single-page document.
///
/// The page size equals the pixel size, one point per pixel, with the
/// image drawn edge to edge.
pub fn png_to_single_page_pdf(data: &[u8]) -> Result<Vec<u8>> {
    let xobject = match detect_format(data)? {
        ImageFormat::Png => ImageXObject::from_png(data)?,
        ImageFormat::Jpeg => ImageXObject::from_jpeg(data)?,
    };

    let page_width = xobject.width as f32;
    let page_height = xobject.height as f32;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(xobject.to_pdf_stream());
    let content = generate_image_operators(
        "Im1",
        0.0,
        0.0,
        page_width as f64,
        page_height as f64,
    );
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let xobject_dict =
        Dictionary::from_iter(vec![("Im1", Object::Reference(image_id))]);
    let resources = Dictionary::from_iter(vec![("XObject", xobject_dict.into())]);

    let page_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", "Page".into()),
        ("Parent", Object::Reference(pages_id)),
        (
            "MediaBox",
            vec![
                0.into(),
                0.into(),
                Object::Real(page_width),
                Object::Real(page_height),
            ]
            .into(),
        ),
        ("Resources", resources.into()),
        ("Contents", Object::Reference(content_id)),
    ]));

    let pages = Dictionary::from_iter(vec![
        ("Type", "Pages".into()),
        ("Kids", vec![Object::Reference(page_id)].into()),
        ("Count", 1.into()),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", "Catalog".into()),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| RenderError::SaveError(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal_jpeg() -> Vec<u8> {
        vec![
            0xFF, 0xD8, // SOI
            0xFF, 0xC0, // SOF0
            0x00, 0x11, // length
            0x08, // precision
            0x00, 0x10, // height = 16
            0x00, 0x20, // width = 32
            0x03, // components (YCbCr)
            0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01,
            0xFF, 0xD9, // EOI
        ]
    }

    fn minimal_png(width: u32, height: u32) -> Vec<u8> {
        use image::{ImageBuffer, Rgba};

        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .expect("Failed to create PNG");
        buffer
    }

    #[test]
    fn test_detect_jpeg() {
        assert_eq!(detect_format(&minimal_jpeg()).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_detect_png() {
        let png_header = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_format(&png_header).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_detect_unknown() {
        assert!(detect_format(b"GIF89a warm greetings").is_err());
        assert!(detect_format(&[0x00, 0x01]).is_err());
    }

    #[test]
    fn test_jpeg_dimensions_from_header() {
        let dims = get_dimensions(&minimal_jpeg()).unwrap();
        assert_eq!(dims.width, 32);
        assert_eq!(dims.height, 16);
    }

    #[test]
    fn test_png_dimensions_from_header() {
        let dims = get_dimensions(&minimal_png(48, 12)).unwrap();
        assert_eq!(dims.width, 48);
        assert_eq!(dims.height, 12);
    }

    #[test]
    fn test_truncated_header_fails_probe() {
        let mut data = minimal_png(8, 8);
        data.truncate(16);
        assert!(get_dimensions(&data).is_err());
    }

    #[test]
    fn test_from_png_blends_alpha() {
        use image::{ImageBuffer, Rgba};

        // Fully transparent red should come out white after blending
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(2, 2, Rgba([255, 0, 0, 0]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();

        let xobject = ImageXObject::from_png(&buffer).unwrap();
        assert_eq!(xobject.color_space, "DeviceRGB");
        assert_eq!(xobject.filter, "FlateDecode");

        let mut decoder = flate2::read::ZlibDecoder::new(&xobject.data[..]);
        let mut raw = Vec::new();
        std::io::Read::read_to_end(&mut decoder, &mut raw).unwrap();
        assert_eq!(raw[0..3], [255, 255, 255]);
    }

    #[test]
    fn test_from_jpeg_keeps_bytes() {
        let data = minimal_jpeg();
        let xobject = ImageXObject::from_jpeg(&data).unwrap();
        assert_eq!(xobject.filter, "DCTDecode");
        assert_eq!(xobject.data, data);
        assert_eq!(xobject.width, 32);
    }

    #[test]
    fn test_to_pdf_stream_dict() {
        let xobject = ImageXObject::from_jpeg(&minimal_jpeg()).unwrap();
        let stream = xobject.to_pdf_stream();
        assert_eq!(
            stream.dict.get(b"Subtype").unwrap(),
            &Object::Name(b"Image".to_vec())
        );
        assert_eq!(stream.dict.get(b"Width").unwrap(), &Object::Integer(32));
        assert_eq!(
            stream.dict.get(b"Filter").unwrap(),
            &Object::Name(b"DCTDecode".to_vec())
        );
    }

    #[test]
    fn test_generate_image_operators() {
        let ops = generate_image_operators("Im1", 0.0, 0.0, 800.0, 600.0);
        let text = String::from_utf8(ops).unwrap();
        assert_eq!(text, "q\n800 0 0 600 0 0 cm\n/Im1 Do\nQ\n");
    }

    #[test]
    fn test_single_page_wrap_page_size_matches_pixels() {
        let png = minimal_png(320, 200);
        let pdf = png_to_single_page_pdf(&png).unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);

        let page_id = pages[&1];
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_f32().unwrap(), 320.0);
        assert_eq!(media_box[3].as_f32().unwrap(), 200.0);

        let content = doc.get_page_content(page_id).unwrap();
        let text = String::from_utf8_lossy(&content);
        assert!(text.contains("/Im1 Do"));
    }
}
