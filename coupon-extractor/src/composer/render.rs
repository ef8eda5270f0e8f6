//! PDF output for composed pages.

use std::fmt::Write as _;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegDecoder;
use image::{ExtendedColorType, ImageDecoder};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::debug;

use super::OutputPage;
use super::placement::{PAGE_HEIGHT, PAGE_WIDTH};
use crate::error::ProcessingError;
use crate::ingestion::optimize::flatten_alpha;
use crate::ingestion::{AcceptedImage, ImageFormat};

/// Build an output document with one page per [`OutputPage`].
pub fn render(pages: &[OutputPage<'_>]) -> Result<Document, ProcessingError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(pages.len());
    for (page, page_number) in pages.iter().zip(1usize..) {
        kids.push(render_page(&mut doc, pages_id, page, page_number)?);
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

fn render_page(
    doc: &mut Document,
    pages_id: ObjectId,
    page: &OutputPage<'_>,
    page_number: usize,
) -> Result<ObjectId, ProcessingError> {
    let mut xobjects = Dictionary::new();
    let mut content = String::new();

    for (slot, index) in page.slots.iter().zip(1usize..) {
        let stream =
            image_xobject(slot.image).map_err(|message| ProcessingError::ImageEmbed {
                page: page_number,
                index,
                message,
            })?;
        let image_id = doc.add_object(stream);

        let name = format!("Im{}", index);
        xobjects.set(name.as_bytes().to_vec(), image_id);

        // Placement rects are top-left based; PDF user space is bottom-left
        let rect = slot.rect;
        let _ = writeln!(
            content,
            "q {:.3} 0 0 {:.3} {:.3} {:.3} cm /{} Do Q",
            rect.width,
            rect.height,
            rect.x,
            PAGE_HEIGHT - rect.bottom(),
            name
        );
    }

    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        "Resources" => dictionary! { "XObject" => xobjects },
        "Contents" => content_id,
    }))
}

/// Image XObject for an accepted payload.
///
/// JPEG and JPEG 2000 payloads are embedded as-is; anything else is decoded
/// to 8-bit RGB samples left for [`save_compacted`] to deflate.
fn image_xobject(image: &AcceptedImage) -> Result<Stream, String> {
    match image.format {
        ImageFormat::Jpeg => {
            let decoder = JpegDecoder::new(Cursor::new(image.data.as_slice()))
                .map_err(|e| format!("unreadable JPEG header: {}", e))?;
            let (width, height) = decoder.dimensions();
            let color_space = match decoder.original_color_type() {
                ExtendedColorType::L8 => "DeviceGray",
                ExtendedColorType::Cmyk8 => "DeviceCMYK",
                _ => "DeviceRGB",
            };
            let mut dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            };
            if let Some(decode) = jpeg_decode_array(decoder.original_color_type(), &image.data) {
                dict.set("Decode", decode);
            }
            Ok(Stream::new(dict, image.data.clone()).with_compression(false))
        }
        ImageFormat::Jpx => {
            let dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "Filter" => "JPXDecode",
            };
            Ok(Stream::new(dict, image.data.clone()).with_compression(false))
        }
        other => {
            let codec = other
                .codec()
                .ok_or_else(|| format!("no decoder for {}", other))?;
            let decoded = image::load_from_memory_with_format(&image.data, codec)
                .map_err(|e| format!("failed to decode {}: {}", other, e))?;
            let decoded = if decoded.color().has_alpha() {
                flatten_alpha(&decoded)
            } else {
                decoded
            };
            let rgb = decoded.to_rgb8();
            let dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => rgb.width() as i64,
                "Height" => rgb.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            };
            Ok(Stream::new(dict, rgb.into_raw()))
        }
    }
}

/// `/Decode` for CMYK JPEGs written by Adobe software, which store inverted
/// ink values.
fn jpeg_decode_array(color_type: ExtendedColorType, data: &[u8]) -> Option<Vec<Object>> {
    if color_type != ExtendedColorType::Cmyk8 || !has_adobe_marker(data) {
        return None;
    }
    Some((0..4).flat_map(|_| [Object::Integer(1), Object::Integer(0)]).collect())
}

/// True if an APP14 "Adobe" segment precedes the scan data.
fn has_adobe_marker(data: &[u8]) -> bool {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return false;
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return false;
        }
        let marker = data[pos + 1];
        match marker {
            // Fill byte
            0xFF => pos += 1,
            // Start of scan or end of image
            0xDA | 0xD9 => return false,
            0x01 | 0xD0..=0xD7 => pos += 2,
            _ => {
                let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                let payload = data.get(pos + 4..pos + 2 + length).unwrap_or_default();
                if marker == 0xEE && payload.starts_with(b"Adobe") {
                    return true;
                }
                pos += 2 + length;
            }
        }
    }
    false
}

/// Drop unreferenced objects, renumber, deflate streams and write to `path`.
pub fn save_compacted(doc: &mut Document, path: &Path) -> Result<(), ProcessingError> {
    let pruned = doc.prune_objects();
    doc.renumber_objects();
    doc.compress();
    debug!(
        output = %path.display(),
        pruned = pruned.len(),
        objects = doc.objects.len(),
        "Compacted output document"
    );

    doc.save(path)
        .map(|_| ())
        .map_err(|e| ProcessingError::DocumentWrite {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
}
