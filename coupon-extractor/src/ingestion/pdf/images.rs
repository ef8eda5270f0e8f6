//! PDF image extraction.
//!
//! Walks the pages of a parsed document in page order and yields every image
//! XObject each page references, in the order the page's resources list them:
//! - `DCTDecode` and `JPXDecode` payloads are passed through byte for byte
//! - Raw sample streams are decoded and expressed as lossless PNG
//! - Images nested in Form XObjects and resources inherited from the page tree
//!   are included; each image object is listed once per page
//!
//! Images that cannot be expressed (CCITT, JBIG2, exotic color spaces) are
//! skipped with a debug log entry but still consume a position on their page.

pub mod conversion;
pub mod types;

use std::collections::{HashSet, VecDeque, btree_map};

use image::codecs::png::CompressionType;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, trace};

use conversion::{ColorSpace, encode_png, invert_samples, samples_to_image};
pub use types::{ImageFormat, SourceImage};

/// Guard against malformed page trees with cyclic `/Parent` links
const MAX_PAGE_TREE_DEPTH: usize = 64;

/// Follow an indirect reference to the object it names.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn dict_integer(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key)
        .ok()
        .and_then(|value| resolve(doc, value))
        .and_then(|value| value.as_i64().ok())
}

/// Per component, whether the image's `/Decode` range runs from high to low
fn inverted_components(doc: &Document, dict: &Dictionary, components: usize) -> Vec<bool> {
    let Some(Object::Array(ranges)) = dict.get(b"Decode").ok().and_then(|d| resolve(doc, d))
    else {
        return Vec::new();
    };
    let bounds: Vec<f32> = ranges
        .iter()
        .filter_map(|value| resolve(doc, value)?.as_float().ok())
        .collect();
    bounds
        .chunks_exact(2)
        .take(components)
        .map(|range| range[0] > range[1])
        .collect()
}

/// Names listed in a stream's `/Filter` entry, in application order
fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    let Some(filter) = dict.get(b"Filter").ok().and_then(|f| resolve(doc, f)) else {
        return Vec::new();
    };
    match filter {
        Object::Name(name) => vec![name.clone()],
        Object::Array(items) => items
            .iter()
            .filter_map(|item| match resolve(doc, item)? {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Find the resources dictionary in effect for a page, walking up the page tree.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources)?.as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?;
        node = resolve(doc, parent)?.as_dict().ok()?;
    }
    None
}

/// Collect image XObject ids reachable from a resources dictionary.
fn collect_image_ids(
    doc: &Document,
    resources: &Dictionary,
    ids: &mut Vec<ObjectId>,
    visited_forms: &mut HashSet<ObjectId>,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve(doc, x))
        .and_then(|x| x.as_dict().ok())
    else {
        return;
    };

    for (_, entry) in xobjects.iter() {
        let Object::Reference(id) = entry else {
            continue;
        };
        let Ok(Object::Stream(stream)) = doc.get_object(*id) else {
            continue;
        };

        match stream.dict.get(b"Subtype").ok().and_then(|s| s.as_name().ok()) {
            Some(b"Image") => {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
            Some(b"Form") => {
                if !visited_forms.insert(*id) {
                    continue;
                }
                if let Some(form_resources) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve(doc, r))
                    .and_then(|r| r.as_dict().ok())
                {
                    collect_image_ids(doc, form_resources, ids, visited_forms);
                }
            }
            _ => {}
        }
    }
}

/// All image XObjects a page references, in resource order
pub fn page_image_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let mut ids = Vec::new();
    let mut visited_forms = HashSet::new();
    if let Some(resources) = page_resources(doc, page_id) {
        collect_image_ids(doc, resources, &mut ids, &mut visited_forms);
    }
    ids
}

/// Payload, format and pixel dimensions of one image XObject
struct ImagePayload {
    data: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

/// Read an image XObject into a standalone payload.
///
/// `Err` carries the reason the image cannot be expressed.
fn read_image(doc: &Document, stream: &Stream) -> Result<ImagePayload, String> {
    let dict = &stream.dict;
    let width = dict_integer(doc, dict, b"Width")
        .and_then(|w| u32::try_from(w).ok())
        .filter(|w| *w > 0)
        .ok_or("missing or invalid /Width")?;
    let height = dict_integer(doc, dict, b"Height")
        .and_then(|h| u32::try_from(h).ok())
        .filter(|h| *h > 0)
        .ok_or("missing or invalid /Height")?;

    let filters = filter_names(doc, dict);
    let passthrough = match filters.as_slice() {
        [only] if only == b"DCTDecode" => Some(ImageFormat::Jpeg),
        [only] if only == b"JPXDecode" => Some(ImageFormat::Jpx),
        _ => None,
    };
    if let Some(format) = passthrough {
        return Ok(ImagePayload {
            data: stream.content.clone(),
            format,
            width,
            height,
        });
    }

    if let Some(unsupported) = filters.iter().find(|f| {
        matches!(
            f.as_slice(),
            b"DCTDecode" | b"JPXDecode" | b"CCITTFaxDecode" | b"JBIG2Decode"
        )
    }) {
        return Err(format!(
            "unsupported filter {}",
            String::from_utf8_lossy(unsupported)
        ));
    }

    let mut samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|e| format!("failed to decompress samples: {}", e))?
    };

    let is_mask = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
    let (bits_per_component, color_space) = if is_mask {
        (1, ColorSpace::Gray)
    } else {
        let bits = dict_integer(doc, dict, b"BitsPerComponent").unwrap_or(8);
        let space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|cs| ColorSpace::parse(doc, cs))
            .ok_or("missing or unsupported /ColorSpace")?;
        (u32::try_from(bits).map_err(|_| "invalid /BitsPerComponent")?, space)
    };

    let inverted = inverted_components(doc, dict, color_space.components());
    invert_samples(
        &mut samples,
        width,
        bits_per_component,
        color_space.components(),
        &inverted,
    );

    let img = samples_to_image(&samples, width, height, bits_per_component, &color_space)?;
    let data = encode_png(&img, CompressionType::Default)
        .map_err(|e| format!("failed to encode PNG: {}", e))?;

    Ok(ImagePayload {
        data,
        format: ImageFormat::Png,
        width,
        height,
    })
}

/// Lazy, single-pass sequence of the images embedded in a document.
///
/// Pages are scanned on demand; restarting requires a new extractor.
pub struct ImageExtractor<'a> {
    doc: &'a Document,
    document: &'a str,
    pages: btree_map::IntoIter<u32, ObjectId>,
    current_page: u32,
    pending: VecDeque<(u32, ObjectId)>,
}

impl<'a> ImageExtractor<'a> {
    pub fn new(doc: &'a Document, document: &'a str) -> Self {
        Self {
            doc,
            document,
            pages: doc.get_pages().into_iter(),
            current_page: 0,
            pending: VecDeque::new(),
        }
    }
}

impl Iterator for ImageExtractor<'_> {
    type Item = SourceImage;

    fn next(&mut self) -> Option<SourceImage> {
        loop {
            if let Some((image_index, id)) = self.pending.pop_front() {
                let result = self
                    .doc
                    .get_object(id)
                    .and_then(Object::as_stream)
                    .map_err(|e| e.to_string())
                    .and_then(|stream| read_image(self.doc, stream));

                match result {
                    Ok(payload) => {
                        trace!(
                            document = self.document,
                            page = self.current_page,
                            image_index = image_index,
                            format = %payload.format,
                            bytes = payload.data.len(),
                            "Extracted image"
                        );
                        return Some(SourceImage {
                            data: payload.data,
                            format: payload.format,
                            width: payload.width,
                            height: payload.height,
                            document: self.document.to_string(),
                            page_number: self.current_page,
                            image_index,
                        });
                    }
                    Err(reason) => {
                        debug!(
                            document = self.document,
                            page = self.current_page,
                            image_index = image_index,
                            object = ?id,
                            reason = %reason,
                            "Skipping image that cannot be extracted"
                        );
                        continue;
                    }
                }
            }

            let (page_number, page_id) = self.pages.next()?;
            self.current_page = page_number;
            self.pending = page_image_ids(self.doc, page_id)
                .into_iter()
                .zip(1u32..)
                .map(|(id, index)| (index, id))
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FixtureImage, PdfBuilder, noise_jpeg};

    #[test]
    fn test_jpeg_bytes_pass_through() {
        let jpeg = noise_jpeg(64, 48, 1);
        let mut builder = PdfBuilder::new();
        builder.page(&[FixtureImage::jpeg(jpeg.clone(), 64, 48)]);
        let doc = builder.build();

        let images: Vec<_> = ImageExtractor::new(&doc, "sample").collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].data, jpeg);
        assert_eq!(images[0].format, ImageFormat::Jpeg);
        assert_eq!((images[0].width, images[0].height), (64, 48));
        assert_eq!(images[0].document, "sample");
        assert_eq!((images[0].page_number, images[0].image_index), (1, 1));
    }

    #[test]
    fn test_page_and_index_order() {
        let mut builder = PdfBuilder::new();
        builder.page(&[
            FixtureImage::jpeg(noise_jpeg(16, 16, 1), 16, 16),
            FixtureImage::jpeg(noise_jpeg(16, 16, 2), 16, 16),
        ]);
        builder.page(&[]);
        builder.page(&[FixtureImage::jpeg(noise_jpeg(16, 16, 3), 16, 16)]);
        let doc = builder.build();

        let positions: Vec<_> = ImageExtractor::new(&doc, "d")
            .map(|img| (img.page_number, img.image_index))
            .collect();
        assert_eq!(positions, vec![(1, 1), (1, 2), (3, 1)]);
    }

    #[test]
    fn test_raw_rgb_samples_become_png() {
        let samples: Vec<u8> = (0..4 * 3 * 3).map(|i| (i * 7) as u8).collect();
        let mut builder = PdfBuilder::new();
        builder.page(&[FixtureImage::raw_rgb(samples.clone(), 4, 3)]);
        let doc = builder.build();

        let images: Vec<_> = ImageExtractor::new(&doc, "raw").collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].format, ImageFormat::Png);

        let decoded = image::load_from_memory(&images[0].data).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.as_raw(), &samples);
    }

    #[test]
    fn test_inverted_decode_range_is_applied() {
        // 8 one-bit pixels: painted, clear, clear, painted ...
        let mut builder = PdfBuilder::new();
        builder.page(&[FixtureImage::raw_gray(vec![0b1001_0110], 8, 1, 1).with_decode(&[1, 0])]);
        let doc = builder.build();

        let images: Vec<_> = ImageExtractor::new(&doc, "mask").collect();
        assert_eq!(images.len(), 1);
        let decoded = image::load_from_memory(&images[0].data).unwrap().to_luma8();
        assert_eq!(decoded.as_raw(), &vec![0, 255, 255, 0, 255, 0, 0, 255]);
    }

    #[test]
    fn test_unsupported_image_keeps_its_position() {
        let mut builder = PdfBuilder::new();
        builder.page(&[
            FixtureImage::ccitt(16, 16),
            FixtureImage::jpeg(noise_jpeg(16, 16, 4), 16, 16),
        ]);
        let doc = builder.build();

        let images: Vec<_> = ImageExtractor::new(&doc, "fax").collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].image_index, 2);
    }

    #[test]
    fn test_images_inside_forms_and_inherited_resources() {
        let mut builder = PdfBuilder::new();
        builder.page_with_form(FixtureImage::jpeg(noise_jpeg(8, 8, 5), 8, 8));
        builder.inherited_resources_page(FixtureImage::jpeg(noise_jpeg(8, 8, 6), 8, 8));
        let doc = builder.build();

        let pages: Vec<_> = ImageExtractor::new(&doc, "nested")
            .map(|img| img.page_number)
            .collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[test]
    fn test_shared_image_listed_once_per_page() {
        let mut builder = PdfBuilder::new();
        let shared = builder.add_image(&FixtureImage::jpeg(noise_jpeg(8, 8, 7), 8, 8));
        builder.page_with_ids(&[shared, shared]);
        builder.page_with_ids(&[shared]);
        let doc = builder.build();

        let positions: Vec<_> = ImageExtractor::new(&doc, "shared")
            .map(|img| (img.page_number, img.image_index))
            .collect();
        assert_eq!(positions, vec![(1, 1), (2, 1)]);
    }
}
