//! In-memory fixture documents for tests.

use std::path::Path;

use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// Pixel dimensions of [`FixtureImage::coupon`] payloads
pub const COUPON_WIDTH: u32 = 200;
pub const COUPON_HEIGHT: u32 = 150;

/// Encode seeded RGB noise as a maximum-quality JPEG.
///
/// Noise barely compresses, so payload size grows with the pixel count.
pub fn noise_jpeg(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    let pixels: Vec<u8> = (0..width * height * 3)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 100)
        .encode(&pixels, width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// A coupon-sized JPEG, comfortably above the default size threshold
pub fn coupon_jpeg(seed: u32) -> Vec<u8> {
    noise_jpeg(COUPON_WIDTH, COUPON_HEIGHT, seed)
}

/// Image XObject to embed in a fixture page
#[derive(Debug, Clone)]
pub struct FixtureImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    filter: Option<&'static str>,
    color_space: &'static str,
    bits_per_component: i64,
    decode: Option<Vec<i64>>,
}

impl FixtureImage {
    pub fn jpeg(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            filter: Some("DCTDecode"),
            color_space: "DeviceRGB",
            bits_per_component: 8,
            decode: None,
        }
    }

    pub fn coupon(seed: u32) -> Self {
        Self::jpeg(coupon_jpeg(seed), COUPON_WIDTH, COUPON_HEIGHT)
    }

    /// Unfiltered 8-bit RGB samples
    pub fn raw_rgb(samples: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data: samples,
            width,
            height,
            filter: None,
            color_space: "DeviceRGB",
            bits_per_component: 8,
            decode: None,
        }
    }

    /// Unfiltered DeviceGray samples at any depth
    pub fn raw_gray(samples: Vec<u8>, width: u32, height: u32, bits_per_component: i64) -> Self {
        Self {
            data: samples,
            width,
            height,
            filter: None,
            color_space: "DeviceGray",
            bits_per_component,
            decode: None,
        }
    }

    pub fn with_decode(mut self, decode: &[i64]) -> Self {
        self.decode = Some(decode.to_vec());
        self
    }

    /// Fax-encoded bilevel image the extractor cannot express
    pub fn ccitt(width: u32, height: u32) -> Self {
        Self {
            data: vec![0x00, 0x10, 0x20, 0x30],
            width,
            height,
            filter: Some("CCITTFaxDecode"),
            color_space: "DeviceGray",
            bits_per_component: 1,
            decode: None,
        }
    }

    fn to_stream(&self) -> Stream {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => self.color_space,
            "BitsPerComponent" => self.bits_per_component,
        };
        if let Some(filter) = self.filter {
            dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
        }
        if let Some(decode) = &self.decode {
            let ranges: Vec<Object> = decode.iter().map(|&v| Object::Integer(v)).collect();
            dict.set("Decode", ranges);
        }
        Stream::new(dict, self.data.clone()).with_compression(false)
    }
}

/// Assembles a small page tree with image XObjects.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    page_count: i64,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            page_count: 0,
        }
    }

    /// Add an image object without placing it on a page
    pub fn add_image(&mut self, image: &FixtureImage) -> ObjectId {
        self.doc.add_object(image.to_stream())
    }

    /// Add a page drawing each image in order
    pub fn page(&mut self, images: &[FixtureImage]) -> ObjectId {
        let ids: Vec<ObjectId> = images.iter().map(|img| self.add_image(img)).collect();
        self.page_with_ids(&ids)
    }

    /// Add a page drawing already-added image objects
    pub fn page_with_ids(&mut self, ids: &[ObjectId]) -> ObjectId {
        let (resources, content) = image_resources(ids);
        let page_id = self.add_page(self.pages_id, Some(resources), content);
        self.kids.push(page_id);
        page_id
    }

    /// Add a page whose only image sits inside a Form XObject
    pub fn page_with_form(&mut self, image: FixtureImage) -> ObjectId {
        let image_id = self.add_image(&image);
        let (form_resources, form_content) = image_resources(&[image_id]);
        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
                "Resources" => form_resources,
            },
            form_content,
        );
        let form_id = self.doc.add_object(form);

        let resources = dictionary! {
            "XObject" => dictionary! { "Fm1" => form_id },
        };
        let page_id = self.add_page(self.pages_id, Some(resources), b"/Fm1 Do".to_vec());
        self.kids.push(page_id);
        page_id
    }

    /// Add a page with no resources of its own under an intermediate
    /// pages node that carries them
    pub fn inherited_resources_page(&mut self, image: FixtureImage) -> ObjectId {
        let image_id = self.add_image(&image);
        let (resources, content) = image_resources(&[image_id]);

        let node_id = self.doc.new_object_id();
        let page_id = self.add_page(node_id, None, content);
        self.doc.objects.insert(
            node_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Parent" => self.pages_id,
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources,
            }),
        );
        self.kids.push(node_id);
        page_id
    }

    fn add_page(
        &mut self,
        parent: ObjectId,
        resources: Option<Dictionary>,
        content: Vec<u8>,
    ) -> ObjectId {
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => parent,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => content_id,
        };
        if let Some(resources) = resources {
            page.set("Resources", resources);
        }
        self.page_count += 1;
        self.doc.add_object(page)
    }

    /// Finish the page tree and catalog
    pub fn build(&self) -> Document {
        let mut doc = self.doc.clone();
        doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
                "Count" => self.page_count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut doc = self.build();
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    /// Serialized document carrying an `%FDF-` header
    pub fn to_fdf_bytes(&self) -> Vec<u8> {
        let mut bytes = self.to_bytes();
        bytes[..5].copy_from_slice(b"%FDF-");
        bytes
    }

    /// Write the `%FDF-` flavored document to `path`
    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.to_fdf_bytes()).unwrap();
    }
}

/// XObject resources naming each id `Im1`, `Im2`, ... and a content stream
/// drawing them in that order
fn image_resources(ids: &[ObjectId]) -> (Dictionary, Vec<u8>) {
    let mut xobjects = Dictionary::new();
    let mut content = String::new();
    for (id, n) in ids.iter().zip(1..) {
        let name = format!("Im{}", n);
        xobjects.set(name.as_bytes().to_vec(), Object::Reference(*id));
        content.push_str(&format!("q 100 0 0 100 0 0 cm /{} Do Q\n", name));
    }
    (dictionary! { "XObject" => xobjects }, content.into_bytes())
}
