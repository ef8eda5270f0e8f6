//! Conversion of raw PDF image samples to PNG.
//!
//! Handles the sample layouts found in coupon documents:
//! - DeviceGray, DeviceRGB and DeviceCMYK (and ICCBased by component count)
//! - Indexed over a Gray, RGB or CMYK base
//! - 1, 2, 4, 8 and 16 bits per component, rows padded to whole bytes

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, GrayImage, ImageEncoder, RgbImage};
use lopdf::{Document, Object};

use super::resolve;

/// Color space of an image XObject, reduced to what conversion needs
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        /// Highest valid palette index
        hival: u32,
        /// Base-space components for each palette entry, back to back
        palette: Vec<u8>,
    },
}

impl ColorSpace {
    /// Components per sample as stored in the stream
    pub fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }

    /// Parse a `/ColorSpace` entry, following references.
    ///
    /// Returns `None` for spaces that cannot be converted (Lab, Separation, DeviceN, ...).
    pub fn parse(doc: &Document, object: &Object) -> Option<Self> {
        match resolve(doc, object)? {
            Object::Name(name) => Self::from_family(name),
            Object::Array(items) => {
                let family = match resolve(doc, items.first()?)? {
                    Object::Name(name) => name.as_slice(),
                    _ => return None,
                };
                match family {
                    b"ICCBased" => {
                        let Object::Stream(profile) = resolve(doc, items.get(1)?)? else {
                            return None;
                        };
                        let n = profile
                            .dict
                            .get(b"N")
                            .ok()
                            .and_then(|n| resolve(doc, n))
                            .and_then(|n| n.as_i64().ok());
                        match n {
                            Some(1) => Some(ColorSpace::Gray),
                            Some(3) => Some(ColorSpace::Rgb),
                            Some(4) => Some(ColorSpace::Cmyk),
                            _ => profile
                                .dict
                                .get(b"Alternate")
                                .ok()
                                .and_then(|alt| Self::parse(doc, alt)),
                        }
                    }
                    b"Indexed" | b"I" => {
                        let base = Self::parse(doc, items.get(1)?)?;
                        if matches!(base, ColorSpace::Indexed { .. }) {
                            return None;
                        }
                        let hival = resolve(doc, items.get(2)?)?.as_i64().ok()?;
                        let palette = match resolve(doc, items.get(3)?)? {
                            Object::String(bytes, _) => bytes.clone(),
                            Object::Stream(stream) => stream
                                .decompressed_content()
                                .unwrap_or_else(|_| stream.content.clone()),
                            _ => return None,
                        };
                        Some(ColorSpace::Indexed {
                            base: Box::new(base),
                            hival: u32::try_from(hival).ok()?,
                            palette,
                        })
                    }
                    other => Self::from_family(other),
                }
            }
            _ => None,
        }
    }

    fn from_family(name: &[u8]) -> Option<Self> {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => Some(ColorSpace::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(ColorSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Some(ColorSpace::Cmyk),
            _ => None,
        }
    }
}

/// Reads packed samples of any supported depth from one row
struct SampleReader<'a> {
    row: &'a [u8],
    bits: u32,
}

impl SampleReader<'_> {
    /// Raw sample value at position `i` within the row
    fn raw(&self, i: usize) -> u32 {
        match self.bits {
            8 => self.row[i] as u32,
            16 => self.row[i * 2] as u32,
            bits => {
                let bit = i * bits as usize;
                let byte = self.row[bit / 8] as u32;
                let shift = 8 - bits - (bit % 8) as u32;
                (byte >> shift) & ((1 << bits) - 1)
            }
        }
    }

    /// Sample scaled to 0-255
    fn scaled(&self, i: usize) -> u8 {
        match self.bits {
            8 | 16 => self.raw(i) as u8,
            bits => (self.raw(i) * 255 / ((1 << bits) - 1)) as u8,
        }
    }
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let white = 255 - k as u32;
    [
        ((255 - c as u32) * white / 255) as u8,
        ((255 - m as u32) * white / 255) as u8,
        ((255 - y as u32) * white / 255) as u8,
    ]
}

/// Flip the samples of every component marked in `inverted`, mapping `v` to
/// `max - v` in place. Used for `/Decode` ranges that run from high to low.
pub fn invert_samples(
    samples: &mut [u8],
    width: u32,
    bits_per_component: u32,
    components: usize,
    inverted: &[bool],
) {
    if !matches!(bits_per_component, 1 | 2 | 4 | 8 | 16) || !inverted.contains(&true) {
        return;
    }
    let bits = bits_per_component as usize;
    let per_row = width as usize * components;
    let stride = (per_row * bits).div_ceil(8);
    if stride == 0 {
        return;
    }

    for row in samples.chunks_exact_mut(stride) {
        for i in (0..per_row).filter(|i| inverted.get(i % components) == Some(&true)) {
            match bits {
                8 => row[i] ^= 0xFF,
                16 => {
                    row[i * 2] ^= 0xFF;
                    row[i * 2 + 1] ^= 0xFF;
                }
                _ => {
                    let bit = i * bits;
                    let shift = 8 - bits - bit % 8;
                    row[bit / 8] ^= (((1u16 << bits) - 1) << shift) as u8;
                }
            }
        }
    }
}

/// Convert decoded stream samples into an image.
pub fn samples_to_image(
    samples: &[u8],
    width: u32,
    height: u32,
    bits_per_component: u32,
    color_space: &ColorSpace,
) -> Result<DynamicImage, String> {
    if !matches!(bits_per_component, 1 | 2 | 4 | 8 | 16) {
        return Err(format!("unsupported bits per component {}", bits_per_component));
    }
    if width == 0 || height == 0 {
        return Err("zero image dimensions".to_string());
    }

    let components = color_space.components();
    let stride = (width as usize * components * bits_per_component as usize).div_ceil(8);
    let needed = stride * height as usize;
    if samples.len() < needed {
        return Err(format!(
            "sample data too short: {} bytes, need {}",
            samples.len(),
            needed
        ));
    }

    let rows = samples[..needed].chunks_exact(stride);

    match color_space {
        ColorSpace::Gray => {
            let mut img = GrayImage::new(width, height);
            for (y, row) in rows.enumerate() {
                let reader = SampleReader {
                    row,
                    bits: bits_per_component,
                };
                for x in 0..width as usize {
                    img.put_pixel(x as u32, y as u32, image::Luma([reader.scaled(x)]));
                }
            }
            Ok(DynamicImage::ImageLuma8(img))
        }
        ColorSpace::Rgb | ColorSpace::Cmyk => {
            let mut img = RgbImage::new(width, height);
            for (y, row) in rows.enumerate() {
                let reader = SampleReader {
                    row,
                    bits: bits_per_component,
                };
                for x in 0..width as usize {
                    let i = x * components;
                    let rgb = if components == 3 {
                        [reader.scaled(i), reader.scaled(i + 1), reader.scaled(i + 2)]
                    } else {
                        cmyk_to_rgb(
                            reader.scaled(i),
                            reader.scaled(i + 1),
                            reader.scaled(i + 2),
                            reader.scaled(i + 3),
                        )
                    };
                    img.put_pixel(x as u32, y as u32, image::Rgb(rgb));
                }
            }
            Ok(DynamicImage::ImageRgb8(img))
        }
        ColorSpace::Indexed {
            base,
            hival,
            palette,
        } => {
            let base_components = base.components();
            let mut img = RgbImage::new(width, height);
            for (y, row) in rows.enumerate() {
                let reader = SampleReader {
                    row,
                    bits: bits_per_component,
                };
                for x in 0..width as usize {
                    let index = reader.raw(x).min(*hival) as usize;
                    let offset = index * base_components;
                    let entry = palette
                        .get(offset..offset + base_components)
                        .ok_or_else(|| format!("palette index {} out of range", index))?;
                    let rgb = match base.as_ref() {
                        ColorSpace::Gray => [entry[0], entry[0], entry[0]],
                        ColorSpace::Rgb => [entry[0], entry[1], entry[2]],
                        ColorSpace::Cmyk => cmyk_to_rgb(entry[0], entry[1], entry[2], entry[3]),
                        ColorSpace::Indexed { .. } => {
                            return Err("nested indexed color space".to_string());
                        }
                    };
                    img.put_pixel(x as u32, y as u32, image::Rgb(rgb));
                }
            }
            Ok(DynamicImage::ImageRgb8(img))
        }
    }
}

/// Encode an image as PNG with the given compression effort
pub fn encode_png(img: &DynamicImage, compression: CompressionType) -> image::ImageResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buffer, compression, FilterType::Adaptive);
    encoder.write_image(img.as_bytes(), img.width(), img.height(), img.color().into())?;
    Ok(buffer)
}
