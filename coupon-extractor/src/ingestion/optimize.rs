//! Storage optimization of accepted image payloads.

use image::codecs::png::CompressionType;
use image::{DynamicImage, RgbImage};
use tracing::debug;

use crate::error::ImageReencodeError;

use super::pdf::images::conversion::encode_png;
use super::pdf::ImageFormat;

/// Optimize a payload for storage without recompressing lossy formats.
///
/// Lossless payloads are decoded and re-encoded at maximum compression, with
/// any alpha channel flattened onto white. Any failure returns the original
/// bytes unchanged.
pub fn optimize_image_storage(data: Vec<u8>, format: ImageFormat) -> Vec<u8> {
    if format.is_lossy() {
        return data;
    }

    match reencode(&data, format) {
        Ok(optimized) => {
            debug!(
                format = %format,
                before = data.len(),
                after = optimized.len(),
                "Re-encoded image payload"
            );
            optimized
        }
        Err(e) => {
            debug!(format = %format, error = %e, "Keeping original image bytes");
            data
        }
    }
}

fn reencode(data: &[u8], format: ImageFormat) -> Result<Vec<u8>, ImageReencodeError> {
    let Some(codec) = format.codec() else {
        return Err(ImageReencodeError::UnsupportedFormat {
            format: format.to_string(),
        });
    };

    let img = image::load_from_memory_with_format(data, codec)?;
    let img = if img.color().has_alpha() {
        flatten_alpha(&img)
    } else {
        img
    };

    match format {
        ImageFormat::Png => Ok(encode_png(&img, CompressionType::Best)?),
        other => Err(ImageReencodeError::UnsupportedFormat {
            format: other.to_string(),
        }),
    }
}

/// Composite an image with transparency onto an opaque white background
pub fn flatten_alpha(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let mut flat = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        flat.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    DynamicImage::ImageRgb8(flat)
}
