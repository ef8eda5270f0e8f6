//! Core types for PDF image extraction.

use strum::{Display, EnumString};

/// Encoded file format of an image payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ImageFormat {
    /// Stored as `DCTDecode`
    Jpeg,
    /// Raw samples expressed as a lossless PNG
    Png,
    /// Stored as `JPXDecode` (JPEG 2000)
    Jpx,
}

impl ImageFormat {
    /// File extension used when writing the payload to disk
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Jpx => "jpx",
        }
    }

    /// Lossy payloads are never re-encoded
    pub fn is_lossy(&self) -> bool {
        matches!(self, ImageFormat::Jpeg)
    }

    /// Matching codec in the `image` crate, if it can decode this format
    pub fn codec(&self) -> Option<image::ImageFormat> {
        match self {
            ImageFormat::Jpeg => Some(image::ImageFormat::Jpeg),
            ImageFormat::Png => Some(image::ImageFormat::Png),
            ImageFormat::Jpx => None,
        }
    }
}

/// One raster image embedded in a source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    /// Payload bytes as stored (or, for raw samples, as lossless PNG)
    pub data: Vec<u8>,
    pub format: ImageFormat,
    /// Pixel width recorded by the document
    pub width: u32,
    /// Pixel height recorded by the document
    pub height: u32,
    /// Base name of the owning document (file name without extension)
    pub document: String,
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Position among the images listed on the page (1-indexed)
    pub image_index: u32,
}

impl SourceImage {
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_format_tags() {
        assert_eq!(ImageFormat::Jpeg.to_string(), "jpeg");
        assert_eq!(ImageFormat::from_str("png").unwrap(), ImageFormat::Png);
        assert_eq!(ImageFormat::Jpx.extension(), "jpx");
        assert!(ImageFormat::Jpeg.is_lossy());
        assert!(!ImageFormat::Png.is_lossy());
        assert!(ImageFormat::Jpx.codec().is_none());
    }
}
