//! Source document loading.
//!
//! Coupon `.fdf` downloads are PDF bodies carrying an `%FDF-` header; both
//! headers are accepted.

pub mod images;

use std::path::Path;

use lopdf::Document;
use tracing::debug;

use crate::error::ProcessingError;

pub use images::{ImageExtractor, ImageFormat, SourceImage};

const PDF_HEADER: &[u8] = b"%PDF-";
const FDF_HEADER: &[u8] = b"%FDF-";

/// A fully loaded source document
pub struct PdfDocument {
    name: String,
    inner: Document,
}

impl PdfDocument {
    /// Load and parse a document from disk.
    pub fn open(path: &Path) -> Result<Self, ProcessingError> {
        let bytes = std::fs::read(path).map_err(|e| ProcessingError::DocumentParse {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        Self::from_bytes(path, bytes)
    }

    /// Parse an in-memory document that was read from `path`.
    pub fn from_bytes(path: &Path, mut bytes: Vec<u8>) -> Result<Self, ProcessingError> {
        if bytes.starts_with(FDF_HEADER) {
            debug!(document = %path.display(), "Treating FDF header as PDF");
            bytes[..PDF_HEADER.len()].copy_from_slice(PDF_HEADER);
        }

        let inner = Document::load_mem(&bytes).map_err(|e| ProcessingError::DocumentParse {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

        Ok(Self {
            name: document_base_name(path),
            inner,
        })
    }

    /// File name without extension, used to name outputs
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Start a fresh pass over the embedded images
    pub fn images(&self) -> ImageExtractor<'_> {
        ImageExtractor::new(&self.inner, &self.name)
    }
}

/// File name without its final extension
pub fn document_base_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
