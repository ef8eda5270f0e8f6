//! Image ingestion: extraction from source documents, size and duplicate
//! filtering, and storage optimization.

pub mod dedup;
pub mod hash;
pub mod optimize;
pub mod pdf;

pub use dedup::{AcceptedImage, filter_images};
pub use hash::SeenSet;
pub use pdf::{ImageFormat, PdfDocument};

use std::path::Path;

use tracing::info;

use crate::error::ProcessingError;

/// Extract and filter all images of one document with a fresh [`SeenSet`].
///
/// Returns the accepted images in page-then-index order.
pub fn ingest_document(
    path: &Path,
    min_bytes: usize,
) -> Result<(PdfDocument, Vec<AcceptedImage>), ProcessingError> {
    let document = PdfDocument::open(path)?;
    let mut seen = SeenSet::new();

    let accepted: Vec<AcceptedImage> =
        filter_images(document.images(), &mut seen, min_bytes).collect();

    info!(
        document = %path.display(),
        pages = document.page_count(),
        accepted = accepted.len(),
        "Extracted coupon images"
    );

    Ok((document, accepted))
}
