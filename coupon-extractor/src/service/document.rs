//! Per-document pipeline: extract, filter, write.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::outputs::{document_pdf_name, write_image_files};
use crate::composer::write_layout;
use crate::config::ExtractorConfig;
use crate::error::ProcessingError;
use crate::ingestion::{AcceptedImage, ingest_document};

/// What one source document produced
#[derive(Debug)]
pub struct DocumentOutcome {
    pub path: PathBuf,
    /// Accepted images in page-then-index order
    pub images: Vec<AcceptedImage>,
    pub image_files: Vec<PathBuf>,
    pub pdf: Option<PathBuf>,
}

/// Run one document through extraction and filtering, then write its
/// extracted images and composed PDF as configured.
///
/// Blocking; called from the runtime's blocking pool.
pub fn process_document(
    path: &Path,
    config: &ExtractorConfig,
) -> Result<DocumentOutcome, ProcessingError> {
    debug!(document = %path.display(), "Processing source document");
    let (document, images) = ingest_document(path, config.min_image_bytes)?;

    let image_files = if config.extract_images {
        write_image_files(&images, &config.destination_dir)?
    } else {
        Vec::new()
    };

    let pdf = if config.convert_pdf && !images.is_empty() {
        let pdf_path = config
            .destination_dir
            .join(document_pdf_name(document.name()));
        write_layout(&images, config.images_per_page(), &pdf_path)?;
        Some(pdf_path)
    } else {
        None
    };

    info!(
        document = %path.display(),
        accepted = images.len(),
        image_files = image_files.len(),
        pdf = pdf.is_some(),
        "Finished source document"
    );

    Ok(DocumentOutcome {
        path: path.to_path_buf(),
        images,
        image_files,
        pdf,
    })
}
