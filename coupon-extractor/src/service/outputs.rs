//! Source enumeration, output naming and file side effects.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ProcessingError;
use crate::ingestion::AcceptedImage;

/// File name of the combined document written in merge mode
pub const MERGED_PDF_NAME: &str = "merged_coupons.pdf";

/// Regular files in `dir` (not descending) whose extension matches
/// `extension` case-insensitively, sorted by file name.
pub fn find_source_documents(
    dir: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>, ProcessingError> {
    let wanted = extension.trim_start_matches('.');
    let entries = std::fs::read_dir(dir).map_err(|e| ProcessingError::io(dir, e))?;

    let mut sources = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ProcessingError::io(dir, e))?;
        let path = entry.path();
        let matches = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(wanted));
        if matches && path.is_file() {
            sources.push(path);
        }
    }

    sources.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(sources)
}

/// `coupon_{document}_p{page}_i{index}.{ext}`
pub fn image_file_name(image: &AcceptedImage) -> String {
    format!(
        "coupon_{}_p{}_i{}.{}",
        image.document,
        image.page_number,
        image.image_index,
        image.format.extension()
    )
}

pub fn document_pdf_name(document: &str) -> String {
    format!("{}.pdf", document)
}

/// Write each accepted image to `destination`, returning the written paths.
pub fn write_image_files(
    images: &[AcceptedImage],
    destination: &Path,
) -> Result<Vec<PathBuf>, ProcessingError> {
    images
        .iter()
        .map(|image| {
            let path = destination.join(image_file_name(image));
            std::fs::write(&path, &image.data).map_err(|e| ProcessingError::io(&path, e))?;
            debug!(output = %path.display(), bytes = image.data.len(), "Wrote image");
            Ok(path)
        })
        .collect()
}

/// A source document that could not be removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Remove every path, collecting the ones that failed.
pub fn delete_sources(paths: &[PathBuf]) -> Vec<DeletionFailure> {
    paths
        .iter()
        .filter_map(|path| match std::fs::remove_file(path) {
            Ok(()) => {
                debug!(document = %path.display(), "Deleted source document");
                None
            }
            Err(e) => {
                warn!(document = %path.display(), error = %e, "Failed to delete source document");
                Some(DeletionFailure {
                    path: path.clone(),
                    message: e.to_string(),
                })
            }
        })
        .collect()
}
