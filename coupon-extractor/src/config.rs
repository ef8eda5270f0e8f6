//! Run configuration.
//!
//! The configuration is a plain value built once before the pipeline starts and
//! handed to the orchestrator. It is persisted as JSON by [`ConfigStore`] and
//! collected interactively through a [`setup::SetupPrompt`] when nothing is stored yet.

mod loader;
mod setup;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString};

pub use loader::{ConfigStore, ensure_config};
pub use setup::TerminalSetup;

/// Smallest and largest number of coupons placed on one output page
pub const MIN_COUPONS_PER_PAGE: u8 = 1;
pub const MAX_COUPONS_PER_PAGE: u8 = 5;

/// What to do when a source document cannot be parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentErrorPolicy {
    /// Fail the whole run on the first unreadable document
    #[default]
    Abort,
    /// Report the document as skipped and keep going
    Skip,
}

/// Complete configuration for one extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Directory scanned (non-recursively) for source documents
    pub source_dir: PathBuf,

    /// Directory receiving extracted images and output PDFs
    pub destination_dir: PathBuf,

    /// Write every accepted image as its own file
    #[serde(default = "default_extract_images")]
    pub extract_images: bool,

    /// Write one composed PDF per source document
    #[serde(default = "default_convert_pdf")]
    pub convert_pdf: bool,

    /// Hide completion and warning notifications
    #[serde(default)]
    pub suppress_messages: bool,

    /// Delete source documents once the whole run has succeeded
    #[serde(default)]
    pub delete_fdf: bool,

    #[serde(default = "default_coupons_per_page")]
    pub coupons_per_page: u8,

    /// Also write one PDF combining every document's coupons
    #[serde(default)]
    pub merge_pdf: bool,

    /// Images with fewer payload bytes than this are treated as decoration
    #[serde(default = "default_min_image_bytes")]
    pub min_image_bytes: usize,

    /// File extension (without the dot) identifying source documents
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    #[serde(default)]
    pub on_document_error: DocumentErrorPolicy,

    /// Upper bound on documents processed at once; `None` uses available parallelism
    #[serde(default)]
    pub max_parallel_documents: Option<usize>,
}

impl ExtractorConfig {
    /// Build a configuration with default options for the given directories.
    pub fn new(source_dir: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            destination_dir: destination_dir.into(),
            extract_images: default_extract_images(),
            convert_pdf: default_convert_pdf(),
            suppress_messages: false,
            delete_fdf: false,
            coupons_per_page: default_coupons_per_page(),
            merge_pdf: false,
            min_image_bytes: default_min_image_bytes(),
            source_extension: default_source_extension(),
            on_document_error: DocumentErrorPolicy::default(),
            max_parallel_documents: None,
        }
    }

    /// Coupons per page clamped to the supported range
    pub fn images_per_page(&self) -> usize {
        self.coupons_per_page
            .clamp(MIN_COUPONS_PER_PAGE, MAX_COUPONS_PER_PAGE) as usize
    }

    /// Number of documents to process concurrently (never zero)
    pub fn parallelism(&self) -> usize {
        self.max_parallel_documents
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}

// ==================== Default Value Functions ====================

pub(crate) fn default_extract_images() -> bool {
    true
}

pub(crate) fn default_convert_pdf() -> bool {
    true
}

/// Stored records written before the option existed lay out three per page
pub(crate) fn default_coupons_per_page() -> u8 {
    3
}

/// Interactive setup proposes four per page
pub(crate) fn default_setup_coupons_per_page() -> u8 {
    4
}

pub(crate) fn default_min_image_bytes() -> usize {
    20 * 1024
}

pub(crate) fn default_source_extension() -> String {
    "fdf".to_string()
}
