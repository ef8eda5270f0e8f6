//! Run orchestration.
//!
//! Documents are processed concurrently on the blocking pool but their
//! results are consumed in enumeration order, so output naming and merge
//! order never depend on scheduling. Source deletion waits until every
//! document has finished.

mod document;
mod notify;
mod outputs;

use document::process_document;
pub use notify::{ConsoleNotifier, Notification, Notifier};
pub use outputs::{DeletionFailure, MERGED_PDF_NAME};

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::composer::write_layout;
use crate::config::{DocumentErrorPolicy, ExtractorConfig};
use crate::error::{ProcessingError, ServiceError, ServiceResult, error_chain};
use crate::ingestion::AcceptedImage;

/// A source document passed over under [`DocumentErrorPolicy::Skip`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub message: String,
}

/// Aggregate outcome of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Matching files found in the source directory
    pub documents_seen: usize,
    pub documents_processed: usize,
    /// At least one image file was written
    pub images_extracted: bool,
    /// At least one PDF (per-document or merged) was written
    pub documents_converted: bool,
    pub files_flagged_for_deletion: Vec<PathBuf>,
    pub skipped_documents: Vec<SkippedDocument>,
    pub deletion_failures: Vec<DeletionFailure>,
    /// Every image and PDF written, in creation order
    pub written_files: Vec<PathBuf>,
}

impl RunResult {
    pub fn produced_output(&self) -> bool {
        self.images_extracted || self.documents_converted
    }
}

/// Drives source documents through extraction, filtering and layout
pub struct CouponService {
    config: Arc<ExtractorConfig>,
}

impl CouponService {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Process every source document and report the outcome.
    ///
    /// Exactly one summary notification is sent. A fatal error is notified
    /// and then returned.
    pub async fn run(&self, notifier: &dyn Notifier) -> ServiceResult<RunResult> {
        match self.execute(notifier).await {
            Ok(result) => {
                let summary = if result.documents_seen == 0 {
                    Notification::NoInputFiles
                } else if result.produced_output() {
                    Notification::Completed
                } else {
                    Notification::NothingProduced
                };
                info!(
                    documents = result.documents_seen,
                    processed = result.documents_processed,
                    skipped = result.skipped_documents.len(),
                    written = result.written_files.len(),
                    deletion_failures = result.deletion_failures.len(),
                    "Run finished"
                );
                notifier.notify(summary);
                Ok(result)
            }
            Err(e) => {
                let message = error_chain(&e);
                error!(error = %message, "Run failed");
                notifier.notify(Notification::Fatal { message });
                Err(e)
            }
        }
    }

    async fn execute(&self, notifier: &dyn Notifier) -> ServiceResult<RunResult> {
        let config = &self.config;
        std::fs::create_dir_all(&config.destination_dir)
            .map_err(|e| ProcessingError::io(&config.destination_dir, e))?;

        let sources = outputs::find_source_documents(&config.source_dir, &config.source_extension)?;
        let mut result = RunResult {
            documents_seen: sources.len(),
            ..RunResult::default()
        };
        if sources.is_empty() {
            info!(source_dir = %config.source_dir.display(), "No source documents found");
            return Ok(result);
        }

        info!(
            documents = sources.len(),
            parallelism = config.parallelism(),
            "Processing source documents"
        );

        // Set on the first fatal error; documents not yet started are left alone
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut fatal: Option<ServiceError> = None;

        let mut merged: Vec<AcceptedImage> = Vec::new();
        let mut outcomes = stream::iter(sources)
            .map(|path| {
                let config = Arc::clone(&self.config);
                let cancelled = Arc::clone(&cancelled);
                async move {
                    let task_path = path.clone();
                    let joined = tokio::task::spawn_blocking(move || {
                        (!cancelled.load(Ordering::SeqCst))
                            .then(|| process_document(&task_path, &config))
                    })
                    .await;
                    (path, joined)
                }
            })
            .buffered(config.parallelism());

        // Keep polling after a fatal error so no document task outlives the run
        while let Some((path, joined)) = outcomes.next().await {
            if fatal.is_some() {
                continue;
            }

            let outcome = match joined {
                Ok(Some(outcome)) => outcome,
                Ok(None) => continue,
                Err(e) => {
                    cancelled.store(true, Ordering::SeqCst);
                    fatal = Some(ServiceError::Internal {
                        message: format!("document task for {} failed: {}", path.display(), e),
                    });
                    debug!("Waiting for in-flight documents before aborting");
                    continue;
                }
            };

            match outcome {
                Ok(outcome) => {
                    result.documents_processed += 1;
                    result.images_extracted |= !outcome.image_files.is_empty();
                    result.written_files.extend(outcome.image_files);
                    if let Some(pdf) = outcome.pdf {
                        result.documents_converted = true;
                        result.written_files.push(pdf);
                    }
                    if config.merge_pdf {
                        merged.extend(outcome.images);
                    }
                    if config.delete_fdf {
                        result.files_flagged_for_deletion.push(outcome.path);
                    }
                }
                Err(e)
                    if e.is_document_parse()
                        && config.on_document_error == DocumentErrorPolicy::Skip =>
                {
                    let message = error_chain(&e);
                    warn!(document = %path.display(), error = %message, "Skipping unreadable document");
                    notifier.notify(Notification::DocumentSkipped {
                        path: path.clone(),
                        message: message.clone(),
                    });
                    result.skipped_documents.push(SkippedDocument { path, message });
                }
                Err(e) => {
                    cancelled.store(true, Ordering::SeqCst);
                    fatal = Some(e.into());
                    debug!("Waiting for in-flight documents before aborting");
                }
            }
        }
        drop(outcomes);

        if let Some(e) = fatal {
            return Err(e);
        }

        if config.merge_pdf && result.documents_processed > 1 && !merged.is_empty() {
            let merged_path = config.destination_dir.join(MERGED_PDF_NAME);
            let per_page = config.images_per_page();
            let task_path = merged_path.clone();
            tokio::task::spawn_blocking(move || write_layout(&merged, per_page, &task_path))
                .await
                .map_err(|e| ServiceError::Internal {
                    message: format!("merge task failed: {}", e),
                })??;
            result.documents_converted = true;
            result.written_files.push(merged_path);
        }

        result.deletion_failures = outputs::delete_sources(&result.files_flagged_for_deletion);
        for failure in &result.deletion_failures {
            notifier.notify(Notification::DeletionFailed {
                path: failure.path.clone(),
                message: failure.message.clone(),
            });
        }

        Ok(result)
    }
}
