use std::path::PathBuf;

use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No configuration found and none was supplied by setup")]
    ConfigMissing,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Document processing failed")]
    Processing(#[from] ProcessingError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Document processing errors
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Failed to parse document {}", path.display())]
    DocumentParse {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to embed image {index} on output page {page}: {message}")]
    ImageEmbed {
        page: usize,
        index: usize,
        message: String,
    },

    #[error("Failed to write output document {}", path.display())]
    DocumentWrite {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("IO error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to decode or re-encode an image payload.
///
/// Never surfaced to the user; callers fall back to the original bytes.
#[derive(Error, Debug)]
pub enum ImageReencodeError {
    #[error("Image format {format} cannot be re-encoded")]
    UnsupportedFormat { format: String },

    #[error("Image codec failed")]
    Codec(#[from] image::ImageError),
}

impl ProcessingError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProcessingError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that mean the source document itself is unreadable.
    pub fn is_document_parse(&self) -> bool {
        matches!(self, ProcessingError::DocumentParse { .. })
    }
}

/// Render an error with its whole source chain, for user-facing messages
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
