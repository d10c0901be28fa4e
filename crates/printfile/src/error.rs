//! Error types for print-file handling.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`PrintFileError`].
pub type Result<T> = std::result::Result<T, PrintFileError>;

/// Errors that can occur while reading, writing or translating print files.
#[derive(Debug, Error)]
pub enum PrintFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("input path must be a .zip file: {}", .0.display())]
    NotAZip(PathBuf),

    #[error("archive does not contain print_settings.json")]
    MissingDocument,

    #[error("image '{0}' is referenced but not present under slices/")]
    MissingImage(String),

    #[error("invalid print settings: {0}")]
    InvalidDocument(String),

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error(transparent)]
    Core(#[from] dosemux_core::Error),
}

impl PrintFileError {
    pub(crate) fn invalid_document(reason: impl Into<String>) -> Self {
        Self::InvalidDocument(reason.into())
    }

    pub(crate) fn invalid_layout(reason: impl Into<String>) -> Self {
        Self::InvalidLayout(reason.into())
    }
}
