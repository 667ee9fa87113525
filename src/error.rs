use std::path::PathBuf;

use thiserror::Error;

use crate::models::ImageRef;

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("malformed PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("image {image} is not placed on page {page}")]
    ImageNotPlaced { page: usize, image: ImageRef },

    #[error("unsupported image {image}: {reason}")]
    UnsupportedImage { image: ImageRef, reason: String },

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub fn unsupported(image: ImageRef, reason: impl Into<String>) -> Self {
        Self::UnsupportedImage {
            image,
            reason: reason.into(),
        }
    }

    /// Filesystem failures abort a batch. Everything else is a problem with
    /// one document and can be recorded against it.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Image(image::ImageError::IoError(_)) => true,
            _ => false,
        }
    }
}
