//! # I/O Error Types
//!
//! Everything that can go wrong between the filesystem and the core.

use std::path::PathBuf;

use phasefx_core::FxError;
use thiserror::Error;

/// Errors raised while reading or writing images and task lists.
#[derive(Error, Debug)]
pub enum IoError {
    /// Filesystem failure, tagged with the path involved.
    #[error("{path}: {source}")]
    Io {
        /// File or directory that failed.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// PNG decode or encode failure.
    #[error("{path}: {source}")]
    Image {
        /// Image file that failed.
        path: PathBuf,
        /// Underlying codec error.
        #[source]
        source: image::ImageError,
    },

    /// Malformed task-list entry.
    #[error("invalid task list: {0}")]
    Json(#[from] serde_json::Error),

    /// Image dimensions the core cannot represent.
    #[error("unsupported dimensions {width}x{height}")]
    Dimensions {
        /// Reported width.
        width: u64,
        /// Reported height.
        height: u64,
    },
}

impl IoError {
    /// Tags an OS error with the path it happened on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Tags a codec error with the path it happened on.
    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Image {
            path: path.into(),
            source,
        }
    }

    /// Converts into the core's collaborator error for identifier `id`.
    #[must_use]
    pub fn into_resolve(self, id: impl Into<String>) -> FxError {
        FxError::Resolve {
            id: id.into(),
            reason: self.to_string(),
        }
    }
}

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;
