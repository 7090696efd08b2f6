//! # Pipeline Error Types

use phasefx_core::FxError;
use phasefx_io::IoError;
use thiserror::Error;

/// Errors that abort a whole run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid configuration or command line.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed TOML configuration file.
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Task list, image or config file I/O failure.
    #[error(transparent)]
    Io(#[from] IoError),

    /// A task or the scheduler failed.
    #[error(transparent)]
    Fx(#[from] FxError),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
