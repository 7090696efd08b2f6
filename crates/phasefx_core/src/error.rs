//! # Core Error Types
//!
//! Every failure in the core is either a static misuse (propagate and abort)
//! or unrecoverable. There is no retryable class.

use thiserror::Error;

/// Errors that can occur while scheduling or processing images.
#[derive(Error, Debug)]
pub enum FxError {
    /// An effect identifier outside the closed set `{S, E, B, G}`.
    #[error("unknown effect: {0:?}")]
    UnknownEffect(String),

    /// Worker pools and band executors need at least one worker.
    #[error("invalid worker count: {0} (must be at least 1)")]
    InvalidWorkerCount(usize),

    /// A pixel buffer does not match the declared bounds.
    #[error("buffer size mismatch: expected {expected} pixels, got {actual}")]
    BufferSizeMismatch {
        /// `width * height` of the declared bounds.
        expected: usize,
        /// Length of the buffer that was supplied.
        actual: usize,
    },

    /// A collaborator could not load or store a task's image.
    #[error("failed to resolve {id}: {reason}")]
    Resolve {
        /// Source or destination identifier that failed.
        id: String,
        /// Human-readable cause reported by the collaborator.
        reason: String,
    },

    /// A task failed and the enclosing run was aborted.
    #[error("task {task} aborted: {cause}")]
    TaskAborted {
        /// Source identifier of the failing task.
        task: String,
        /// What went wrong inside the task.
        #[source]
        cause: Box<FxError>,
    },

    /// A pool worker panicked while processing a task.
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),

    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl FxError {
    /// Wraps this error as the cause of an aborted task.
    #[must_use]
    pub fn in_task(self, task: impl Into<String>) -> Self {
        Self::TaskAborted {
            task: task.into(),
            cause: Box::new(self),
        }
    }
}

/// Result type for core operations.
pub type FxResult<T> = Result<T, FxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_abort_keeps_cause() {
        let err = FxError::UnknownEffect("X".to_string()).in_task("in/a.png");
        let message = err.to_string();
        assert!(message.contains("in/a.png"));
        assert!(message.contains("unknown effect"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
