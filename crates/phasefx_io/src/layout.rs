//! # Data Layout
//!
//! Where inputs come from and where outputs go:
//!
//! ```text
//! <input_root>/<data_dir>/<inPath>     read
//! <output_root>/<data_dir>_<outPath>   written
//! ```
//!
//! One task list is shared by every data directory; it is re-read once per
//! directory so each directory yields its own copy of every task.

use std::path::{Path, PathBuf};

use phasefx_core::Task;

use crate::error::IoResult;
use crate::tasks::{read_task_file, TaskRecord};

/// Locations of the task list and the input/output trees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataLayout {
    /// The shared task list.
    pub effects_file: PathBuf,
    /// Parent of every input data directory.
    pub input_root: PathBuf,
    /// Flat directory receiving every output.
    pub output_root: PathBuf,
}

impl Default for DataLayout {
    /// `../data/effects.txt`, `../data/in`, `../data/out`.
    fn default() -> Self {
        Self::under("../data")
    }
}

impl DataLayout {
    /// Standard layout below `root`: `effects.txt`, `in/`, `out/`.
    #[must_use]
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            effects_file: root.join("effects.txt"),
            input_root: root.join("in"),
            output_root: root.join("out"),
        }
    }

    /// Input path of `record` inside `data_dir`.
    #[must_use]
    pub fn input_path(&self, data_dir: &str, record: &TaskRecord) -> PathBuf {
        self.input_root.join(data_dir).join(&record.in_path)
    }

    /// Output path of `record` for `data_dir`.
    #[must_use]
    pub fn output_path(&self, data_dir: &str, record: &TaskRecord) -> PathBuf {
        self.output_root
            .join(format!("{data_dir}_{}", record.out_path))
    }

    /// Binds `record` to `data_dir`.
    #[must_use]
    pub fn task_for(&self, data_dir: &str, record: TaskRecord) -> Task {
        Task::new(
            self.input_path(data_dir, &record).to_string_lossy(),
            self.output_path(data_dir, &record).to_string_lossy(),
            record.effects,
        )
    }
}

/// Splits a `+`-separated directory list (`small+big`), dropping empties.
#[must_use]
pub fn split_data_dirs(joined: &str) -> Vec<String> {
    joined
        .split('+')
        .map(str::trim)
        .filter(|dir| !dir.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Builds the full task list: every record, once per data directory, in
/// directory order then file order.
///
/// # Errors
///
/// Returns an error if the task list cannot be opened or parsed.
pub fn build_tasks<S: AsRef<str>>(layout: &DataLayout, data_dirs: &[S]) -> IoResult<Vec<Task>> {
    let mut tasks = Vec::new();
    for dir in data_dirs {
        let dir = dir.as_ref();
        let records = read_task_file(&layout.effects_file)?;
        tracing::debug!(data_dir = dir, records = records.len(), "read task list");
        tasks.extend(records.into_iter().map(|record| layout.task_for(dir, record)));
    }
    Ok(tasks)
}
