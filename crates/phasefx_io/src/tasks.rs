//! # Task Lists
//!
//! `effects.txt` is not a JSON array but a stream of objects, one after the
//! other:
//!
//! ```text
//! {"inPath": "IMG_2020.png", "outPath": "IMG_2020_Out.png", "effects": ["S", "B"]}
//! {"inPath": "IMG_2724.png", "outPath": "IMG_2724_Out.png", "effects": ["G"]}
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoError, IoResult};

/// One entry of a task list, before it is bound to a data directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Input file name, relative to the data directory.
    pub in_path: String,
    /// Output file name, prefixed with the data directory on write.
    pub out_path: String,
    /// Effect identifiers in application order.
    #[serde(default)]
    pub effects: Vec<String>,
}

/// Parses every record in a stream of concatenated JSON objects.
///
/// Whitespace between objects is ignored; an empty stream yields no records.
///
/// # Errors
///
/// Returns [`IoError::Json`] on the first malformed object.
pub fn read_task_records<R: Read>(reader: R) -> IoResult<Vec<TaskRecord>> {
    serde_json::Deserializer::from_reader(reader)
        .into_iter::<TaskRecord>()
        .map(|record| record.map_err(IoError::from))
        .collect()
}

/// Opens and parses a task-list file.
///
/// # Errors
///
/// Returns [`IoError::Io`] if the file cannot be opened, otherwise as
/// [`read_task_records`].
pub fn read_task_file(path: impl AsRef<Path>) -> IoResult<Vec<TaskRecord>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IoError::io(path, e))?;
    read_task_records(BufReader::new(file))
}
