//! # PHASEFX I/O
//!
//! The filesystem side of a run:
//! - [`png`]: 16-bit RGBA decode/encode
//! - [`tasks`]: `effects.txt` parsing
//! - [`layout`]: data directories and output naming
//! - [`PngResolver`]: plugs all of the above into the core scheduler
//!
//! ## Example
//!
//! ```rust,ignore
//! use phasefx_io::{build_tasks, DataLayout, PngResolver};
//!
//! let tasks = build_tasks(&DataLayout::default(), &["small", "big"])?;
//! phasefx_core::schedule_tasks(tasks, 8, &PngResolver)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod layout;
pub mod png;
pub mod resolver;
pub mod tasks;

pub use error::{IoError, IoResult};
pub use layout::{build_tasks, split_data_dirs, DataLayout};
pub use png::{load_png, save_png};
pub use resolver::PngResolver;
pub use tasks::{read_task_file, read_task_records, TaskRecord};
