//! # PHASEFX
//!
//! Applies image effects to every task of a task list, across one or more
//! data directories, in one of four run modes.
//!
//! ```text
//! phasefx small+big bspsteal 8
//!   │
//!   ├─ cli      → CliArgs → PipelineConfig
//!   ├─ phasefx_io::build_tasks  (effects.txt × data dirs)
//!   └─ runner   → s | parfiles | bsp | bspsteal → PNGs in output_root
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cli;
pub mod config;
pub mod error;
pub mod runner;

pub use cli::{CliArgs, Command, USAGE};
pub use config::{Mode, PipelineConfig};
pub use error::{PipelineError, PipelineResult};
pub use runner::{run_pipeline, run_tasks, RunSummary};
