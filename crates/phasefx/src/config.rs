//! # Pipeline Configuration
//!
//! Built from three layers, later layers winning:
//!
//! ```text
//! PipelineConfig::default()  →  --config <file.toml>  →  positional CLI args
//! ```
//!
//! ## Example file
//!
//! ```toml
//! mode = "bspsteal"
//! threads = 8
//! data_dirs = ["small", "big"]
//! effects_file = "../data/effects.txt"
//! input_root = "../data/in"
//! output_root = "../data/out"
//! log_level = "info"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use phasefx_io::{DataLayout, IoError};
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::{PipelineError, PipelineResult};

/// How tasks are spread over threads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// One thread, one image at a time.
    #[default]
    #[serde(rename = "s")]
    Sequential,
    /// Whole images pulled from a shared queue, each processed on one thread.
    #[serde(rename = "parfiles")]
    ParFiles,
    /// One image at a time, every effect split into barrier-synchronized
    /// row bands.
    #[serde(rename = "bsp")]
    Bsp,
    /// Work-stealing pool of images, each processed in row bands.
    #[serde(rename = "bspsteal")]
    BspSteal,
}

impl Mode {
    /// Every mode, in command-line order.
    pub const ALL: [Self; 4] = [Self::Sequential, Self::ParFiles, Self::Bsp, Self::BspSteal];

    /// Name used on the command line and in config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "s",
            Self::ParFiles => "parfiles",
            Self::Bsp => "bsp",
            Self::BspSteal => "bspsteal",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "unknown mode {s:?} (expected one of: s, parfiles, bsp, bspsteal)"
                ))
            })
    }
}

/// Everything a run needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Scheduling strategy.
    pub mode: Mode,
    /// Worker / band count for the parallel modes.
    pub threads: usize,
    /// Data directories under `input_root`, processed in order.
    pub data_dirs: Vec<String>,
    /// Shared task list.
    pub effects_file: PathBuf,
    /// Parent of the data directories.
    pub input_root: PathBuf,
    /// Directory receiving every output.
    pub output_root: PathBuf,
    /// Maximum log level (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let layout = DataLayout::default();
        Self {
            mode: Mode::default(),
            threads: std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            data_dirs: Vec::new(),
            effects_file: layout.effects_file,
            input_root: layout.input_root,
            output_root: layout.output_root,
            log_level: "info".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Default configuration with the standard layout below `root`.
    #[must_use]
    pub fn under(root: impl AsRef<Path>) -> Self {
        let layout = DataLayout::under(root);
        Self {
            effects_file: layout.effects_file,
            input_root: layout.input_root,
            output_root: layout.output_root,
            ..Self::default()
        }
    }

    /// Parses a TOML document; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Toml`] on malformed input or unknown keys.
    pub fn from_toml_str(text: &str) -> PipelineResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the file cannot be read, otherwise as
    /// [`PipelineConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| IoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Paths of the task list and data trees.
    #[must_use]
    pub fn layout(&self) -> DataLayout {
        DataLayout {
            effects_file: self.effects_file.clone(),
            input_root: self.input_root.clone(),
            output_root: self.output_root.clone(),
        }
    }

    /// Parsed [`PipelineConfig::log_level`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for an unknown level name.
    pub fn level(&self) -> PipelineResult<Level> {
        self.log_level
            .parse()
            .map_err(|_| PipelineError::Config(format!("unknown log level {:?}", self.log_level)))
    }

    /// Checks the configuration before anything runs.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if `threads` is zero, no data
    /// directory is given, or the log level is unknown.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.threads == 0 {
            return Err(PipelineError::Config("threads must be at least 1".to_string()));
        }
        if self.data_dirs.is_empty() {
            return Err(PipelineError::Config("no data directories given".to_string()));
        }
        self.level().map(|_| ())
    }
}
