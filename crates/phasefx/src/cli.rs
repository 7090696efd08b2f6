//! # Command Line
//!
//! ```bash
//! phasefx <data_dirs> [mode] [threads] [--config <file>] [-v]
//! phasefx small+big bspsteal 8
//! ```
//!
//! Parsed by hand, as a flat walk over `std::env::args`.

use std::path::PathBuf;

use crate::config::{Mode, PipelineConfig};
use crate::error::{PipelineError, PipelineResult};

/// Usage text printed by `--help` and on bad input.
pub const USAGE: &str = "\
Usage: phasefx <data_dirs> [mode] [threads] [OPTIONS]

Arguments:
  <data_dirs>   Data directories under the input root, joined with '+' (e.g. small+big)
  [mode]        s (sequential), parfiles, bsp, bspsteal (default: s)
  [threads]     Worker count for the parallel modes (default: available cores)

Options:
  -c, --config <FILE>   Load settings from a TOML file first
  -v, --verbose         Log at debug level
  -h, --help            Show this help";

/// What the command line asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print [`USAGE`] and exit.
    Help,
    /// Process images.
    Run(CliArgs),
}

/// Parsed arguments; `None` means "keep the config value".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// `+`-joined data directories.
    pub data_dirs: Option<String>,
    /// Run mode.
    pub mode: Option<Mode>,
    /// Worker count.
    pub threads: Option<usize>,
    /// TOML file loaded before the positional overrides.
    pub config: Option<PathBuf>,
    /// Force debug logging.
    pub verbose: bool,
}

impl CliArgs {
    /// Parses arguments, excluding the program name.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for unknown flags, a flag missing
    /// its value, an unknown mode, a non-numeric thread count, or extra
    /// positionals.
    pub fn parse<I>(args: I) -> PipelineResult<Command>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        let mut parsed = Self::default();
        let mut positionals = Vec::new();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--help" | "-h" => return Ok(Command::Help),
                "--verbose" | "-v" => parsed.verbose = true,
                "--config" | "-c" => {
                    let path = args.get(i + 1).ok_or_else(|| {
                        PipelineError::Config(format!("{} needs a file", args[i]))
                    })?;
                    parsed.config = Some(PathBuf::from(path));
                    i += 1;
                }
                flag if flag.starts_with('-') => {
                    return Err(PipelineError::Config(format!("unknown option {flag:?}")));
                }
                value => positionals.push(value.to_string()),
            }
            i += 1;
        }

        let mut positionals = positionals.into_iter();
        parsed.data_dirs = positionals.next();
        parsed.mode = positionals.next().map(|m| m.parse::<Mode>()).transpose()?;
        parsed.threads = positionals
            .next()
            .map(|t| {
                t.parse::<usize>()
                    .map_err(|_| PipelineError::Config(format!("invalid thread count {t:?}")))
            })
            .transpose()?;
        if let Some(extra) = positionals.next() {
            return Err(PipelineError::Config(format!("unexpected argument {extra:?}")));
        }

        Ok(Command::Run(parsed))
    }

    /// Builds the effective configuration: defaults, then `--config`, then
    /// positionals.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded.
    pub fn resolve(&self) -> PipelineResult<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_toml_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(dirs) = &self.data_dirs {
            config.data_dirs = phasefx_io::split_data_dirs(dirs);
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.verbose {
            config.log_level = "debug".to_string();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> PipelineResult<Command> {
        CliArgs::parse(args.iter().map(ToString::to_string))
    }

    fn run_args(args: &[&str]) -> CliArgs {
        match parse(args).unwrap() {
            Command::Run(cli) => cli,
            Command::Help => panic!("expected run"),
        }
    }

    #[test]
    fn test_positionals() {
        let cli = run_args(&["small+big", "bspsteal", "8"]);
        assert_eq!(cli.data_dirs.as_deref(), Some("small+big"));
        assert_eq!(cli.mode, Some(Mode::BspSteal));
        assert_eq!(cli.threads, Some(8));

        let config = cli.resolve().unwrap();
        assert_eq!(config.data_dirs, vec!["small", "big"]);
        assert_eq!(config.threads, 8);
    }

    #[test]
    fn test_only_data_dirs_keeps_defaults() {
        let config = run_args(&["small"]).resolve().unwrap();
        assert_eq!(config.mode, Mode::Sequential);
        assert_eq!(config.threads, PipelineConfig::default().threads);
    }

    #[test]
    fn test_help_wins() {
        assert_eq!(parse(&["small", "-h"]).unwrap(), Command::Help);
    }

    #[test]
    fn test_flags() {
        let cli = run_args(&["-v", "small", "--config", "run.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("run.toml")));
        assert_eq!(cli.data_dirs.as_deref(), Some("small"));
    }

    #[test]
    fn test_bad_input_rejected() {
        assert!(parse(&["small", "fast"]).is_err());
        assert!(parse(&["small", "bsp", "many"]).is_err());
        assert!(parse(&["small", "bsp", "4", "extra"]).is_err());
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["--turbo"]).is_err());
    }

    #[test]
    fn test_config_file_then_positionals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, "mode = \"bsp\"\nthreads = 3\ndata_dirs = [\"big\"]\n").unwrap();

        let from_file = run_args(&["--config", path.to_str().unwrap()]).resolve().unwrap();
        assert_eq!(from_file.mode, Mode::Bsp);
        assert_eq!(from_file.data_dirs, vec!["big"]);

        let overridden = run_args(&["small", "parfiles", "--config", path.to_str().unwrap()])
            .resolve()
            .unwrap();
        assert_eq!(overridden.mode, Mode::ParFiles);
        assert_eq!(overridden.threads, 3);
        assert_eq!(overridden.data_dirs, vec!["small"]);
    }
}
