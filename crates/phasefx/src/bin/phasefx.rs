//! # PHASEFX Editor
//!
//! ```bash
//! phasefx small+big bspsteal 8
//! ```
//!
//! Prints the elapsed processing time in seconds on success.

use std::process::ExitCode;

use phasefx::{run_pipeline, CliArgs, Command, PipelineResult, USAGE};

fn main() -> ExitCode {
    let command = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    let cli = match command {
        Command::Help => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Command::Run(cli) => cli,
    };

    match run(&cli) {
        Ok(seconds) => {
            println!("{seconds:.2}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &CliArgs) -> PipelineResult<f64> {
    let config = cli.resolve()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_max_level(config.level()?)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .init();

    let summary = run_pipeline(&config)?;
    Ok(summary.elapsed.as_secs_f64())
}
