// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Deadlock Lab CLI - runs the account-transfer workbench.

mod args;
mod logging;
mod output;

use std::env;
use std::io::{self, Write};
use std::process;

use dlab_bank::{write_banner, Lab, LabConfig, LabError, RunOutcome, StatsSnapshot, Tuning};
use thiserror::Error;

use crate::args::{Command, RunOptions};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Lab(#[from] LabError),
    #[error("writing output: {0}")]
    Io(#[from] io::Error),
}

fn main() {
    output::init();

    let mut argv = env::args();
    let program = argv.next().unwrap_or_else(|| "deadlock-lab".to_string());

    let command = match args::parse_args(argv) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}: {}", output::error_label(), e);
            let _ = args::write_usage(&mut io::stderr().lock(), &program);
            process::exit(1);
        }
    };

    let code = match command {
        Command::Help => match args::write_usage(&mut io::stdout().lock(), &program) {
            Ok(()) => 0,
            Err(_) => 1,
        },
        Command::Run(opts) => match cmd_run(opts) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("{}: {}", output::error_label(), e);
                1
            }
        },
    };
    process::exit(code);
}

/// Run the lab and print the report. Returns the exit code.
fn cmd_run(opts: RunOptions) -> Result<i32, CliError> {
    logging::init(opts.verbose);

    let mut config = LabConfig::new(opts.mode, opts.threads, opts.transfers)
        .with_tuning(Tuning::from_env()?);
    if let Some(seed) = opts.seed {
        config = config.with_seed(seed);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_banner(&mut out, &config)?;
    out.flush()?;

    let lab = Lab::new(config)?;
    let outcome = match opts.watchdog {
        Some(limit) => lab.run_with_watchdog(limit)?,
        None => RunOutcome::Finished(lab.run()?),
    };

    match outcome {
        RunOutcome::Finished(report) => {
            report.write_to(&mut out)?;
            out.flush()?;
            if report.is_conserved() {
                Ok(0)
            } else {
                eprintln!("ERROR: Balance mismatch! Money was lost or created.");
                Ok(1)
            }
        }
        RunOutcome::Hung { after, stats } => {
            write_hang(&mut out, after.as_secs_f64(), &stats)?;
            out.flush()?;
            eprintln!(
                "{}: no completion within {:.3} seconds, workers are deadlocked",
                output::hang_label(),
                after.as_secs_f64()
            );
            Ok(1)
        }
    }
}

fn write_hang<W: Write>(out: &mut W, secs: f64, stats: &StatsSnapshot) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "=== Watchdog ===")?;
    writeln!(out, "No completion after {secs:.3} seconds")?;
    writeln!(out, "Successful transfers before hang: {}", stats.successful_transfers)?;
    writeln!(out, "FAIL: Run did not terminate (deadlock).")
}
