// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Command-line parsing.
//!
//! getopt-style short flags: `-t 8` and `-t8` are equivalent. Anything
//! else is a usage error.

use std::io::{self, Write};
use std::time::Duration;

use dlab_bank::config::{NUM_THREADS, TRANSFERS_PER_THREAD};
use dlab_bank::{LabError, Mode};
use thiserror::Error;

use crate::output;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub threads: usize,
    pub transfers: usize,
    pub mode: Mode,
    pub seed: Option<u64>,
    pub watchdog: Option<Duration>,
    pub verbose: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            threads: NUM_THREADS,
            transfers: TRANSFERS_PER_THREAD,
            mode: Mode::Naive,
            seed: None,
            watchdog: None,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(RunOptions),
    Help,
}

#[derive(Debug, Error)]
pub enum ArgError {
    #[error("unknown option `{0}`")]
    UnknownOption(String),
    #[error("unexpected argument `{0}`")]
    UnexpectedArgument(String),
    #[error("option -{0} requires a value")]
    MissingValue(char),
    #[error("option -{flag}: `{value}` is not a valid number")]
    BadNumber { flag: char, value: String },
    #[error(transparent)]
    Mode(#[from] LabError),
}

/// Parse the arguments that follow the program name.
pub fn parse_args<I>(args: I) -> Result<Command, ArgError>
where
    I: IntoIterator<Item = String>,
{
    let mut opts = RunOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut chars = arg.chars();
        let flag = match (chars.next(), chars.next()) {
            (Some('-'), Some(flag)) => flag,
            _ => return Err(ArgError::UnexpectedArgument(arg)),
        };
        let attached: String = chars.collect();

        match flag {
            'h' | 'v' if attached.is_empty() => {
                if flag == 'h' {
                    return Ok(Command::Help);
                }
                opts.verbose = true;
            }
            't' | 'n' | 'm' | 's' | 'w' => {
                let value = if attached.is_empty() {
                    args.next().ok_or(ArgError::MissingValue(flag))?
                } else {
                    attached
                };
                match flag {
                    't' => opts.threads = number(flag, &value)?,
                    'n' => opts.transfers = number(flag, &value)?,
                    'm' => opts.mode = value.parse()?,
                    's' => opts.seed = Some(number(flag, &value)?),
                    _ => opts.watchdog = Some(Duration::from_secs(number(flag, &value)?)),
                }
            }
            _ => return Err(ArgError::UnknownOption(arg)),
        }
    }

    Ok(Command::Run(opts))
}

fn number<T: std::str::FromStr>(flag: char, value: &str) -> Result<T, ArgError> {
    value.trim().parse().map_err(|_| ArgError::BadNumber {
        flag,
        value: value.to_string(),
    })
}

pub fn write_usage<W: Write>(out: &mut W, program: &str) -> io::Result<()> {
    writeln!(
        out,
        "Usage: {} [-t threads] [-n transfers] [-m mode] [-s seed] [-w secs] [-v]",
        output::title(program)
    )?;
    writeln!(out, "  mode: 0=naive, 1=timeout, 2=ordered, 3=trylock")?;
    writeln!(out)?;
    writeln!(out, "{}", output::section_header("Options:"))?;
    let rows = [
        ("-t", "N", "worker threads (default 8)"),
        ("-n", "K", "transfers per worker (default 1000)"),
        ("-m", "M", "transfer strategy (default 0)"),
        ("-s", "SEED", "fixed random seed (default: wall clock)"),
        ("-w", "SECS", "abort and report a hang after SECS seconds"),
        ("-v", "", "debug logging on stderr (RUST_LOG overrides)"),
        ("-h", "", "show this help"),
    ];
    for (flag, arg, help) in rows {
        writeln!(out, "  {} {:<5} {}", output::flag(flag), output::arg(arg), help)?;
    }
    Ok(())
}
