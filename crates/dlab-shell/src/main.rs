// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! SLOsh - a small teaching shell.
//!
//! Reads one line at a time, runs built-ins in-process and everything else
//! as a pipeline of child processes. Ctrl+C interrupts the foreground
//! pipeline, never the shell; end of input exits.

mod builtin;
mod exec;
mod lexer;
mod parser;
mod signal;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::builtin::{Builtin, Flow};

fn main() {
    init_logging();

    if let Err(e) = signal::install() {
        eprintln!("slosh: sigaction: {e}");
        process::exit(1);
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    loop {
        if let Err(e) = show_prompt(&mut io::stdout().lock()) {
            eprintln!("slosh: {e}");
            break;
        }

        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                eprintln!("slosh: read: {e}");
                break;
            }
        }
        // Ctrl+C at the prompt has already been answered with a newline.
        signal::take_interrupted();

        if eval(&line) == Flow::Exit {
            break;
        }
    }

    println!("SLOsh exiting...");
}

/// Run one input line.
fn eval(line: &str) -> Flow {
    let pipeline = match parser::parse_line(line) {
        Ok(Some(pipeline)) => pipeline,
        Ok(None) => return Flow::Continue,
        Err(e) => {
            eprintln!("slosh: {e}");
            return Flow::Continue;
        }
    };

    if let Some(builtin) = Builtin::from_pipeline(&pipeline) {
        return match builtin.run() {
            Ok(flow) => flow,
            Err(e) => {
                eprintln!("slosh: {e}");
                Flow::Continue
            }
        };
    }

    match exec::run_pipeline(&pipeline) {
        Ok(statuses) => {
            if signal::take_interrupted() {
                // Interrupted children leave the cursor mid-line.
                println!();
            }
            debug!(stages = statuses.len(), last = ?statuses.last(), "pipeline done");
        }
        Err(e) => eprintln!("slosh: {e}"),
    }
    Flow::Continue
}

/// `<cwd>> `, or `SLOsh> ` when the working directory is unreadable.
fn prompt() -> String {
    match env::current_dir() {
        Ok(cwd) => format!("{}> ", cwd.display()),
        Err(_) => "SLOsh> ".to_string(),
    }
}

fn show_prompt<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(prompt().as_bytes())?;
    out.flush()
}

/// Diagnostics go to stderr and stay silent unless `RUST_LOG` asks.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_shows_working_directory() {
        let cwd = env::current_dir().unwrap();
        assert_eq!(prompt(), format!("{}> ", cwd.display()));
    }

    #[test]
    fn prompt_is_flushed_without_newline() {
        let mut out = Vec::new();
        show_prompt(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("> "));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn blank_and_bad_lines_continue() {
        assert_eq!(eval("\n"), Flow::Continue);
        assert_eq!(eval("| nothing\n"), Flow::Continue);
    }

    #[test]
    fn exit_line_stops() {
        assert_eq!(eval("exit\n"), Flow::Exit);
    }
}
