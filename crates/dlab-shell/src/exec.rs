// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Pipeline execution.
//!
//! Every stage is spawned before any is waited on. Stage `i`'s stdout is
//! piped into stage `i + 1`'s stdin; the last stage writes to the
//! terminal or to the redirect target. Children are tracked for SIGINT
//! forwarding while they run.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::parser::{Pipeline, Redirect, RedirectMode};
use crate::signal;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{path}: {source}")]
    Redirect {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("cd: {0}")]
    Cd(String),
}

/// A spawned stage.
struct Running {
    program: String,
    child: Child,
}

/// Run every stage of `pipeline` and wait for all of them. Returns the
/// exit status of each stage in order.
pub fn run_pipeline(pipeline: &Pipeline) -> Result<Vec<ExitStatus>, ExecError> {
    // Open the target first so a bad path spawns nothing.
    let mut sink = pipeline.redirect.as_ref().map(open_redirect).transpose()?;

    let last = pipeline.stages.len().saturating_sub(1);
    let mut running: Vec<Running> = Vec::with_capacity(pipeline.stages.len());
    let mut upstream: Option<ChildStdout> = None;

    for (i, stage) in pipeline.stages.iter().enumerate() {
        let mut cmd = Command::new(stage.program());
        cmd.args(stage.args());
        if let Some(out) = upstream.take() {
            cmd.stdin(Stdio::from(out));
        }
        if i < last {
            cmd.stdout(Stdio::piped());
        } else if let Some(file) = sink.take() {
            cmd.stdout(Stdio::from(file));
        }

        match cmd.spawn() {
            Ok(mut child) => {
                signal::track(child.id());
                upstream = child.stdout.take();
                debug!(program = stage.program(), pid = child.id(), "spawned");
                running.push(Running { program: stage.program().to_string(), child });
            }
            Err(source) => {
                // Already-spawned stages lose their reader and wind down.
                drop(cmd);
                let _ = wait_all(running);
                return Err(ExecError::Spawn { program: stage.program().to_string(), source });
            }
        }
    }

    wait_all(running)
}

fn wait_all(running: Vec<Running>) -> Result<Vec<ExitStatus>, ExecError> {
    let mut statuses = Vec::with_capacity(running.len());
    let mut first_err = None;

    for Running { program, mut child } in running {
        let result = child.wait();
        signal::untrack(child.id());
        match result {
            Ok(status) => {
                debug!(program = %program, %status, "stage finished");
                statuses.push(status);
            }
            Err(source) => {
                if first_err.is_none() {
                    first_err = Some(ExecError::Wait { program, source });
                }
            }
        }
    }

    match first_err {
        Some(err) => Err(err),
        None => Ok(statuses),
    }
}

fn open_redirect(redirect: &Redirect) -> Result<File, ExecError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(0o644);
    match redirect.mode {
        RedirectMode::Truncate => options.truncate(true),
        RedirectMode::Append => options.append(true),
    };
    options.open(&redirect.path).map_err(|source| ExecError::Redirect {
        path: redirect.path.display().to_string(),
        source,
    })
}
