// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Sleep and deadline primitives.
//!
//! Sleeps block the OS thread. A deadline races the work thread against
//! `recv_timeout` on a one-shot channel.

use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use thiserror::Error;

/// Sleep the current thread for the given duration. Zero returns at once.
pub fn sleep(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

/// Run a closure on a thread built from `builder`, with a deadline.
///
/// The outer error means the thread could not be created. The inner
/// `Err(TimedOut)` means the closure has not completed within `limit`.
/// The work thread is not interrupted: it keeps running (or stays blocked)
/// after the deadline and its result is discarded.
pub fn with_deadline<T, F>(
    builder: thread::Builder,
    limit: Duration,
    f: F,
) -> io::Result<Result<T, TimedOut>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    builder.spawn(move || {
        let _ = tx.send(f());
    })?;

    Ok(rx.recv_timeout(limit).map_err(|_| TimedOut))
}

/// Timeout error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation timed out")]
pub struct TimedOut;
