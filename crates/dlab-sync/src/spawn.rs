// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Worker spawn/join.
//!
//! `spawn_worker` creates a named OS thread. `WorkerHandle` wraps the
//! `JoinHandle` and turns a worker panic into a `JoinError` carrying the
//! panic message.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use thiserror::Error;

/// Error returned by `join()` when the worker failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// Worker panicked with the given message.
    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Handle to a spawned worker thread.
#[derive(Debug)]
pub struct WorkerHandle<T> {
    name: String,
    handle: JoinHandle<Result<T, String>>,
}

impl<T> WorkerHandle<T> {
    /// Thread name given at spawn time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the worker to complete, returning its result.
    pub fn join(self) -> Result<T, JoinError> {
        match self.handle.join() {
            Ok(Ok(val)) => Ok(val),
            Ok(Err(msg)) => Err(JoinError::Panicked(msg)),
            Err(payload) => Err(JoinError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

/// Spawn a named worker thread.
///
/// Fails only if the OS refuses to create the thread.
pub fn spawn_worker<T, F>(name: impl Into<String>, f: F) -> io::Result<WorkerHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let name = name.into();
    let handle = thread::Builder::new().name(name.clone()).spawn(move || {
        // Catch panics and convert to Result
        panic::catch_unwind(AssertUnwindSafe(f)).map_err(|e| panic_message(e.as_ref()))
    })?;
    Ok(WorkerHandle { name, handle })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
