// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Synchronization primitives for the deadlock lab.
//!
//! OS threads only. Every primitive is closure-scoped: a lock is held for
//! exactly the duration of the closure, so no code path can forget to
//! release it.
//!
//! Components:
//! - mutex: blocking, try and timed-poll acquisition
//! - spawn/join: named worker threads with panic capture
//! - sleep/deadline: timer primitives and the run watchdog

pub mod mutex;
pub mod spawn;
pub mod timeout;

pub use mutex::LabMutex;
pub use spawn::{spawn_worker, JoinError, WorkerHandle};
pub use timeout::{sleep, with_deadline, TimedOut};
