// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Lab error types.

use std::io;

use thiserror::Error;

use crate::account::{AccountId, Balance};

/// Errors surfaced by the lab. Contention is not among them: timeouts and
/// busy locks are recovered inside the worker and only show up in the stats.
#[derive(Debug, Error)]
pub enum LabError {
    /// Mode outside `0..=3`, or not a number.
    #[error("invalid mode `{0}` (expected 0=naive, 1=timeout, 2=ordered, 3=trylock)")]
    InvalidMode(String),

    /// Inconsistent configuration or an unparsable override.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A transfer named the same account on both sides.
    #[error("account {0} cannot transfer to itself")]
    SelfTransfer(AccountId),

    /// The OS refused a resource the lab needs.
    #[error("{op}: {source}")]
    Os {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// A worker thread panicked.
    #[error("worker {worker} panicked: {message}")]
    WorkerPanicked { worker: String, message: String },

    /// Money was created or destroyed.
    #[error("balance mismatch: total ${total}, expected ${expected}")]
    Conservation { total: Balance, expected: Balance },
}

impl LabError {
    pub fn os(op: &'static str, source: io::Error) -> Self {
        LabError::Os { op, source }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        LabError::InvalidConfig(msg.into())
    }
}
