// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Account-transfer workbench.
//!
//! Many workers move money between a small table of accounts, each
//! guarded by its own mutex, under one of four locking strategies. The
//! naive one deadlocks; the other three detect or prevent it. Whatever
//! the strategy, the sum of all balances after the run must equal the sum
//! before it.

pub mod account;
pub mod config;
pub mod error;
pub mod lab;
pub mod pair;
pub mod report;
pub mod stats;
pub mod strategy;
pub mod worker;

pub use account::{Account, AccountId, Balance, Bank};
pub use config::{LabConfig, Tuning};
pub use error::LabError;
pub use lab::{Lab, RunOutcome};
pub use pair::{AccountPair, AcquirePolicy, Contention, OrderedPair, Side};
pub use report::{write_banner, Report};
pub use stats::{Stats, StatsSnapshot};
pub use strategy::{transfer, Mode, TransferOutcome};
pub use worker::{draw_request, run_worker, TransferRequest, WorkerArgs};
