// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Run configuration and timing knobs.
//!
//! `LabConfig` is what the orchestrator needs to set up a run; `Tuning`
//! holds the sleeps, timeouts and retry bound the strategies and workers
//! use. Tuning values can be overridden from `DLAB_*` environment
//! variables.

use std::env;
use std::time::Duration;

use crate::account::Balance;
use crate::error::LabError;
use crate::strategy::Mode;

pub const NUM_ACCOUNTS: usize = 10;
pub const INITIAL_BALANCE: Balance = 1000;
pub const NUM_THREADS: usize = 8;
pub const TRANSFERS_PER_THREAD: usize = 1000;

/// Timing parameters of the strategies and the worker retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    /// Sleep between the first and second acquisition of the naive
    /// strategy, widening the deadlock window.
    pub settle: Duration,
    /// Per-lock budget of the timeout strategy.
    pub lock_timeout: Duration,
    /// Sleep between timed-poll attempts.
    pub poll_interval: Duration,
    /// Sleep between timeout-mode retries.
    pub retry_delay: Duration,
    /// Exclusive upper bound of the random trylock backoff.
    pub backoff_ceiling: Duration,
    /// A transfer is abandoned once its retry count exceeds this.
    pub max_retries: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            settle: Duration::from_micros(1),
            lock_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(10),
            retry_delay: Duration::from_millis(10),
            backoff_ceiling: Duration::from_micros(1_000_000),
            max_retries: 1000,
        }
    }
}

impl Tuning {
    /// Defaults with `DLAB_*` environment overrides applied.
    pub fn from_env() -> Result<Self, LabError> {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides found by `lookup`. Unset keys keep their value.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, LabError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| -> Result<Option<u64>, LabError> {
            match lookup(key) {
                None => Ok(None),
                Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|_| {
                    LabError::invalid_config(format!("{key}=`{raw}` is not a non-negative integer"))
                }),
            }
        };

        if let Some(us) = read("DLAB_SETTLE_US")? {
            self.settle = Duration::from_micros(us);
        }
        if let Some(ms) = read("DLAB_LOCK_TIMEOUT_MS")? {
            self.lock_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = read("DLAB_POLL_MS")? {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = read("DLAB_RETRY_DELAY_MS")? {
            self.retry_delay = Duration::from_millis(ms);
        }
        if let Some(us) = read("DLAB_BACKOFF_US")? {
            self.backoff_ceiling = Duration::from_micros(us);
        }
        if let Some(n) = read("DLAB_MAX_RETRIES")? {
            self.max_retries = u32::try_from(n)
                .map_err(|_| LabError::invalid_config(format!("DLAB_MAX_RETRIES={n} is too large")))?;
        }
        Ok(self)
    }
}

/// Everything the orchestrator needs to set up one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabConfig {
    pub mode: Mode,
    pub threads: usize,
    pub transfers_per_thread: usize,
    pub accounts: usize,
    pub initial_balance: Balance,
    /// Fixed RNG seed; `None` seeds from wall time.
    pub seed: Option<u64>,
    pub tuning: Tuning,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Naive,
            threads: NUM_THREADS,
            transfers_per_thread: TRANSFERS_PER_THREAD,
            accounts: NUM_ACCOUNTS,
            initial_balance: INITIAL_BALANCE,
            seed: None,
            tuning: Tuning::default(),
        }
    }
}

impl LabConfig {
    pub fn new(mode: Mode, threads: usize, transfers_per_thread: usize) -> Self {
        Self {
            mode,
            threads,
            transfers_per_thread,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_accounts(mut self, accounts: usize) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Sum of all balances that conservation demands.
    pub fn expected_total(&self) -> Balance {
        self.accounts as Balance * self.initial_balance
    }

    /// Reject configurations no run can satisfy.
    pub fn validate(&self) -> Result<(), LabError> {
        let any_work = self.threads > 0 && self.transfers_per_thread > 0;
        if any_work && self.accounts < 2 {
            return Err(LabError::invalid_config(format!(
                "transfers need at least 2 accounts, got {}",
                self.accounts
            )));
        }
        if self.threads.checked_mul(self.transfers_per_thread).is_none() {
            return Err(LabError::invalid_config("threads * transfers overflows"));
        }
        Ok(())
    }
}
