// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Orchestrator.
//!
//! Builds the table, spawns the workers over one shared `WorkerArgs`,
//! joins them all and assembles the `Report`. A run in naive mode may
//! never return; `run_with_watchdog` bounds it.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dlab_sync::{spawn_worker, with_deadline, JoinError, TimedOut, WorkerHandle};
use tracing::{error, info, warn};

use crate::account::{Balance, Bank};
use crate::config::LabConfig;
use crate::error::LabError;
use crate::report::Report;
use crate::stats::{Stats, StatsSnapshot};
use crate::worker::{run_worker, WorkerArgs, WorkerSummary};

/// How a watched run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Finished(Report),
    /// Still running when the watchdog fired. The workers are abandoned.
    Hung { after: Duration, stats: StatsSnapshot },
}

#[derive(Debug)]
pub struct Lab {
    args: Arc<WorkerArgs>,
    threads: usize,
    seed: u64,
    expected: Balance,
}

impl Lab {
    pub fn new(config: LabConfig) -> Result<Self, LabError> {
        config.validate()?;
        let seed = match config.seed {
            Some(seed) => seed,
            None => wall_clock_seed()?,
        };
        let expected = config.expected_total();
        let args = WorkerArgs {
            bank: Bank::new(config.accounts, config.initial_balance),
            stats: Stats::new(),
            mode: config.mode,
            transfers: config.transfers_per_thread,
            tuning: config.tuning,
        };
        Ok(Self {
            args: Arc::new(args),
            threads: config.threads,
            seed,
            expected,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The shared table and counters. Counters may be sampled mid-run.
    pub fn shared(&self) -> Arc<WorkerArgs> {
        Arc::clone(&self.args)
    }

    /// Run every worker to completion.
    pub fn run(self) -> Result<Report, LabError> {
        let args = &self.args;
        info!(
            mode = args.mode.name(),
            threads = self.threads,
            transfers = args.transfers,
            seed = self.seed,
            "starting run"
        );

        let start = Instant::now();
        let handles = self.spawn_all()?;
        let joined = join_all(handles);
        let elapsed = start.elapsed();
        joined?;

        let stats = args.stats.snapshot();
        let balances = args.bank.balances();
        let total = match args.bank.verify_total(self.expected) {
            Ok(total) => total,
            Err(LabError::Conservation { total, expected }) => {
                error!(total, expected, "money was lost or created");
                total
            }
            Err(e) => return Err(e),
        };
        let report = Report {
            mode: args.mode,
            threads: self.threads,
            transfers_per_thread: args.transfers,
            seed: self.seed,
            elapsed,
            stats,
            balances,
            total,
            expected: self.expected,
        };

        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            successful = stats.successful_transfers,
            failed = stats.failed_transfers,
            detections = stats.deadlock_detections,
            retries = stats.retries,
            "run finished"
        );
        Ok(report)
    }

    /// Run with a time limit. On expiry the counters are sampled and the
    /// still-blocked workers are left behind.
    pub fn run_with_watchdog(self, limit: Duration) -> Result<RunOutcome, LabError> {
        self.watch(thread::Builder::new().name("watchdog".to_string()), limit)
    }

    fn watch(self, watcher: thread::Builder, limit: Duration) -> Result<RunOutcome, LabError> {
        let shared = self.shared();
        let finished = with_deadline(watcher, limit, move || self.run())
            .map_err(|e| LabError::os("watchdog spawn", e))?;
        match finished {
            Ok(result) => result.map(RunOutcome::Finished),
            Err(TimedOut) => {
                let stats = shared.stats.snapshot();
                warn!(
                    limit_ms = limit.as_millis() as u64,
                    successful = stats.successful_transfers,
                    "run did not finish in time, workers are likely deadlocked"
                );
                Ok(RunOutcome::Hung { after: limit, stats })
            }
        }
    }

    fn spawn_all(&self) -> Result<Vec<WorkerHandle<Result<WorkerSummary, LabError>>>, LabError> {
        let mut handles = Vec::with_capacity(self.threads);
        for index in 0..self.threads {
            let args = Arc::clone(&self.args);
            let seed = self.seed;
            match spawn_worker(format!("worker-{index}"), move || run_worker(&args, index, seed)) {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    // Let the ones already running finish before bailing out.
                    let _ = join_all(handles);
                    return Err(LabError::os("thread spawn", source));
                }
            }
        }
        Ok(handles)
    }
}

/// Join every handle; report the first failure after all are joined.
fn join_all(handles: Vec<WorkerHandle<Result<WorkerSummary, LabError>>>) -> Result<(), LabError> {
    let mut first_error = None;
    for handle in handles {
        let worker = handle.name().to_string();
        let failure = match handle.join() {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(e),
            Err(JoinError::Panicked(message)) => Some(LabError::WorkerPanicked { worker, message }),
        };
        if first_error.is_none() {
            first_error = failure;
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn wall_clock_seed() -> Result<u64, LabError> {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LabError::os("wall clock", io::Error::new(io::ErrorKind::Other, e)))?;
    Ok(since_epoch.as_nanos() as u64)
}
