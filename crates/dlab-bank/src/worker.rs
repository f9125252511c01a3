// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Worker driver.
//!
//! A worker performs `transfers` random transfers against the shared
//! table. Retrying strategies are re-invoked until they succeed or the
//! retry bound is exceeded, with a mode-specific pause in between.

use std::time::Duration;

use dlab_sync::sleep;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::account::{AccountId, Balance, Bank};
use crate::config::Tuning;
use crate::error::LabError;
use crate::pair::AccountPair;
use crate::stats::Stats;
use crate::strategy::{transfer, Mode, TransferOutcome};

pub const MIN_AMOUNT: Balance = 1;
pub const MAX_AMOUNT: Balance = 10;

/// Everything the workers share. Read-only after spawn apart from the
/// account balances and the counters, which carry their own
/// synchronization.
#[derive(Debug)]
pub struct WorkerArgs {
    pub bank: Bank,
    pub stats: Stats,
    pub mode: Mode,
    pub transfers: usize,
    pub tuning: Tuning,
}

/// One transfer to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Balance,
}

/// What a single worker did, for its log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub completed: u64,
    pub abandoned: u64,
    pub retries: u64,
}

/// Draw two distinct ids from `0..accounts` and an amount in 1..=10.
///
/// An equal pair is redrawn; redraws are not transfers. `None` when the
/// table has fewer than two accounts.
pub fn draw_request<R: Rng>(rng: &mut R, accounts: usize) -> Option<TransferRequest> {
    if accounts < 2 {
        return None;
    }
    let (from, to) = loop {
        let from = rng.gen_range(0..accounts);
        let to = rng.gen_range(0..accounts);
        if from != to {
            break (from, to);
        }
    };
    let amount = rng.gen_range(MIN_AMOUNT..=MAX_AMOUNT);
    Some(TransferRequest { from, to, amount })
}

/// Seed for worker `index` of a run seeded with `seed`.
pub fn worker_seed(seed: u64, index: usize) -> u64 {
    // splitmix64 step keeps neighbouring workers' streams apart
    let mut z = seed.wrapping_add((index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Body of worker `index`.
pub fn run_worker(args: &WorkerArgs, index: usize, seed: u64) -> Result<WorkerSummary, LabError> {
    let mut rng = StdRng::seed_from_u64(worker_seed(seed, index));
    let mut summary = WorkerSummary::default();

    for _ in 0..args.transfers {
        let request = draw_request(&mut rng, args.bank.len()).ok_or_else(|| {
            LabError::invalid_config(format!(
                "transfers need at least 2 accounts, table has {}",
                args.bank.len()
            ))
        })?;
        execute(args, request, &mut rng, &mut summary)?;
    }

    debug!(
        worker = index,
        completed = summary.completed,
        abandoned = summary.abandoned,
        retries = summary.retries,
        "worker finished"
    );
    Ok(summary)
}

/// Perform one request, retrying as the mode allows.
fn execute<R: Rng>(
    args: &WorkerArgs,
    request: TransferRequest,
    rng: &mut R,
    summary: &mut WorkerSummary,
) -> Result<(), LabError> {
    let (from, to) = match (args.bank.get(request.from), args.bank.get(request.to)) {
        (Some(from), Some(to)) => (from, to),
        _ => {
            return Err(LabError::invalid_config(format!(
                "transfer {} -> {} outside table of {}",
                request.from,
                request.to,
                args.bank.len()
            )))
        }
    };
    let pair = AccountPair::new(from, to)?;

    let mut retry_count: u32 = 0;
    loop {
        match transfer(args.mode, pair, request.amount, &args.stats, &args.tuning) {
            TransferOutcome::Completed => {
                summary.completed += 1;
                return Ok(());
            }
            TransferOutcome::Retry(_) => {
                args.stats.record_retry();
                summary.retries += 1;
                retry_count += 1;
                if retry_count > args.tuning.max_retries {
                    args.stats.record_failure();
                    summary.abandoned += 1;
                    debug!(
                        from = request.from,
                        to = request.to,
                        amount = request.amount,
                        retries = retry_count,
                        "transfer abandoned"
                    );
                    return Ok(());
                }
                sleep(backoff(args.mode, &args.tuning, rng));
            }
        }
    }
}

/// Pause before the next attempt of a retrying strategy.
fn backoff<R: Rng>(mode: Mode, tuning: &Tuning, rng: &mut R) -> Duration {
    match mode {
        Mode::TryLock => {
            let ceiling = tuning.backoff_ceiling.as_micros() as u64;
            if ceiling == 0 {
                Duration::ZERO
            } else {
                Duration::from_micros(rng.gen_range(0..ceiling))
            }
        }
        _ => tuning.retry_delay,
    }
}
