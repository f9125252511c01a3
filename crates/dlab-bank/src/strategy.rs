// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Transfer strategies.
//!
//! Four ways to move `amount` from one account to another. All of them
//! debit `from` and credit `to` while holding both locks; they differ in
//! how the locks are taken and whether they can give up:
//!
//! | mode    | policy          | can deadlock | can ask for retry |
//! |---------|-----------------|--------------|-------------------|
//! | naive   | block, block    | yes          | no                |
//! | timeout | poll w/ timeout | no           | yes               |
//! | ordered | block, by id    | no           | no                |
//! | trylock | try or release  | no           | yes               |

use std::fmt;
use std::str::FromStr;

use crate::account::Balance;
use crate::config::Tuning;
use crate::error::LabError;
use crate::pair::{AccountPair, AcquirePolicy, Contention};
use crate::stats::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Naive,
    Timeout,
    Ordered,
    TryLock,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Naive, Mode::Timeout, Mode::Ordered, Mode::TryLock];

    /// Mode for its command-line number.
    pub fn from_index(index: u32) -> Option<Mode> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> u32 {
        match self {
            Mode::Naive => 0,
            Mode::Timeout => 1,
            Mode::Ordered => 2,
            Mode::TryLock => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Naive => "NAIVE",
            Mode::Timeout => "TIMEOUT",
            Mode::Ordered => "ORDERED",
            Mode::TryLock => "TRYLOCK",
        }
    }

    pub fn subtitle(self) -> &'static str {
        match self {
            Mode::Naive => "will deadlock",
            Mode::Timeout => "detect deadlock",
            Mode::Ordered | Mode::TryLock => "prevent deadlock",
        }
    }

    /// Whether the strategy can return `Retry`.
    pub fn retries(self) -> bool {
        matches!(self, Mode::Timeout | Mode::TryLock)
    }

    pub fn policy(self, tuning: &Tuning) -> AcquirePolicy {
        match self {
            Mode::Naive => AcquirePolicy::Blocking { settle: tuning.settle },
            Mode::Timeout => AcquirePolicy::TimedPoll {
                timeout: tuning.lock_timeout,
                poll: tuning.poll_interval,
            },
            Mode::Ordered => AcquirePolicy::Ordered,
            Mode::TryLock => AcquirePolicy::TryOrRelease,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.subtitle())
    }
}

impl FromStr for Mode {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Mode::from_index)
            .ok_or_else(|| LabError::InvalidMode(s.to_string()))
    }
}

/// Result of one strategy call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed,
    Retry(Contention),
}

/// Run one transfer attempt with the strategy for `mode`.
pub fn transfer(
    mode: Mode,
    pair: AccountPair<'_>,
    amount: Balance,
    stats: &Stats,
    tuning: &Tuning,
) -> TransferOutcome {
    match mode {
        Mode::Naive => {
            transfer_naive(pair, amount, stats, tuning);
            TransferOutcome::Completed
        }
        Mode::Timeout => transfer_timeout(pair, amount, stats, tuning),
        Mode::Ordered => {
            transfer_ordered(pair, amount, stats);
            TransferOutcome::Completed
        }
        Mode::TryLock => transfer_trylock(pair, amount, stats),
    }
}

/// Lock `from`, pause, lock `to`. Holds one lock while waiting for the
/// other, so opposite transfers can wait on each other forever.
pub fn transfer_naive(pair: AccountPair<'_>, amount: Balance, stats: &Stats, tuning: &Tuning) {
    pair.acquire_blocking(tuning.settle, move_funds(amount));
    stats.record_success();
}

/// Poll each lock for at most `lock_timeout`. A timeout counts as a
/// detected deadlock; any lock already held is released before returning.
pub fn transfer_timeout(
    pair: AccountPair<'_>,
    amount: Balance,
    stats: &Stats,
    tuning: &Tuning,
) -> TransferOutcome {
    match pair.acquire(Mode::Timeout.policy(tuning), move_funds(amount)) {
        Ok(()) => {
            stats.record_success();
            TransferOutcome::Completed
        }
        Err(contention) => {
            stats.record_deadlock_detection();
            TransferOutcome::Retry(contention)
        }
    }
}

/// Lock the lower id first. The balance direction follows the roles.
pub fn transfer_ordered(pair: AccountPair<'_>, amount: Balance, stats: &Stats) {
    pair.ordered().acquire(move_funds(amount));
    stats.record_success();
}

/// Take both locks without blocking or back out.
pub fn transfer_trylock(pair: AccountPair<'_>, amount: Balance, stats: &Stats) -> TransferOutcome {
    match pair.acquire(AcquirePolicy::TryOrRelease, move_funds(amount)) {
        Ok(()) => {
            stats.record_success();
            TransferOutcome::Completed
        }
        Err(contention) => TransferOutcome::Retry(contention),
    }
}

fn move_funds(amount: Balance) -> impl FnOnce(&mut Balance, &mut Balance) {
    move |from, to| {
        *from -= amount;
        *to += amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Bank;
    use crate::pair::Side;
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    fn fast_tuning() -> Tuning {
        Tuning {
            settle: Duration::ZERO,
            lock_timeout: Duration::from_millis(15),
            poll_interval: Duration::from_millis(1),
            retry_delay: Duration::from_millis(1),
            backoff_ceiling: Duration::from_micros(100),
            max_retries: 1000,
        }
    }

    #[test]
    fn mode_numbers_and_names() {
        assert_eq!("2".parse::<Mode>().unwrap(), Mode::Ordered);
        assert_eq!(Mode::from_index(3), Some(Mode::TryLock));
        assert_eq!(Mode::from_index(4), None);
        assert!(matches!("9".parse::<Mode>(), Err(LabError::InvalidMode(_))));
        assert!(matches!("x".parse::<Mode>(), Err(LabError::InvalidMode(_))));
        assert_eq!(Mode::Naive.to_string(), "NAIVE (will deadlock)");
        assert_eq!(Mode::Timeout.to_string(), "TIMEOUT (detect deadlock)");
        assert_eq!(Mode::TryLock.to_string(), "TRYLOCK (prevent deadlock)");
        for mode in Mode::ALL {
            assert_eq!(Mode::from_index(mode.index()), Some(mode));
        }
    }

    #[test]
    fn every_mode_completes_uncontended() {
        for mode in Mode::ALL {
            let bank = Bank::new(2, 50);
            let stats = Stats::new();
            let pair = AccountPair::new(&bank.accounts()[0], &bank.accounts()[1]).unwrap();
            let outcome = transfer(mode, pair, 10, &stats, &fast_tuning());
            assert_eq!(outcome, TransferOutcome::Completed, "{mode:?}");
            assert_eq!(bank.balances(), vec![(0, 40), (1, 60)]);
            let snap = stats.snapshot();
            assert_eq!(snap.successful_transfers, 1);
            assert_eq!(snap.deadlock_detections, 0);
        }
    }

    #[test]
    fn timeout_counts_detection_and_leaves_balances() {
        let bank = Arc::new(Bank::new(2, 50));
        let stats = Stats::new();
        let (held_tx, held_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let holder = {
            let bank = bank.clone();
            std::thread::spawn(move || {
                bank.accounts()[1].cell().lock(|_| {
                    held_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                })
            })
        };
        held_rx.recv().unwrap();

        let pair = AccountPair::new(&bank.accounts()[0], &bank.accounts()[1]).unwrap();
        let outcome = transfer(Mode::Timeout, pair, 5, &stats, &fast_tuning());
        assert_eq!(outcome, TransferOutcome::Retry(Contention::TimedOut(Side::To)));
        assert_eq!(stats.snapshot().deadlock_detections, 1);
        assert_eq!(stats.snapshot().successful_transfers, 0);

        release_tx.send(()).unwrap();
        holder.join().unwrap();
        assert_eq!(bank.balances(), vec![(0, 50), (1, 50)]);
    }

    #[test]
    fn trylock_busy_is_not_a_detection() {
        let bank = Bank::new(2, 50);
        let stats = Stats::new();
        let pair = AccountPair::new(&bank.accounts()[0], &bank.accounts()[1]).unwrap();
        let outcome = bank.accounts()[0]
            .cell()
            .lock(|_| transfer(Mode::TryLock, pair, 5, &stats, &fast_tuning()));
        assert_eq!(outcome, TransferOutcome::Retry(Contention::Busy(Side::From)));
        assert_eq!(stats.snapshot(), Default::default());
    }
}
