// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Two-lock acquisition.
//!
//! Every strategy is "acquire two distinct account locks, run the work,
//! release". This module owns that operation; the strategies only choose
//! an `AcquirePolicy`. The work closure always receives the balances in
//! role order `(from, to)`, whatever order the locks were taken in.
//!
//! Release is structural: locks are closure-scoped, so returning from an
//! inner closure (success or contention) drops the inner lock before the
//! outer one, and a failed second acquisition can never leave the first
//! lock held.

use std::time::Duration;

use dlab_sync::{sleep, LabMutex};
use thiserror::Error;
use tracing::trace;

use crate::account::{Account, AccountId, Balance};
use crate::error::LabError;

/// How the two locks are acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquirePolicy {
    /// Block on `from`, sleep `settle`, block on `to`. Can deadlock.
    Blocking { settle: Duration },
    /// Poll each lock until `timeout`, sleeping `poll` between attempts.
    /// The second lock is tried as soon as the first is held.
    TimedPoll { timeout: Duration, poll: Duration },
    /// Block on both, lower account id first.
    Ordered,
    /// Never block; back out if either lock is taken.
    TryOrRelease,
}

/// Which lock could not be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    From,
    To,
}

/// Why a pair acquisition gave up. Only the timed and try policies
/// produce these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Contention {
    #[error("timed out waiting for the {0:?} lock")]
    TimedOut(Side),
    #[error("the {0:?} lock was busy")]
    Busy(Side),
}

impl Contention {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Contention::TimedOut(_))
    }
}

/// Two distinct accounts in their transfer roles.
#[derive(Debug, Clone, Copy)]
pub struct AccountPair<'a> {
    from: &'a Account,
    to: &'a Account,
}

impl<'a> AccountPair<'a> {
    /// Pair two accounts. Fails if both are the same account.
    pub fn new(from: &'a Account, to: &'a Account) -> Result<Self, LabError> {
        if from.id() == to.id() {
            return Err(LabError::SelfTransfer(from.id()));
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> &'a Account {
        self.from
    }

    pub fn to(&self) -> &'a Account {
        self.to
    }

    /// The same pair sorted by account id.
    pub fn ordered(&self) -> OrderedPair<'a> {
        OrderedPair::new(*self)
    }

    /// Take both locks under `policy` and run `work(from, to)`.
    pub fn acquire<R, F>(&self, policy: AcquirePolicy, work: F) -> Result<R, Contention>
    where
        F: FnOnce(&mut Balance, &mut Balance) -> R,
    {
        match policy {
            AcquirePolicy::Blocking { settle } => Ok(self.acquire_blocking(settle, work)),
            AcquirePolicy::TimedPoll { timeout, poll } => self.acquire_timed(timeout, poll, work),
            AcquirePolicy::Ordered => Ok(self.ordered().acquire(work)),
            AcquirePolicy::TryOrRelease => self.acquire_try(work),
        }
    }

    /// Block on `from`, sleep `settle`, block on `to`, run `work(from, to)`.
    ///
    /// Cannot fail, and can wait forever when another thread holds the
    /// same two locks in the opposite order.
    pub fn acquire_blocking<R, F>(&self, settle: Duration, work: F) -> R
    where
        F: FnOnce(&mut Balance, &mut Balance) -> R,
    {
        self.from.cell().lock(|from| {
            sleep(settle);
            self.to.cell().lock(|to| work(from, to))
        })
    }

    fn acquire_timed<R, F>(
        &self,
        timeout: Duration,
        poll: Duration,
        work: F,
    ) -> Result<R, Contention>
    where
        F: FnOnce(&mut Balance, &mut Balance) -> R,
    {
        let outcome = self.from.cell().try_lock_for(timeout, poll, |from| {
            self.to
                .cell()
                .try_lock_for(timeout, poll, |to| work(from, to))
                .map_err(|_| Contention::TimedOut(Side::To))
        });
        let result = outcome.unwrap_or(Err(Contention::TimedOut(Side::From)));
        if let Err(c) = &result {
            trace!(from = self.from.id(), to = self.to.id(), "{c}");
        }
        result
    }

    fn acquire_try<R, F>(&self, work: F) -> Result<R, Contention>
    where
        F: FnOnce(&mut Balance, &mut Balance) -> R,
    {
        let outcome = self.from.cell().try_lock(|from| {
            self.to
                .cell()
                .try_lock(|to| work(from, to))
                .ok_or(Contention::Busy(Side::To))
        });
        let result = outcome.unwrap_or(Err(Contention::Busy(Side::From)));
        if let Err(c) = &result {
            trace!(from = self.from.id(), to = self.to.id(), "{c}");
        }
        result
    }
}

/// A pair tagged with the global lock order: `lower.id() < higher.id()`.
///
/// The only way to build one is from an `AccountPair`, which sorts by id,
/// so every ordered acquisition in the program takes locks in the same
/// order and no wait cycle can form.
#[derive(Debug, Clone, Copy)]
pub struct OrderedPair<'a> {
    lower: &'a Account,
    higher: &'a Account,
    /// `from` is the higher-id account.
    swapped: bool,
}

impl<'a> OrderedPair<'a> {
    fn new(pair: AccountPair<'a>) -> Self {
        if pair.from.id() < pair.to.id() {
            Self { lower: pair.from, higher: pair.to, swapped: false }
        } else {
            Self { lower: pair.to, higher: pair.from, swapped: true }
        }
    }

    pub fn lower(&self) -> AccountId {
        self.lower.id()
    }

    pub fn higher(&self) -> AccountId {
        self.higher.id()
    }

    /// Lock lower then higher, run `work(from, to)`, unlock higher then lower.
    pub fn acquire<R, F>(&self, work: F) -> R
    where
        F: FnOnce(&mut Balance, &mut Balance) -> R,
    {
        lock_both(self.lower.cell(), self.higher.cell(), |low, high| {
            if self.swapped {
                work(high, low)
            } else {
                work(low, high)
            }
        })
    }
}

fn lock_both<R, F>(first: &LabMutex<Balance>, second: &LabMutex<Balance>, work: F) -> R
where
    F: FnOnce(&mut Balance, &mut Balance) -> R,
{
    first.lock(|a| second.lock(|b| work(a, b)))
}
