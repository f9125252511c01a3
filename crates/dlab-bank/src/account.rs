// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Account table.
//!
//! A fixed set of accounts, each owning its balance behind its own mutex.
//! The identity never changes; the balance is only reachable through the
//! mutex. Read-outs (`balances`, `total`, `write_balances`) lock each
//! account in turn and are meant for quiescent tables.

use std::io::{self, Write};

use dlab_sync::LabMutex;

use crate::error::LabError;

pub type AccountId = usize;
pub type Balance = i64;

#[derive(Debug)]
pub struct Account {
    id: AccountId,
    balance: LabMutex<Balance>,
}

impl Account {
    pub fn new(id: AccountId, initial: Balance) -> Self {
        Self {
            id,
            balance: LabMutex::new(initial),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Current balance, read under the account lock.
    pub fn balance(&self) -> Balance {
        self.balance.lock(|b| *b)
    }

    /// The mutex guarding this account's balance.
    pub(crate) fn cell(&self) -> &LabMutex<Balance> {
        &self.balance
    }
}

/// The shared account table.
#[derive(Debug)]
pub struct Bank {
    accounts: Vec<Account>,
}

impl Bank {
    /// Create `count` accounts with ids `0..count`, all holding `initial`.
    pub fn new(count: usize, initial: Balance) -> Self {
        Self {
            accounts: (0..count).map(|id| Account::new(id, initial)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// `(id, balance)` for every account, in id order.
    pub fn balances(&self) -> Vec<(AccountId, Balance)> {
        self.accounts.iter().map(|a| (a.id(), a.balance())).collect()
    }

    pub fn total(&self) -> Balance {
        self.accounts.iter().map(Account::balance).sum()
    }

    /// Render the balance block of the current table.
    pub fn write_balances<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write_balance_block(out, &self.balances())
    }

    /// Check conservation. Returns the observed total when it matches.
    pub fn verify_total(&self, expected: Balance) -> Result<Balance, LabError> {
        let total = self.total();
        if total == expected {
            Ok(total)
        } else {
            Err(LabError::Conservation { total, expected })
        }
    }
}

/// Render `(id, balance)` pairs, one account per line.
pub fn write_balance_block<W: Write>(
    out: &mut W,
    balances: &[(AccountId, Balance)],
) -> io::Result<()> {
    writeln!(out, "Account balances:")?;
    for (id, balance) in balances {
        writeln!(out, "  Account {id}: ${balance}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_assigns_ids_and_balances() {
        let bank = Bank::new(4, 250);
        assert_eq!(bank.len(), 4);
        assert_eq!(bank.balances(), vec![(0, 250), (1, 250), (2, 250), (3, 250)]);
        assert_eq!(bank.get(3).map(Account::id), Some(3));
        assert!(bank.get(4).is_none());
    }

    #[test]
    fn verify_total_detects_drift() {
        let bank = Bank::new(10, 1000);
        assert_eq!(bank.verify_total(10_000).unwrap(), 10_000);

        bank.accounts()[2].cell().lock(|b| *b -= 5);
        match bank.verify_total(10_000) {
            Err(LabError::Conservation { total, expected }) => {
                assert_eq!(total, 9_995);
                assert_eq!(expected, 10_000);
            }
            other => panic!("expected conservation failure, got {:?}", other),
        }
    }

    #[test]
    fn negative_balances_are_allowed() {
        let bank = Bank::new(2, 0);
        bank.accounts()[0].cell().lock(|b| *b -= 7);
        bank.accounts()[1].cell().lock(|b| *b += 7);
        assert_eq!(bank.accounts()[0].balance(), -7);
        assert_eq!(bank.total(), 0);
    }

    #[test]
    fn balance_block_format() {
        let bank = Bank::new(2, 1000);
        bank.accounts()[1].cell().lock(|b| *b = -3);
        let mut out = Vec::new();
        bank.write_balances(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Account balances:\n  Account 0: $1000\n  Account 1: $-3\n"
        );
    }
}
