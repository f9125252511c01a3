// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Run banner and results block.
//!
//! The layout is fixed; scripts and tests match on these lines.

use std::io::{self, Write};
use std::time::Duration;

use crate::account::{write_balance_block, AccountId, Balance};
use crate::config::LabConfig;
use crate::stats::StatsSnapshot;
use crate::strategy::Mode;

/// Outcome of a completed run, read after every worker was joined.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub mode: Mode,
    pub threads: usize,
    pub transfers_per_thread: usize,
    pub seed: u64,
    pub elapsed: Duration,
    pub stats: StatsSnapshot,
    pub balances: Vec<(AccountId, Balance)>,
    pub total: Balance,
    pub expected: Balance,
}

impl Report {
    pub fn is_conserved(&self) -> bool {
        self.total == self.expected
    }

    /// Successful transfers per second of wall time.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.stats.successful_transfers as f64 / secs
        } else {
            0.0
        }
    }

    /// Render the results section, balance block and verdict.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "=== Results ===")?;
        writeln!(out, "Elapsed time: {:.3} seconds", self.elapsed.as_secs_f64())?;
        writeln!(out, "Successful transfers: {}", self.stats.successful_transfers)?;
        writeln!(out, "Failed transfers: {}", self.stats.failed_transfers)?;
        writeln!(out, "Deadlock detections: {}", self.stats.deadlock_detections)?;
        writeln!(out, "Retries: {}", self.stats.retries)?;
        writeln!(out, "Throughput: {:.2} transfers/sec", self.throughput())?;
        writeln!(out)?;

        write_balance_block(out, &self.balances)?;
        writeln!(out)?;

        writeln!(out, "Total balance: ${} (expected: ${})", self.total, self.expected)?;
        if self.is_conserved() {
            writeln!(out, "SUCCESS: All transfers completed and balances verified.")
        } else {
            writeln!(out, "FAIL: Balance check failed!")
        }
    }
}

/// Render the banner printed before the workers start.
pub fn write_banner<W: Write>(out: &mut W, config: &LabConfig) -> io::Result<()> {
    writeln!(out, "=== Deadlock Lab ===")?;
    writeln!(out, "Mode: {}", config.mode)?;
    writeln!(
        out,
        "Threads: {}, Transfers per thread: {}",
        config.threads, config.transfers_per_thread
    )?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(total: Balance) -> Report {
        Report {
            mode: Mode::Ordered,
            threads: 2,
            transfers_per_thread: 5,
            seed: 1,
            elapsed: Duration::from_millis(250),
            stats: StatsSnapshot {
                successful_transfers: 10,
                ..Default::default()
            },
            balances: vec![(0, 1003), (1, total - 1003)],
            total,
            expected: 2000,
        }
    }

    #[test]
    fn banner_lines() {
        let mut out = Vec::new();
        write_banner(&mut out, &LabConfig::new(Mode::TryLock, 4, 20)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "=== Deadlock Lab ===\nMode: TRYLOCK (prevent deadlock)\nThreads: 4, Transfers per thread: 20\n\n"
        );
    }

    #[test]
    fn results_block_success() {
        let mut out = Vec::new();
        report(2000).write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = "\n=== Results ===\n\
            Elapsed time: 0.250 seconds\n\
            Successful transfers: 10\n\
            Failed transfers: 0\n\
            Deadlock detections: 0\n\
            Retries: 0\n\
            Throughput: 40.00 transfers/sec\n\
            \n\
            Account balances:\n  Account 0: $1003\n  Account 1: $997\n\
            \n\
            Total balance: $2000 (expected: $2000)\n\
            SUCCESS: All transfers completed and balances verified.\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn results_block_failure() {
        let r = report(1990);
        assert!(!r.is_conserved());
        let mut out = Vec::new();
        r.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Total balance: $1990 (expected: $2000)\n"));
        assert!(text.ends_with("FAIL: Balance check failed!\n"));
    }

    #[test]
    fn zero_elapsed_has_zero_throughput() {
        let mut r = report(2000);
        r.elapsed = Duration::ZERO;
        assert_eq!(r.throughput(), 0.0);
    }
}
