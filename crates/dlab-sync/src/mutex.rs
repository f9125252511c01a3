// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Closure-scoped mutex.
//!
//! Closure-based access: no guard objects escape, so a lock is always
//! released when the closure returns, including on the early-return paths
//! of a failed second acquisition.

use std::sync::{self, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};

use crate::timeout::{sleep, TimedOut};

/// Exclusive-access wrapper around `std::sync::Mutex`.
#[derive(Debug, Default)]
pub struct LabMutex<T> {
    inner: sync::Mutex<T>,
}

impl<T> LabMutex<T> {
    /// Create a new mutex wrapping `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: sync::Mutex::new(value),
        }
    }

    /// Block until the lock is acquired, then run `f` with exclusive access.
    pub fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Try to acquire the lock without blocking.
    ///
    /// Returns `None` if another thread holds it.
    pub fn try_lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> Option<R> {
        self.try_guard().map(|mut guard| f(&mut guard))
    }

    /// Poll for the lock until `timeout` has elapsed.
    ///
    /// Each attempt is non-blocking; between failed attempts the caller
    /// sleeps for `poll`. The deadline is measured on the monotonic clock
    /// from entry. At least one attempt is always made.
    pub fn try_lock_for<R, F: FnOnce(&mut T) -> R>(
        &self,
        timeout: Duration,
        poll: Duration,
        f: F,
    ) -> Result<R, TimedOut> {
        let start = Instant::now();
        loop {
            if let Some(mut guard) = self.try_guard() {
                return Ok(f(&mut guard));
            }
            if start.elapsed() >= timeout {
                return Err(TimedOut);
            }
            sleep(poll);
        }
    }

    /// Consume the mutex and return the protected value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_guard(&self) -> Option<MutexGuard<'_, T>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::WouldBlock) => None,
            // A panicking holder leaves the value intact; keep using it.
            Err(TryLockError::Poisoned(e)) => Some(e.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;

    #[test]
    fn lock_and_mutate() {
        let m = LabMutex::new(0);
        m.lock(|v| *v += 1);
        let val = m.lock(|v| *v);
        assert_eq!(val, 1);
    }

    #[test]
    fn try_lock_succeeds() {
        let m = LabMutex::new(42);
        assert_eq!(m.try_lock(|v| *v), Some(42));
    }

    #[test]
    fn try_lock_reports_busy_while_held() {
        let m = LabMutex::new(0);
        let nested = m.lock(|_| m.try_lock(|v| *v));
        assert_eq!(nested, None);
    }

    #[test]
    fn try_lock_for_times_out_while_held() {
        let m = Arc::new(LabMutex::new(0));
        let (held_tx, held_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let m = m.clone();
            std::thread::spawn(move || {
                m.lock(|_| {
                    held_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                });
            })
        };
        held_rx.recv().unwrap();

        let start = Instant::now();
        let res = m.try_lock_for(Duration::from_millis(30), Duration::from_millis(5), |v| *v);
        assert_eq!(res, Err(TimedOut));
        assert!(start.elapsed() >= Duration::from_millis(30));

        release_tx.send(()).unwrap();
        holder.join().unwrap();
        assert_eq!(
            m.try_lock_for(Duration::from_millis(30), Duration::from_millis(5), |v| *v),
            Ok(0)
        );
    }

    #[test]
    fn try_lock_for_acquires_once_released() {
        let m = Arc::new(LabMutex::new(7));
        let (held_tx, held_rx) = mpsc::channel();
        let holder = {
            let m = m.clone();
            std::thread::spawn(move || {
                m.lock(|v| {
                    held_tx.send(()).unwrap();
                    std::thread::sleep(Duration::from_millis(20));
                    *v += 1;
                });
            })
        };
        held_rx.recv().unwrap();
        let res = m.try_lock_for(Duration::from_secs(5), Duration::from_millis(2), |v| *v);
        assert_eq!(res, Ok(8));
        holder.join().unwrap();
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let m = Arc::new(LabMutex::new(5));
        let m2 = m.clone();
        let _ = std::thread::spawn(move || {
            m2.lock(|_| panic!("poison"));
        })
        .join();
        assert_eq!(m.lock(|v| *v), 5);
        assert_eq!(m.try_lock(|v| *v), Some(5));
    }

    #[test]
    fn concurrent_lock() {
        let m = Arc::new(LabMutex::new(0));
        let mut handles = vec![];
        for _ in 0..10 {
            let m = m.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    m.lock(|v| *v += 1);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(m.lock(|v| *v), 1000);
    }
}
