// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! SIGINT handling.
//!
//! Ctrl+C must never kill the shell. Children share the shell's process
//! group, so a Ctrl+C typed at the terminal already reaches them. A SIGINT
//! sent to the shell alone (`kill -INT`) is forwarded to every tracked
//! child. At the prompt the handler just prints a newline. The handler
//! touches only atomics and async-signal-safe libc calls.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

const MAX_TRACKED: usize = 64;

#[allow(clippy::declare_interior_mutable_const)]
const FREE: AtomicI32 = AtomicI32::new(0);

/// Pids of running foreground children, 0 marks a free slot.
static FOREGROUND: [AtomicI32; MAX_TRACKED] = [FREE; MAX_TRACKED];
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signo: libc::c_int, info: *mut libc::siginfo_t, _ctx: *mut libc::c_void) {
    INTERRUPTED.store(true, Ordering::SeqCst);

    let running = FOREGROUND.iter().any(|slot| slot.load(Ordering::SeqCst) > 0);
    if !running {
        let newline = b"\n";
        unsafe {
            libc::write(
                libc::STDOUT_FILENO,
                newline.as_ptr() as *const libc::c_void,
                newline.len(),
            );
        }
        return;
    }

    let code = if info.is_null() { 0 } else { unsafe { (*info).si_code } };
    if !sent_by_process(code) {
        return;
    }
    for slot in &FOREGROUND {
        let pid = slot.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGINT);
            }
        }
    }
}

/// `kill(2)`, `sigqueue(3)` and `tgkill(2)` leave a zero or negative
/// `si_code`; the terminal driver's signals carry a positive one.
fn sent_by_process(si_code: libc::c_int) -> bool {
    si_code <= 0
}

/// Install the SIGINT handler for the whole process.
pub fn install() -> io::Result<()> {
    let handler: extern "C" fn(libc::c_int, *mut libc::siginfo_t, *mut libc::c_void) = on_sigint;
    let ret = unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as libc::sighandler_t;
        action.sa_flags = libc::SA_SIGINFO | libc::SA_RESTART;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut())
    };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Register a running child. Returns false when every slot is taken; the
/// child then only sees SIGINT from the terminal itself.
pub fn track(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    FOREGROUND.iter().any(|slot| {
        slot.compare_exchange(0, pid, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    })
}

pub fn untrack(pid: u32) {
    let Ok(pid) = i32::try_from(pid) else {
        return;
    };
    for slot in &FOREGROUND {
        if slot
            .compare_exchange(pid, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return;
        }
    }
}

/// Whether SIGINT arrived since the last call.
pub fn take_interrupted() -> bool {
    INTERRUPTED.swap(false, Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Pids far above any real pid_max so the slots never collide with
    // children spawned by other tests.
    #[test]
    fn track_then_untrack() {
        let pid = 0x3fff_0001;
        assert!(track(pid));
        assert!(FOREGROUND.iter().any(|s| s.load(Ordering::SeqCst) == pid as i32));
        untrack(pid);
        assert!(!FOREGROUND.iter().any(|s| s.load(Ordering::SeqCst) == pid as i32));
    }

    #[test]
    fn untrack_unknown_is_noop() {
        untrack(0x3fff_0002);
    }

    #[test]
    fn only_process_sent_signals_are_forwarded() {
        assert!(sent_by_process(0)); // SI_USER
        assert!(sent_by_process(-1)); // SI_QUEUE
        assert!(sent_by_process(-6)); // SI_TKILL
        assert!(!sent_by_process(0x80)); // SI_KERNEL, as from the tty
    }

    #[test]
    fn oversized_pid_is_not_tracked() {
        assert!(!track(u32::MAX));
    }
}
