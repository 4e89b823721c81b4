// src/process/liveness.rs

//! OS-level liveness primitives.
//!
//! Nothing here waits: every call is a single non-blocking syscall.

use std::io;

use tracing::trace;

/// Does a process with this id exist?
///
/// If `pid` is an exited child of ours it is reaped first, so a zombie left
/// behind by a finished build never reads as alive. `EPERM` from the probe
/// means the process exists but belongs to someone else.
pub fn pid_exists(pid: u32) -> bool {
    let Ok(raw) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }

    if try_reap(raw) {
        return false;
    }

    // SAFETY: signal 0 performs only the existence and permission check.
    let r = unsafe { libc::kill(raw, 0) };
    if r == 0 {
        return true;
    }
    io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Reap `pid` if it is a terminated child of this process.
///
/// Returns `true` when a status was collected. Non-children and still-running
/// children return `false`.
pub fn try_reap(pid: libc::pid_t) -> bool {
    let mut status: libc::c_int = 0;
    // SAFETY: WNOHANG makes this a non-blocking poll; `status` is a valid out-pointer.
    let r = unsafe { libc::waitpid(pid, &mut status, libc::WNOHANG) };
    if r == pid {
        trace!(pid, status, "reaped exited child");
        return true;
    }
    false
}

/// Collect every terminated child of this process, discarding statuses.
///
/// Returns the number reaped. Stops at the first "nothing ready" or
/// "no children" answer.
pub fn reap_all() -> usize {
    let mut reaped = 0;
    loop {
        let mut status: libc::c_int = 0;
        // SAFETY: see `try_reap`.
        let r = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };
        if r <= 0 {
            break;
        }
        trace!(pid = r, status, "reaped child");
        reaped += 1;
    }
    reaped
}

/// Id of the calling process.
pub fn current_pid() -> u32 {
    std::process::id()
}

/// Is this `io::Error` the "child already reaped elsewhere" case?
pub fn is_echild(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ECHILD)
}

#[cfg(test)]
mod tests {
    use std::process::Command;
    use std::thread::sleep;
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn current_process_exists() {
        assert!(pid_exists(current_pid()));
    }

    #[test]
    fn pid_zero_is_never_alive() {
        assert!(!pid_exists(0));
    }

    #[test]
    fn exited_child_is_not_alive() {
        let child = Command::new("sh")
            .args(["-c", "exit 0"])
            .spawn()
            .expect("spawn quick-exit child");
        let pid = child.id();
        drop(child);

        let deadline = Instant::now() + Duration::from_secs(5);
        while pid_exists(pid) {
            assert!(Instant::now() < deadline, "child {pid} still reported alive");
            sleep(Duration::from_millis(10));
        }
    }
}
