//! Asynchronous child-exit notification.
//!
//! The SIGCHLD handler only records a pid/status pair into atomics; every
//! user-visible consequence is deferred to the hub's next loop iteration via
//! [`take_exit`]. Notifications for pids other than the watched monitor
//! (score reducers, for instance) are reaped and dropped here, which is why
//! their spawners must tolerate an already-collected wait.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use anyhow::Result;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

static MONITOR_PID: AtomicI32 = AtomicI32::new(-1);
static MONITOR_EXITED: AtomicBool = AtomicBool::new(false);
static EXIT_STATUS: AtomicI32 = AtomicI32::new(0);

extern "C" fn on_sigchld(_: nix::libc::c_int) {
    loop {
        match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(pid, code)) => note_exit(pid, code),
            Ok(WaitStatus::Signaled(pid, sig, _)) => note_exit(pid, 128 + sig as i32),
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(_) => continue,
        }
    }
}

fn note_exit(pid: Pid, status: i32) {
    if pid.as_raw() == MONITOR_PID.load(Ordering::SeqCst) {
        EXIT_STATUS.store(status, Ordering::SeqCst);
        MONITOR_PID.store(-1, Ordering::SeqCst);
        MONITOR_EXITED.store(true, Ordering::SeqCst);
    }
}

/// Install the SIGCHLD handler. SA_RESTART keeps the hub's blocking stdin
/// read alive across notifications, which is what defers the state reset to
/// the next interactive iteration.
pub fn install() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigchld),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe { sigaction(Signal::SIGCHLD, &action) }?;
    Ok(())
}

/// Declare which child pid is the monitor. Exits of any other child are
/// silently reaped.
pub fn watch(pid: Pid) {
    MONITOR_EXITED.store(false, Ordering::SeqCst);
    MONITOR_PID.store(pid.as_raw(), Ordering::SeqCst);
}

/// Consume a recorded monitor exit, if one happened since the last call.
pub fn take_exit() -> Option<i32> {
    if MONITOR_EXITED.swap(false, Ordering::SeqCst) {
        Some(EXIT_STATUS.load(Ordering::SeqCst))
    } else {
        None
    }
}
