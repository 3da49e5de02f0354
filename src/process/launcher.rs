//! Launches the guest child: fork, disable the hardware cycle counter,
//! request tracing, synchronize with the parent, then exec.
//!
//! Grounded on the teacher's own `PRoot::launch_process`, generalized from
//! proot's fixed `sleep` demo command to an arbitrary argv/envp and with the
//! `PR_SET_TSC` step added ahead of `PTRACE_TRACEME`.

use crate::constants::{PR_SET_TSC, PR_TSC_SIGSEGV};
use crate::errors::Result;
use nix::sys::ptrace;
use nix::sys::signal::{kill, Signal};
use nix::unistd::{execvpe, fork, getpid, ForkResult, Pid};
use std::ffi::CString;

/// Forks a child that will become the traced guest.
///
/// In the parent, returns the child's pid immediately; the child is still
/// stopped (via `SIGSTOP`) at that point, awaiting the tracer's first wait
/// and attach. In the child, this function does not return: it either
/// execs `argv[0]` or aborts the process on failure, since by this point
/// the caller (the driver) has already forked away and cannot observe a
/// `Result` from this half.
pub fn spawn(argv: &[CString], envp: &[CString]) -> Result<Pid> {
    match unsafe { fork() }? {
        ForkResult::Parent { child } => Ok(child),
        // exec_child never returns: it either execs argv[0] or aborts the
        // process directly, since there is no longer a caller able to
        // receive this Result.
        ForkResult::Child => exec_child(argv, envp),
    }
}

fn exec_child(argv: &[CString], envp: &[CString]) -> ! {
    unsafe {
        if libc::prctl(PR_SET_TSC, PR_TSC_SIGSEGV, 0, 0, 0) != 0 {
            libc::_exit(126);
        }
    }

    if ptrace::traceme().is_err() {
        unsafe { libc::_exit(126) };
    }

    // Synchronize with the parent's event loop: it must reach its first
    // wait before we exec, or the exec stop could be missed.
    if kill(getpid(), Signal::SIGSTOP).is_err() {
        unsafe { libc::_exit(126) };
    }

    match execvpe(&argv[0], argv, envp) {
        Ok(_) => unreachable!("execvpe does not return on success"),
        Err(_) => unsafe { libc::_exit(127) },
    }
}
