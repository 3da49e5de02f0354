//! The state machine driver: spawns the guest, and loops it between stops
//! until the syscall handler blocks the thread or the guest exits.
//!
//! Grounded on the teacher's `PRoot::event_loop`, narrowed from proot's
//! multi-tracee `HashMap` and path-translation dispatch down to a single
//! traced thread mediating syscalls instead of rewriting paths.

use crate::errors::Result;
use crate::process::launcher;
use crate::process::syscall::{HandlerResult, SyscallHandler, TimeSource};
use crate::process::trap;
use crate::process::tracee::{State, TracedThread};
use nix::sys::ptrace;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag};
use std::ffi::CString;

impl TracedThread {
    /// Spawns `argv` (with environment `envp`) as the guest, observes its
    /// initial attach stop, and runs it until the handler blocks or the
    /// guest exits.
    pub fn run(
        argv: &[CString],
        envp: &[CString],
        cycles_per_second: u64,
        handler: &mut dyn SyscallHandler,
        time_source: &dyn TimeSource,
    ) -> Result<TracedThread> {
        let pid = launcher::spawn(argv, envp)?;
        let mut thread = TracedThread::new(pid, cycles_per_second);

        let status = waitpid(pid, Some(WaitPidFlag::__WALL))?;
        thread.classify(status)?;
        debug_assert_eq!(thread.state(), State::TraceMe);

        thread.resume(handler, time_source)?;
        Ok(thread)
    }

    /// Runs the per-spec driver loop: continue, wait, classify, dispatch,
    /// repeat, until the handler blocks the thread or it exits.
    pub fn resume(
        &mut self,
        handler: &mut dyn SyscallHandler,
        time_source: &dyn TimeSource,
    ) -> Result<()> {
        loop {
            if self.state == State::Exited {
                return Ok(());
            }
            if self.state == State::SyscallPre
                && self.pending_result == Some(HandlerResult::Blocked)
            {
                return Ok(());
            }

            // A thread unblocked since the last time we stopped here still
            // needs its syscall cancelled before we let the kernel see it.
            self.cancel_syscall_if_done()?;

            self.temp_reads.clear();

            if !self.pending_writes.is_empty() {
                let pending = std::mem::take(&mut self.pending_writes);
                for write in pending {
                    self.memory_mut()?.write(write.addr, &write.bytes)?;
                }
                self.memory_mut()?.mark_dirty();
            }
            if self.memory_mut()?.is_dirty() {
                self.memory_mut()?.flush()?;
            }

            let signal_to_deliver = self.pending_signal.take();
            ptrace::syscall(self.pid, signal_to_deliver)?;

            let status = waitpid(self.pid, Some(WaitPidFlag::__WALL))?;
            self.classify(status)?;

            match self.state {
                State::SyscallPre => self.mediate_syscall_enter(handler)?,
                State::SyscallPost => self.mediate_syscall_exit()?,
                State::Signalled => {
                    if self.pending_signal == Some(Signal::SIGSEGV)
                        && trap::try_emulate(self, time_source)
                    {
                        self.pending_signal = None;
                    }
                }
                _ => {}
            }
        }
    }

    /// Stops the thread if it is still running: a non-blocking wait first
    /// (in case it has already exited), then `SIGKILL` and a final
    /// synchronous wait to collect the exit. Post-condition: `is_running()`
    /// is false.
    pub fn terminate(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        if let Ok(status) = waitpid(self.pid, Some(WaitPidFlag::WNOHANG | WaitPidFlag::__WALL)) {
            if self.classify(status).is_ok() && self.state == State::Exited {
                return Ok(());
            }
        }

        let _ = kill(self.pid, Signal::SIGKILL);
        let status = waitpid(self.pid, Some(WaitPidFlag::__WALL))?;
        self.classify(status)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tests::{cstrings, run_until, BlockingHandler, FixedTime, NativeHandler};

    #[test]
    /// S1: a guest whose syscalls are all let through natively should run
    /// to a normal exit, observing its own real exit status.
    fn native_passthrough_runs_to_completion() {
        let argv = cstrings(&["true"]);
        let mut handler = NativeHandler;
        let time = FixedTime(0);

        let thread = run_until(&argv, &mut handler, &time, |t| t.state() == State::Exited);

        assert_eq!(thread.state(), State::Exited);
        assert_eq!(thread.return_code().unwrap(), 0);
    }

    #[test]
    /// S5: an unhandled segfault (here, self-inflicted by the guest via
    /// `kill -SEGV $$`) terminates the guest; the next classification
    /// observes termination-by-signal with a negative return code.
    fn unhandled_segfault_terminates_with_negative_code() {
        let argv = cstrings(&["sh", "-c", "kill -SEGV $$"]);
        let mut handler = NativeHandler;
        let time = FixedTime(0);

        let thread = run_until(&argv, &mut handler, &time, |t| t.state() == State::Exited);

        assert!(!thread.is_running());
        assert!(thread.return_code().unwrap() < 0);
    }

    #[test]
    /// S3 plus termination: a handler that blocks forever leaves the guest
    /// parked at syscall-entry; `terminate` must still bring it down.
    fn terminate_is_quiescent_on_a_blocked_thread() {
        let argv = cstrings(&["sleep", "5"]);
        let mut handler = BlockingHandler;
        let time = FixedTime(0);

        let mut thread =
            run_until(&argv, &mut handler, &time, |t| t.state() == State::SyscallPre);
        assert!(thread.is_running());
        assert_eq!(thread.state(), State::SyscallPre);

        thread.terminate().expect("terminate");

        assert!(!thread.is_running());
        assert!(thread.return_code().is_ok());
    }
}
