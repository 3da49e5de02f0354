//! The stop classifier: turns a wait status into the next traced-thread
//! state, per the decision table in order of priority. This is the only
//! code that writes `TracedThread::state` once the thread has started.

use crate::errors::{Error, Result};
use crate::process::memory::MemoryWindow;
use crate::process::tracee::{State, TracedThread};
use nix::sys::ptrace;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;

impl TracedThread {
    /// Applies one wait-status observation to the thread, performing
    /// whatever side effects the transition calls for (opening the memory
    /// window, installing tracer options).
    pub(crate) fn classify(&mut self, status: WaitStatus) -> Result<()> {
        match status {
            WaitStatus::Signaled(_, term_signal, _) => {
                self.state = State::Exited;
                self.return_code = Some(-(term_signal as i32));
                Ok(())
            }
            WaitStatus::Exited(_, exit_status) => {
                self.state = State::Exited;
                self.return_code = Some(exit_status);
                Ok(())
            }
            WaitStatus::Stopped(_, Signal::SIGSTOP) if self.state == State::None => {
                self.state = State::TraceMe;
                install_ptrace_options(self.pid)?;
                self.memory = Some(MemoryWindow::open(self.pid)?);
                Ok(())
            }
            WaitStatus::PtraceEvent(_, _, event)
                if event == ptrace::Event::PTRACE_EVENT_EXEC as i32 =>
            {
                self.state = State::Exec;
                self.memory_mut()?.reopen()?;
                Ok(())
            }
            WaitStatus::PtraceSyscall(_) => {
                self.state = match self.state {
                    State::SyscallPre | State::Exec => State::SyscallPost,
                    _ => State::SyscallPre,
                };
                Ok(())
            }
            WaitStatus::Stopped(_, signal) => {
                self.state = State::Signalled;
                self.pending_signal = Some(signal);
                Ok(())
            }
            WaitStatus::PtraceEvent(_, signal, _) => {
                self.state = State::Signalled;
                self.pending_signal = Some(signal);
                Ok(())
            }
            other => Err(Error::protocol(format!(
                "unrecognized wait status: {:?}",
                other
            ))),
        }
    }
}

fn install_ptrace_options(pid: nix::unistd::Pid) -> Result<()> {
    let options = ptrace::Options::PTRACE_O_EXITKILL
        | ptrace::Options::PTRACE_O_TRACESYSGOOD
        | ptrace::Options::PTRACE_O_TRACEEXEC;
    ptrace::setoptions(pid, options)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tests::{cstrings, run_until, FixedTime, NativeHandler};

    #[test]
    /// S6: the guest exec's exactly once, between the launcher's `SIGSTOP`
    /// and its first syscall. If `reopen` after that `PTRACE_EVENT_EXEC`
    /// failed (stale fd over a torn-down address space) the whole run would
    /// error out here instead of reaching a normal exit.
    fn memory_window_survives_the_post_attach_exec() {
        let argv = cstrings(&["true"]);
        let mut handler = NativeHandler;
        let time = FixedTime(0);

        let thread = run_until(&argv, &mut handler, &time, |t| t.state() == State::Exited);

        assert_eq!(thread.state(), State::Exited);
        assert_eq!(thread.return_code().unwrap(), 0);
    }
}
