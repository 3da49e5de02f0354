//! The syscall mediator: reads the syscall descriptor at syscall-entry,
//! hands it to the external handler, and installs the chosen outcome at
//! syscall-entry and syscall-exit.
//!
//! Called from [`crate::process::driver`] exactly once per transition into
//! `SyscallPre`/`SyscallPost`; a blocked thread returns from `resume`
//! before the driver ever waits again, so the next real syscall-entry stop
//! is the next time either of these runs.

use crate::errors::Result;
use crate::process::syscall::{HandlerResult, SyscallArgs, SyscallHandler};
use crate::process::tracee::TracedThread;
use crate::register::{SysArg0, SysArg1, SysArg2, SysArg3, SysArg4, SysArg5};

impl TracedThread {
    pub(crate) fn mediate_syscall_enter(&mut self, handler: &mut dyn SyscallHandler) -> Result<()> {
        self.regs.fetch_regs()?;

        let call = SyscallArgs {
            number: self.regs.get_sys_num(),
            args: [
                self.regs.get_sys_arg(SysArg0),
                self.regs.get_sys_arg(SysArg1),
                self.regs.get_sys_arg(SysArg2),
                self.regs.get_sys_arg(SysArg3),
                self.regs.get_sys_arg(SysArg4),
                self.regs.get_sys_arg(SysArg5),
            ],
        };

        trace!("{}: syscall-enter {:?}", self.pid, call);
        let outcome = handler.handle(self, call);
        // The handler may already have recorded its own outcome through
        // `set_syscall_result`; that takes precedence over its return value.
        if self.pending_result.is_none() {
            self.pending_result = Some(outcome);
        }

        self.cancel_syscall_if_done()
    }

    /// If the handler's outcome is `Done`, substitutes the syscall number
    /// with an invalid one and pushes the registers, so the kernel rejects
    /// the real call cheaply. Safe to call more than once: `Registers::set`
    /// only marks the block dirty on an actual change.
    ///
    /// Called both right after the handler decides, and again by the
    /// driver just before continuing a thread that was previously blocked
    /// and has since been unblocked with a result.
    pub(crate) fn cancel_syscall_if_done(&mut self) -> Result<()> {
        if let Some(HandlerResult::Done(_)) = self.pending_result {
            self.regs
                .cancel_syscall("handler supplied a result; suppress the real syscall");
            self.regs.push_regs()?;
        }
        Ok(())
    }

    pub(crate) fn mediate_syscall_exit(&mut self) -> Result<()> {
        if let Some(HandlerResult::Done(value)) = self.pending_result.take() {
            self.regs.fetch_regs()?;
            self.regs
                .set_sys_result(value, "installing handler-supplied syscall result");
            self.regs.push_regs()?;
        }
        trace!("{}: syscall-exit", self.pid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::syscall::HandlerResult;
    use crate::process::tracee::State;
    use crate::utils::tests::{cstrings, run_until, FixedTime};
    use std::cell::Cell;

    /// A handler that fakes the result of the first syscall it sees (via
    /// `HandlerResult::Done`, returned rather than set directly, to cover
    /// the "handler's return value becomes `pending_result`" path) and lets
    /// every syscall after that run natively.
    struct FakeFirstResult {
        faked: Cell<bool>,
    }

    impl SyscallHandler for FakeFirstResult {
        fn handle(&mut self, _thread: &mut TracedThread, _call: SyscallArgs) -> HandlerResult {
            if self.faked.get() {
                HandlerResult::Native
            } else {
                self.faked.set(true);
                HandlerResult::Done(0)
            }
        }
    }

    #[test]
    /// S2: a handler-supplied result is installed at syscall-exit, and the
    /// real syscall never reaches the kernel (observable here only
    /// indirectly, by the guest still completing normally afterwards).
    fn handler_supplied_result_is_installed_at_syscall_exit() {
        let argv = cstrings(&["true"]);
        let mut handler = FakeFirstResult {
            faked: Cell::new(false),
        };
        let time = FixedTime(0);

        // `resume` only ever returns on `Exited` or a blocked syscall-pre, so
        // a handler that never blocks drives the guest straight through to
        // exit in one call; there is no intermediate stop to assert against
        // other than the final one.
        let thread = run_until(&argv, &mut handler, &time, |t| t.state() == State::Exited);

        assert_eq!(thread.state(), State::Exited);
        assert!(handler.faked.get());
    }
}
