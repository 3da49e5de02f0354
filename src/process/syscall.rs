//! The syscall mediator's external contract: the descriptor handed to the
//! handler at syscall-entry, and the three outcomes it may return.

use crate::process::tracee::TracedThread;

/// A decoded syscall, as observed at the syscall-entry stop.
#[derive(Debug, Copy, Clone)]
pub struct SyscallArgs {
    pub number: i64,
    pub args: [u64; 6],
}

/// What the syscall handler decided to do with the intercepted call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HandlerResult {
    /// The simulator must suspend this thread; `resume` returns without
    /// continuing the guest, and the guest stays parked at syscall-entry.
    Blocked,
    /// The real syscall must not run; install `v` as its result instead.
    Done(u64),
    /// Let the syscall run unmodified on the host kernel.
    Native,
}

/// External collaborator that decides, per intercepted syscall, whether to
/// block the thread, supply a value, or let the call through untouched.
///
/// Implementations may call back into `thread` to use `borrow_read`,
/// `clone_read`, and `stage_write` against the guest's memory window, and
/// `set_syscall_result` as a shorthand for returning `Done`. They must not
/// otherwise mutate the thread's state.
pub trait SyscallHandler {
    fn handle(&mut self, thread: &mut TracedThread, call: SyscallArgs) -> HandlerResult;
}

/// Supplies the simulator's notion of time to the trap emulator.
pub trait TimeSource {
    /// Nanoseconds since the start of the simulation.
    fn current_simulated_time(&self) -> u64;
}
