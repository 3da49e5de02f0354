//! Test-only helpers for driving a real traced child process, in the same
//! no-mocking spirit as the teacher's own `fork_test`: every test that
//! exercises the controller against a live process forks one, traces it
//! for real, and asserts on the observed state.

#[cfg(test)]
pub mod tests {
    use crate::process::{HandlerResult, SyscallArgs, SyscallHandler, TimeSource, TracedThread};
    use std::ffi::CString;

    /// A handler that always lets the syscall run natively. Useful for
    /// tests that only care about state transitions, not interception.
    pub struct NativeHandler;

    impl SyscallHandler for NativeHandler {
        fn handle(&mut self, _thread: &mut TracedThread, _call: SyscallArgs) -> HandlerResult {
            HandlerResult::Native
        }
    }

    /// A handler that blocks on every syscall, so `resume` returns with
    /// the guest still parked at syscall-entry. Useful for tests that need
    /// a running-but-stopped thread to act on (e.g. `terminate`).
    pub struct BlockingHandler;

    impl SyscallHandler for BlockingHandler {
        fn handle(&mut self, _thread: &mut TracedThread, _call: SyscallArgs) -> HandlerResult {
            HandlerResult::Blocked
        }
    }

    /// A fixed simulated clock, for tests that don't care about its value.
    pub struct FixedTime(pub u64);

    impl TimeSource for FixedTime {
        fn current_simulated_time(&self) -> u64 {
            self.0
        }
    }

    pub fn cstrings(args: &[&str]) -> Vec<CString> {
        args.iter()
            .map(|s| CString::new(*s).expect("argument has no interior nul"))
            .collect()
    }

    /// Launches `argv` as a traced guest and repeatedly calls `resume`
    /// until either `until` returns true or the guest exits, then returns
    /// the thread for the caller to assert against.
    ///
    /// Mirrors the teacher's `fork_test`: a real fork, a real ptrace
    /// attach, and a predicate closure deciding when the parent-side loop
    /// is done, rather than any mocked tracer.
    pub fn run_until(
        argv: &[CString],
        handler: &mut dyn SyscallHandler,
        time_source: &dyn TimeSource,
        mut until: impl FnMut(&TracedThread) -> bool,
    ) -> TracedThread {
        let envp: Vec<CString> = vec![];
        let mut thread =
            TracedThread::run(argv, &envp, 2_000_000_000, handler, time_source).expect("run");

        while thread.is_running() && !until(&thread) {
            thread.resume(handler, time_source).expect("resume");
        }
        thread
    }
}
