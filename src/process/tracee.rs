//! The traced thread: the controller's per-guest state and public surface.
//!
//! Grounded on the teacher's `Tracee` (pid + status + restart-method +
//! cached registers), generalized with the memory window, the handler
//! outcome bookkeeping, and the deferred read/write lists this spec calls
//! for, and stripped of the path-translation/filesystem concerns that were
//! specific to running a sandboxed rootfs.

use crate::errors::{Error, Result};
use crate::guest_ptr::GuestPtr;
use crate::process::memory::MemoryWindow;
use crate::process::syscall::HandlerResult;
use crate::register::Registers;
use crate::tsc::Tsc;
use nix::sys::signal::Signal;
use nix::unistd::Pid;

/// Where the traced thread currently sits in the protocol.
///
/// `None` is the sentinel before the initial attach stop is observed; it
/// never recurs afterwards. `Exited` is likewise terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    None,
    TraceMe,
    SyscallPre,
    SyscallPost,
    Exec,
    Signalled,
    Exited,
}

/// A write the handler staged against the memory window, waiting to be
/// flushed into the guest on the next resume.
#[derive(Debug)]
pub(crate) struct PendingWrite {
    pub addr: GuestPtr,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct TracedThread {
    pub(crate) pid: Pid,
    pub(crate) state: State,
    pub(crate) regs: Registers,
    /// Absent until the initial attach stop is classified, which is the
    /// first point at which `/proc/<pid>/mem` can be read from or written
    /// to under ptrace.
    pub(crate) memory: Option<MemoryWindow>,
    pub(crate) tsc: Tsc,

    /// Outcome the handler returned for the syscall currently at
    /// syscall-pre/syscall-post, if any has been decided yet.
    pub(crate) pending_result: Option<HandlerResult>,
    pub(crate) pending_writes: Vec<PendingWrite>,
    pub(crate) temp_reads: Vec<Vec<u8>>,
    pub(crate) pending_signal: Option<Signal>,
    pub(crate) return_code: Option<i32>,
}

impl TracedThread {
    pub(crate) fn new(pid: Pid, cycles_per_second: u64) -> Self {
        TracedThread {
            pid,
            state: State::None,
            regs: Registers::new(pid),
            memory: None,
            tsc: Tsc::new(cycles_per_second),
            pending_result: None,
            pending_writes: Vec::new(),
            temp_reads: Vec::new(),
            pending_signal: None,
            return_code: None,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// True while the thread is anywhere in the protocol other than not-yet-
    /// started or terminated.
    pub fn is_running(&self) -> bool {
        matches!(
            self.state,
            State::TraceMe | State::SyscallPre | State::SyscallPost | State::Signalled | State::Exec
        )
    }

    /// The guest's exit status. Only meaningful once `state() == Exited`.
    pub fn return_code(&self) -> Result<i32> {
        match self.return_code {
            Some(code) => Ok(code),
            None => Err(Error::fatal("return_code read before the thread exited")),
        }
    }

    pub(crate) fn memory_mut(&mut self) -> Result<&mut MemoryWindow> {
        self.memory
            .as_mut()
            .ok_or_else(|| Error::fatal("memory window accessed before the attach stop"))
    }

    /// Returns a copy of `n` bytes of guest memory at `addr`, registered on
    /// the temporary-reads list so it is released at the next resume.
    ///
    /// Unlike `clone_read`, the caller does not own the buffer outright;
    /// its backing storage is dropped by the driver on the next resume.
    /// This mirrors the original's pointer-based borrow with a Rust-side
    /// reference whose lifetime is tied to `&self`.
    pub fn borrow_read(&mut self, addr: GuestPtr, n: usize) -> Result<&[u8]> {
        let bytes = self.memory_mut()?.read(addr, n)?;
        self.temp_reads.push(bytes);
        Ok(self.temp_reads.last().unwrap())
    }

    /// As `borrow_read`, but the caller takes ownership of the buffer; it
    /// is not placed on the temporary-reads list and has no lifetime tied
    /// to the next resume.
    pub fn clone_read(&mut self, addr: GuestPtr, n: usize) -> Result<Vec<u8>> {
        self.memory_mut()?.read(addr, n)
    }

    /// Stages a write of `n` bytes to guest memory at `addr`, to be flushed
    /// on the next resume. Returns a mutable slice into the staged buffer
    /// so the handler can fill it incrementally; the bytes present at the
    /// next resume are what reaches the guest.
    pub fn stage_write(&mut self, addr: GuestPtr, n: usize) -> &mut [u8] {
        self.pending_writes.push(PendingWrite {
            addr,
            bytes: vec![0u8; n],
        });
        &mut self.pending_writes.last_mut().unwrap().bytes
    }

    /// Shorthand for a handler that wants to finish the current syscall
    /// immediately with a known result, without going through its own
    /// return value. Precondition: `state() == SyscallPre`.
    pub fn set_syscall_result(&mut self, value: u64) {
        debug_assert_eq!(
            self.state,
            State::SyscallPre,
            "set_syscall_result called outside syscall-pre"
        );
        self.pending_result = Some(HandlerResult::Done(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::syscall::{SyscallArgs, SyscallHandler};
    use crate::utils::tests::{cstrings, run_until, FixedTime};

    /// Reads a handful of bytes at the guest's own instruction pointer and
    /// stages writing them straight back, then blocks. Exercises
    /// `clone_read`/`stage_write` against a real memory window without
    /// actually perturbing the guest's memory.
    struct ReadBackWriter;

    impl SyscallHandler for ReadBackWriter {
        fn handle(&mut self, thread: &mut TracedThread, _call: SyscallArgs) -> HandlerResult {
            let pc = thread.regs.instruction_pointer();
            let bytes = thread.clone_read(pc, 8).expect("clone_read at rip");
            assert_eq!(bytes.len(), 8);
            thread.stage_write(pc, bytes.len()).copy_from_slice(&bytes);
            HandlerResult::Blocked
        }
    }

    #[test]
    fn clone_read_and_stage_write_round_trip_against_a_live_guest() {
        let argv = cstrings(&["sleep", "5"]);
        let mut handler = ReadBackWriter;
        let time = FixedTime(0);

        let mut thread =
            run_until(&argv, &mut handler, &time, |t| t.state() == State::SyscallPre);
        assert_eq!(thread.state(), State::SyscallPre);

        thread.terminate().expect("terminate");
        assert!(!thread.is_running());
    }

    #[test]
    fn borrow_read_is_released_by_the_next_resume() {
        let argv = cstrings(&["sleep", "5"]);
        let mut handler = crate::utils::tests::BlockingHandler;
        let time = FixedTime(0);

        let mut thread =
            run_until(&argv, &mut handler, &time, |t| t.state() == State::SyscallPre);
        assert!(thread.temp_reads.is_empty());

        let pc = thread.regs.instruction_pointer();
        let _ = thread.borrow_read(pc, 4).expect("borrow_read at rip");
        assert_eq!(thread.temp_reads.len(), 1);

        // Unblock so the next `resume` actually re-enters its loop body
        // (the early-return on `Blocked` would otherwise skip the clear).
        thread.set_syscall_result(0);
        thread.resume(&mut handler, &time).expect("resume");
        assert!(thread.temp_reads.is_empty());

        thread.terminate().expect("terminate");
    }
}
