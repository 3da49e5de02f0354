//! The trap emulator: recognizes a cycle-counter read disguised as a
//! segfault and synthesizes its result, instead of letting it kill the
//! guest.

use crate::process::tracee::TracedThread;
use crate::process::syscall::TimeSource;
use crate::tsc::{decode_trap, TrapKind};

/// Number of bytes read from the faulting program counter to identify the
/// instruction: enough to cover the longest cycle-counter opcode (`RDTSCP`,
/// 3 bytes) with headroom for a decoder that wants more context.
const TRAP_PROBE_LEN: usize = 16;

/// Attempts to explain a `SIGSEGV` as an emulated cycle-counter read.
///
/// Returns `true` if the trap was handled (registers patched, program
/// counter advanced, signal consumed); `false` if the faulting instruction
/// was not a cycle-counter read, in which case the caller must forward the
/// signal to the guest on the next resume.
pub fn try_emulate(thread: &mut TracedThread, time_source: &dyn TimeSource) -> bool {
    if thread.regs.fetch_regs().is_err() {
        return false;
    }
    let pc = thread.regs.instruction_pointer();

    let memory = match thread.memory_mut() {
        Ok(memory) => memory,
        Err(_) => return false,
    };
    let bytes = match memory.read(pc, TRAP_PROBE_LEN) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("trap emulator: failed to read faulting opcode: {}", err);
            return false;
        }
    };

    let kind = match decode_trap(&bytes) {
        Some(kind) => kind,
        None => return false,
    };

    let simulated_ns = time_source.current_simulated_time();
    trace!(
        "trap emulator: {:?} at {} (simulated time {} ns)",
        kind,
        pc,
        simulated_ns
    );

    match kind {
        TrapKind::Rdtsc => thread.tsc.emulate_rdtsc(&mut thread.regs, simulated_ns),
        TrapKind::Rdtscp => thread.tsc.emulate_rdtscp(&mut thread.regs, simulated_ns),
    }

    thread.regs.push_regs().is_ok()
}
