use crate::errors::Result;
use crate::guest_ptr::GuestPtr;
use libc::user_regs_struct;
use nix::sys::ptrace;
use nix::unistd::Pid;
use std::fmt;

#[derive(Debug, Copy, Clone)]
#[allow(dead_code)]
pub enum SysArgIndex {
    SysArg0 = 0,
    SysArg1,
    SysArg2,
    SysArg3,
    SysArg4,
    SysArg5,
}
use self::SysArgIndex::*;

#[derive(Debug, Copy, Clone)]
pub enum Register {
    SysNum,
    SysArg(SysArgIndex),
    SysResult,
    StackPointer,
    InstrPointer,
    TscLow,
    TscHigh,
    TscAux,
}
use self::Register::*;

/// The guest's general-purpose register block, as of the most recent stop.
///
/// Unlike the teacher's `Registers` (which keeps `Current`/`Original`/
/// `Modified` snapshots so it can roll back path-substitution rewrites),
/// this controller only ever has one version in flight at a time: the
/// syscall mediator and the trap emulator each fetch, mutate, and push once
/// per stop, so a single cached block plus a dirty flag is enough.
#[derive(Debug)]
pub struct Registers {
    pid: Pid,
    raw: Option<user_regs_struct>,
    regs_were_changed: bool,
}

#[allow(dead_code)]
impl Registers {
    pub fn new(pid: Pid) -> Self {
        Registers {
            pid,
            raw: None,
            regs_were_changed: false,
        }
    }

    #[cfg(test)]
    pub fn from(pid: Pid, raw_regs: user_regs_struct) -> Self {
        Registers {
            pid,
            raw: Some(raw_regs),
            regs_were_changed: false,
        }
    }

    /// Retrieves all of the tracee's general-purpose registers via
    /// `PTRACE_GETREGS` and caches them as the current block.
    pub fn fetch_regs(&mut self) -> Result<()> {
        let regs: user_regs_struct = ptrace::getregs(self.pid)?;
        self.raw = Some(regs);
        self.regs_were_changed = false;
        Ok(())
    }

    /// Pushes the cached block back to the tracee via `PTRACE_SETREGS`, if
    /// it was modified since the last fetch or push. No-op otherwise.
    pub fn push_regs(&mut self) -> Result<()> {
        if !self.regs_were_changed {
            return Ok(());
        }

        let pid = self.pid;
        let raw_regs = self.raw_mut();

        debug!("push regs: {:x?}", raw_regs);
        ptrace::setregs(pid, *raw_regs)?;
        self.regs_were_changed = false;
        Ok(())
    }

    #[inline]
    fn raw(&self) -> &user_regs_struct {
        match self.raw {
            Some(ref regs) => regs,
            None => unreachable!("registers accessed before fetch_regs"),
        }
    }

    #[inline]
    fn raw_mut(&mut self) -> &mut user_regs_struct {
        match self.raw {
            Some(ref mut regs) => regs,
            None => unreachable!("registers accessed before fetch_regs"),
        }
    }

    /// Retrieves a value from one of the registers.
    #[inline]
    pub fn get(&self, register: Register) -> u64 {
        let raw = self.raw();
        match register {
            SysNum => get_reg!(raw, SysNum),
            SysArg(SysArg0) => get_reg!(raw, SysArg0),
            SysArg(SysArg1) => get_reg!(raw, SysArg1),
            SysArg(SysArg2) => get_reg!(raw, SysArg2),
            SysArg(SysArg3) => get_reg!(raw, SysArg3),
            SysArg(SysArg4) => get_reg!(raw, SysArg4),
            SysArg(SysArg5) => get_reg!(raw, SysArg5),
            SysResult => get_reg!(raw, SysResult),
            StackPointer => get_reg!(raw, StackPointer),
            InstrPointer => get_reg!(raw, InstrPointer),
            TscLow => get_reg!(raw, TscLow),
            TscHigh => get_reg!(raw, TscHigh),
            TscAux => get_reg!(raw, TscAux),
        }
    }

    /// Modifies the value of one register in the cached block.
    ///
    /// If `new_value` equals the current one, `regs_were_changed` is not
    /// toggled, so `push_regs` can skip the syscall entirely.
    #[inline]
    pub fn set(&mut self, register: Register, new_value: u64, justification: &'static str) {
        let current_value = self.get(register);

        debug!(
            "-- {}, modifying register {:?}: {:#x} -> {:#x} ({})",
            self.pid, register, current_value, new_value, justification
        );

        if current_value == new_value {
            return;
        }

        let raw = self.raw_mut();
        match register {
            SysNum => get_reg!(raw, SysNum) = new_value,
            SysArg(SysArg0) => get_reg!(raw, SysArg0) = new_value,
            SysArg(SysArg1) => get_reg!(raw, SysArg1) = new_value,
            SysArg(SysArg2) => get_reg!(raw, SysArg2) = new_value,
            SysArg(SysArg3) => get_reg!(raw, SysArg3) = new_value,
            SysArg(SysArg4) => get_reg!(raw, SysArg4) = new_value,
            SysArg(SysArg5) => get_reg!(raw, SysArg5) = new_value,
            SysResult => get_reg!(raw, SysResult) = new_value,
            StackPointer => get_reg!(raw, StackPointer) = new_value,
            InstrPointer => get_reg!(raw, InstrPointer) = new_value,
            TscLow => get_reg!(raw, TscLow) = new_value,
            TscHigh => get_reg!(raw, TscHigh) = new_value,
            TscAux => get_reg!(raw, TscAux) = new_value,
        };
        self.regs_were_changed = true;
    }

    #[inline]
    pub fn get_pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn get_sys_num(&self) -> i64 {
        self.get(SysNum) as i64
    }

    #[inline]
    pub fn set_sys_num(&mut self, new_value: i64, justification: &'static str) {
        self.set(SysNum, new_value as u64, justification);
    }

    /// Substitutes the syscall number with a sentinel the kernel will reject
    /// cheaply (`-1`, not a valid syscall on any architecture), so that
    /// continuing the guest doesn't run the real syscall.
    #[inline]
    pub fn cancel_syscall(&mut self, justification: &'static str) {
        self.set_sys_num(-1, justification);
    }

    #[inline]
    pub fn get_sys_arg(&self, index: SysArgIndex) -> u64 {
        self.get(SysArg(index))
    }

    #[inline]
    pub fn set_sys_arg(&mut self, index: SysArgIndex, value: u64, justification: &'static str) {
        self.set(SysArg(index), value, justification);
    }

    #[inline]
    pub fn get_sys_result(&self) -> u64 {
        self.get(SysResult)
    }

    #[inline]
    pub fn set_sys_result(&mut self, value: u64, justification: &'static str) {
        self.set(SysResult, value, justification);
    }

    #[inline]
    pub fn instruction_pointer(&self) -> GuestPtr {
        GuestPtr(self.get(InstrPointer))
    }

    #[inline]
    pub fn advance_instruction_pointer(&mut self, delta: u64) {
        let pc = self.get(InstrPointer);
        self.set(InstrPointer, pc + delta, "advancing past emulated instruction");
    }

    /// Deposits a 64-bit cycle count as `EDX:EAX`, per RDTSC's calling
    /// convention (low 32 bits in EAX, high 32 bits in EDX). In 64-bit mode,
    /// writing a 32-bit sub-register zero-extends into the full register,
    /// which assigning `u32 as u64` below reproduces.
    #[inline]
    pub fn set_tsc_result(&mut self, cycles: u64) {
        let low = (cycles & 0xffff_ffff) as u32 as u64;
        let high = (cycles >> 32) as u32 as u64;
        self.set(TscLow, low, "emulating rdtsc low result");
        self.set(TscHigh, high, "emulating rdtsc high result");
    }

    /// Sets RDTSCP's auxiliary (processor/node id) register.
    #[inline]
    pub fn set_tsc_aux(&mut self, aux: u32) {
        self.set(TscAux, aux as u64, "emulating rdtscp aux result");
    }

    #[inline]
    fn display(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "(pid {}: syscall {} - args [{}, {}, {}, {}, {}, {}], result {:#x}, rip {})",
            self.pid,
            self.get_sys_num(),
            self.get_sys_arg(SysArg0),
            self.get_sys_arg(SysArg1),
            self.get_sys_arg(SysArg2),
            self.get_sys_arg(SysArg3),
            self.get_sys_arg(SysArg4),
            self.get_sys_arg(SysArg5),
            self.get_sys_result(),
            self.instruction_pointer(),
        )
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.display(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    fn zeroed_regs() -> Registers {
        let raw: user_regs_struct = unsafe { mem::zeroed() };
        Registers::from(Pid::from_raw(-1), raw)
    }

    #[test]
    fn set_marks_dirty_only_on_change() {
        let mut regs = zeroed_regs();
        assert!(!regs.regs_were_changed);

        regs.set(SysNum, 0, "no-op set");
        assert!(!regs.regs_were_changed);

        regs.set(SysNum, 42, "real set");
        assert!(regs.regs_were_changed);
        assert_eq!(regs.get(SysNum), 42);
    }

    #[test]
    fn cancel_syscall_sets_sentinel() {
        let mut regs = zeroed_regs();
        regs.set_sys_num(39, "seed a real syscall number");
        regs.cancel_syscall("substitute an invalid number");
        assert_eq!(regs.get_sys_num(), -1);
    }

    #[test]
    fn set_tsc_result_splits_into_high_and_low() {
        let mut regs = zeroed_regs();
        regs.set_tsc_result(0x0000_0002_0000_0001);
        assert_eq!(regs.get(TscLow), 1);
        assert_eq!(regs.get(TscHigh), 2);
    }

    #[test]
    fn advance_instruction_pointer_moves_forward() {
        let mut regs = zeroed_regs();
        regs.set(InstrPointer, 0x1000, "seed rip");
        regs.advance_instruction_pointer(2);
        assert_eq!(regs.instruction_pointer(), GuestPtr(0x1002));
    }

    #[test]
    fn sys_args_round_trip_through_all_six_slots() {
        let mut regs = zeroed_regs();
        let slots = [SysArg0, SysArg1, SysArg2, SysArg3, SysArg4, SysArg5];
        for (i, slot) in slots.iter().enumerate() {
            regs.set_sys_arg(*slot, i as u64 + 100, "seed arg");
        }
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(regs.get_sys_arg(*slot), i as u64 + 100);
        }
    }
}
