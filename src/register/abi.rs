/// Specify the ABI registers (syscall argument passing, stack pointer, the
/// `RDTSC`/`RDTSCP` result/auxiliary registers).
/// See sysdeps/unix/sysv/linux/x86_64/syscall.S from the GNU C Library for
/// the syscall ABI, and the Intel/AMD manuals for RDTSC/RDTSCP's calling
/// convention.
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
#[macro_use]
pub mod regs_offset {
    macro_rules! get_reg {
        ($regs:expr, SysNum)       => ($regs.orig_rax);
        ($regs:expr, SysArg0)      => ($regs.rdi);
        ($regs:expr, SysArg1)      => ($regs.rsi);
        ($regs:expr, SysArg2)      => ($regs.rdx);
        ($regs:expr, SysArg3)      => ($regs.r10);
        ($regs:expr, SysArg4)      => ($regs.r8);
        ($regs:expr, SysArg5)      => ($regs.r9);
        ($regs:expr, SysResult)    => ($regs.rax);
        ($regs:expr, StackPointer) => ($regs.rsp);
        ($regs:expr, InstrPointer) => ($regs.rip);
        ($regs:expr, TscLow)       => ($regs.rax);
        ($regs:expr, TscHigh)      => ($regs.rdx);
        ($regs:expr, TscAux)       => ($regs.rcx);
    }
}
