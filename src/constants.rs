//! Kernel UAPI constants not (yet) exposed by the `libc` crate.
//!
//! Mirrors the teacher's own `constants.rs`, which keeps this kind of
//! stopgap isolated in one place with a note to remove it once upstream
//! catches up.

//todo: remove once the `libc` crate exposes these PR_SET_TSC constants directly
/// `prctl(2)` option to configure the `RDTSC`/`RDTSCP` trapping behaviour.
pub const PR_SET_TSC: libc::c_int = 26;

/// Argument to `PR_SET_TSC` that makes `RDTSC`/`RDTSCP` raise `SIGSEGV`
/// when executed in user mode, instead of reading the real counter.
pub const PR_TSC_SIGSEGV: libc::c_ulong = 2;
