//! A traced-thread controller: launches a guest process, attaches as its
//! tracer, mediates every syscall it makes through an external handler,
//! and emulates the `RDTSC`/`RDTSCP` cycle-counter instructions against a
//! simulator-supplied notion of time.
//!
//! The binary in `src/main.rs` is a small demonstration harness; this
//! crate's real consumer is expected to be a larger simulator that
//! supplies its own [`process::SyscallHandler`] and [`process::TimeSource`].

#[macro_use]
extern crate log;

pub mod constants;
pub mod errors;
pub mod guest_ptr;
pub mod process;
pub mod register;
pub mod tsc;

#[cfg(test)]
pub mod utils;

pub use errors::{Error, Result};
pub use guest_ptr::GuestPtr;
pub use process::{HandlerResult, SyscallArgs, SyscallHandler, State, TimeSource, TracedThread};
