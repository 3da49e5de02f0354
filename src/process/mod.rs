mod classifier;
mod driver;
pub mod launcher;
pub mod mediator;
pub mod memory;
pub mod syscall;
pub mod tracee;
pub mod trap;

pub use self::memory::MemoryWindow;
pub use self::syscall::{HandlerResult, SyscallArgs, SyscallHandler, TimeSource};
pub use self::tracee::{State, TracedThread};
