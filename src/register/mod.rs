#[macro_use]
mod abi;
mod regs;

pub use self::regs::Register::*;
pub use self::regs::Registers;
pub use self::regs::SysArgIndex;
pub use self::regs::SysArgIndex::*;
