//! The guest pointer type.
//!
//! An address in the traced process's virtual address space. It is opaque
//! to the controller: it can be offset and compared, but never dereferenced
//! directly. The only way to get at the bytes it names is through the
//! [`crate::process::memory::MemoryWindow`].

use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GuestPtr(pub u64);

impl GuestPtr {
    pub const NULL: GuestPtr = GuestPtr(0);

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn offset(self, delta: u64) -> GuestPtr {
        GuestPtr(self.0.wrapping_add(delta))
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for GuestPtr {
    fn from(addr: u64) -> GuestPtr {
        GuestPtr(addr)
    }
}

impl fmt::Debug for GuestPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl fmt::Display for GuestPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
