//! The memory window: a byte-addressable view of the guest's virtual
//! address space, backed by `/proc/<pid>/mem`.
//!
//! The window itself only knows how to seek, read, and write raw bytes; the
//! deferred-write/temporary-read bookkeeping described by the controller
//! lives on [`crate::process::tracee::TracedThread`], which owns this window
//! and decides when buffers are flushed or released.

use crate::errors::{Error, Result};
use crate::guest_ptr::GuestPtr;
use nix::unistd::Pid;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

#[derive(Debug)]
pub struct MemoryWindow {
    pid: Pid,
    file: File,
    dirty: bool,
}

impl MemoryWindow {
    /// Opens `/proc/<pid>/mem` for the given tracee. Requires the tracee to
    /// already be stopped and traced; otherwise the open itself may race
    /// the kernel tearing the mapping down.
    pub fn open(pid: Pid) -> Result<Self> {
        let file = open_mem_file(pid)?;
        Ok(MemoryWindow {
            pid,
            file,
            dirty: false,
        })
    }

    /// Re-opens the window at the same path after a successful exec: the
    /// pid is stable across exec, but the address space it names is a
    /// fresh image, so the old file handle must be discarded.
    pub fn reopen(&mut self) -> Result<()> {
        self.file = open_mem_file(self.pid)?;
        self.dirty = false;
        Ok(())
    }

    /// Reads exactly `n` bytes starting at `addr`. A short read (including
    /// hitting end-of-file) is treated as fatal: the controller has no
    /// partial-read contract to offer its caller.
    pub fn read(&mut self, addr: GuestPtr, n: usize) -> Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(addr.as_u64()))?;
        let mut buf = vec![0u8; n];
        self.file.read_exact(&mut buf).map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::fatal(format!(
                    "short read of {} bytes from guest memory at {}",
                    n, addr
                ))
            } else {
                Error::from(err)
            }
        })?;
        Ok(buf)
    }

    /// Writes `bytes` starting at `addr` and marks the window dirty.
    pub fn write(&mut self, addr: GuestPtr, bytes: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(addr.as_u64()))?;
        self.file.write_all(bytes)?;
        self.dirty = true;
        Ok(())
    }

    /// Flushes any buffered writes to the kernel. Idempotent; always
    /// clears the dirty flag even if there was nothing to flush.
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.dirty = false;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

fn open_mem_file(pid: Pid) -> Result<File> {
    let path = format!("/proc/{}/mem", pid);
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .map_err(Error::from)
}
