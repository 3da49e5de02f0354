//! Crate-local error type.
//!
//! The controller talks to three fallible layers: the OS process/ptrace
//! primitives (`nix`), the memory-window file (`std::io`), and its own
//! protocol decisions (an unrecognized wait status, a precondition violated
//! by a caller). All three collapse into one `Error` so that callers can
//! propagate with `?` and the binary can log a single, useful line.
//!
//! This intentionally avoids a blanket `impl<E: std::error::Error> From<E>`:
//! that pattern (as used upstream) needs specialization to coexist with the
//! concrete `From<io::Error>`/`From<nix::Error>` impls below, which isn't
//! available on stable. An enum with a handful of named variants is just as
//! usable from `?` and doesn't need the nightly feature.

use nix::errno::Errno;
use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// A `nix` call (ptrace, wait, signal, fork, exec) failed.
    Nix(nix::Error),
    /// Memory-window I/O (open/seek/read/write/flush on `/proc/<pid>/mem`) failed.
    Io(io::Error),
    /// The wait status did not match any case the stop classifier knows about.
    Protocol(String),
    /// A fatal condition outside the two above (e.g. a short read on the
    /// memory window, which `nix`/`io` wouldn't themselves flag as an error).
    Fatal(String),
}

impl Error {
    pub fn protocol<M: Into<String>>(msg: M) -> Self {
        Error::Protocol(msg.into())
    }

    pub fn fatal<M: Into<String>>(msg: M) -> Self {
        Error::Fatal(msg.into())
    }

    /// The OS errno behind this error, when there is one. Used by callers
    /// that need to distinguish specific failure codes (e.g. an `ESRCH` race
    /// between `terminate` and a concurrently-exiting child).
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Error::Nix(nix::Error::Sys(errno)) => Some(*errno),
            Error::Io(io_err) => io_err.raw_os_error().map(Errno::from_i32),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Nix(err) => write!(f, "ptrace/os error: {}", err),
            Error::Io(err) => write!(f, "memory window I/O error: {}", err),
            Error::Protocol(msg) => write!(f, "protocol violation: {}", msg),
            Error::Fatal(msg) => write!(f, "fatal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Nix(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Protocol(_) | Error::Fatal(_) => None,
        }
    }
}

impl From<nix::Error> for Error {
    fn from(err: nix::Error) -> Error {
        Error::Nix(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_has_no_errno() {
        let err = Error::protocol("unrecognized wait status");
        assert!(err.errno().is_none());
        assert!(format!("{}", err).contains("unrecognized wait status"));
    }

    #[test]
    fn nix_error_exposes_errno() {
        let err: Error = nix::Error::Sys(Errno::ESRCH).into();
        assert_eq!(err.errno(), Some(Errno::ESRCH));
    }
}
