//! System call error codes

use core::fmt;

use crate::drivers::NetError;
use crate::env::EnvError;
use crate::mm::MappingError;

/// System call error codes, returned to user mode as small negative words.
#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// Environment does not exist or the caller may not act on it
    BadEnv = -2,
    /// Invalid argument
    Inval = -3,
    /// Out of memory for pages or page tables
    NoMem = -4,
    /// Environment table exhausted
    NoFreeEnv = -5,
    /// Caller was destroyed for touching memory it does not own.
    /// Never delivered: the caller no longer exists to observe it.
    Fault = -6,
    /// Target is not blocked in receive
    IpcNotRecv = -7,
    /// Device momentarily busy
    Retry = -8,
}

/// Result of a syscall handler.
pub type SysResult<T = usize> = Result<T, SyscallError>;

impl SyscallError {
    /// The result word delivered to user mode.
    #[inline]
    pub const fn as_raw(self) -> isize {
        self as i64 as isize
    }

    /// Decode a negative result word.
    pub fn from_raw(raw: isize) -> Option<Self> {
        Some(match raw {
            -2 => Self::BadEnv,
            -3 => Self::Inval,
            -4 => Self::NoMem,
            -5 => Self::NoFreeEnv,
            -6 => Self::Fault,
            -7 => Self::IpcNotRecv,
            -8 => Self::Retry,
            _ => return None,
        })
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadEnv => write!(f, "bad environment"),
            Self::Inval => write!(f, "invalid parameter"),
            Self::NoMem => write!(f, "out of memory"),
            Self::NoFreeEnv => write!(f, "out of environments"),
            Self::Fault => write!(f, "segmentation fault"),
            Self::IpcNotRecv => write!(f, "env is not recving"),
            Self::Retry => write!(f, "device busy, retry"),
        }
    }
}

impl From<MappingError> for SyscallError {
    fn from(err: MappingError) -> Self {
        match err {
            MappingError::OutOfMemory => Self::NoMem,
            _ => Self::Inval,
        }
    }
}

impl From<EnvError> for SyscallError {
    fn from(err: EnvError) -> Self {
        match err {
            EnvError::BadEnv => Self::BadEnv,
            EnvError::NoFreeEnv => Self::NoFreeEnv,
            EnvError::NoMem => Self::NoMem,
            EnvError::NotRunnable => Self::Inval,
        }
    }
}

impl From<NetError> for SyscallError {
    fn from(err: NetError) -> Self {
        match err {
            NetError::Busy => Self::Retry,
            NetError::FrameTooLong => Self::Inval,
        }
    }
}
