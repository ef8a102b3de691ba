//! User-side library
//!
//! Code that runs in an environment at EL0: typed wrappers around the raw
//! syscall gate, and the IPC `send`/`receive` helpers built on them.
//!
//! The gate itself is a trait so the same library code can trap with `svc`
//! on hardware or call straight into a hosted [`Kernel`](crate::kernel::Kernel).

pub mod ipc;
pub mod syscall;

use crate::env::IpcInbox;

/// The user/kernel boundary as seen from one environment.
pub trait SyscallGate {
    /// Trap into the kernel with `num` and five argument words, returning
    /// the result word the environment observes when it next runs.
    fn syscall(&mut self, num: usize, args: [usize; 5]) -> isize;

    /// The environment's read-only view of its delivered IPC message.
    fn inbox(&self) -> IpcInbox;
}
