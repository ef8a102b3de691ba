//! System Call Interface
//!
//! The privileged entry layer: decodes a trapped request, validates its
//! arguments and applies it to the kernel state.
//!
//! # Security Model
//! - Whitelist approach: only the numbers in [`numbers`] are accepted
//! - All parameters are validated before any state changes
//! - A handler either commits fully or returns an error with no effect
//! - A bad user pointer destroys the caller instead of returning an error
//!
//! # Syscall Groups
//! - console, clock: `cputs`, `cgetc`, `time_msec`
//! - environments: `getenvid`, `env_destroy`, `yield`, `exofork`,
//!   `env_set_status`, `env_set_trapframe`, `env_set_pgfault_upcall`
//! - memory grants: `page_alloc`, `page_map`, `page_unmap`
//! - IPC rendezvous: `ipc_try_send`, `ipc_recv`
//! - network: `net_send`, `net_recv`

mod env;
mod error;
mod handler;
mod io;
mod ipc;
mod mem;
mod net;
pub mod numbers;
mod validate;

#[cfg(test)]
mod tests;
#[cfg(test)]
mod tests_prop;

pub use error::{SysResult, SyscallError};
pub use handler::dispatch;
