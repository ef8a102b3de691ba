//! exokern - Syscall and IPC core of an environment-based microkernel
//!
//! User environments are isolated address spaces that cooperate only
//! through kernel-mediated primitives: single-page memory grants and a
//! synchronous value-plus-page rendezvous.
//!
//! # Security Features
//! - Every syscall argument is validated before any state changes
//! - Self/parent permission model for mutating another environment
//! - Reference-counted frame sharing that cannot escalate write access
//! - Bad user pointers destroy the offending environment
//! - Fresh pages are zeroized before they are mapped
//!
//! # Architecture
//! - Target: AArch64 (ARM64), EL0 environments under an EL1 kernel
//! - `no_std` + `alloc`; builds with `std` only for host tests
//! - Devices sit behind traits, with reference models in [`drivers`]

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod cap;
pub mod config;
pub mod drivers;
pub mod env;
pub mod exception;
pub mod kernel;
pub mod mm;
pub mod sched;
pub mod security;
pub mod syscall;
pub mod ulib;

pub use config::KernelConfig;
pub use env::{EnvId, EnvStatus};
pub use kernel::{Devices, Kernel};
pub use syscall::SyscallError;
