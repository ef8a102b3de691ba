//! System Call Input Validation
//!
//! Decoding of address and permission arguments, and checked copies across
//! the user/kernel boundary.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: deny by default
//! - User buffers are copied into the kernel before they are used, so a
//!   later change to the user page cannot affect a check already made

use crate::env::EnvId;
use crate::kernel::Kernel;
use crate::mm::{PagePerm, VirtAddr};

use super::error::{SysResult, SyscallError};

/// Decode a page address argument: page-aligned and below `UTOP`.
pub fn page_addr(raw: usize) -> SysResult<VirtAddr> {
    let va = VirtAddr::new(raw);
    if !va.is_user_page() {
        return Err(SyscallError::Inval);
    }
    Ok(va)
}

/// Decode an optional page address: anything at or above `UTOP` means
/// "no page".
pub fn optional_page(raw: usize) -> SysResult<Option<VirtAddr>> {
    let va = VirtAddr::new(raw);
    if !va.is_user() {
        return Ok(None);
    }
    if !va.is_aligned() {
        return Err(SyscallError::Inval);
    }
    Ok(Some(va))
}

/// Decode a permission word.
pub fn perm(raw: usize) -> SysResult<PagePerm> {
    Ok(PagePerm::from_syscall(raw)?)
}

/// Copy `buf.len()` bytes from `id`'s memory at `va`.
///
/// Destroys `id` if the range is not mapped with `need`.
pub fn copy_from_user(
    kernel: &mut Kernel,
    id: EnvId,
    va: usize,
    buf: &mut [u8],
    need: PagePerm,
) -> SysResult<()> {
    kernel.user_mem_assert(id, va, buf.len(), need)?;
    let space = kernel
        .envs
        .get(id)
        .and_then(|env| env.address_space())
        .ok_or(SyscallError::BadEnv)?;
    space.copy_in(VirtAddr::new(va), buf, need)?;
    Ok(())
}

/// Copy `bytes` into `id`'s memory at `va`.
///
/// Destroys `id` if the range is not mapped with `need`.
pub fn copy_to_user(
    kernel: &mut Kernel,
    id: EnvId,
    va: usize,
    bytes: &[u8],
    need: PagePerm,
) -> SysResult<()> {
    kernel.user_mem_assert(id, va, bytes.len(), need)?;
    let space = kernel
        .envs
        .get(id)
        .and_then(|env| env.address_space())
        .ok_or(SyscallError::BadEnv)?;
    space.copy_out(VirtAddr::new(va), bytes, need)?;
    Ok(())
}
