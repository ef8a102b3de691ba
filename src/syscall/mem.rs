//! Memory-grant syscalls: allocate-and-map, cross-map and unmap.
//!
//! A page is the unit of sharing. Every grant installs a reference to a
//! frame; every unmap or replaced mapping drops one.

use alloc::sync::Arc;

use crate::cap::Access;
use crate::env::EnvId;
use crate::kernel::Kernel;
use crate::mm::{AddressSpace, PagePerm, SharedFrame, VirtAddr};

use super::error::{SysResult, SyscallError};
use super::validate;

/// Address space of a live environment.
pub(super) fn space_mut(kernel: &mut Kernel, id: EnvId) -> SysResult<&mut AddressSpace> {
    kernel
        .envs
        .get_mut(id)
        .and_then(|env| env.space.as_mut())
        .ok_or(SyscallError::BadEnv)
}

/// Check that `owner`'s page at `va` may be shared with `raw_perm`.
///
/// The page must be mapped user-accessible, the permission word must be
/// valid, and it must not ask for write access the mapping lacks.
pub(super) fn grantable(
    kernel: &Kernel,
    owner: EnvId,
    va: VirtAddr,
    raw_perm: usize,
) -> SysResult<(SharedFrame, PagePerm)> {
    let entry = kernel
        .envs
        .get(owner)
        .and_then(|env| env.address_space())
        .ok_or(SyscallError::BadEnv)?
        .lookup(va)
        .ok_or(SyscallError::Inval)?;
    if !entry.perm().is_user_accessible() {
        return Err(SyscallError::Inval);
    }
    let perm = validate::perm(raw_perm)?;
    if !perm.within_writability_of(entry.perm()) {
        return Err(SyscallError::Inval);
    }
    Ok((Arc::clone(entry.frame()), perm))
}

/// Allocate a zeroed page and map it at `va` in `envid`'s address space,
/// replacing any page already there.
pub fn sys_page_alloc(
    kernel: &mut Kernel,
    caller: EnvId,
    envid: EnvId,
    va: usize,
    perm: usize,
) -> SysResult {
    let va = validate::page_addr(va)?;
    let target = kernel.envs.resolve(caller, envid, Access::Owner)?.id();
    let perm = validate::perm(perm)?;

    let frame = Arc::new(kernel.frames.alloc()?);
    // On failure the frame drops here and goes back to the allocator.
    space_mut(kernel, target)?.insert(va, frame, perm)?;

    log::trace!("[{}] page_alloc {} at {} {:?}", caller, target, va, perm);
    Ok(0)
}

/// Map the page at `srcva` in `srcid` at `dstva` in `dstid`.
///
/// # Arguments
/// * `srcid`, `dstid` - Source and destination; each must be the caller or
///   its child
/// * `srcva`, `dstva` - Page-aligned addresses below `UTOP`
/// * `perm` - Permission of the new mapping
///
/// # Security
/// - The source page must be mapped and user-accessible
/// - A read-only source cannot be mapped writable
/// - Any mapping already at `dstva` is replaced and its reference dropped
pub fn sys_page_map(
    kernel: &mut Kernel,
    caller: EnvId,
    srcid: EnvId,
    srcva: usize,
    dstid: EnvId,
    dstva: usize,
    perm: usize,
) -> SysResult {
    let src = kernel.envs.resolve(caller, srcid, Access::Owner)?.id();
    let dst = kernel.envs.resolve(caller, dstid, Access::Owner)?.id();
    let srcva = validate::page_addr(srcva)?;
    let dstva = validate::page_addr(dstva)?;

    let (frame, perm) = grantable(kernel, src, srcva, perm)?;
    space_mut(kernel, dst)?.insert(dstva, frame, perm)?;

    log::trace!("[{}] page_map {}:{} -> {}:{}", caller, src, srcva, dst, dstva);
    Ok(0)
}

/// Remove the mapping at `va` in `envid`'s address space, if any.
pub fn sys_page_unmap(kernel: &mut Kernel, caller: EnvId, envid: EnvId, va: usize) -> SysResult {
    let va = validate::page_addr(va)?;
    let target = kernel.envs.resolve(caller, envid, Access::Owner)?.id();
    space_mut(kernel, target)?.remove(va);
    Ok(0)
}
