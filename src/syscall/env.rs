//! Environment-control syscalls.

use crate::cap::Access;
use crate::env::{EnvId, EnvStatus};
use crate::exception::Trapframe;
use crate::kernel::Kernel;
use crate::mm::PagePerm;

use super::error::{SysResult, SyscallError};
use super::validate;

/// Destroy `envid`, which may be the caller itself.
pub fn sys_env_destroy(kernel: &mut Kernel, caller: EnvId, envid: EnvId) -> SysResult {
    let target = kernel.envs.resolve(caller, envid, Access::Owner)?.id();
    kernel.destroy(target);
    Ok(0)
}

/// Give up the CPU.
pub fn sys_yield(kernel: &mut Kernel) -> SysResult {
    kernel.schedule();
    Ok(0)
}

/// Create a child of the caller with a copy of its registers.
///
/// The child starts `NotRunnable` with an empty address space, and sees 0
/// as the result of this call once it runs.
pub fn sys_exofork(kernel: &mut Kernel, caller: EnvId) -> SysResult {
    let tf = *kernel
        .envs
        .get(caller)
        .ok_or(SyscallError::BadEnv)?
        .trapframe();
    let child = kernel.envs.alloc(caller, &kernel.frames)?;

    let env = kernel.envs.get_mut(child).ok_or(SyscallError::BadEnv)?;
    env.tf = tf;
    env.tf.set_return(0);
    Ok(child.as_u32() as usize)
}

/// Set `envid`'s status to `Runnable` or `NotRunnable`.
pub fn sys_env_set_status(
    kernel: &mut Kernel,
    caller: EnvId,
    envid: EnvId,
    status: usize,
) -> SysResult {
    let env = kernel.envs.resolve_mut(caller, envid, Access::Owner)?;
    let status = EnvStatus::settable(status).ok_or(SyscallError::Inval)?;
    if status == EnvStatus::Runnable && env.ipc.receiving {
        // Woken without a message: the pending receive is abandoned.
        env.ipc.receiving = false;
        env.ipc.dst_va = None;
    }
    env.status = status;
    Ok(0)
}

/// Replace `envid`'s saved registers with a frame read from the caller's
/// memory at `tf_va`.
///
/// When `envid` is the caller, the result word is written after the new
/// frame is installed, so the caller resumes with `x0 = 0`.
pub fn sys_env_set_trapframe(
    kernel: &mut Kernel,
    caller: EnvId,
    envid: EnvId,
    tf_va: usize,
) -> SysResult {
    let target = kernel.envs.resolve(caller, envid, Access::Owner)?.id();

    let mut raw = [0u8; Trapframe::SIZE];
    validate::copy_from_user(kernel, caller, tf_va, &mut raw, PagePerm::REQUIRED)?;
    let mut tf = Trapframe::from_bytes(&raw);
    tf.sanitize();

    kernel.envs.get_mut(target).ok_or(SyscallError::BadEnv)?.tf = tf;
    Ok(0)
}

/// Register `envid`'s page fault entry point. Not validated until used.
pub fn sys_env_set_pgfault_upcall(
    kernel: &mut Kernel,
    caller: EnvId,
    envid: EnvId,
    func: usize,
) -> SysResult {
    kernel.envs.resolve_mut(caller, envid, Access::Owner)?.pgfault_upcall = func;
    Ok(0)
}
