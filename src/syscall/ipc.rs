//! IPC Rendezvous
//!
//! Synchronous message passing: a receiver parks itself with
//! [`sys_ipc_recv`], and the first sender to find it parked delivers a
//! 32-bit value and, if both sides agree, one shared page.
//!
//! # Protocol
//! ```text
//!   receiver                         sender
//!   ipc_recv(dst) ──► WAITING
//!     receiving = true               ipc_try_send(to, v, src, perm)
//!     NotRunnable                      ├─ not WAITING  ─► IpcNotRecv
//!                                      ├─ page check   ─► Inval / NoMem
//!   RUNNABLE ◄─────────────────────────┴─ commit: value, from, perm,
//!     x0 = 0, inbox filled                  receiving = false
//! ```
//!
//! # Security Properties
//! - The `receiving` flag is a single-acquisition latch: exactly one sender
//!   wins each receive, every other sender sees `IpcNotRecv`
//! - A failed send leaves the receiver untouched, so retrying is safe
//! - A shared page never carries more write access than the sender has

use crate::cap::Access;
use crate::env::{EnvId, EnvStatus};
use crate::kernel::Kernel;
use crate::mm::{PagePerm, VirtAddr};

use super::error::{SysResult, SyscallError};
use super::mem::{grantable, space_mut};
use super::validate;

/// Block the caller until a message arrives.
///
/// `dstva` at or above `UTOP` means the caller does not want a page.
pub fn sys_ipc_recv(kernel: &mut Kernel, caller: EnvId, dstva: usize) -> SysResult {
    let dst_va = validate::optional_page(dstva)?;
    let env = kernel.envs.get_mut(caller).ok_or(SyscallError::BadEnv)?;
    env.ipc.receiving = true;
    env.ipc.dst_va = dst_va;
    env.status = EnvStatus::NotRunnable;
    log::trace!("[{}] ipc_recv {:?}", caller, dst_va);
    Ok(0)
}

/// Try to deliver `value` (and the page at `srcva`) to `envid`.
///
/// # Arguments
/// * `envid` - Receiver; any live environment may be sent to
/// * `value` - 32-bit message word
/// * `srcva` - Page to share, or at/above `UTOP` for none
/// * `perm` - Permission the receiver gets on the shared page
///
/// # Returns
/// 0 on delivery, `IpcNotRecv` if `envid` is not waiting in receive
///
/// # Security
/// - The page moves only if the receiver also asked for one
/// - `perm` must be well formed and may not add write access
/// - On any error the receiver is left exactly as it was
pub fn sys_ipc_try_send(
    kernel: &mut Kernel,
    caller: EnvId,
    envid: EnvId,
    value: u32,
    srcva: usize,
    perm: usize,
) -> SysResult {
    let target = kernel.envs.resolve(caller, envid, Access::Any)?;
    if target.status() != EnvStatus::NotRunnable || !target.ipc().receiving {
        return Err(SyscallError::IpcNotRecv);
    }
    let target_id = target.id();
    let dst_va = target.ipc().dst_va;

    let granted = match dst_va {
        Some(dst_va) if VirtAddr::new(srcva).is_user() => {
            let srcva = validate::page_addr(srcva)?;
            let (frame, perm) = grantable(kernel, caller, srcva, perm)?;
            space_mut(kernel, target_id)?.insert(dst_va, frame, perm)?;
            log::debug!("[{}] ipc page {} -> {}:{}", caller, srcva, target_id, dst_va);
            perm
        }
        _ => PagePerm::empty(),
    };

    // Page (if any) is installed; nothing below can fail.
    let env = kernel.envs.get_mut(target_id).ok_or(SyscallError::BadEnv)?;
    env.ipc.receiving = false;
    env.ipc.from = caller;
    env.ipc.value = value;
    env.ipc.perm = granted;
    env.tf.set_return(0);
    env.status = EnvStatus::Runnable;

    log::trace!("[{}] ipc_send {} to {}", caller, value, target_id);
    Ok(0)
}
