//! System Call Handler
//!
//! Demultiplexes a syscall number and five argument words to the handler
//! for that operation.
//!
//! # Security Considerations
//! - Unknown syscall numbers return `Inval`
//! - Arguments are decoded here; every handler validates its own

use crate::env::EnvId;
use crate::kernel::Kernel;

use super::error::SyscallError;
use super::numbers::*;
use super::{env, io, ipc, mem, net};

/// Dispatch a system call made by `caller`.
///
/// # Arguments
/// * `kernel` - Kernel state, held exclusively for the whole call
/// * `caller` - The environment that trapped
/// * `num` - System call number (from x8)
/// * `args` - Argument words (from x0-x4)
///
/// # Returns
/// Result word to be placed in `x0`: non-negative on success, a negative
/// [`SyscallError`] code on failure.
///
/// # Security
/// - Unknown syscall numbers are rejected with `Inval`
/// - Identifier words wider than 32 bits never resolve to an environment
pub fn dispatch(kernel: &mut Kernel, caller: EnvId, num: usize, args: [usize; 5]) -> isize {
    let [a1, a2, a3, a4, a5] = args;
    let id = EnvId::from_word;

    let result = match num {
        SYS_CPUTS => io::sys_cputs(kernel, caller, a1, a2),
        SYS_CGETC => io::sys_cgetc(kernel),
        SYS_GETENVID => Ok(caller.as_u32() as usize),
        SYS_ENV_DESTROY => env::sys_env_destroy(kernel, caller, id(a1)),
        SYS_PAGE_ALLOC => mem::sys_page_alloc(kernel, caller, id(a1), a2, a3),
        SYS_PAGE_MAP => mem::sys_page_map(kernel, caller, id(a1), a2, id(a3), a4, a5),
        SYS_PAGE_UNMAP => mem::sys_page_unmap(kernel, caller, id(a1), a2),
        SYS_EXOFORK => env::sys_exofork(kernel, caller),
        SYS_ENV_SET_STATUS => env::sys_env_set_status(kernel, caller, id(a1), a2),
        SYS_ENV_SET_TRAPFRAME => env::sys_env_set_trapframe(kernel, caller, id(a1), a2),
        SYS_ENV_SET_PGFAULT_UPCALL => env::sys_env_set_pgfault_upcall(kernel, caller, id(a1), a2),
        SYS_YIELD => env::sys_yield(kernel),
        SYS_IPC_TRY_SEND => ipc::sys_ipc_try_send(kernel, caller, id(a1), a2 as u32, a3, a4),
        SYS_IPC_RECV => ipc::sys_ipc_recv(kernel, caller, a1),
        SYS_TIME_MSEC => io::sys_time_msec(kernel),
        SYS_NET_SEND => net::sys_net_send(kernel, caller, a1, a2),
        SYS_NET_RECV => net::sys_net_recv(kernel, caller, a1, a2),
        _ => {
            log::warn!("[{}] unknown syscall {}", caller, num);
            Err(SyscallError::Inval)
        }
    };

    match result {
        Ok(value) => value as isize,
        Err(err) => {
            log::trace!("[{}] syscall {} failed: {}", caller, num, err);
            err.as_raw()
        }
    }
}
