//! User-level IPC helpers.
//!
//! `ipc_recv` and `ipc_send` hide the "no page" sentinel and the retry
//! loop a sender needs when the receiver is not waiting yet.

use crate::env::EnvId;
use crate::mm::{PagePerm, VirtAddr};
use crate::syscall::SyscallError;

use super::syscall;
use super::SyscallGate;

/// Receive a value via IPC and return it.
///
/// If `pg` is given, a page sent along with the value is mapped there.
/// `from_store` and `perm_store`, when given, receive the sender and the
/// permission of the transferred page (empty if no page moved). On failure
/// both are cleared and the error is returned.
pub fn ipc_recv(
    gate: &mut dyn SyscallGate,
    pg: Option<VirtAddr>,
    from_store: Option<&mut EnvId>,
    perm_store: Option<&mut PagePerm>,
) -> Result<u32, SyscallError> {
    let dst = pg.unwrap_or(VirtAddr::UTOP);

    if let Err(err) = syscall::sys_ipc_recv(gate, dst) {
        if let Some(from) = from_store {
            *from = EnvId::SELF;
        }
        if let Some(perm) = perm_store {
            *perm = PagePerm::empty();
        }
        return Err(err);
    }

    let inbox = gate.inbox();
    if let Some(from) = from_store {
        *from = inbox.from;
    }
    if let Some(perm) = perm_store {
        *perm = inbox.perm;
    }
    Ok(inbox.value)
}

/// Send `val` (and the page at `pg` with `perm`, if given) to `to`,
/// yielding between attempts until the receiver takes it.
///
/// # Panics
/// On any error other than [`SyscallError::IpcNotRecv`]: those indicate a
/// bad argument, not contention, and retrying cannot succeed.
pub fn ipc_send(
    gate: &mut dyn SyscallGate,
    to: EnvId,
    val: u32,
    pg: Option<VirtAddr>,
    perm: PagePerm,
) {
    let src = pg.unwrap_or(VirtAddr::UTOP);
    loop {
        match syscall::sys_ipc_try_send(gate, to, val, src, perm) {
            Ok(()) => return,
            Err(SyscallError::IpcNotRecv) => syscall::sys_yield(gate),
            Err(err) => panic!("ipc_send: {}", err),
        }
    }
}
