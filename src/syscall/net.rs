//! Network pass-through syscalls.
//!
//! Both calls are non-blocking: a busy descriptor comes back as `Retry`
//! and the caller re-issues the call.

use crate::drivers::MAX_FRAME_LEN;
use crate::env::EnvId;
use crate::kernel::Kernel;
use crate::mm::PagePerm;

use super::error::{SysResult, SyscallError};
use super::validate;

/// Transmit `len` bytes of the caller's memory at `buf` as one frame.
pub fn sys_net_send(kernel: &mut Kernel, caller: EnvId, buf: usize, len: usize) -> SysResult {
    if len > MAX_FRAME_LEN {
        return Err(SyscallError::Inval);
    }
    let mut frame = [0u8; MAX_FRAME_LEN];
    validate::copy_from_user(kernel, caller, buf, &mut frame[..len], PagePerm::REQUIRED)?;
    kernel.devices.nic.transmit(&frame[..len])?;
    Ok(0)
}

/// Receive the next frame into the caller's buffer, truncated to `len`.
///
/// Returns the number of bytes copied, 0 if nothing has arrived.
pub fn sys_net_recv(kernel: &mut Kernel, caller: EnvId, buf: usize, len: usize) -> SysResult {
    let mut frame = [0u8; MAX_FRAME_LEN];
    let cap = len.min(MAX_FRAME_LEN);
    let n = kernel.devices.nic.receive(&mut frame[..cap])?;
    if n > 0 {
        let need = PagePerm::REQUIRED | PagePerm::WRITABLE;
        validate::copy_to_user(kernel, caller, buf, &frame[..n], need)?;
    }
    Ok(n)
}
