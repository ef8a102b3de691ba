//! Typed syscall stubs.

use crate::env::{EnvId, EnvStatus};
use crate::mm::{PagePerm, VirtAddr};
use crate::syscall::numbers::*;
use crate::syscall::{SysResult, SyscallError};

use super::SyscallGate;

fn id(env: EnvId) -> usize {
    env.as_u32() as usize
}

/// Decode a result word; unknown negative codes read as `Inval`.
fn check(ret: isize) -> SysResult {
    if ret < 0 {
        return Err(SyscallError::from_raw(ret).unwrap_or(SyscallError::Inval));
    }
    Ok(ret as usize)
}

fn call(gate: &mut dyn SyscallGate, num: usize, args: [usize; 5]) -> SysResult {
    check(gate.syscall(num, args))
}

pub fn sys_cputs(gate: &mut dyn SyscallGate, s: VirtAddr, len: usize) -> SysResult<()> {
    call(gate, SYS_CPUTS, [s.as_usize(), len, 0, 0, 0]).map(drop)
}

/// Next console byte, if any is waiting.
pub fn sys_cgetc(gate: &mut dyn SyscallGate) -> Option<u8> {
    match call(gate, SYS_CGETC, [0; 5]) {
        Ok(0) | Err(_) => None,
        Ok(c) => u8::try_from(c).ok(),
    }
}

pub fn sys_getenvid(gate: &mut dyn SyscallGate) -> EnvId {
    EnvId::from_word(call(gate, SYS_GETENVID, [0; 5]).unwrap_or(0))
}

pub fn sys_env_destroy(gate: &mut dyn SyscallGate, env: EnvId) -> SysResult<()> {
    call(gate, SYS_ENV_DESTROY, [id(env), 0, 0, 0, 0]).map(drop)
}

pub fn sys_yield(gate: &mut dyn SyscallGate) {
    gate.syscall(SYS_YIELD, [0; 5]);
}

/// Create a child environment. The child observes `EnvId::SELF`.
pub fn sys_exofork(gate: &mut dyn SyscallGate) -> SysResult<EnvId> {
    call(gate, SYS_EXOFORK, [0; 5]).map(EnvId::from_word)
}

pub fn sys_env_set_status(gate: &mut dyn SyscallGate, env: EnvId, status: EnvStatus) -> SysResult<()> {
    call(gate, SYS_ENV_SET_STATUS, [id(env), status as usize, 0, 0, 0]).map(drop)
}

pub fn sys_env_set_trapframe(gate: &mut dyn SyscallGate, env: EnvId, tf: VirtAddr) -> SysResult<()> {
    call(gate, SYS_ENV_SET_TRAPFRAME, [id(env), tf.as_usize(), 0, 0, 0]).map(drop)
}

pub fn sys_env_set_pgfault_upcall(gate: &mut dyn SyscallGate, env: EnvId, func: usize) -> SysResult<()> {
    call(gate, SYS_ENV_SET_PGFAULT_UPCALL, [id(env), func, 0, 0, 0]).map(drop)
}

pub fn sys_page_alloc(gate: &mut dyn SyscallGate, env: EnvId, va: VirtAddr, perm: PagePerm) -> SysResult<()> {
    call(gate, SYS_PAGE_ALLOC, [id(env), va.as_usize(), perm.bits(), 0, 0]).map(drop)
}

pub fn sys_page_map(
    gate: &mut dyn SyscallGate,
    src: EnvId,
    srcva: VirtAddr,
    dst: EnvId,
    dstva: VirtAddr,
    perm: PagePerm,
) -> SysResult<()> {
    let args = [id(src), srcva.as_usize(), id(dst), dstva.as_usize(), perm.bits()];
    call(gate, SYS_PAGE_MAP, args).map(drop)
}

pub fn sys_page_unmap(gate: &mut dyn SyscallGate, env: EnvId, va: VirtAddr) -> SysResult<()> {
    call(gate, SYS_PAGE_UNMAP, [id(env), va.as_usize(), 0, 0, 0]).map(drop)
}

/// One send attempt; `srcva` at or above `UTOP` sends no page.
pub fn sys_ipc_try_send(
    gate: &mut dyn SyscallGate,
    to: EnvId,
    value: u32,
    srcva: VirtAddr,
    perm: PagePerm,
) -> SysResult<()> {
    let args = [id(to), value as usize, srcva.as_usize(), perm.bits(), 0];
    call(gate, SYS_IPC_TRY_SEND, args).map(drop)
}

/// Wait for a message; `dstva` at or above `UTOP` accepts no page.
pub fn sys_ipc_recv(gate: &mut dyn SyscallGate, dstva: VirtAddr) -> SysResult<()> {
    call(gate, SYS_IPC_RECV, [dstva.as_usize(), 0, 0, 0, 0]).map(drop)
}

pub fn sys_time_msec(gate: &mut dyn SyscallGate) -> u64 {
    call(gate, SYS_TIME_MSEC, [0; 5]).map_or(0, |ms| ms as u64)
}

/// Queue one frame; `Retry` means the transmit ring is full.
pub fn sys_net_send(gate: &mut dyn SyscallGate, buf: VirtAddr, len: usize) -> SysResult<()> {
    call(gate, SYS_NET_SEND, [buf.as_usize(), len, 0, 0, 0]).map(drop)
}

/// Receive one frame, returning its length (0 if none is ready).
pub fn sys_net_recv(gate: &mut dyn SyscallGate, buf: VirtAddr, len: usize) -> SysResult {
    call(gate, SYS_NET_RECV, [buf.as_usize(), len, 0, 0, 0])
}
