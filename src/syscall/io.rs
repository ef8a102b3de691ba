//! Console and clock syscalls.

use crate::env::EnvId;
use crate::kernel::Kernel;
use crate::mm::PagePerm;

use super::error::SysResult;
use super::validate;

/// Bytes copied out of user memory per console write.
const CPUTS_CHUNK: usize = 256;

/// Print `len` bytes of the caller's memory at `s`.
///
/// The whole range is checked before anything is printed.
pub fn sys_cputs(kernel: &mut Kernel, caller: EnvId, s: usize, len: usize) -> SysResult {
    kernel.user_mem_assert(caller, s, len, PagePerm::REQUIRED)?;

    let mut chunk = [0u8; CPUTS_CHUNK];
    let mut done = 0;
    while done < len {
        let n = (len - done).min(CPUTS_CHUNK);
        validate::copy_from_user(kernel, caller, s + done, &mut chunk[..n], PagePerm::REQUIRED)?;
        kernel.devices.console.write_bytes(&chunk[..n]);
        done += n;
    }
    Ok(0)
}

/// Next console input byte, or 0 if none is waiting.
pub fn sys_cgetc(kernel: &mut Kernel) -> SysResult {
    Ok(kernel.devices.console.read_byte().map_or(0, usize::from))
}

/// Milliseconds since boot.
pub fn sys_time_msec(kernel: &mut Kernel) -> SysResult {
    Ok(kernel.devices.clock.now_ms() as usize)
}
