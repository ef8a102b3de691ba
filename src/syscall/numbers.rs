//! System call numbers

pub const SYS_CPUTS: usize = 0;
pub const SYS_CGETC: usize = 1;
pub const SYS_GETENVID: usize = 2;
pub const SYS_ENV_DESTROY: usize = 3;
pub const SYS_PAGE_ALLOC: usize = 4;
pub const SYS_PAGE_MAP: usize = 5;
pub const SYS_PAGE_UNMAP: usize = 6;
pub const SYS_EXOFORK: usize = 7;
pub const SYS_ENV_SET_STATUS: usize = 8;
pub const SYS_ENV_SET_TRAPFRAME: usize = 9;
pub const SYS_ENV_SET_PGFAULT_UPCALL: usize = 10;
pub const SYS_YIELD: usize = 11;
pub const SYS_IPC_TRY_SEND: usize = 12;
pub const SYS_IPC_RECV: usize = 13;
pub const SYS_TIME_MSEC: usize = 14;
pub const SYS_NET_SEND: usize = 15;
pub const SYS_NET_RECV: usize = 16;
