//! ARM64 Exception Handling
//!
//! Saved user register state and the synchronous-exception entry from EL0.
//!
//! # Exception Levels
//! - EL0: User environments
//! - EL1: Kernel (where we run)
//!
//! # Syscall ABI
//! - `x8`: syscall number
//! - `x0`..`x4`: arguments
//! - `x0`: signed result word
//!
//! # Security Considerations
//! - Every frame installed into an environment is sanitized to resume at
//!   EL0t with IRQ and FIQ unmasked
//! - User aborts never halt the kernel; they are redirected to the
//!   environment's fault upcall or destroy the environment

use spin::{Mutex, Once};
use static_assertions::assert_eq_size;

use crate::kernel::Kernel;

/// SPSR.M\[4:0\]: exception level and stack pointer selection.
const SPSR_MODE_MASK: u64 = 0x1F;
/// SPSR.F: FIQ masked.
const SPSR_F: u64 = 1 << 6;
/// SPSR.I: IRQ masked.
const SPSR_I: u64 = 1 << 7;

/// Register state of a user environment, as saved by the vector stubs.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trapframe {
    /// General purpose registers x0-x30
    pub gpr: [u64; 31],
    /// User stack pointer (SP_EL0)
    pub sp: u64,
    /// Exception Link Register (return address)
    pub elr: u64,
    /// Saved Program Status Register
    pub spsr: u64,
    /// Exception Syndrome Register
    pub esr: u64,
    /// Fault Address Register
    pub far: u64,
}

assert_eq_size!(Trapframe, [u64; 36]);

impl Trapframe {
    /// Size of the frame in user memory.
    pub const SIZE: usize = core::mem::size_of::<Self>();

    /// A fresh EL0 frame starting at `entry` on `stack_top`.
    pub fn new_user(entry: usize, stack_top: usize) -> Self {
        Self {
            sp: stack_top as u64,
            elr: entry as u64,
            ..Self::default()
        }
    }

    #[inline]
    pub fn syscall_number(&self) -> usize {
        self.gpr[8] as usize
    }

    /// Syscall arguments `x0`..`x4`.
    pub fn syscall_args(&self) -> [usize; 5] {
        let mut args = [0; 5];
        for (arg, reg) in args.iter_mut().zip(&self.gpr[..5]) {
            *arg = *reg as usize;
        }
        args
    }

    /// Load a syscall request into the frame.
    pub fn set_syscall(&mut self, num: usize, args: [usize; 5]) {
        self.gpr[8] = num as u64;
        for (reg, arg) in self.gpr[..5].iter_mut().zip(args) {
            *reg = arg as u64;
        }
    }

    /// Store the syscall result word.
    #[inline]
    pub fn set_return(&mut self, value: isize) {
        self.gpr[0] = value as u64;
    }

    #[inline]
    pub fn return_value(&self) -> isize {
        self.gpr[0] as isize
    }

    /// Force the frame to resume at EL0t with interrupts enabled.
    pub fn sanitize(&mut self) {
        self.spsr &= !(SPSR_MODE_MASK | SPSR_I | SPSR_F);
    }

    /// Decode a frame from its in-memory layout (little-endian words).
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        let mut words = [0u64; 36];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *word = u64::from_le_bytes(raw);
        }
        let mut tf = Self::default();
        tf.gpr.copy_from_slice(&words[..31]);
        tf.sp = words[31];
        tf.elr = words[32];
        tf.spsr = words[33];
        tf.esr = words[34];
        tf.far = words[35];
        tf
    }

    /// Encode the frame in its in-memory layout.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        let tail = [self.sp, self.elr, self.spsr, self.esr, self.far];
        for (chunk, word) in bytes.chunks_exact_mut(8).zip(self.gpr.iter().chain(&tail)) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }
}

/// Exception class extracted from ESR_EL1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExceptionClass {
    Unknown = 0x00,
    SvcAarch64 = 0x15,
    InstructionAbortLowerEl = 0x20,
    DataAbortLowerEl = 0x24,
    Other = 0xFF,
}

impl From<u64> for ExceptionClass {
    fn from(esr: u64) -> Self {
        let ec = ((esr >> 26) & 0x3F) as u8;
        match ec {
            0x00 => ExceptionClass::Unknown,
            0x15 => ExceptionClass::SvcAarch64,
            0x20 => ExceptionClass::InstructionAbortLowerEl,
            0x24 => ExceptionClass::DataAbortLowerEl,
            _ => ExceptionClass::Other,
        }
    }
}

impl ExceptionClass {
    /// ESR value carrying this class, with an empty syndrome.
    pub const fn esr(self) -> u64 {
        (self as u64) << 26
    }
}

/// The kernel instance driven by the exception vectors.
///
/// The lock is held for the whole trap, so at most one syscall is in
/// flight at a time.
static KERNEL: Once<Mutex<Kernel>> = Once::new();

/// Install the kernel the exception vectors dispatch into.
///
/// Returns false if a kernel was already installed.
pub fn install(kernel: Kernel) -> bool {
    let mut installed = false;
    KERNEL.call_once(|| {
        installed = true;
        Mutex::new(kernel)
    });
    installed
}

/// Handle one trap taken by the current environment.
///
/// `ctx` holds the trapped registers on entry and the registers of the
/// environment to resume on exit. Returns false when no environment is
/// runnable and the CPU should idle.
pub fn handle_trap(kernel: &mut Kernel, ctx: &mut Trapframe) -> bool {
    if let Some(cur) = kernel.current() {
        kernel.save_context(cur, ctx);
        match ExceptionClass::from(ctx.esr) {
            ExceptionClass::SvcAarch64 => {
                kernel.handle_syscall();
            }
            ExceptionClass::DataAbortLowerEl | ExceptionClass::InstructionAbortLowerEl => {
                kernel.page_fault(cur);
            }
            ec => {
                log::warn!("[{}] unhandled exception {:?}, esr {:#x}", cur, ec, ctx.esr);
                kernel.destroy(cur);
            }
        }
    }
    kernel.finish_trap();

    match kernel.current().and_then(|id| kernel.env(id)) {
        Some(env) => {
            *ctx = *env.trapframe();
            true
        }
        None => false,
    }
}

/// Handle synchronous exception from lower EL (user mode)
///
/// This is the main entry point for syscalls (SVC instruction) and user
/// aborts.
#[no_mangle]
pub extern "C" fn handle_sync_exception_lower_el(ctx: &mut Trapframe) -> bool {
    match KERNEL.get() {
        Some(kernel) => handle_trap(&mut kernel.lock(), ctx),
        None => false,
    }
}
