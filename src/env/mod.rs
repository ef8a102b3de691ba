//! Environments
//!
//! An environment is the unit of isolation and scheduling: a saved register
//! context, an exclusively owned address space, and the IPC mailbox used by
//! the rendezvous protocol.
//!
//! # Identifiers
//! ```text
//!  31                12 11          0
//! ┌────────────────────┬─────────────┐
//! │     generation     │ slot index  │
//! └────────────────────┴─────────────┘
//! ```
//! A slot gets a new generation every time it is reused, so a stale
//! identifier never resolves to the new occupant.

mod table;

use core::fmt;

pub use table::{EnvError, EnvTable};

use crate::exception::Trapframe;
use crate::mm::{AddressSpace, PagePerm, VirtAddr};

/// Bits reserved for the slot index in an identifier.
pub const ENV_GEN_SHIFT: usize = 12;

/// Increment applied to an identifier's generation on slot reuse.
pub const ENV_GEN_UNIT: usize = 1 << ENV_GEN_SHIFT;

/// A versioned environment identifier.
///
/// `EnvId(0)` is never handed out; syscalls read it as "the caller".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct EnvId(u32);

impl EnvId {
    /// The "calling environment" / "no environment" identifier.
    pub const SELF: Self = Self(0);

    /// Wrap a raw identifier.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Decode an identifier from a syscall argument word.
    ///
    /// Words that do not fit in 32 bits can never name an environment and
    /// map to an identifier that fails resolution.
    #[inline]
    pub fn from_word(word: usize) -> Self {
        Self(u32::try_from(word).unwrap_or(u32::MAX))
    }

    /// Get the raw identifier.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Slot index in a table of `capacity` slots (a power of two).
    #[inline]
    pub const fn slot(self, capacity: usize) -> usize {
        self.0 as usize & (capacity - 1)
    }

    /// Identifier for the next occupant of the slot this one names.
    pub(crate) fn next_generation(self, slot: usize) -> Self {
        let generation = (self.0 as usize + ENV_GEN_UNIT) & !(ENV_GEN_UNIT - 1);
        // Keep identifiers positive as signed result words.
        let generation = if generation == 0 || generation > i32::MAX as usize {
            ENV_GEN_UNIT
        } else {
            generation
        };
        Self((generation | slot) as u32)
    }
}

impl fmt::Debug for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnvId({:08x})", self.0)
    }
}

impl fmt::Display for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Scheduling status of an environment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum EnvStatus {
    /// Slot is unallocated.
    Free = 0,
    /// Eligible to be picked by the scheduler.
    Runnable = 1,
    /// Alive but not scheduled (fresh child, or waiting in receive).
    NotRunnable = 2,
    /// Destroyed while running; reaped on trap exit.
    Dying = 3,
}

impl EnvStatus {
    /// Decode a status value a syscall is allowed to set.
    ///
    /// Only `Runnable` and `NotRunnable` are externally settable.
    pub fn settable(raw: usize) -> Option<Self> {
        match raw {
            x if x == Self::Runnable as usize => Some(Self::Runnable),
            x if x == Self::NotRunnable as usize => Some(Self::NotRunnable),
            _ => None,
        }
    }
}

/// Receive-side IPC state of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IpcState {
    /// Waiting in receive; acts as the single-acquisition latch for senders.
    pub receiving: bool,
    /// Where an incoming page should be mapped, if one is wanted.
    pub dst_va: Option<VirtAddr>,
    /// Sender of the last delivered message.
    pub from: EnvId,
    /// Value of the last delivered message.
    pub value: u32,
    /// Permission of the page delivered with the last message, or empty.
    pub perm: PagePerm,
}

/// The part of an environment's IPC state its own user code may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IpcInbox {
    pub from: EnvId,
    pub value: u32,
    pub perm: PagePerm,
}

/// An environment control block.
#[derive(Debug)]
pub struct Env {
    pub(crate) id: EnvId,
    pub(crate) parent_id: EnvId,
    pub(crate) status: EnvStatus,
    pub(crate) tf: Trapframe,
    pub(crate) space: Option<AddressSpace>,
    pub(crate) pgfault_upcall: usize,
    pub(crate) ipc: IpcState,
    pub(crate) runs: u64,
}

impl Env {
    pub(crate) fn free_slot() -> Self {
        Self {
            id: EnvId::SELF,
            parent_id: EnvId::SELF,
            status: EnvStatus::Free,
            tf: Trapframe::default(),
            space: None,
            pgfault_upcall: 0,
            ipc: IpcState::default(),
            runs: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> EnvId {
        self.id
    }

    #[inline]
    pub fn parent_id(&self) -> EnvId {
        self.parent_id
    }

    #[inline]
    pub fn status(&self) -> EnvStatus {
        self.status
    }

    /// Saved user register context.
    #[inline]
    pub fn trapframe(&self) -> &Trapframe {
        &self.tf
    }

    /// The environment's address space; `None` only for free slots.
    #[inline]
    pub fn address_space(&self) -> Option<&AddressSpace> {
        self.space.as_ref()
    }

    #[inline]
    pub fn pgfault_upcall(&self) -> usize {
        self.pgfault_upcall
    }

    #[inline]
    pub fn ipc(&self) -> &IpcState {
        &self.ipc
    }

    /// Delivered message as seen by the environment's own user code.
    pub fn inbox(&self) -> IpcInbox {
        IpcInbox {
            from: self.ipc.from,
            value: self.ipc.value,
            perm: self.ipc.perm,
        }
    }

    /// Number of times the environment has been dispatched.
    #[inline]
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// True for slots holding a live environment.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.status != EnvStatus::Free
    }
}
