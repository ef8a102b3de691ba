//! Environment Table
//!
//! A fixed-capacity arena of environment slots indexed by identifier.
//!
//! # Design
//! - Slots are allocated from a free list, lowest index first
//! - Lookup checks the full identifier, so stale handles fail
//! - Freeing a slot drops its address space, which releases every frame
//!   reference the environment held

use alloc::vec::Vec;
use core::fmt;

use super::{Env, EnvId, EnvStatus, IpcState};
use crate::exception::Trapframe;
use crate::mm::{AddressSpace, FrameAllocator, MappingError};

/// Error type for environment table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvError {
    /// The identifier does not name a live environment, or the caller may
    /// not act on it.
    BadEnv,
    /// Every slot is in use.
    NoFreeEnv,
    /// No memory for the new environment's address space.
    NoMem,
    /// The environment is not in a state that allows the operation.
    NotRunnable,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadEnv => write!(f, "bad environment"),
            Self::NoFreeEnv => write!(f, "out of environments"),
            Self::NoMem => write!(f, "out of memory"),
            Self::NotRunnable => write!(f, "environment not runnable"),
        }
    }
}

impl From<MappingError> for EnvError {
    fn from(_: MappingError) -> Self {
        Self::NoMem
    }
}

/// Registry of environment control blocks.
pub struct EnvTable {
    envs: Vec<Env>,
    /// Free slot indices; the next allocation pops from the end.
    free_list: Vec<usize>,
}

impl EnvTable {
    /// Create a table with `capacity` slots (a power of two).
    pub fn new(capacity: usize) -> Self {
        let mut envs = Vec::with_capacity(capacity);
        envs.resize_with(capacity, Env::free_slot);
        Self {
            envs,
            free_list: (0..capacity).rev().collect(),
        }
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.envs.len()
    }

    /// Number of live environments.
    pub fn live(&self) -> usize {
        self.envs.len() - self.free_list.len()
    }

    /// Allocate a new environment as a child of `parent_id`.
    ///
    /// The new environment is `NotRunnable` with a fresh address space and
    /// an empty user-mode register context.
    pub fn alloc(&mut self, parent_id: EnvId, frames: &FrameAllocator) -> Result<EnvId, EnvError> {
        let slot = *self.free_list.last().ok_or(EnvError::NoFreeEnv)?;
        let space = AddressSpace::new(frames)?;
        self.free_list.pop();

        let env = &mut self.envs[slot];
        env.id = env.id.next_generation(slot);
        env.parent_id = parent_id;
        env.status = EnvStatus::NotRunnable;
        env.tf = Trapframe::new_user(0, 0);
        env.space = Some(space);
        env.pgfault_upcall = 0;
        env.ipc = IpcState::default();
        env.runs = 0;

        log::info!("[{}] new env {}", parent_id, env.id);
        Ok(env.id)
    }

    /// Release an environment's slot and everything it owns.
    pub fn free(&mut self, id: EnvId) -> Result<(), EnvError> {
        let slot = self.slot_of(id).ok_or(EnvError::BadEnv)?;
        let env = &mut self.envs[slot];
        env.space = None;
        env.status = EnvStatus::Free;
        env.ipc = IpcState::default();
        env.pgfault_upcall = 0;
        self.free_list.push(slot);
        Ok(())
    }

    /// Look up a live environment by exact identifier.
    pub fn get(&self, id: EnvId) -> Option<&Env> {
        self.slot_of(id).map(|slot| &self.envs[slot])
    }

    /// Mutable lookup by exact identifier.
    pub fn get_mut(&mut self, id: EnvId) -> Option<&mut Env> {
        self.slot_of(id).map(move |slot| &mut self.envs[slot])
    }

    /// Slot index holding the live environment `id`.
    pub(crate) fn slot_of(&self, id: EnvId) -> Option<usize> {
        if id == EnvId::SELF {
            return None;
        }
        let slot = id.slot(self.capacity());
        let env = &self.envs[slot];
        (env.is_live() && env.id == id).then_some(slot)
    }

    /// Live environment in slot `slot`, if any.
    pub fn at_slot(&self, slot: usize) -> Option<&Env> {
        self.envs.get(slot).filter(|env| env.is_live())
    }
}

impl fmt::Debug for EnvTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvTable")
            .field("capacity", &self.capacity())
            .field("live", &self.live())
            .finish()
    }
}
