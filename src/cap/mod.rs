//! Permission Resolver
//!
//! The only capability in this kernel is the self/parent relationship: an
//! environment may mutate its own control block and those of the
//! environments it created, and nothing else.
//!
//! # Security Properties
//! - Resolution never mutates state
//! - Stale identifiers (wrong generation) never resolve
//! - Identifier 0 always means the caller, never another environment

use crate::env::{Env, EnvError, EnvId, EnvTable};

/// What the caller needs to be to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any live environment resolves (IPC send targets).
    Any,
    /// The caller must be the target or its direct parent.
    Owner,
}

impl Access {
    /// Check `caller`'s standing towards `target`.
    #[inline]
    pub fn permits(self, caller: EnvId, target: &Env) -> bool {
        match self {
            Self::Any => true,
            Self::Owner => target.id() == caller || target.parent_id() == caller,
        }
    }
}

impl EnvTable {
    /// Resolve `id` on behalf of `caller`.
    ///
    /// Fails with `BadEnv` if the identifier is stale or unknown, or if
    /// `access` demands ownership the caller lacks.
    pub fn resolve(&self, caller: EnvId, id: EnvId, access: Access) -> Result<&Env, EnvError> {
        let slot = self.resolve_slot(caller, id, access)?;
        self.at_slot(slot).ok_or(EnvError::BadEnv)
    }

    /// Mutable variant of [`EnvTable::resolve`].
    pub fn resolve_mut(&mut self, caller: EnvId, id: EnvId, access: Access) -> Result<&mut Env, EnvError> {
        let id = self.resolve(caller, id, access)?.id();
        self.get_mut(id).ok_or(EnvError::BadEnv)
    }

    fn resolve_slot(&self, caller: EnvId, id: EnvId, access: Access) -> Result<usize, EnvError> {
        let id = if id == EnvId::SELF { caller } else { id };
        let slot = self.slot_of(id).ok_or(EnvError::BadEnv)?;
        let target = self.at_slot(slot).ok_or(EnvError::BadEnv)?;
        if !access.permits(caller, target) {
            return Err(EnvError::BadEnv);
        }
        Ok(slot)
    }
}
