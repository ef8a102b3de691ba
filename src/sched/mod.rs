//! Scheduling Policy
//!
//! The kernel core only marks environments runnable or not and asks the
//! policy for the next one to run.

use crate::env::{EnvId, EnvStatus, EnvTable};

/// Environment selection policy.
pub trait Scheduler: Send {
    /// Choose the next environment to run, or `None` to idle.
    ///
    /// `current` is the environment that was running, if any. Only
    /// environments whose status is `Runnable` may be returned.
    fn pick_next(&mut self, envs: &EnvTable, current: Option<EnvId>) -> Option<EnvId>;
}

/// Round-robin over table slots.
///
/// The scan starts at the slot after the current environment and wraps
/// around, so the current environment is chosen again only when nothing
/// else is runnable.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundRobin;

impl Scheduler for RoundRobin {
    fn pick_next(&mut self, envs: &EnvTable, current: Option<EnvId>) -> Option<EnvId> {
        let n = envs.capacity();
        let start = current.map_or(0, |id| id.slot(n) + 1);
        (0..n)
            .map(|i| (start + i) % n)
            .filter_map(|slot| envs.at_slot(slot))
            .find(|env| env.status() == EnvStatus::Runnable)
            .map(|env| env.id())
    }
}
