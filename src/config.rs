//! Kernel Configuration
//!
//! Sizing knobs fixed at boot. Everything else about the layout is a
//! compile-time constant in [`crate::mm::address`].

use core::fmt;

use crate::env::ENV_GEN_UNIT;

/// Default number of environment slots.
pub const NENV: usize = 1024;

/// Default number of physical frames (64 MiB of 4 KiB frames).
pub const MAX_FRAMES: usize = 16384;

/// Boot-time sizing of the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Capacity of the environment table. Must be a power of two no larger
    /// than the identifier generation unit.
    pub max_envs: usize,
    /// Number of physical frames available for page tables and user pages.
    pub max_frames: usize,
}

impl KernelConfig {
    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_envs == 0 || !self.max_envs.is_power_of_two() || self.max_envs > ENV_GEN_UNIT {
            return Err(ConfigError::BadEnvCount(self.max_envs));
        }
        if self.max_frames == 0 {
            return Err(ConfigError::NoFrames);
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_envs: NENV,
            max_frames: MAX_FRAMES,
        }
    }
}

/// Rejected configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment count is zero, not a power of two, or too large.
    BadEnvCount(usize),
    /// No physical memory to manage.
    NoFrames,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadEnvCount(n) => write!(f, "invalid environment count {}", n),
            Self::NoFrames => write!(f, "no physical frames configured"),
        }
    }
}
