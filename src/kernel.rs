//! Kernel State
//!
//! Everything a trap handler touches: the frame allocator, the environment
//! table, the running environment, the scheduling policy and the devices.
//!
//! # Execution Model
//! One trap is handled at a time and runs to completion. The exception
//! layer holds the kernel behind a single lock for the whole trap, which is
//! the only synchronization the syscall handlers rely on.

use alloc::boxed::Box;

use crate::config::{ConfigError, KernelConfig};
use crate::drivers::{Clock, Console, NetDevice};
use crate::env::{Env, EnvError, EnvId, EnvStatus, EnvTable};
use crate::exception::Trapframe;
use crate::mm::{FrameAllocator, PagePerm, VirtAddr};
use crate::sched::{RoundRobin, Scheduler};
use crate::syscall::{self, SysResult, SyscallError};

/// Devices reachable from syscalls.
pub struct Devices {
    pub console: Box<dyn Console>,
    pub clock: Box<dyn Clock>,
    pub nic: Box<dyn NetDevice>,
}

impl Devices {
    pub fn new<C, T, N>(console: C, clock: T, nic: N) -> Self
    where
        C: Console + 'static,
        T: Clock + 'static,
        N: NetDevice + 'static,
    {
        Self {
            console: Box::new(console),
            clock: Box::new(clock),
            nic: Box::new(nic),
        }
    }
}

/// The kernel.
pub struct Kernel {
    pub(crate) frames: FrameAllocator,
    pub(crate) envs: EnvTable,
    pub(crate) curenv: Option<EnvId>,
    sched: Box<dyn Scheduler>,
    pub(crate) devices: Devices,
}

impl Kernel {
    /// Build a kernel sized by `config`, scheduling round-robin.
    pub fn new(config: KernelConfig, devices: Devices) -> Result<Self, ConfigError> {
        config.validate()?;
        log::info!(
            "kernel: {} env slots, {} frames",
            config.max_envs,
            config.max_frames
        );
        Ok(Self {
            frames: FrameAllocator::new(config.max_frames),
            envs: EnvTable::new(config.max_envs),
            curenv: None,
            sched: Box::new(RoundRobin),
            devices,
        })
    }

    /// Replace the scheduling policy.
    pub fn with_scheduler<S: Scheduler + 'static>(mut self, sched: S) -> Self {
        self.sched = Box::new(sched);
        self
    }

    #[inline]
    pub fn frames(&self) -> &FrameAllocator {
        &self.frames
    }

    #[inline]
    pub fn envs(&self) -> &EnvTable {
        &self.envs
    }

    /// Look up a live environment.
    pub fn env(&self, id: EnvId) -> Option<&Env> {
        self.envs.get(id)
    }

    /// The running environment, if any.
    #[inline]
    pub fn current(&self) -> Option<EnvId> {
        self.curenv
    }

    /// Create a top-level environment starting at `entry` with its stack
    /// pointer at `stack_top`, and make it runnable.
    pub fn env_create(&mut self, entry: usize, stack_top: usize) -> Result<EnvId, EnvError> {
        let id = self.envs.alloc(EnvId::SELF, &self.frames)?;
        let env = self.envs.get_mut(id).ok_or(EnvError::BadEnv)?;
        env.tf = Trapframe::new_user(entry, stack_top);
        env.status = EnvStatus::Runnable;
        Ok(id)
    }

    /// Make `id` the running environment.
    pub fn env_run(&mut self, id: EnvId) -> Result<(), EnvError> {
        let env = self.envs.get_mut(id).ok_or(EnvError::BadEnv)?;
        if env.status != EnvStatus::Runnable {
            return Err(EnvError::NotRunnable);
        }
        env.runs += 1;
        self.curenv = Some(id);
        Ok(())
    }

    /// Hand the CPU to whichever environment the policy picks next.
    ///
    /// Returns the new running environment, or `None` if the CPU idles.
    pub fn schedule(&mut self) -> Option<EnvId> {
        let next = self.sched.pick_next(&self.envs, self.curenv);
        self.curenv = None;
        match next {
            Some(id) => {
                if let Err(err) = self.env_run(id) {
                    log::warn!("scheduler picked {}: {}", id, err);
                }
            }
            None => log::trace!("no runnable environment, idling"),
        }
        self.curenv
    }

    /// Destroy an environment.
    ///
    /// The running environment is only marked `Dying`; its resources are
    /// released when the current trap finishes.
    pub fn destroy(&mut self, id: EnvId) {
        let by = self.curenv.unwrap_or(EnvId::SELF);
        if self.curenv == Some(id) {
            if let Some(env) = self.envs.get_mut(id) {
                env.status = EnvStatus::Dying;
            }
        } else if self.envs.free(id).is_err() {
            return;
        }
        log::info!("[{}] free env {}", by, id);
    }

    /// Copy the trapped registers into the environment's saved frame.
    pub fn save_context(&mut self, id: EnvId, ctx: &Trapframe) {
        if let Some(env) = self.envs.get_mut(id) {
            env.tf = *ctx;
        }
    }

    /// Reap a dying current environment and pick another if the current one
    /// can no longer run.
    pub fn finish_trap(&mut self) {
        if let Some(cur) = self.curenv {
            match self.envs.get(cur).map(Env::status) {
                Some(EnvStatus::Runnable) => return,
                Some(EnvStatus::Dying) => {
                    if self.envs.free(cur).is_ok() {
                        log::debug!("reaped env {}", cur);
                    }
                }
                _ => {}
            }
        }
        self.schedule();
    }

    /// Handle the syscall saved in the current environment's frame.
    ///
    /// The result word is stored back into the caller's frame unless the
    /// call destroyed the caller.
    pub fn handle_syscall(&mut self) -> isize {
        let Some(caller) = self.curenv else {
            return SyscallError::BadEnv.as_raw();
        };
        let Some(env) = self.envs.get(caller) else {
            return SyscallError::BadEnv.as_raw();
        };
        let num = env.tf.syscall_number();
        let args = env.tf.syscall_args();

        let ret = syscall::dispatch(self, caller, num, args);

        if let Some(env) = self.envs.get_mut(caller) {
            if env.status != EnvStatus::Dying {
                env.tf.set_return(ret);
            }
        }
        ret
    }

    /// Issue a syscall as the current environment, as if it had trapped
    /// with `num` in `x8` and `args` in `x0`..`x4`.
    ///
    /// Runs the full trap path, so the current environment may change.
    pub fn syscall(&mut self, num: usize, args: [usize; 5]) -> isize {
        let Some(caller) = self.curenv else {
            return SyscallError::BadEnv.as_raw();
        };
        if let Some(env) = self.envs.get_mut(caller) {
            env.tf.set_syscall(num, args);
        }
        let ret = self.handle_syscall();
        self.finish_trap();
        ret
    }

    /// Deliver a user-mode abort taken by `id`.
    ///
    /// With a fault upcall registered the environment resumes there with
    /// the fault address, syndrome and faulting pc in `x0`..`x2`; without
    /// one it is destroyed.
    pub fn page_fault(&mut self, id: EnvId) {
        let Some(env) = self.envs.get_mut(id) else {
            return;
        };
        if env.pgfault_upcall == 0 {
            log::warn!(
                "[{}] user fault va {:#010x} ip {:#010x}",
                id,
                env.tf.far,
                env.tf.elr
            );
            self.destroy(id);
            return;
        }
        let tf = &mut env.tf;
        tf.gpr[0] = tf.far;
        tf.gpr[1] = tf.esr;
        tf.gpr[2] = tf.elr;
        tf.elr = env.pgfault_upcall as u64;
        log::debug!("[{}] page fault at {:#x} to upcall", id, env.tf.gpr[0]);
    }

    /// Check that `id` may access `[va, va + len)` with `need`.
    ///
    /// On violation the environment is destroyed and `Fault` returned.
    pub(crate) fn user_mem_assert(
        &mut self,
        id: EnvId,
        va: usize,
        len: usize,
        need: PagePerm,
    ) -> SysResult<()> {
        let ok = self
            .envs
            .get(id)
            .and_then(Env::address_space)
            .is_some_and(|space| space.check_range(VirtAddr::new(va), len, need).is_ok());
        if ok {
            return Ok(());
        }
        log::warn!("[{}] user_mem_check assertion failure for va {:#010x}", id, va);
        self.destroy(id);
        Err(SyscallError::Fault)
    }
}

impl core::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Kernel")
            .field("envs", &self.envs)
            .field("free_frames", &self.frames.free_frames())
            .field("curenv", &self.curenv)
            .finish()
    }
}
