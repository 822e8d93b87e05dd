// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Best-effort core pinning for the measuring thread.
//!
//! Pinning reduces variance from OS thread migration. It is a platform hint,
//! never a correctness requirement: every failure is logged and the run
//! continues unpinned.

use crate::error::AffinityError;

/// Sysfs list of online CPUs.
const ONLINE_CPUS_PATH: &str = "/sys/devices/system/cpu/online";

/// Capability for binding the calling thread to one logical CPU.
pub trait CoreAffinity {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Pin the calling thread to `core`.
    fn pin_current(&self, core: usize) -> Result<(), AffinityError>;

    /// Restore the mask the thread had before the first successful pin.
    fn unpin_current(&self) -> Result<(), AffinityError> {
        Ok(())
    }
}

/// Fallback for platforms without an affinity syscall.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAffinity;

impl CoreAffinity for NoopAffinity {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn pin_current(&self, _core: usize) -> Result<(), AffinityError> {
        Err(AffinityError::Unsupported)
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use std::cell::Cell;

    use nix::sched::{sched_getaffinity, sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    use super::CoreAffinity;
    use crate::error::AffinityError;

    /// `sched_setaffinity(2)` on the calling thread.
    #[derive(Debug, Default)]
    pub struct SchedAffinity {
        saved: Cell<Option<CpuSet>>,
    }

    impl CoreAffinity for SchedAffinity {
        fn name(&self) -> &'static str {
            "sched_setaffinity"
        }

        fn pin_current(&self, core: usize) -> Result<(), AffinityError> {
            let syscall = |e: nix::Error| AffinityError::Syscall {
                core,
                reason: e.to_string(),
            };

            // Pid 0 addresses the calling thread.
            let previous = sched_getaffinity(Pid::from_raw(0)).map_err(syscall)?;
            let mut cpuset = CpuSet::new();
            cpuset.set(core).map_err(syscall)?;
            sched_setaffinity(Pid::from_raw(0), &cpuset).map_err(syscall)?;

            if self.saved.get().is_none() {
                self.saved.set(Some(previous));
            }
            Ok(())
        }

        fn unpin_current(&self) -> Result<(), AffinityError> {
            match self.saved.take() {
                Some(previous) => sched_setaffinity(Pid::from_raw(0), &previous).map_err(|e| {
                    AffinityError::Restore {
                        reason: e.to_string(),
                    }
                }),
                None => Ok(()),
            }
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux::SchedAffinity;

/// The affinity implementation for the current platform.
pub fn platform_affinity() -> Box<dyn CoreAffinity> {
    #[cfg(target_os = "linux")]
    {
        Box::new(SchedAffinity::default())
    }
    #[cfg(not(target_os = "linux"))]
    {
        Box::new(NoopAffinity)
    }
}

/// Logical CPUs currently online.
/// Falls back to `0..num_cpus` if sysfs is unavailable.
pub fn online_cpus() -> Vec<usize> {
    let cpus = std::fs::read_to_string(ONLINE_CPUS_PATH)
        .map(|list| parse_cpu_list(list.trim()))
        .unwrap_or_default();

    if cpus.is_empty() {
        (0..num_cpus::get()).collect()
    } else {
        cpus
    }
}

/// Try to pin the calling thread to `core`.
///
/// Returns the pinned core on success. Failures are logged, never raised.
pub fn try_pin(affinity: &dyn CoreAffinity, core: usize) -> Option<usize> {
    let online = online_cpus();
    let result = if online.contains(&core) {
        affinity.pin_current(core)
    } else {
        Err(AffinityError::CoreOffline { core, online })
    };

    match result {
        Ok(()) => {
            tracing::info!(core = core, method = affinity.name(), "Pinned harness thread");
            Some(core)
        }
        Err(e) => {
            tracing::warn!(
                core = core,
                method = affinity.name(),
                error = %e,
                "Core pinning failed, continuing unpinned"
            );
            None
        }
    }
}

/// Undo a pin made by [`try_pin`]. Failures are logged, never raised.
pub fn restore(affinity: &dyn CoreAffinity) {
    match affinity.unpin_current() {
        Ok(()) => tracing::debug!(method = affinity.name(), "Restored thread affinity"),
        Err(e) => tracing::warn!(
            method = affinity.name(),
            error = %e,
            "Failed to restore thread affinity"
        ),
    }
}

/// Parse a CPU list string like "0-3,8-11" into a Vec of CPU indices.
fn parse_cpu_list(s: &str) -> Vec<usize> {
    let mut cpus = Vec::new();
    for part in s.split(',') {
        let part = part.trim();
        if let Some((start, end)) = part.split_once('-') {
            if let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) {
                cpus.extend(start..=end);
            }
        } else if let Ok(cpu) = part.parse::<usize>() {
            cpus.push(cpu);
        }
    }
    cpus
}
