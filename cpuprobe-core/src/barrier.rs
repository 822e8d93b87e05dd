// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Optimization and memory-clobber barriers.
//!
//! A [`Barrier`] keeps the compiler from proving that a workload's result or
//! written memory is unused. Two implementations are provided:
//!
//! - [`HintBarrier`]: `std::hint::black_box` plus a compiler-only fence.
//! - [`VolatileBarrier`]: volatile reads, a SeqCst publish of escaped
//!   addresses into a process-wide sink and a full hardware fence.

use std::fmt;
use std::hint;
use std::ptr;
use std::str::FromStr;
use std::sync::atomic::{self, AtomicPtr, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Addresses published by [`VolatileBarrier::escape`]. Never read back.
static ESCAPE_SINK: AtomicPtr<()> = AtomicPtr::new(ptr::null_mut());

/// Capability for defeating dead-code elimination around measured work.
pub trait Barrier {
    /// Consume a scalar result so the computation producing it cannot be elided.
    fn consume(&self, value: u64) -> u64;

    /// Make the memory at `addr` observable to the outside world.
    fn escape(&self, addr: *const ());

    /// Assert that all prior writes are visible; forbids reordering across it.
    fn fence(&self);

    /// Which implementation this is.
    fn kind(&self) -> BarrierKind;
}

impl dyn Barrier + '_ {
    /// Observe any value by reference, e.g. an output buffer.
    pub fn observe<T: ?Sized>(&self, value: &T) {
        self.escape(value as *const T as *const ());
    }
}

/// Barrier built on `std::hint::black_box`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HintBarrier;

impl Barrier for HintBarrier {
    #[inline(always)]
    fn consume(&self, value: u64) -> u64 {
        hint::black_box(value)
    }

    #[inline(always)]
    fn escape(&self, addr: *const ()) {
        hint::black_box(addr);
    }

    #[inline(always)]
    fn fence(&self) {
        atomic::compiler_fence(Ordering::SeqCst);
    }

    fn kind(&self) -> BarrierKind {
        BarrierKind::Hint
    }
}

/// Barrier built on volatile accesses and atomic fences.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolatileBarrier;

impl Barrier for VolatileBarrier {
    #[inline(always)]
    fn consume(&self, value: u64) -> u64 {
        // SAFETY: `value` is a live, aligned local.
        unsafe { ptr::read_volatile(&value) }
    }

    #[inline(always)]
    fn escape(&self, addr: *const ()) {
        // A SeqCst publish forces every write reachable from `addr`
        // to be materialized before the store.
        ESCAPE_SINK.store(addr as *mut (), Ordering::SeqCst);
    }

    #[inline(always)]
    fn fence(&self) {
        atomic::fence(Ordering::SeqCst);
    }

    fn kind(&self) -> BarrierKind {
        BarrierKind::Volatile
    }
}

/// Selectable barrier implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierKind {
    #[default]
    Hint,
    Volatile,
}

impl BarrierKind {
    /// Build the barrier this kind names.
    pub fn build(self) -> Box<dyn Barrier> {
        match self {
            BarrierKind::Hint => Box::new(HintBarrier),
            BarrierKind::Volatile => Box::new(VolatileBarrier),
        }
    }
}

impl fmt::Display for BarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarrierKind::Hint => write!(f, "hint"),
            BarrierKind::Volatile => write!(f, "volatile"),
        }
    }
}

impl FromStr for BarrierKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hint" => Ok(BarrierKind::Hint),
            "volatile" => Ok(BarrierKind::Volatile),
            other => Err(ConfigurationError::InvalidFieldValue {
                field: "barrier",
                value: other.to_string(),
                reason: "Expected 'hint' or 'volatile'".to_string(),
            }),
        }
    }
}
