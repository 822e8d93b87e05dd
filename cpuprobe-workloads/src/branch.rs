// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Branch-prediction workloads.
//!
//! The input is 95 % zeros followed by 5 % ones. Each element adds 1 when zero
//! and 2 otherwise. The sorted layout is trivially predictable; the shuffled
//! layout defeats the predictor.

use std::mem::size_of;

use cpuprobe_core::{Barrier, Counters, Workload, WorkloadError};

use crate::input;

#[cold]
#[inline(never)]
fn cold_path() {}

/// Marks `b == false` as the unlikely outcome.
#[inline(always)]
fn likely(b: bool) -> bool {
    if !b {
        cold_path();
    }
    b
}

/// Branch count without layout hints.
#[inline(never)]
pub fn count_nohint(data: &[i64]) -> i64 {
    let mut sum = 0i64;
    for &x in data {
        if x == 0 {
            sum = sum.wrapping_add(1);
        } else {
            sum = sum.wrapping_add(2);
        }
    }
    sum
}

/// Branch count with the rare path marked cold.
#[inline(never)]
pub fn count_hinted(data: &[i64]) -> i64 {
    let mut sum = 0i64;
    for &x in data {
        if likely(x == 0) {
            sum = sum.wrapping_add(1);
        } else {
            sum = sum.wrapping_add(2);
        }
    }
    sum
}

/// Order of the skewed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Zeros first, then ones.
    Sorted,
    /// Seeded random permutation.
    Shuffled { seed: u64 },
}

/// Branch-counting workload over a skewed input.
pub struct BranchCount {
    elements: usize,
    layout: Layout,
    hinted: bool,
    data: Vec<i64>,
}

impl BranchCount {
    pub fn new(elements: usize, layout: Layout, hinted: bool) -> Self {
        Self {
            elements,
            layout,
            hinted,
            data: Vec::new(),
        }
    }
}

impl Workload for BranchCount {
    fn setup(&mut self) -> Result<(), WorkloadError> {
        self.data = match self.layout {
            Layout::Sorted => input::skewed(self.elements)?,
            Layout::Shuffled { seed } => input::shuffled(self.elements, seed)?,
        };
        Ok(())
    }

    fn iterate(&mut self, barrier: &dyn Barrier) -> Result<u64, WorkloadError> {
        barrier.observe(self.data.as_slice());
        let sum = if self.hinted {
            count_hinted(&self.data)
        } else {
            count_nohint(&self.data)
        };
        Ok(sum as u64)
    }

    fn counters(&self) -> Counters {
        let elements = self.elements as u64;
        Counters::bytes(elements * size_of::<i64>() as u64).with_items(elements)
    }

    fn teardown(&mut self) {
        self.data = Vec::new();
    }
}
