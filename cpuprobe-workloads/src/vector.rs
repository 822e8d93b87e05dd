// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Element-wise vector addition into an output buffer.

use std::mem::size_of;

use cpuprobe_core::{Barrier, Counters, Workload, WorkloadError};

use crate::input;

/// `out[i] = a[i] + b[i]` over the common length.
#[inline(never)]
pub fn vector_add(a: &[i64], b: &[i64], out: &mut [i64]) {
    for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *o = x.wrapping_add(y);
    }
}

/// Two iota inputs summed into a third buffer.
///
/// The result lives only in memory, so the output buffer is escaped through
/// the barrier after every invocation.
pub struct VectorAdd {
    elements: usize,
    a: Vec<i64>,
    b: Vec<i64>,
    out: Vec<i64>,
}

impl VectorAdd {
    pub fn new(elements: usize) -> Self {
        Self {
            elements,
            a: Vec::new(),
            b: Vec::new(),
            out: Vec::new(),
        }
    }
}

impl Workload for VectorAdd {
    fn setup(&mut self) -> Result<(), WorkloadError> {
        self.a = input::iota(self.elements)?;
        self.b = input::iota(self.elements)?;
        self.out = input::zeroed(self.elements)?;
        Ok(())
    }

    fn iterate(&mut self, barrier: &dyn Barrier) -> Result<u64, WorkloadError> {
        vector_add(&self.a, &self.b, &mut self.out);
        barrier.observe(self.out.as_slice());
        Ok(self.out.last().copied().unwrap_or_default() as u64)
    }

    fn counters(&self) -> Counters {
        // two reads and one write per element
        let elements = self.elements as u64;
        Counters::bytes(3 * elements * size_of::<i64>() as u64).with_items(elements)
    }

    fn teardown(&mut self) {
        self.a = Vec::new();
        self.b = Vec::new();
        self.out = Vec::new();
    }
}
