// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Sequential and strided sums.
//!
//! A stride of N touches every N-th element. Once the stride covers a cache
//! line (8 × `i64`), every access pulls a fresh line and the loop becomes
//! bandwidth-bound.

use std::mem::size_of;

use cpuprobe_core::{Barrier, Counters, Workload, WorkloadError};

use crate::input;

/// Strides registered as `sum_stride{N}`.
pub const STRIDES: [usize; 6] = [2, 4, 8, 16, 32, 64];

/// Sum of `data[0], data[stride], ...` over `data.len() / stride` elements.
#[inline(never)]
pub fn stride_sum(data: &[i64], stride: usize) -> i64 {
    data.iter()
        .step_by(stride)
        .take(data.len() / stride)
        .fold(0i64, |sum, &x| sum.wrapping_add(x))
}

/// Strided sum over an iota buffer. A stride of 1 is the sequential sum.
pub struct StrideSum {
    stride: usize,
    elements: usize,
    data: Vec<i64>,
}

impl StrideSum {
    pub fn new(stride: usize, elements: usize) -> Self {
        Self {
            stride: stride.max(1),
            elements,
            data: Vec::new(),
        }
    }

    fn touched(&self) -> u64 {
        (self.elements / self.stride) as u64
    }
}

impl Workload for StrideSum {
    fn setup(&mut self) -> Result<(), WorkloadError> {
        self.data = input::iota(self.elements)?;
        Ok(())
    }

    fn iterate(&mut self, barrier: &dyn Barrier) -> Result<u64, WorkloadError> {
        barrier.observe(self.data.as_slice());
        Ok(stride_sum(&self.data, self.stride) as u64)
    }

    fn counters(&self) -> Counters {
        let touched = self.touched();
        Counters::bytes(touched * size_of::<i64>() as u64).with_items(touched)
    }

    fn teardown(&mut self) {
        self.data = Vec::new();
    }
}
