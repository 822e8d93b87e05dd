// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Input buffers for the stock workloads.
//!
//! All inputs are built in `setup` and never timed. Allocation failures are
//! reported as setup errors rather than aborting the process.

use cpuprobe_core::{ConfigurationError, WorkloadError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Default element count of every input buffer.
pub const DEFAULT_ELEMENTS: usize = 1_000_000;

/// Default seed for shuffled inputs.
pub const DEFAULT_SEED: u64 = 0x00c0_ffee;

/// Percentage of zeros in the skewed branch input.
pub const COMMON_PERCENT: usize = 95;

/// Size and seed shared by all stock workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputParams {
    pub elements: usize,
    pub seed: u64,
}

impl Default for InputParams {
    fn default() -> Self {
        Self {
            elements: DEFAULT_ELEMENTS,
            seed: DEFAULT_SEED,
        }
    }
}

impl InputParams {
    pub fn new(elements: usize) -> Result<Self, ConfigurationError> {
        if elements == 0 {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "elements",
                value: "0".to_string(),
                reason: "Input buffers must hold at least one element".to_string(),
            });
        }
        Ok(Self {
            elements,
            ..Self::default()
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Zeroed buffer of `len` elements.
pub fn zeroed(len: usize) -> Result<Vec<i64>, WorkloadError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|e| {
        WorkloadError::setup(format!("cannot allocate {} elements: {}", len, e))
    })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// `1, 2, ..., len`.
pub fn iota(len: usize) -> Result<Vec<i64>, WorkloadError> {
    let mut buf = zeroed(len)?;
    for (slot, value) in buf.iter_mut().zip(1i64..) {
        *slot = value;
    }
    Ok(buf)
}

/// Zeros for the first 95 % of the buffer, ones for the rest.
pub fn skewed(len: usize) -> Result<Vec<i64>, WorkloadError> {
    let mut buf = zeroed(len)?;
    let cutoff = len * COMMON_PERCENT / 100;
    buf[cutoff..].fill(1);
    Ok(buf)
}

/// The skewed distribution in a seeded random order.
pub fn shuffled(len: usize, seed: u64) -> Result<Vec<i64>, WorkloadError> {
    let mut buf = skewed(len)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    buf.shuffle(&mut rng);
    Ok(buf)
}
