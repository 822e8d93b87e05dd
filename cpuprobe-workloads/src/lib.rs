//! cpuprobe Workloads
//!
//! Stock workloads exploring cache-line utilization, output escaping and
//! branch prediction over large `i64` buffers.

pub mod branch;
pub mod input;
pub mod stride;
pub mod vector;

use cpuprobe_core::{Harness, HarnessResult, WorkloadOptions};

pub use branch::{BranchCount, Layout};
pub use input::InputParams;
pub use stride::{StrideSum, STRIDES};
pub use vector::VectorAdd;

/// Register every stock workload with `harness`.
///
/// Summing and vector workloads clobber memory after each invocation; the
/// branch workloads only consume their result.
pub fn register_all(harness: &mut Harness, params: &InputParams) -> HarnessResult<()> {
    let elements = params.elements;

    harness.register(
        "sum_sequential",
        StrideSum::new(1, elements),
        WorkloadOptions::new(),
    )?;

    for stride in STRIDES {
        harness.register(
            &format!("sum_stride{}", stride),
            StrideSum::new(stride, elements),
            WorkloadOptions::new(),
        )?;
    }

    harness.register(
        "vector_add",
        VectorAdd::new(elements),
        WorkloadOptions::new().clobber_memory(true),
    )?;

    let branch = WorkloadOptions::new().clobber_memory(false);
    harness.register(
        "branch_nohint",
        BranchCount::new(elements, Layout::Sorted, false),
        branch.clone(),
    )?;
    harness.register(
        "branch_hinted",
        BranchCount::new(elements, Layout::Sorted, true),
        branch.clone(),
    )?;
    harness.register(
        "branch_shuffled",
        BranchCount::new(elements, Layout::Shuffled { seed: params.seed }, false),
        branch,
    )?;

    tracing::debug!(
        elements = elements,
        seed = params.seed,
        "Registered stock workloads"
    );
    Ok(())
}
