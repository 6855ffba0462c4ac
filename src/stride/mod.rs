//! Logical step assignment.
//!
//! The passes run in order over a linked trace:
//!
//! 1. [`build_stride_dag`] links stride events into a DAG, which
//!    [`ensure_acyclic`] then checks
//! 2. [`assign_strides`] computes each stride event's depth in that DAG
//! 3. [`assign_steps`] turns strides into steps shared across PEs
//! 4. optionally [`coalesce_isends`] merges runs of non-blocking sends

pub mod coalesce;
pub mod dag;
pub mod steps;

pub use coalesce::{coalesce, coalesce_isends};
pub use dag::build_stride_dag;
pub use steps::{assign_steps, assign_strides};

use anyhow::{bail, Result};
use tracing::info;

use crate::trace::Trace;
use crate::validation::ValidationError;

/// Outcome of [`assign_logical_steps`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepSummary {
    pub stride_edges: usize,
    pub max_stride: i32,
    pub max_step: i32,
    pub coalesced: usize,
}

/// Fail if the stride DAG has a cycle; strides are undefined on one.
pub fn ensure_acyclic(trace: &Trace) -> Result<()> {
    let ordered = trace.stride_topological_order().len();
    if ordered < trace.len() {
        bail!(ValidationError::StrideCycle {
            events: trace.len() - ordered,
        });
    }
    Ok(())
}

/// Run every step assignment pass over `trace`.
///
/// Refuses to step a trace whose stride DAG came out cyclic rather than
/// leaving the events on the cycle unstepped.
pub fn assign_logical_steps(
    trace: &mut Trace,
    coalesce_nonblocking: bool,
) -> Result<StepSummary> {
    let stride_edges = build_stride_dag(trace);
    ensure_acyclic(trace)?;
    let max_stride = assign_strides(trace);
    let max_step = assign_steps(trace);
    let coalesced = if coalesce_nonblocking {
        coalesce_isends(trace)
    } else {
        0
    };

    let summary = StepSummary {
        stride_edges,
        max_stride,
        max_step,
        coalesced,
    };
    info!(
        stride_edges,
        max_stride, max_step, coalesced, "assigned logical steps"
    );
    Ok(summary)
}
