//! The analysis pipeline.
//!
//! [`analyze`] runs every pass over a linked trace in order: validation,
//! step assignment, lateness, then the configured differential metrics.
//! Emission is left to the caller so the same analyzed trace can feed any
//! number of writers.

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::metrics::MetricDiagnostics;
use crate::stride::{assign_logical_steps, StepSummary};
use crate::trace::Trace;
use crate::validation::validate_trace;

/// What a run of [`analyze`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub events: usize,
    pub stride_edges: usize,
    pub max_stride: i32,
    pub max_step: i32,
    pub coalesced: usize,
    pub lateness_events: usize,
    pub differential_metrics: Vec<String>,
    pub clamped: usize,
    pub clamped_aggregate: usize,
    pub warnings: usize,
}

impl AnalysisSummary {
    fn new(trace: &Trace, steps: StepSummary, diagnostics: MetricDiagnostics) -> Self {
        Self {
            events: trace.len(),
            stride_edges: steps.stride_edges,
            max_stride: steps.max_stride,
            max_step: steps.max_step,
            coalesced: steps.coalesced,
            clamped: diagnostics.clamped,
            clamped_aggregate: diagnostics.clamped_aggregate,
            ..Default::default()
        }
    }
}

/// Assign steps and compute metrics on `trace` as `config` asks.
pub fn analyze(trace: &mut Trace, config: &AnalysisConfig) -> Result<AnalysisSummary> {
    let mut warnings = 0;
    if config.validate {
        let result = validate_trace(trace);
        for warning in &result.warnings {
            warn!("{warning}");
        }
        warnings = result.warnings.len();
        if let Some(first) = result.errors.first() {
            bail!(
                "Trace failed validation with {} error(s), first: {first}",
                result.errors.len()
            );
        }
    }

    let steps = assign_logical_steps(trace, config.coalesce_isends)?;
    let lateness_events = trace.calculate_lateness();
    for metric in &config.differential {
        trace.calculate_differential_metrics(&metric.derived, &metric.base, config.aggregates);
    }

    let mut summary = AnalysisSummary::new(trace, steps, trace.metric_diagnostics());
    summary.lateness_events = lateness_events;
    summary.differential_metrics = config
        .differential
        .iter()
        .map(|m| m.derived.clone())
        .collect();
    summary.warnings = warnings;

    if summary.clamped + summary.clamped_aggregate > 0 {
        warn!(
            clamped = summary.clamped,
            clamped_aggregate = summary.clamped_aggregate,
            "differential metrics clamped to zero"
        );
    }
    info!(
        events = summary.events,
        max_step = summary.max_step,
        "analysis complete"
    );
    Ok(summary)
}
