//! commstep library - logical step assignment for communication traces.
//!
//! Events recorded on many processing elements (PEs) are linked into an
//! arena, arranged in a stride DAG and given logical steps that line up the
//! same phase of communication across PEs. Per-step metrics such as lateness
//! are then computed and the trace is written back out with the results
//! attached to every function leave.
//!
//! # Modules
//!
//! - [`trace`] - event arena, relations and input parsing
//! - [`metrics`] - metric storage, fallback resolution and derived metrics
//! - [`stride`] - stride DAG, stride and step assignment, coalescing
//! - [`output`] - re-emission through [`TraceWriter`](output::TraceWriter)
//! - [`validation`] - structural checks on a linked trace
//! - [`analyze`] - the pass pipeline driven by [`AnalysisConfig`]
//!
//! # Example
//!
//! ```no_run
//! use commstep::output::{emit_trace, AttributeSchema, InMemoryWriter};
//! use commstep::{analyze, build_trace, AnalysisConfig, TraceFile};
//! use std::path::Path;
//!
//! let file = TraceFile::from_path(Path::new("trace.json")).expect("Failed to read trace");
//! let mut trace = build_trace(&file).expect("Failed to link trace");
//! let config = AnalysisConfig::default();
//! analyze(&mut trace, &config).expect("Analysis failed");
//!
//! let schema = AttributeSchema::from_trace(&trace, &config.metric_filter().unwrap()).unwrap();
//! let mut writer = InMemoryWriter::new();
//! emit_trace(&trace, &schema, &mut writer).expect("Failed to emit");
//! ```

pub mod analyze;
pub mod config;
pub mod metrics;
pub mod output;
pub mod stride;
pub mod trace;
pub mod validation;

#[cfg(test)]
mod test_utils;

// Re-export for convenience
pub use analyze::{analyze, AnalysisSummary};
pub use config::{AnalysisConfig, DifferentialMetric};
pub use trace::{build_trace, CommEvent, EventId, EventKind, Trace, TraceFile};
pub use validation::{validate_trace, ValidationError, ValidationResult, ValidationWarning};
