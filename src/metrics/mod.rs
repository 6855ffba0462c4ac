//! Metric storage, resolution and derived metric computation.
//!
//! - [`container`]: the per-event [`MetricsContainer`]
//! - [`resolve`]: the self → caller → partition lookup chain
//! - [`derived`]: aggregate duration, lateness and differential metrics

pub mod container;
pub mod derived;
pub mod resolve;

pub use container::{MetricValue, MetricsContainer};
pub use derived::MetricDiagnostics;
pub use resolve::MetricSource;
