//! Trace data model.
//!
//! # Module Organization
//!
//! - [`event`]: communication events, callers, ids and the event ordering
//! - [`arena`]: the [`Trace`] arena and its relation/stride DAG accessors
//! - [`partition`]: partitions supplying fallback metrics
//! - [`models`]: serde records for the input document
//! - [`link`]: the linking pass building a [`Trace`] from those records
//! - [`constants`]: attribute and metric names shared with the output side

pub mod arena;
pub mod constants;
pub mod event;
pub mod link;
pub mod models;
pub mod partition;

pub use arena::{PeSequence, Trace};
pub use constants::*;
pub use event::{CallerId, CommEvent, Event, EventId, EventKind, PartitionId, Relation};
pub use link::build_trace;
pub use models::{CallerRecord, EventRecord, MetricRecords, PartitionRecord, TraceFile};
pub use partition::Partition;
