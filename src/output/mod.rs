//! Trace re-emission.
//!
//! Finalized events are written back out as leave records through the
//! [`TraceWriter`] trait, so the emitter does not know which format it is
//! producing. Attribute ids come from an injected [`AttributeSchema`].
//!
//! # Writers
//!
//! - [`InMemoryWriter`]: keeps records in a `Vec`, for tests and tooling
//! - [`JsonLinesWriter`]: one JSON object per record
//! - [`PerfettoWriter`]: Perfetto protobuf trace, one track per PE
//!
//! [`dot`] additionally exports the stride DAG for graph visualization.

pub mod dot;
mod json;
mod memory;
mod perfetto;
mod types;

pub use json::JsonLinesWriter;
pub use memory::InMemoryWriter;
pub use perfetto::PerfettoWriter;
pub use types::*;

use std::collections::BTreeMap;

use anyhow::Result;
use tracing::info;

use crate::trace::{EventId, Trace};

/// Sink for leave records.
///
/// Records for one location arrive in non-decreasing time order;
/// implementations reject records that go backwards on a location.
pub trait TraceWriter {
    /// Write one leave record.
    fn write_leave(&mut self, record: &LeaveRecord) -> Result<()>;

    /// Flush any buffered data to the output.
    fn flush(&mut self) -> Result<()>;
}

/// Build the leave record of event `id`.
///
/// Coalesced events (negative step) get no attribute list at all. Otherwise
/// the list holds `phase`, `step`, and the direct and aggregate value of each
/// schema metric the event itself stores. Metrics the event lacks are left
/// out rather than written as zero.
pub fn leave_record(trace: &Trace, id: EventId, schema: &AttributeSchema) -> LeaveRecord {
    let event = trace.event(id);
    let mut record = LeaveRecord {
        location: event.pe,
        time: event.exit,
        function: event.function,
        attributes: None,
    };
    if event.step < 0 {
        return record;
    }

    let mut attributes = vec![
        Attribute {
            id: AttributeSchema::PHASE_ID,
            value: AttributeValue::Uint64(u64::from(event.phase)),
        },
        Attribute {
            id: AttributeSchema::STEP_ID,
            value: AttributeValue::Uint64(event.step as u64),
        },
    ];
    for metric in schema.metrics() {
        let Some(value) = event.metrics.get(&metric.name) else {
            continue;
        };
        attributes.push(Attribute {
            id: metric.id,
            value: AttributeValue::Double(value.value),
        });
        attributes.push(Attribute {
            id: metric.aggregate_id,
            value: AttributeValue::Double(value.aggregate),
        });
    }
    record.attributes = Some(attributes);
    record
}

/// Write the leave record of event `id`.
pub fn write_leave(
    trace: &Trace,
    id: EventId,
    schema: &AttributeSchema,
    writer: &mut dyn TraceWriter,
) -> Result<()> {
    writer.write_leave(&leave_record(trace, id, schema))
}

/// Write every event of `trace`, PE by PE, each PE in exit time order.
/// Returns the number of records written.
pub fn emit_trace(
    trace: &Trace,
    schema: &AttributeSchema,
    writer: &mut dyn TraceWriter,
) -> Result<usize> {
    let mut streams: BTreeMap<u32, Vec<EventId>> = BTreeMap::new();
    for (id, event) in trace.events() {
        streams.entry(event.pe).or_default().push(id);
    }

    let mut written = 0;
    for ids in streams.values_mut() {
        ids.sort_by(|a, b| {
            trace[*a]
                .exit
                .cmp(&trace[*b].exit)
                .then_with(|| trace[*a].cmp(&trace[*b]))
        });
        for id in ids.iter() {
            write_leave(trace, *id, schema, writer)?;
            written += 1;
        }
    }
    writer.flush()?;

    info!(records = written, locations = streams.len(), "emitted trace");
    Ok(written)
}
