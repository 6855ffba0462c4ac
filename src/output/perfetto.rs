//! Perfetto output.
//!
//! Each location (PE) becomes a track; every leave record becomes a
//! `TYPE_SLICE_END` track event on that track with the attributes attached
//! as debug annotations named after the schema.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use perfetto_protos::debug_annotation::DebugAnnotation;
use perfetto_protos::trace::Trace as PerfettoTrace;
use perfetto_protos::trace_packet::TracePacket;
use perfetto_protos::track_descriptor::TrackDescriptor;
use perfetto_protos::track_event::track_event::Type;
use perfetto_protos::track_event::TrackEvent;
use protobuf::Message;

use super::types::{AttributeSchema, AttributeValue, LeaveRecord, StreamClock};
use super::TraceWriter;

const SEQUENCE_ID: u32 = 1;

/// Extension trait for building debug annotations on a TrackEvent.
trait DebugAnnotationBuilder {
    fn add_uint(&mut self, name: &str, value: u64);
    fn add_double(&mut self, name: &str, value: f64);
}

impl DebugAnnotationBuilder for TrackEvent {
    fn add_uint(&mut self, name: &str, value: u64) {
        let mut annotation = DebugAnnotation::default();
        annotation.set_name(name.to_string());
        annotation.set_uint_value(value);
        self.debug_annotations.push(annotation);
    }

    fn add_double(&mut self, name: &str, value: f64) {
        let mut annotation = DebugAnnotation::default();
        annotation.set_name(name.to_string());
        annotation.set_double_value(value);
        self.debug_annotations.push(annotation);
    }
}

/// Collects leave records into a Perfetto trace held in memory until
/// [`write_to`](Self::write_to) is called.
pub struct PerfettoWriter {
    trace: PerfettoTrace,
    names: Vec<String>,
    tracks: BTreeMap<u32, u64>,
    clock: StreamClock,
}

impl PerfettoWriter {
    pub fn new(schema: &AttributeSchema) -> Self {
        Self {
            trace: PerfettoTrace::default(),
            names: schema
                .definitions()
                .map(|(_, name)| name.to_string())
                .collect(),
            tracks: BTreeMap::new(),
            clock: StreamClock::default(),
        }
    }

    /// Track uuid for `location`, emitting its descriptor on first use.
    fn track_uuid(&mut self, location: u32) -> u64 {
        if let Some(uuid) = self.tracks.get(&location) {
            return *uuid;
        }
        let uuid = u64::from(location) + 1;

        let mut desc = TrackDescriptor::default();
        desc.set_uuid(uuid);
        desc.set_name(format!("PE {location}"));
        let mut packet = TracePacket::default();
        packet.set_track_descriptor(desc);
        self.trace.packet.push(packet);

        self.tracks.insert(location, uuid);
        uuid
    }

    pub fn packets(&self) -> &[TracePacket] {
        &self.trace.packet
    }

    /// Serialize the collected trace.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        self.trace
            .write_to_writer(out)
            .context("Failed to write Perfetto trace")
    }
}

impl TraceWriter for PerfettoWriter {
    fn write_leave(&mut self, record: &LeaveRecord) -> Result<()> {
        self.clock.advance(record.location, record.time)?;
        let track_uuid = self.track_uuid(record.location);

        let mut event = TrackEvent::default();
        event.set_type(Type::TYPE_SLICE_END);
        event.set_track_uuid(track_uuid);
        event.add_uint("function", u64::from(record.function));
        for attribute in record.attributes.iter().flatten() {
            let name = self
                .names
                .get(attribute.id as usize)
                .cloned()
                .unwrap_or_else(|| format!("attribute_{}", attribute.id));
            match attribute.value {
                AttributeValue::Uint64(value) => event.add_uint(&name, value),
                AttributeValue::Double(value) => event.add_double(&name, value),
            }
        }

        let mut packet = TracePacket::default();
        packet.set_timestamp(record.time);
        packet.set_track_event(event);
        packet.set_trusted_packet_sequence_id(SEQUENCE_ID);
        self.trace.packet.push(packet);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // Packets are kept in memory until write_to
        Ok(())
    }
}
