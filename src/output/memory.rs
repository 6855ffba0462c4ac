use anyhow::Result;

use super::types::{LeaveRecord, StreamClock};
use super::TraceWriter;

/// A simple in-memory writer that keeps every record.
///
/// Useful for testing and for callers that post-process records themselves.
#[derive(Debug, Default)]
pub struct InMemoryWriter {
    records: Vec<LeaveRecord>,
    clock: StreamClock,
}

impl InMemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[LeaveRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<LeaveRecord> {
        self.records
    }
}

impl TraceWriter for InMemoryWriter {
    fn write_leave(&mut self, record: &LeaveRecord) -> Result<()> {
        self.clock.advance(record.location, record.time)?;
        self.records.push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // Nothing is buffered
        Ok(())
    }
}
