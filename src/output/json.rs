use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use super::types::{AttributeSchema, LeaveRecord, StreamClock};
use super::TraceWriter;

#[derive(Serialize)]
struct AttributeDefinition<'a> {
    id: u32,
    name: &'a str,
}

#[derive(Serialize)]
struct SchemaHeader<'a> {
    attributes: Vec<AttributeDefinition<'a>>,
}

/// Writes one JSON object per line.
///
/// The first line defines the attribute schema so readers can map attribute
/// ids back to names; every following line is a [`LeaveRecord`].
pub struct JsonLinesWriter<W: Write> {
    out: W,
    clock: StreamClock,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(mut out: W, schema: &AttributeSchema) -> Result<Self> {
        let header = SchemaHeader {
            attributes: schema
                .definitions()
                .map(|(id, name)| AttributeDefinition { id, name })
                .collect(),
        };
        serde_json::to_writer(&mut out, &header).context("Failed to write schema header")?;
        out.write_all(b"\n")?;
        Ok(Self {
            out,
            clock: StreamClock::default(),
        })
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceWriter for JsonLinesWriter<W> {
    fn write_leave(&mut self, record: &LeaveRecord) -> Result<()> {
        self.clock.advance(record.location, record.time)?;
        serde_json::to_writer(&mut self.out, record).context("Failed to write leave record")?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().context("Failed to flush JSON output")
    }
}
