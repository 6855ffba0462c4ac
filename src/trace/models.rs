//! Input records for a linked trace.
//!
//! These structs describe the JSON document produced by the import front end:
//! parsed communication events already attributed to PEs and partitions.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::event::EventKind;
use crate::metrics::{MetricValue, MetricsContainer};

/// Metrics as stored in input records: `{ name: { value, aggregate } }`.
pub type MetricRecords = BTreeMap<String, MetricValue>;

/// Partition membership is carried on each event; the record itself only
/// holds partition-level metrics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionRecord {
    #[serde(default)]
    pub metrics: MetricRecords,
}

/// A non-communication function call that encloses communication events.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CallerRecord {
    pub enter: u64,
    pub exit: u64,
    pub function: u32,
    #[serde(default)]
    pub entity: u32,
    pub pe: u32,
    #[serde(default)]
    pub metrics: MetricRecords,
}

/// One communication event.
///
/// # Fields
/// - `matching`: message id shared by a send and its receive, or by all
///   members of one collective operation
/// - `communicator`: communicator id, defaults to the world communicator
/// - `caller`: index into [`TraceFile::callers`]
/// - `partition`: index into [`TraceFile::partitions`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub enter: u64,
    pub exit: u64,
    pub function: u32,
    #[serde(default)]
    pub entity: u32,
    pub pe: u32,
    #[serde(default)]
    pub phase: u32,
    pub kind: EventKind,
    #[serde(default)]
    pub matching: Option<i64>,
    #[serde(default)]
    pub communicator: Option<u32>,
    #[serde(default)]
    pub atomic: Option<i64>,
    #[serde(default)]
    pub caller: Option<usize>,
    #[serde(default)]
    pub partition: Option<usize>,
    #[serde(default)]
    pub metrics: MetricRecords,
}

/// Complete input document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceFile {
    #[serde(default)]
    pub partitions: Vec<PartitionRecord>,
    #[serde(default)]
    pub callers: Vec<CallerRecord>,
    pub events: Vec<EventRecord>,
}

impl TraceFile {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).context("Failed to parse trace JSON")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open trace file: {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to load trace file: {}", path.display()))
    }
}

pub(crate) fn metrics_from_records(records: &MetricRecords) -> MetricsContainer {
    records
        .iter()
        .map(|(name, value)| (name.clone(), *value))
        .collect()
}
