//! Data structures passed to trace writers.
//!
//! A [`LeaveRecord`] is format-agnostic: attribute ids come from an
//! [`AttributeSchema`] the caller builds once and hands to both the emitter
//! and the writer.

use std::collections::{BTreeSet, HashMap};

use anyhow::{bail, Result};
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::trace::{Trace, AGGREGATE_SUFFIX, PHASE_ATTRIBUTE, STEP_ATTRIBUTE};

/// Wire type of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Uint64,
    Double,
}

/// Typed attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    Uint64(u64),
    Double(f64),
}

impl AttributeValue {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            AttributeValue::Uint64(_) => AttributeType::Uint64,
            AttributeValue::Double(_) => AttributeType::Double,
        }
    }
}

/// One `(id, type, value)` entry of an attribute list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub id: u32,
    pub value: AttributeValue,
}

/// A function leave written to one location (PE) stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaveRecord {
    pub location: u32,
    pub time: u64,
    pub function: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Attribute>>,
}

/// Attribute ids of one exported metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricAttribute {
    pub name: String,
    pub id: u32,
    pub aggregate_id: u32,
}

/// Name to id mapping for every attribute a writer may see.
///
/// `phase` and `step` are always defined first. Each metric defines two
/// attributes: its own name and the name with [`AGGREGATE_SUFFIX`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSchema {
    names: Vec<String>,
    metrics: Vec<MetricAttribute>,
}

impl Default for AttributeSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeSchema {
    pub const PHASE_ID: u32 = 0;
    pub const STEP_ID: u32 = 1;

    pub fn new() -> Self {
        Self {
            names: vec![PHASE_ATTRIBUTE.to_string(), STEP_ATTRIBUTE.to_string()],
            metrics: Vec::new(),
        }
    }

    /// Schema exporting the given metrics in the given order.
    pub fn with_metrics<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut schema = Self::new();
        for name in names {
            schema.add_metric(name.as_ref())?;
        }
        Ok(schema)
    }

    /// Schema exporting every metric stored on an event of `trace` whose name
    /// matches `filter`, sorted by name.
    ///
    /// A stored metric whose name is the aggregate attribute of another
    /// selected metric (`X_agg` next to `X`), or a reserved attribute name,
    /// is left out with a warning.
    pub fn from_trace(trace: &Trace, filter: &Regex) -> Result<Self> {
        let names: BTreeSet<&str> = trace
            .events()
            .flat_map(|(_, event)| event.metrics.names())
            .filter(|name| filter.is_match(name))
            .collect();

        let mut schema = Self::new();
        for &name in &names {
            let shadows = name
                .strip_suffix(AGGREGATE_SUFFIX)
                .is_some_and(|base| names.contains(base));
            if shadows || schema.id(name).is_some() {
                warn!(
                    metric = name,
                    "metric name collides with an exported attribute, skipping"
                );
                continue;
            }
            schema.add_metric(name)?;
        }
        Ok(schema)
    }

    /// Define the attributes of metric `name`. Defining a metric twice
    /// returns the existing ids.
    pub fn add_metric(&mut self, name: &str) -> Result<&MetricAttribute> {
        if let Some(index) = self.metrics.iter().position(|m| m.name == name) {
            return Ok(&self.metrics[index]);
        }
        let aggregate_name = format!("{name}{AGGREGATE_SUFFIX}");
        if self.id(name).is_some() || self.id(&aggregate_name).is_some() {
            bail!("Metric '{name}' collides with an existing attribute");
        }

        let id = self.define(name.to_string());
        let aggregate_id = self.define(aggregate_name);
        self.metrics.push(MetricAttribute {
            name: name.to_string(),
            id,
            aggregate_id,
        });
        Ok(&self.metrics[self.metrics.len() - 1])
    }

    fn define(&mut self, name: String) -> u32 {
        self.names.push(name);
        (self.names.len() - 1) as u32
    }

    pub fn id(&self, name: &str) -> Option<u32> {
        self.names.iter().position(|n| n == name).map(|i| i as u32)
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn metrics(&self) -> &[MetricAttribute] {
        &self.metrics
    }

    /// All `(id, name)` definitions in id order.
    pub fn definitions(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(id, name)| (id as u32, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Enforces non-decreasing timestamps per location stream.
#[derive(Debug, Default)]
pub struct StreamClock {
    last: HashMap<u32, u64>,
}

impl StreamClock {
    pub fn advance(&mut self, location: u32, time: u64) -> Result<()> {
        match self.last.get(&location) {
            Some(&previous) if time < previous => bail!(
                "Leave record at {time} on location {location} precedes the previous record at {previous}"
            ),
            _ => {
                self.last.insert(location, time);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{CommEvent, EventKind};

    #[test]
    fn test_schema_ids() {
        let schema = AttributeSchema::with_metrics(["Lateness", "D.Lateness"]).unwrap();
        assert_eq!(schema.id("phase"), Some(AttributeSchema::PHASE_ID));
        assert_eq!(schema.id("step"), Some(AttributeSchema::STEP_ID));
        assert_eq!(schema.id("Lateness"), Some(2));
        assert_eq!(schema.id("Lateness_agg"), Some(3));
        assert_eq!(schema.id("D.Lateness_agg"), Some(5));
        assert_eq!(schema.name(4), Some("D.Lateness"));
        assert_eq!(schema.metrics().len(), 2);
        assert_eq!(schema.len(), 6);
    }

    #[test]
    fn test_duplicate_metric_keeps_ids() {
        let mut schema = AttributeSchema::new();
        let first = schema.add_metric("Lateness").unwrap().clone();
        let second = schema.add_metric("Lateness").unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(schema.len(), 4);
    }

    #[test]
    fn test_colliding_metric_is_rejected() {
        let mut schema = AttributeSchema::new();
        assert!(schema.add_metric("step").is_err());
        schema.add_metric("X").unwrap();
        assert!(schema.add_metric("X_agg").is_err());
    }

    #[test]
    fn test_from_trace_skips_shadowed_aggregate_names() {
        let mut trace = Trace::new();
        let mut event = CommEvent::new(10, 20, 1, 0, 0, 0, EventKind::Send);
        event.metrics.add_metric("X", 1.0, 1.0);
        event.metrics.add_metric("X_agg", 2.0, 2.0);
        event.metrics.add_metric("step", 3.0, 3.0);
        trace.add_event(event);

        let schema = AttributeSchema::from_trace(&trace, &Regex::new(".*").unwrap()).unwrap();
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.id("X"), Some(2));
        assert_eq!(schema.id("X_agg"), Some(3));
        assert_eq!(schema.id("step"), Some(AttributeSchema::STEP_ID));
        assert_eq!(schema.metrics().len(), 1);
    }

    #[test]
    fn test_stream_clock_rejects_going_backwards() {
        let mut clock = StreamClock::default();
        clock.advance(0, 100).unwrap();
        clock.advance(0, 100).unwrap();
        clock.advance(1, 50).unwrap();
        assert!(clock.advance(0, 99).is_err());
    }

    #[test]
    fn test_attribute_value_json() {
        let attr = Attribute {
            id: 1,
            value: AttributeValue::Uint64(3),
        };
        assert_eq!(
            serde_json::to_string(&attr).unwrap(),
            r#"{"id":1,"value":{"type":"uint64","value":3}}"#
        );
        assert_eq!(attr.value.attribute_type(), AttributeType::Uint64);
    }
}
