//! Per-event metric storage.
//!
//! Every metric name maps to two independent values: the direct value for the
//! event itself and an aggregate value for the span leading up to it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Direct and aggregate value stored under one metric name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub value: f64,
    #[serde(default)]
    pub aggregate: f64,
}

impl MetricValue {
    pub fn new(value: f64, aggregate: f64) -> Self {
        Self { value, aggregate }
    }

    /// Pick the value from the requested namespace.
    pub fn get(&self, aggregate: bool) -> f64 {
        if aggregate {
            self.aggregate
        } else {
            self.value
        }
    }
}

/// Key/value metric store owned by an event, caller or partition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsContainer {
    metrics: BTreeMap<String, MetricValue>,
}

impl MetricsContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite both values of `name`.
    pub fn add_metric(&mut self, name: &str, value: f64, aggregate: f64) {
        self.metrics
            .insert(name.to_string(), MetricValue::new(value, aggregate));
    }

    pub fn has_metric(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Value of `name` in the requested namespace, or 0 if it is not stored.
    pub fn get_metric(&self, name: &str, aggregate: bool) -> f64 {
        self.metrics.get(name).map_or(0.0, |m| m.get(aggregate))
    }

    pub fn get(&self, name: &str) -> Option<MetricValue> {
        self.metrics.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl FromIterator<(String, MetricValue)> for MetricsContainer {
    fn from_iter<I: IntoIterator<Item = (String, MetricValue)>>(iter: I) -> Self {
        Self {
            metrics: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_metric_is_zero() {
        let metrics = MetricsContainer::new();
        assert!(!metrics.has_metric("Lateness"));
        assert_eq!(metrics.get_metric("Lateness", false), 0.0);
        assert_eq!(metrics.get_metric("Lateness", true), 0.0);
    }

    #[test]
    fn test_aggregate_values_are_independent() {
        let mut metrics = MetricsContainer::new();
        metrics.add_metric("Lateness", 12.0, 7.5);
        assert_eq!(metrics.get_metric("Lateness", false), 12.0);
        assert_eq!(metrics.get_metric("Lateness", true), 7.5);

        // Overwriting replaces both slots
        metrics.add_metric("Lateness", 3.0, 0.0);
        assert_eq!(metrics.get_metric("Lateness", false), 3.0);
        assert_eq!(metrics.get_metric("Lateness", true), 0.0);
        assert_eq!(metrics.len(), 1);
    }

    #[test]
    fn test_names_are_sorted() {
        let metrics: MetricsContainer = [
            ("b".to_string(), MetricValue::new(1.0, 0.0)),
            ("a".to_string(), MetricValue::new(2.0, 0.0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(metrics.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
