//! Metric lookup through the fallback chain.
//!
//! A metric asked of an event is answered by the first provider that stores
//! it, in this order: the event itself, its caller, its partition. Absent
//! providers are skipped. A name nobody stores resolves to zero.

use std::fmt;

use super::container::MetricsContainer;
use crate::trace::{EventId, Trace};

/// Which provider answered a metric lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricSource {
    Own,
    Caller,
    Partition,
}

impl fmt::Display for MetricSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricSource::Own => "own",
            MetricSource::Caller => "caller",
            MetricSource::Partition => "partition",
        };
        f.write_str(name)
    }
}

impl Trace {
    /// Metric providers of `id`, in lookup order.
    pub fn metric_sources(
        &self,
        id: EventId,
    ) -> impl Iterator<Item = (MetricSource, &MetricsContainer)> {
        let event = self.event(id);
        let caller = event.caller.map(|c| &self.caller(c).metrics);
        let partition = event.partition.map(|p| &self.partition(p).metrics);

        std::iter::once((MetricSource::Own, &event.metrics))
            .chain(caller.map(|m| (MetricSource::Caller, m)))
            .chain(partition.map(|m| (MetricSource::Partition, m)))
    }

    /// Provider that would answer a lookup of `name` for `id`.
    pub fn metric_source(&self, id: EventId, name: &str) -> Option<MetricSource> {
        self.metric_sources(id)
            .find(|(_, metrics)| metrics.has_metric(name))
            .map(|(source, _)| source)
    }

    pub fn has_metric(&self, id: EventId, name: &str) -> bool {
        self.metric_source(id, name).is_some()
    }

    /// Resolve `name` for `id` in the direct or aggregate namespace.
    pub fn get_metric(&self, id: EventId, name: &str, aggregate: bool) -> f64 {
        self.metric_sources(id)
            .find(|(_, metrics)| metrics.has_metric(name))
            .map_or(0.0, |(_, metrics)| metrics.get_metric(name, aggregate))
    }
}
