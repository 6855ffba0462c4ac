//! Partitions: externally assigned groups of events.

use super::event::EventId;
use crate::metrics::MetricsContainer;

/// A logical unit of work.
///
/// Membership comes from the input; the analysis only reads the
/// partition-level metrics as the last fallback when resolving a metric.
#[derive(Clone, Debug, Default)]
pub struct Partition {
    pub metrics: MetricsContainer,
    events: Vec<EventId>,
}

impl Partition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(metrics: MetricsContainer) -> Self {
        Self {
            metrics,
            events: Vec::new(),
        }
    }

    pub(crate) fn add_event(&mut self, id: EventId) {
        self.events.push(id);
    }

    pub fn events(&self) -> &[EventId] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
