//! Derived metrics: aggregate duration, lateness and differential metrics.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::trace::{EventId, Trace, LATENESS_METRIC};

/// Counts of values the differential computation clamped to zero.
///
/// A clamp means the base metric came out below its enclosing scope. That is
/// either timing noise or a bad base metric upstream; the counters keep the
/// loss visible instead of silently absorbing it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricDiagnostics {
    /// Direct values clamped to zero.
    pub clamped: usize,
    /// Aggregate values clamped to zero.
    pub clamped_aggregate: usize,
}

impl MetricDiagnostics {
    pub fn total(&self) -> usize {
        self.clamped + self.clamped_aggregate
    }
}

fn clamp_to_zero(value: f64, counter: &mut usize) -> f64 {
    if value < 0.0 {
        *counter += 1;
        0.0
    } else {
        value
    }
}

impl Trace {
    /// Gap between the previous comm-order event's exit and this event's enter.
    ///
    /// The first event of a sequence reports 0: the trace start is not
    /// observable, so any gap before it would be misleading.
    pub fn agg_duration(&self, id: EventId) -> u64 {
        match self.comm_prev(id) {
            Some(prev) => self.event(id).enter().saturating_sub(self.event(prev).exit),
            None => 0,
        }
    }

    /// Store under `derived` the part of `base` attributable to this event
    /// alone, clamped at zero.
    ///
    /// The enclosing value is the event's own aggregate value of `base`. With
    /// `aggregates`, the aggregate slot gets the aggregate value of `base`
    /// minus the aggregate value stored on the previous comm-order event.
    pub fn calculate_differential_metric(
        &mut self,
        id: EventId,
        derived: &str,
        base: &str,
        aggregates: bool,
    ) {
        let max_parent = self.event(id).metrics.get_metric(base, true);
        let raw = self.get_metric(id, base, false) - max_parent;
        let value = clamp_to_zero(raw, &mut self.diagnostics.clamped);

        let aggregate = if aggregates {
            let max_agg_parent = self
                .comm_prev(id)
                .map_or(0.0, |prev| self.event(prev).metrics.get_metric(base, true));
            let raw_agg = self.get_metric(id, base, true) - max_agg_parent;
            if raw_agg < 0.0 {
                debug!(event = %id, derived, base, raw_agg, "clamped aggregate differential metric");
            }
            clamp_to_zero(raw_agg, &mut self.diagnostics.clamped_aggregate)
        } else {
            0.0
        };

        if raw < 0.0 {
            debug!(event = %id, derived, base, raw, "clamped differential metric");
        }
        self.event_mut(id).metrics.add_metric(derived, value, aggregate);
    }

    /// Run [`calculate_differential_metric`](Self::calculate_differential_metric)
    /// over every event.
    pub fn calculate_differential_metrics(
        &mut self,
        derived: &str,
        base: &str,
        aggregates: bool,
    ) {
        let ids: Vec<EventId> = self.event_ids().collect();
        for id in ids {
            self.calculate_differential_metric(id, derived, base, aggregates);
        }
    }

    /// Compute `Lateness` for every event with an assigned step.
    ///
    /// The direct value is how far the event exits behind the earliest exit
    /// of its step. The aggregate value is how far it enters behind the
    /// earliest enter of its step, covering the time spent getting there.
    pub fn calculate_lateness(&mut self) -> usize {
        let mut earliest: BTreeMap<i32, (u64, u64)> = BTreeMap::new();
        for (_, event) in self.events() {
            if event.step < 0 {
                continue;
            }
            earliest
                .entry(event.step)
                .and_modify(|(exit, enter)| {
                    *exit = (*exit).min(event.exit);
                    *enter = (*enter).min(event.enter());
                })
                .or_insert((event.exit, event.enter()));
        }

        let ids: Vec<EventId> = self.event_ids().collect();
        let mut updated = 0;
        for id in ids {
            let event = self.event(id);
            let Some((min_exit, min_enter)) = earliest.get(&event.step).copied() else {
                continue;
            };
            let lateness = (event.exit - min_exit) as f64;
            let agg_lateness = (event.enter() - min_enter) as f64;
            self.event_mut(id)
                .metrics
                .add_metric(LATENESS_METRIC, lateness, agg_lateness);
            updated += 1;
        }

        info!(steps = earliest.len(), events = updated, "computed lateness");
        updated
    }

    pub fn metric_diagnostics(&self) -> MetricDiagnostics {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{CommEvent, Event, EventKind, Relation};

    fn event(trace: &mut Trace, enter: u64, exit: u64) -> EventId {
        trace.add_event(CommEvent::new(enter, exit, 1, 0, 0, 0, EventKind::Send))
    }

    #[test]
    fn test_agg_duration_without_predecessor_is_zero() {
        let mut trace = Trace::new();
        let id = event(&mut trace, 150, 200);
        assert_eq!(trace.agg_duration(id), 0);
    }

    #[test]
    fn test_agg_duration_uses_comm_prev_exit() {
        let mut trace = Trace::new();
        let prev = event(&mut trace, 50, 100);
        let id = event(&mut trace, 150, 200);
        trace.link(Relation::Comm, prev, id);
        assert_eq!(trace.agg_duration(id), 50);
        assert_eq!(trace.agg_duration(prev), 0);
    }

    #[test]
    fn test_agg_duration_ignores_display_extent() {
        let mut trace = Trace::new();
        let prev = event(&mut trace, 50, 100);
        let id = event(&mut trace, 150, 200);
        trace.link(Relation::Comm, prev, id);
        trace.event_mut(prev).extent_end = 140;
        trace.event_mut(id).extent_begin = 0;
        assert_eq!(trace.agg_duration(id), 50);
    }

    #[test]
    fn test_differential_normal_case() {
        let mut trace = Trace::new();
        let id = event(&mut trace, 10, 20);
        trace.event_mut(id).metrics.add_metric("Lateness", 120.0, 80.0);

        trace.calculate_differential_metric(id, "D.Lateness", "Lateness", false);
        let metrics = &trace.event(id).metrics;
        assert_eq!(metrics.get_metric("D.Lateness", false), 40.0);
        assert_eq!(metrics.get_metric("D.Lateness", true), 0.0);
        assert_eq!(trace.metric_diagnostics().total(), 0);
    }

    #[test]
    fn test_differential_clamps_negative_to_zero() {
        let mut trace = Trace::new();
        let id = event(&mut trace, 10, 20);
        trace.event_mut(id).metrics.add_metric("Lateness", 30.0, 80.0);

        trace.calculate_differential_metric(id, "D.Lateness", "Lateness", false);
        assert_eq!(
            trace.event(id).metrics.get_metric("D.Lateness", false),
            0.0
        );
        assert_eq!(trace.metric_diagnostics().clamped, 1);
    }

    #[test]
    fn test_differential_with_aggregates() {
        let mut trace = Trace::new();
        let prev = event(&mut trace, 0, 5);
        let id = event(&mut trace, 10, 20);
        trace.link(Relation::Comm, prev, id);
        trace.event_mut(prev).metrics.add_metric("Lateness", 0.0, 25.0);
        trace.event_mut(id).metrics.add_metric("Lateness", 120.0, 80.0);

        trace.calculate_differential_metric(id, "D.Lateness", "Lateness", true);
        let metrics = &trace.event(id).metrics;
        assert_eq!(metrics.get_metric("D.Lateness", false), 40.0);
        assert_eq!(metrics.get_metric("D.Lateness", true), 55.0);

        // First event: no predecessor, aggregate uses 0 as the parent
        trace.calculate_differential_metric(prev, "D.Lateness", "Lateness", true);
        let metrics = &trace.event(prev).metrics;
        assert_eq!(metrics.get_metric("D.Lateness", false), 0.0);
        assert_eq!(metrics.get_metric("D.Lateness", true), 25.0);
        assert_eq!(trace.metric_diagnostics().clamped, 1);
    }

    #[test]
    fn test_differential_reads_base_through_fallback() {
        let mut trace = Trace::new();
        let id = event(&mut trace, 10, 20);
        let caller = trace.add_caller(Event::new(0, 100, 2, 0, 0));
        trace.caller_mut(caller).metrics.add_metric("Work", 70.0, 0.0);
        trace.set_caller(id, caller);

        // Own container lacks the base, so the enclosing value is 0
        trace.calculate_differential_metric(id, "D.Work", "Work", false);
        assert_eq!(trace.event(id).metrics.get_metric("D.Work", false), 70.0);
    }

    #[test]
    fn test_lateness_per_step() {
        let mut trace = Trace::new();
        let a = event(&mut trace, 100, 150);
        let b = event(&mut trace, 110, 190);
        let c = event(&mut trace, 300, 310);
        let coalesced = event(&mut trace, 90, 100);
        trace.event_mut(a).step = 2;
        trace.event_mut(b).step = 2;
        trace.event_mut(c).step = 4;

        assert_eq!(trace.calculate_lateness(), 3);
        let late = |id| trace.event(id).metrics.get("Lateness");
        assert_eq!(late(a).map(|m| (m.value, m.aggregate)), Some((0.0, 0.0)));
        assert_eq!(late(b).map(|m| (m.value, m.aggregate)), Some((40.0, 10.0)));
        assert_eq!(late(c).map(|m| (m.value, m.aggregate)), Some((0.0, 0.0)));
        assert!(late(coalesced).is_none());
    }
}
