//! Coalescing of logical steps for display.
//!
//! A coalesced event keeps its timestamps and metrics but loses its step
//! (set to a negative value); the surviving event's display extent grows to
//! cover it. Ordering and durations never read the display extent.

use tracing::debug;

use crate::trace::{EventId, EventKind, Trace, UNASSIGNED};

/// Merge `merged` into `keep`.
pub fn coalesce(trace: &mut Trace, keep: EventId, merged: &[EventId]) {
    for &id in merged {
        let (begin, end) = (trace[id].extent_begin, trace[id].extent_end);
        let kept = &mut trace[keep];
        kept.extent_begin = kept.extent_begin.min(begin);
        kept.extent_end = kept.extent_end.max(end);
        trace[id].step = UNASSIGNED;
    }
}

/// Merge every run of consecutive non-blocking sends on a PE into the run's
/// first event. Returns the number of events coalesced away.
pub fn coalesce_isends(trace: &mut Trace) -> usize {
    let mut runs: Vec<Vec<EventId>> = Vec::new();
    for head in trace.pe_heads().into_values() {
        let sequence: Vec<EventId> = trace.pe_sequence(head).collect();
        let is_isend = |id: &EventId| trace[*id].kind == EventKind::Isend;
        runs.extend(
            sequence
                .chunk_by(|a, b| is_isend(a) && is_isend(b))
                .filter(|run| run.len() > 1)
                .map(<[EventId]>::to_vec),
        );
    }

    let mut coalesced = 0;
    for run in runs {
        coalesce(trace, run[0], &run[1..]);
        coalesced += run.len() - 1;
    }
    debug!(coalesced, "coalesced non-blocking sends");
    coalesced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{linked, record};

    #[test]
    fn test_coalesce_extends_extent() {
        let mut trace = linked(vec![
            record(10, 0, EventKind::Isend, -1),
            record(20, 0, EventKind::Isend, -1),
        ]);
        trace[EventId(0)].step = 0;
        trace[EventId(1)].step = 1;

        coalesce(&mut trace, EventId(0), &[EventId(1)]);
        let kept = &trace[EventId(0)];
        assert_eq!((kept.extent_begin, kept.extent_end), (10, 25));
        assert_eq!(kept.step, 0);
        assert!(trace[EventId(1)].is_coalesced());

        // Logical timestamps are untouched
        assert_eq!(kept.exit, 15);
        assert_eq!(trace[EventId(1)].enter(), 20);
    }

    #[test]
    fn test_coalesce_isend_runs() {
        let mut trace = linked(vec![
            record(10, 0, EventKind::Isend, -1),
            record(20, 0, EventKind::Isend, -1),
            record(30, 0, EventKind::Isend, -1),
            record(40, 0, EventKind::Send, -1),
            record(50, 0, EventKind::Isend, -1),
            record(10, 1, EventKind::Isend, -1),
            record(20, 1, EventKind::Recv, -1),
            record(30, 1, EventKind::Isend, -1),
        ]);
        for id in trace.event_ids().collect::<Vec<_>>() {
            trace[id].step = id.0 as i32;
        }

        assert_eq!(coalesce_isends(&mut trace), 2);
        let coalesced: Vec<usize> = trace
            .events()
            .filter(|(_, e)| e.is_coalesced())
            .map(|(id, _)| id.0)
            .collect();
        assert_eq!(coalesced, vec![1, 2]);
        assert_eq!(trace[EventId(0)].extent_end, 35);
    }
}
