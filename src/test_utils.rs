//! Shared helpers for unit tests.

use crate::trace::{build_trace, EventKind, EventRecord, Trace, TraceFile};

/// An input event lasting 5 time units; a negative `matching` means unmatched.
pub fn record(enter: u64, pe: u32, kind: EventKind, matching: i64) -> EventRecord {
    EventRecord {
        enter,
        exit: enter + 5,
        function: 1,
        entity: pe,
        pe,
        phase: 0,
        kind,
        matching: (matching >= 0).then_some(matching),
        communicator: None,
        atomic: None,
        caller: None,
        partition: None,
        metrics: Default::default(),
    }
}

/// Link a trace made only of `events`.
pub fn linked(events: Vec<EventRecord>) -> Trace {
    build_trace(&TraceFile {
        events,
        ..Default::default()
    })
    .expect("test trace must link")
}

/// Two PEs exchanging one message, then a collective across both.
///
/// ```text
/// PE 0: send(0) ------------------- coll(3)
/// PE 1:          recv(1)  send(2)   coll(4)
/// ```
pub fn exchange_trace() -> Trace {
    linked(vec![
        record(10, 0, EventKind::Send, 1),
        record(20, 1, EventKind::Recv, 1),
        record(30, 1, EventKind::Send, -1),
        record(60, 0, EventKind::Collective, 5),
        record(50, 1, EventKind::Collective, 5),
    ])
}
