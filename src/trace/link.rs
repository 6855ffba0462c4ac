//! Linking pass: turns input records into an arena with its relations set up.
//!
//! After this pass every event has its `add_order`, its pe and comm
//! neighbours, its matched send or receive through the true relation, and
//! its caller and partition references.

use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Result};
use tracing::{debug, warn};

use super::arena::Trace;
use super::constants::DEFAULT_COMMUNICATOR;
use super::event::{CallerId, CommEvent, Event, EventId, EventKind, PartitionId, Relation};
use super::models::{metrics_from_records, TraceFile};
use super::partition::Partition;

/// Build a linked [`Trace`] from an input document.
pub fn build_trace(file: &TraceFile) -> Result<Trace> {
    let mut trace = Trace::new();

    for record in &file.partitions {
        trace.add_partition(Partition::with_metrics(metrics_from_records(
            &record.metrics,
        )));
    }

    for record in &file.callers {
        let mut caller = Event::new(
            record.enter,
            record.exit,
            record.function,
            record.entity,
            record.pe,
        );
        caller.metrics = metrics_from_records(&record.metrics);
        trace.add_caller(caller);
    }

    let mut add_orders: HashMap<u64, u64> = HashMap::new();
    for (index, record) in file.events.iter().enumerate() {
        let add_order = add_orders.entry(record.enter).or_insert(0);
        let mut event = CommEvent::new(
            record.enter,
            record.exit,
            record.function,
            record.entity,
            record.pe,
            record.phase,
            record.kind,
        )
        .with_add_order(*add_order);
        *add_order += 1;

        event.communicator = record.communicator.unwrap_or(DEFAULT_COMMUNICATOR);
        event.matching = record.matching.unwrap_or(-1);
        event.atomic = record.atomic.unwrap_or(-1);
        event.metrics = metrics_from_records(&record.metrics);
        let id = trace.add_event(event);

        if let Some(caller) = record.caller {
            if caller >= trace.caller_count() {
                bail!(
                    "Event {index} references caller {caller}, but only {} callers exist",
                    trace.caller_count()
                );
            }
            trace.set_caller(id, CallerId(caller));
        }
        if let Some(partition) = record.partition {
            if partition >= trace.partition_count() {
                bail!(
                    "Event {index} references partition {partition}, but only {} partitions exist",
                    trace.partition_count()
                );
            }
            trace.assign_partition(id, PartitionId(partition));
        }
    }

    link_pe_order(&mut trace);
    link_comm_order(&mut trace);
    link_true_order(&mut trace);

    debug!(
        events = trace.len(),
        callers = trace.caller_count(),
        partitions = trace.partition_count(),
        "linked trace"
    );
    Ok(trace)
}

fn link_sorted_groups<K: Ord>(
    trace: &mut Trace,
    relation: Relation,
    groups: BTreeMap<K, Vec<EventId>>,
) {
    for (_, mut ids) in groups {
        ids.sort_by(|a, b| trace[*a].cmp(&trace[*b]));
        for pair in ids.windows(2) {
            trace.link(relation, pair[0], pair[1]);
        }
    }
}

fn link_pe_order(trace: &mut Trace) {
    let mut groups: BTreeMap<u32, Vec<EventId>> = BTreeMap::new();
    for (id, event) in trace.events() {
        groups.entry(event.pe).or_default().push(id);
    }
    link_sorted_groups(trace, Relation::Pe, groups);
}

fn link_comm_order(trace: &mut Trace) {
    let mut groups: BTreeMap<(u32, u32), Vec<EventId>> = BTreeMap::new();
    for (id, event) in trace.events() {
        groups
            .entry((event.pe, event.communicator))
            .or_default()
            .push(id);
    }
    link_sorted_groups(trace, Relation::Comm, groups);
}

/// Pair sends with receives sharing a message id, in timestamp order.
fn link_true_order(trace: &mut Trace) {
    let mut sends: BTreeMap<i64, Vec<EventId>> = BTreeMap::new();
    let mut recvs: BTreeMap<i64, Vec<EventId>> = BTreeMap::new();
    for (id, event) in trace.events() {
        if event.matching < 0 {
            continue;
        }
        match event.kind {
            EventKind::Send | EventKind::Isend => {
                sends.entry(event.matching).or_default().push(id)
            }
            EventKind::Recv => recvs.entry(event.matching).or_default().push(id),
            EventKind::Collective => {}
        }
    }

    for (matching, mut senders) in sends {
        let Some(mut receivers) = recvs.remove(&matching) else {
            debug!(matching, "send has no matching receive");
            continue;
        };
        senders.sort_by(|a, b| trace[*a].cmp(&trace[*b]));
        receivers.sort_by(|a, b| trace[*a].cmp(&trace[*b]));
        if senders.len() != receivers.len() {
            warn!(
                matching,
                sends = senders.len(),
                recvs = receivers.len(),
                "unbalanced message id, pairing in timestamp order"
            );
        }
        for (send, recv) in senders.into_iter().zip(receivers) {
            trace.link(Relation::True, send, recv);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::record;
    use crate::trace::models::{CallerRecord, PartitionRecord};

    #[test]
    fn test_links_pe_and_true_order() {
        let file = TraceFile {
            events: vec![
                record(30, 0, EventKind::Send, 2),
                record(10, 0, EventKind::Send, 1),
                record(20, 1, EventKind::Recv, 1),
                record(40, 1, EventKind::Recv, 2),
            ],
            ..Default::default()
        };
        let trace = build_trace(&file).unwrap();

        // PE 0 is ordered by enter, not by input position
        assert_eq!(trace.pe_next(EventId(1)), Some(EventId(0)));
        assert_eq!(trace.pe_prev(EventId(0)), Some(EventId(1)));
        assert_eq!(trace.pe_next(EventId(2)), Some(EventId(3)));
        assert_eq!(trace.pe_next(EventId(0)), None);

        // Comm order matches pe order on the default communicator
        assert_eq!(trace.comm_prev(EventId(0)), Some(EventId(1)));

        assert_eq!(trace.true_next(EventId(1)), Some(EventId(2)));
        assert_eq!(trace.true_prev(EventId(3)), Some(EventId(0)));
    }

    #[test]
    fn test_add_order_counts_shared_enter() {
        let file = TraceFile {
            events: vec![
                record(10, 0, EventKind::Send, -1),
                record(10, 1, EventKind::Send, -1),
                record(11, 1, EventKind::Send, -1),
                record(10, 2, EventKind::Send, -1),
            ],
            ..Default::default()
        };
        let trace = build_trace(&file).unwrap();
        let orders: Vec<u64> = trace.events().map(|(_, e)| e.add_order()).collect();
        assert_eq!(orders, vec![0, 1, 0, 2]);
    }

    #[test]
    fn test_separate_communicators_have_separate_comm_order() {
        let mut a = record(10, 0, EventKind::Send, -1);
        a.communicator = Some(1);
        let b = record(20, 0, EventKind::Send, -1);
        let mut c = record(30, 0, EventKind::Send, -1);
        c.communicator = Some(1);
        let file = TraceFile {
            events: vec![a, b, c],
            ..Default::default()
        };
        let trace = build_trace(&file).unwrap();
        assert_eq!(trace.comm_next(EventId(0)), Some(EventId(2)));
        assert_eq!(trace.comm_prev(EventId(1)), None);
        assert_eq!(trace.pe_next(EventId(0)), Some(EventId(1)));
    }

    #[test]
    fn test_caller_and_partition_references() {
        let mut event = record(10, 0, EventKind::Send, -1);
        event.caller = Some(0);
        event.partition = Some(0);
        let file = TraceFile {
            partitions: vec![PartitionRecord::default()],
            callers: vec![CallerRecord {
                enter: 5,
                exit: 50,
                function: 9,
                entity: 0,
                pe: 0,
                metrics: Default::default(),
            }],
            events: vec![event],
        };
        let trace = build_trace(&file).unwrap();
        assert_eq!(trace.event(EventId(0)).caller, Some(CallerId(0)));
        assert_eq!(trace.partition(PartitionId(0)).events(), &[EventId(0)]);
    }

    #[test]
    fn test_dangling_partition_is_an_error() {
        let mut event = record(10, 0, EventKind::Send, -1);
        event.partition = Some(3);
        let file = TraceFile {
            events: vec![event],
            ..Default::default()
        };
        let err = build_trace(&file).unwrap_err();
        assert!(err.to_string().contains("partition 3"));
    }
}
