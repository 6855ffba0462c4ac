//! Construction of the stride DAG.
//!
//! Stride events are the non-receive communication events. Walking each PE in
//! pe order, a stride event depends on the previous stride event of its PE
//! and on the senders of every receive that happened on its PE since then.
//! Members of one collective operation additionally share their parents so
//! they end up on the same stride.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::trace::{EventId, EventKind, Trace};

/// Rebuild the stride DAG and the `last_stride`/`next_stride`/`last_recvs`
/// bookkeeping from the pe and true relations. Returns the number of edges.
pub fn build_stride_dag(trace: &mut Trace) -> usize {
    trace.clear_stride_dag();

    for head in trace.pe_heads().into_values() {
        let sequence: Vec<EventId> = trace.pe_sequence(head).collect();
        let mut last_stride: Option<EventId> = None;
        let mut pending_recvs: Vec<EventId> = Vec::new();

        for id in sequence {
            trace[id].last_stride = last_stride;
            if trace[id].is_receive() {
                pending_recvs.push(id);
                continue;
            }

            if let Some(prev) = last_stride {
                trace.add_stride_edge(prev, id);
                trace[prev].next_stride = Some(id);
            }
            for &recv in &pending_recvs {
                trace[recv].next_stride = Some(id);
                if let Some(send) = trace.true_prev(recv).filter(|send| *send != id) {
                    trace.add_stride_edge(send, id);
                }
            }
            trace[id].last_recvs = std::mem::take(&mut pending_recvs);
            last_stride = Some(id);
        }
    }

    link_collectives(trace);

    let edges = trace.stride_edge_count();
    debug!(edges, "built stride DAG");
    edges
}

/// Every event reachable from `roots` over stride edges, roots included.
fn descendants(trace: &Trace, roots: &BTreeSet<EventId>) -> BTreeSet<EventId> {
    let mut seen = roots.clone();
    let mut stack: Vec<EventId> = roots.iter().copied().collect();
    while let Some(id) = stack.pop() {
        for child in trace[id].stride_children() {
            if seen.insert(child) {
                stack.push(child);
            }
        }
    }
    seen
}

/// Give every member of a collective operation the union of the group's parents.
///
/// A parent that some member already reaches (e.g. a send issued after the
/// collective on the member's own PE) is left out, since linking it to the
/// other members would close a cycle.
fn link_collectives(trace: &mut Trace) {
    let mut groups: BTreeMap<i64, Vec<EventId>> = BTreeMap::new();
    for (id, event) in trace.events() {
        if event.kind == EventKind::Collective && event.matching >= 0 {
            groups.entry(event.matching).or_default().push(id);
        }
    }

    for (matching, members) in groups.into_iter().filter(|(_, m)| m.len() > 1) {
        let member_set: BTreeSet<EventId> = members.iter().copied().collect();
        let downstream = descendants(trace, &member_set);
        let (parents, skipped): (BTreeSet<EventId>, BTreeSet<EventId>) = members
            .iter()
            .flat_map(|m| trace[*m].stride_parents())
            .filter(|p| !member_set.contains(p))
            .partition(|p| !downstream.contains(p));
        if !skipped.is_empty() {
            debug!(
                matching,
                skipped = skipped.len(),
                "collective parents reachable from the group"
            );
        }
        for &member in &members {
            for &parent in &parents {
                trace.add_stride_edge(parent, member);
            }
        }
    }
}
