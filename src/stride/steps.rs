//! Stride and step assignment over the stride DAG.
//!
//! A stride is the longest-path depth of a stride event in the DAG. Steps are
//! the logical time coordinates shown to the user: all stride events on one
//! stride share a step, and receives get their own steps in between, after
//! both their sender and the previous event on their PE.

use std::collections::BTreeMap;

use tracing::debug;

use crate::trace::{EventId, Trace, UNASSIGNED};

/// Assign every stride (non-receive) event its stride. Receives keep
/// [`UNASSIGNED`]. Returns the largest stride, or [`UNASSIGNED`] if there are
/// no stride events.
pub fn assign_strides(trace: &mut Trace) -> i32 {
    let order = trace.stride_topological_order();
    debug_assert_eq!(order.len(), trace.len(), "stride DAG contains a cycle");

    for id in trace.event_ids().collect::<Vec<_>>() {
        trace[id].stride = UNASSIGNED;
    }

    let mut max_stride = UNASSIGNED;
    for id in order {
        if trace[id].is_receive() {
            continue;
        }
        let stride = trace[id]
            .stride_parents()
            .map(|parent| trace[parent].stride)
            .max()
            .map_or(0, |s| s + 1);
        trace[id].stride = stride;
        max_stride = max_stride.max(stride);
    }
    max_stride
}

/// Lowest step `id` may take: one past every already stepped predecessor.
fn step_floor(trace: &Trace, id: EventId) -> i32 {
    let event = &trace[id];
    let mut preds: Vec<EventId> = event.stride_parents().collect();
    preds.extend(trace.pe_prev(id));
    if event.is_receive() {
        preds.extend(event.last_stride);
        preds.extend(trace.true_prev(id));
    }
    preds
        .into_iter()
        .map(|pred| trace[pred].step + 1)
        .fold(0, i32::max)
}

fn set_step(trace: &mut Trace, id: EventId, step: i32) {
    let last_step = trace[id]
        .last_stride
        .map_or(UNASSIGNED, |last| trace[last].step);
    let event = &mut trace[id];
    event.step = step;
    event.last_step = last_step;
}

fn step_receives(trace: &mut Trace, mut recvs: Vec<EventId>) -> i32 {
    // Receives on one PE must be stepped in pe order
    recvs.sort_by(|a, b| trace[*a].cmp(&trace[*b]));
    let mut max_step = UNASSIGNED;
    for id in recvs {
        let step = step_floor(trace, id);
        set_step(trace, id, step);
        max_step = max_step.max(step);
    }
    max_step
}

/// Assign steps to every event with a stride and to every receive. Requires
/// [`assign_strides`] to have run. Returns the largest step.
pub fn assign_steps(trace: &mut Trace) -> i32 {
    let mut levels: BTreeMap<i32, Vec<EventId>> = BTreeMap::new();
    let mut recvs_by_level: BTreeMap<i32, Vec<EventId>> = BTreeMap::new();
    let mut trailing = Vec::new();

    for id in trace.event_ids().collect::<Vec<_>>() {
        trace[id].step = UNASSIGNED;
        trace[id].last_step = UNASSIGNED;

        let event = &trace[id];
        if event.is_receive() {
            let level = event
                .next_stride
                .map(|next| trace[next].stride)
                .filter(|stride| *stride >= 0);
            match level {
                Some(level) => recvs_by_level.entry(level).or_default().push(id),
                None => trailing.push(id),
            }
        } else if event.stride >= 0 {
            levels.entry(event.stride).or_default().push(id);
        }
    }

    let mut max_step = UNASSIGNED;
    for (level, members) in levels {
        if let Some(recvs) = recvs_by_level.remove(&level) {
            max_step = max_step.max(step_receives(trace, recvs));
        }

        let step = members
            .iter()
            .map(|member| step_floor(trace, *member))
            .max()
            .unwrap_or(0);
        for member in members {
            set_step(trace, member, step);
        }
        debug!(stride = level, step, "stepped stride");
        max_step = max_step.max(step);
    }

    trailing.extend(recvs_by_level.into_values().flatten());
    max_step.max(step_receives(trace, trailing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stride::build_stride_dag;
    use crate::test_utils::{exchange_trace, linked, record};
    use crate::trace::EventKind;

    fn stepped(mut trace: Trace) -> Trace {
        build_stride_dag(&mut trace);
        assign_strides(&mut trace);
        assign_steps(&mut trace);
        trace
    }

    fn steps(trace: &Trace) -> Vec<i32> {
        trace.events().map(|(_, e)| e.step).collect()
    }

    #[test]
    fn test_strides_follow_longest_path() {
        let mut trace = exchange_trace();
        build_stride_dag(&mut trace);
        assert_eq!(assign_strides(&mut trace), 2);

        let strides: Vec<i32> = trace.events().map(|(_, e)| e.stride).collect();
        // send(0)=0, recv(1) none, send(2)=1, collectives share stride 2
        assert_eq!(strides, vec![0, UNASSIGNED, 1, 2, 2]);
    }

    #[test]
    fn test_exchange_steps() {
        let trace = stepped(exchange_trace());
        // send 0, recv after send 1, send after recv 2, collectives 3
        assert_eq!(steps(&trace), vec![0, 1, 2, 3, 3]);
        assert_eq!(trace[EventId(2)].last_step, UNASSIGNED);
        assert_eq!(trace[EventId(3)].last_step, 0);
        assert_eq!(trace[EventId(4)].last_step, 2);
    }

    #[test]
    fn test_independent_pes_share_steps() {
        let trace = stepped(linked(vec![
            record(10, 0, EventKind::Send, -1),
            record(500, 1, EventKind::Send, -1),
            record(20, 0, EventKind::Send, -1),
        ]));
        assert_eq!(steps(&trace), vec![0, 0, 1]);
    }

    #[test]
    fn test_several_receives_before_one_send() {
        let trace = stepped(linked(vec![
            record(10, 0, EventKind::Send, 1),
            record(12, 1, EventKind::Send, 2),
            record(20, 2, EventKind::Recv, 1),
            record(25, 2, EventKind::Recv, 2),
            record(30, 2, EventKind::Send, -1),
        ]));
        assert_eq!(steps(&trace), vec![0, 0, 1, 2, 3]);
    }

    #[test]
    fn test_trailing_receive() {
        let trace = stepped(linked(vec![
            record(10, 0, EventKind::Send, 1),
            record(15, 1, EventKind::Send, -1),
            record(20, 1, EventKind::Recv, 1),
        ]));
        assert_eq!(steps(&trace), vec![0, 0, 1]);
        assert_eq!(trace[EventId(2)].next_stride, None);
        assert_eq!(trace[EventId(2)].last_step, 0);
    }

    #[test]
    fn test_steps_increase_along_every_pe() {
        let trace = stepped(linked(vec![
            record(10, 0, EventKind::Send, 1),
            record(11, 0, EventKind::Recv, 2),
            record(12, 0, EventKind::Send, 3),
            record(13, 1, EventKind::Recv, 1),
            record(14, 1, EventKind::Send, 2),
            record(15, 1, EventKind::Recv, 3),
            record(16, 1, EventKind::Collective, 8),
            record(17, 0, EventKind::Collective, 8),
        ]));
        for head in trace.pe_heads().into_values() {
            let seq: Vec<i32> = trace.pe_sequence(head).map(|id| trace[id].step).collect();
            assert!(seq.windows(2).all(|w| w[0] < w[1]), "{seq:?}");
        }
        // Every receive comes after its sender
        for (id, event) in trace.events() {
            if let Some(send) = trace.true_prev(id) {
                assert!(trace[send].step < event.step);
            }
        }
    }
}
