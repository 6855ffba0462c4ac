//! Arena holding every event of a trace.
//!
//! Events refer to each other through [`EventId`] indices rather than
//! references. All relation links and stride DAG edges are changed through the
//! methods here so both ends of an edge always agree.

use std::collections::{BTreeMap, VecDeque};
use std::ops::{Index, IndexMut};

use super::event::{CallerId, CommEvent, Event, EventId, PartitionId, Relation};
use super::partition::Partition;
use crate::metrics::MetricDiagnostics;

#[derive(Debug, Default)]
pub struct Trace {
    events: Vec<CommEvent>,
    callers: Vec<Event>,
    partitions: Vec<Partition>,
    pub(crate) diagnostics: MetricDiagnostics,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&mut self, event: CommEvent) -> EventId {
        self.events.push(event);
        EventId(self.events.len() - 1)
    }

    pub fn add_caller(&mut self, caller: Event) -> CallerId {
        self.callers.push(caller);
        CallerId(self.callers.len() - 1)
    }

    pub fn add_partition(&mut self, partition: Partition) -> PartitionId {
        self.partitions.push(partition);
        PartitionId(self.partitions.len() - 1)
    }

    /// Make `partition` the owning partition of `id`.
    pub fn assign_partition(&mut self, id: EventId, partition: PartitionId) {
        self.events[id.0].partition = Some(partition);
        self.partitions[partition.0].add_event(id);
    }

    pub fn set_caller(&mut self, id: EventId, caller: CallerId) {
        self.events[id.0].caller = Some(caller);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn event(&self, id: EventId) -> &CommEvent {
        &self.events[id.0]
    }

    pub fn event_mut(&mut self, id: EventId) -> &mut CommEvent {
        &mut self.events[id.0]
    }

    pub fn caller(&self, id: CallerId) -> &Event {
        &self.callers[id.0]
    }

    pub fn caller_mut(&mut self, id: CallerId) -> &mut Event {
        &mut self.callers[id.0]
    }

    pub fn partition(&self, id: PartitionId) -> &Partition {
        &self.partitions[id.0]
    }

    pub fn partition_mut(&mut self, id: PartitionId) -> &mut Partition {
        &mut self.partitions[id.0]
    }

    pub fn event_ids(&self) -> impl Iterator<Item = EventId> {
        (0..self.events.len()).map(EventId)
    }

    pub fn events(&self) -> impl Iterator<Item = (EventId, &CommEvent)> {
        self.events.iter().enumerate().map(|(i, e)| (EventId(i), e))
    }

    pub fn partitions(&self) -> impl Iterator<Item = (PartitionId, &Partition)> {
        self.partitions
            .iter()
            .enumerate()
            .map(|(i, p)| (PartitionId(i), p))
    }

    pub fn caller_count(&self) -> usize {
        self.callers.len()
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    // Relations

    /// Link `from -> to` in `relation`.
    ///
    /// Any previous neighbours of the two events in that relation are
    /// detached first, so the prev/next pairs stay mutually consistent.
    pub fn link(&mut self, relation: Relation, from: EventId, to: EventId) {
        let r = relation.index();
        if let Some(old) = self.events[from.0].links[r].next {
            self.events[old.0].links[r].prev = None;
        }
        if let Some(old) = self.events[to.0].links[r].prev {
            self.events[old.0].links[r].next = None;
        }
        self.events[from.0].links[r].next = Some(to);
        self.events[to.0].links[r].prev = Some(from);
    }

    pub fn prev(&self, id: EventId, relation: Relation) -> Option<EventId> {
        self.events[id.0].links[relation.index()].prev
    }

    pub fn next(&self, id: EventId, relation: Relation) -> Option<EventId> {
        self.events[id.0].links[relation.index()].next
    }

    pub fn comm_prev(&self, id: EventId) -> Option<EventId> {
        self.prev(id, Relation::Comm)
    }

    pub fn comm_next(&self, id: EventId) -> Option<EventId> {
        self.next(id, Relation::Comm)
    }

    pub fn true_prev(&self, id: EventId) -> Option<EventId> {
        self.prev(id, Relation::True)
    }

    pub fn true_next(&self, id: EventId) -> Option<EventId> {
        self.next(id, Relation::True)
    }

    pub fn pe_prev(&self, id: EventId) -> Option<EventId> {
        self.prev(id, Relation::Pe)
    }

    pub fn pe_next(&self, id: EventId) -> Option<EventId> {
        self.next(id, Relation::Pe)
    }

    /// First event of every PE's pe-order chain, keyed by PE.
    pub fn pe_heads(&self) -> BTreeMap<u32, EventId> {
        let mut heads = BTreeMap::new();
        for (id, event) in self.events() {
            if self.pe_prev(id).is_none() {
                heads
                    .entry(event.pe)
                    .and_modify(|head: &mut EventId| {
                        if event < self.event(*head) {
                            *head = id;
                        }
                    })
                    .or_insert(id);
            }
        }
        heads
    }

    /// Events of one PE in pe order, starting from `head`.
    pub fn pe_sequence(&self, head: EventId) -> PeSequence<'_> {
        PeSequence {
            trace: self,
            next: Some(head),
        }
    }

    // Stride DAG

    /// Record that `child` depends on `parent`. Returns false if the edge
    /// already existed.
    pub fn add_stride_edge(&mut self, parent: EventId, child: EventId) -> bool {
        let inserted = self.events[parent.0].stride_children.insert(child);
        self.events[child.0].stride_parents.insert(parent);
        inserted
    }

    /// Drop every stride edge and stride bookkeeping field.
    pub fn clear_stride_dag(&mut self) {
        for event in &mut self.events {
            event.stride_parents.clear();
            event.stride_children.clear();
            event.last_stride = None;
            event.next_stride = None;
            event.last_recvs.clear();
        }
    }

    pub fn stride_edge_count(&self) -> usize {
        self.events.iter().map(|e| e.stride_children.len()).sum()
    }

    /// Topological order of the stride DAG (Kahn's algorithm, ties broken by id).
    ///
    /// Events on a cycle are never reached, so a result shorter than
    /// [`len`](Self::len) means the DAG is not acyclic.
    pub fn stride_topological_order(&self) -> Vec<EventId> {
        let mut indegree: Vec<usize> = self
            .events
            .iter()
            .map(|e| e.stride_parents.len())
            .collect();
        let mut queue: VecDeque<EventId> = self
            .event_ids()
            .filter(|id| indegree[id.0] == 0)
            .collect();

        let mut order = Vec::with_capacity(self.events.len());
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for child in self.events[id.0].stride_children() {
                indegree[child.0] -= 1;
                if indegree[child.0] == 0 {
                    queue.push_back(child);
                }
            }
        }
        order
    }

    pub fn is_stride_acyclic(&self) -> bool {
        self.stride_topological_order().len() == self.events.len()
    }
}

impl Index<EventId> for Trace {
    type Output = CommEvent;

    fn index(&self, id: EventId) -> &CommEvent {
        &self.events[id.0]
    }
}

impl IndexMut<EventId> for Trace {
    fn index_mut(&mut self, id: EventId) -> &mut CommEvent {
        &mut self.events[id.0]
    }
}

/// Iterator following `pe_next` links.
pub struct PeSequence<'a> {
    trace: &'a Trace,
    next: Option<EventId>,
}

impl Iterator for PeSequence<'_> {
    type Item = EventId;

    fn next(&mut self) -> Option<EventId> {
        let current = self.next?;
        self.next = self.trace.pe_next(current);
        Some(current)
    }
}
