//! Event entities stored in the trace arena.
//!
//! [`CommEvent`] is the communication event the analysis passes operate on.
//! [`Event`] is a plain function call that only serves as the enclosing
//! "caller" of communication events when resolving metrics.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_COMMUNICATOR, UNASSIGNED};
use crate::metrics::MetricsContainer;

/// Index of a communication event in the trace arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub usize);

/// Index of a caller event in the trace arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallerId(pub usize);

/// Index of a partition in the trace arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionId(pub usize);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "partition {}", self.0)
    }
}

/// Kind of communication an event performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Send,
    /// Non-blocking send, eligible for coalescing.
    Isend,
    Recv,
    Collective,
}

/// Ordering relations kept as prev/next pairs on every event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Communication events on the same PE sharing a communicator.
    Comm,
    /// Causal order, e.g. a send followed by its matched receive.
    True,
    /// All communication events on the same PE.
    Pe,
}

impl Relation {
    pub const ALL: [Relation; 3] = [Relation::Comm, Relation::True, Relation::Pe];

    pub(crate) fn index(self) -> usize {
        match self {
            Relation::Comm => 0,
            Relation::True => 1,
            Relation::Pe => 2,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Relation::Comm => "comm",
            Relation::True => "true",
            Relation::Pe => "pe",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Link {
    pub prev: Option<EventId>,
    pub next: Option<EventId>,
}

/// A plain function call. Communication events may point at one as their caller.
#[derive(Clone, Debug, Default)]
pub struct Event {
    pub enter: u64,
    pub exit: u64,
    pub function: u32,
    pub entity: u32,
    pub pe: u32,
    pub metrics: MetricsContainer,
}

impl Event {
    pub fn new(enter: u64, exit: u64, function: u32, entity: u32, pe: u32) -> Self {
        Self {
            enter,
            exit,
            function,
            entity,
            pe,
            metrics: MetricsContainer::new(),
        }
    }
}

/// A communication event.
///
/// `enter` and `add_order` define the event's position in every sort and are
/// fixed at construction. `extent_begin`/`extent_end` are display bounds only
/// and never take part in ordering or duration computations.
///
/// Relation links and stride DAG edges are owned by the arena; use the
/// accessors on [`Trace`](super::Trace) to read or change them.
#[derive(Clone, Debug)]
pub struct CommEvent {
    enter: u64,
    add_order: u64,
    pub exit: u64,
    pub function: u32,
    pub entity: u32,
    pub pe: u32,
    pub phase: u32,
    pub kind: EventKind,
    pub communicator: u32,

    pub extent_begin: u64,
    pub extent_end: u64,

    pub(crate) links: [Link; 3],
    pub(crate) stride_parents: BTreeSet<EventId>,
    pub(crate) stride_children: BTreeSet<EventId>,

    /// Previous stride (non-receive) event on the same PE.
    pub last_stride: Option<EventId>,
    /// Next stride (non-receive) event on the same PE.
    pub next_stride: Option<EventId>,
    /// Receives seen on this PE between `last_stride` and this event.
    pub last_recvs: Vec<EventId>,

    pub stride: i32,
    /// Logical step; negative once the event has been coalesced away.
    pub step: i32,
    pub last_step: i32,

    pub matching: i64,
    pub atomic: i64,
    pub gvid: String,

    pub metrics: MetricsContainer,
    pub caller: Option<CallerId>,
    pub partition: Option<PartitionId>,
}

impl CommEvent {
    pub fn new(
        enter: u64,
        exit: u64,
        function: u32,
        entity: u32,
        pe: u32,
        phase: u32,
        kind: EventKind,
    ) -> Self {
        Self {
            enter,
            add_order: 0,
            exit,
            function,
            entity,
            pe,
            phase,
            kind,
            communicator: DEFAULT_COMMUNICATOR,
            extent_begin: enter,
            extent_end: exit,
            links: [Link::default(); 3],
            stride_parents: BTreeSet::new(),
            stride_children: BTreeSet::new(),
            last_stride: None,
            next_stride: None,
            last_recvs: Vec::new(),
            stride: UNASSIGNED,
            step: UNASSIGNED,
            last_step: UNASSIGNED,
            matching: -1,
            atomic: -1,
            gvid: String::new(),
            metrics: MetricsContainer::new(),
            caller: None,
            partition: None,
        }
    }

    /// Set the insertion sequence number used to break ties on `enter`.
    pub fn with_add_order(mut self, add_order: u64) -> Self {
        self.add_order = add_order;
        self
    }

    pub fn enter(&self) -> u64 {
        self.enter
    }

    pub fn add_order(&self) -> u64 {
        self.add_order
    }

    pub fn is_receive(&self) -> bool {
        self.kind == EventKind::Recv
    }

    /// True for events whose step was merged away. Only meaningful once
    /// steps have been assigned.
    pub fn is_coalesced(&self) -> bool {
        self.step < 0
    }

    pub fn stride_parents(&self) -> impl Iterator<Item = EventId> + '_ {
        self.stride_parents.iter().copied()
    }

    pub fn stride_children(&self) -> impl Iterator<Item = EventId> + '_ {
        self.stride_children.iter().copied()
    }
}

impl Ord for CommEvent {
    /// Orders by `enter`, then `add_order`; on a full tie receives come first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.enter
            .cmp(&other.enter)
            .then(self.add_order.cmp(&other.add_order))
            .then_with(|| other.is_receive().cmp(&self.is_receive()))
    }
}

impl PartialOrd for CommEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for CommEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CommEvent {}
