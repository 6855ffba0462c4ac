//! Findings of [`validate_trace`](super::validate_trace).
//!
//! Errors mean the steps computed from the trace would be meaningless;
//! warnings flag data the analysis tolerates.

use std::fmt;

use crate::trace::{EventId, PartitionId, Relation};

/// Everything one validation run found, in check order.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// No errors; warnings do not count.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `event.next == neighbour` but `neighbour.prev != event`, or the reverse.
    InconsistentLink {
        event: EventId,
        relation: Relation,
        neighbour: EventId,
    },
    /// A pe or comm link joins events on different PEs.
    CrossPeLink {
        event: EventId,
        relation: Relation,
        neighbour: EventId,
    },
    /// A stride edge points outside the arena or is missing its reverse half.
    DanglingStrideEdge { parent: EventId, child: EventId },
    /// The stride graph has a cycle; `events` is how many events sit on or
    /// behind one.
    StrideCycle { events: usize },
    /// An event leaves before it enters.
    InvalidTimestamps { event: EventId, enter: u64, exit: u64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InconsistentLink {
                event,
                relation,
                neighbour,
            } => {
                write!(
                    f,
                    "{event}: {relation} link to {neighbour} is not mirrored by {neighbour}"
                )
            }
            ValidationError::CrossPeLink {
                event,
                relation,
                neighbour,
            } => {
                write!(
                    f,
                    "{event}: {relation} link to {neighbour} crosses processing elements"
                )
            }
            ValidationError::DanglingStrideEdge { parent, child } => {
                write!(f, "stride edge {parent} -> {child} is dangling")
            }
            ValidationError::StrideCycle { events } => {
                write!(f, "stride graph is not acyclic: {events} events unreachable")
            }
            ValidationError::InvalidTimestamps { event, enter, exit } => {
                write!(f, "{event}: exit {exit} precedes enter {enter}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validation warning types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// A receive with no matched send.
    UnmatchedReceive { event: EventId },
    /// A send whose matched receive never appears.
    UnmatchedSend { event: EventId },
    /// A partition without events.
    EmptyPartition { partition: PartitionId },
    /// Too many findings of the same kind - only showing first N.
    TooManyFindings {
        category: &'static str,
        shown: usize,
        total: usize,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::UnmatchedReceive { event } => {
                write!(f, "{event}: receive has no matching send")
            }
            ValidationWarning::UnmatchedSend { event } => {
                write!(f, "{event}: send has no matching receive")
            }
            ValidationWarning::EmptyPartition { partition } => {
                write!(f, "{partition} has no events")
            }
            ValidationWarning::TooManyFindings {
                category,
                shown,
                total,
            } => {
                write!(f, "{category}: showing first {shown} of {total}")
            }
        }
    }
}
