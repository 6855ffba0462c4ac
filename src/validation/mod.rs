//! Structural validation of a linked trace.
//!
//! The checks here catch inputs and pass bugs that would otherwise produce
//! silently wrong steps:
//!
//! - relation links that are not mirrored, or pe/comm links across PEs
//! - stride edges that dangle or form a cycle
//! - events that leave before they enter
//!
//! Unmatched messages and empty partitions are reported as warnings only.
//!
//! # Entry Points
//!
//! - [`validate_trace`] - run every check with the default configuration
//! - [`validate_trace_with`] - run every check with an explicit [`ValidationConfig`]

mod config;
mod result;

pub use config::ValidationConfig;
pub use result::{ValidationError, ValidationResult, ValidationWarning};

use tracing::debug;

use crate::trace::{EventId, EventKind, Relation, Trace};

/// Validate `trace` with [`ValidationConfig::default`].
pub fn validate_trace(trace: &Trace) -> ValidationResult {
    validate_trace_with(trace, &ValidationConfig::default())
}

pub fn validate_trace_with(trace: &Trace, config: &ValidationConfig) -> ValidationResult {
    let mut reporter = Reporter {
        result: ValidationResult::default(),
        limit: config.max_findings_per_category,
    };

    reporter.errors("timestamps", check_timestamps(trace));
    reporter.errors("relation links", check_links(trace));

    let dangling = check_stride_edges(trace);
    let has_dangling = !dangling.is_empty();
    reporter.errors("stride edges", dangling);
    // Topological sorting indexes by child id, so only run it on sound edges
    if !has_dangling {
        let ordered = trace.stride_topological_order().len();
        if ordered < trace.len() {
            reporter.result.add_error(ValidationError::StrideCycle {
                events: trace.len() - ordered,
            });
        }
    }

    if config.warn_unmatched {
        reporter.warnings("unmatched messages", check_unmatched(trace));
    }
    reporter.warnings(
        "empty partitions",
        trace
            .partitions()
            .filter(|(_, partition)| partition.is_empty())
            .map(|(partition, _)| ValidationWarning::EmptyPartition { partition })
            .collect(),
    );

    debug!(
        errors = reporter.result.errors.len(),
        warnings = reporter.result.warnings.len(),
        "validated trace"
    );
    reporter.result
}

struct Reporter {
    result: ValidationResult,
    limit: usize,
}

impl Reporter {
    fn truncated(&mut self, category: &'static str, total: usize) {
        if total > self.limit {
            self.result.add_warning(ValidationWarning::TooManyFindings {
                category,
                shown: self.limit,
                total,
            });
        }
    }

    fn errors(&mut self, category: &'static str, errors: Vec<ValidationError>) {
        let total = errors.len();
        self.result
            .errors
            .extend(errors.into_iter().take(self.limit));
        self.truncated(category, total);
    }

    fn warnings(&mut self, category: &'static str, warnings: Vec<ValidationWarning>) {
        let total = warnings.len();
        self.result
            .warnings
            .extend(warnings.into_iter().take(self.limit));
        self.truncated(category, total);
    }
}

fn check_timestamps(trace: &Trace) -> Vec<ValidationError> {
    trace
        .events()
        .filter(|(_, event)| event.exit < event.enter())
        .map(|(event, e)| ValidationError::InvalidTimestamps {
            event,
            enter: e.enter(),
            exit: e.exit,
        })
        .collect()
}

fn check_links(trace: &Trace) -> Vec<ValidationError> {
    let in_range = |id: EventId| id.0 < trace.len();
    let mut errors = Vec::new();

    for id in trace.event_ids() {
        for relation in Relation::ALL {
            let neighbours = [
                (trace.next(id, relation), true),
                (trace.prev(id, relation), false),
            ];
            for (neighbour, forward) in neighbours {
                let Some(neighbour) = neighbour else {
                    continue;
                };
                let mirrored = in_range(neighbour)
                    && if forward {
                        trace.prev(neighbour, relation) == Some(id)
                    } else {
                        trace.next(neighbour, relation) == Some(id)
                    };
                if !mirrored {
                    errors.push(ValidationError::InconsistentLink {
                        event: id,
                        relation,
                        neighbour,
                    });
                    continue;
                }
                // Report each cross-PE pair once, from its forward end
                if forward && relation != Relation::True && trace[id].pe != trace[neighbour].pe {
                    errors.push(ValidationError::CrossPeLink {
                        event: id,
                        relation,
                        neighbour,
                    });
                }
            }
        }
    }
    errors
}

fn check_stride_edges(trace: &Trace) -> Vec<ValidationError> {
    let in_range = |id: EventId| id.0 < trace.len();
    let mut errors = Vec::new();

    for (id, event) in trace.events() {
        for child in event.stride_children() {
            if !in_range(child) || !trace[child].stride_parents.contains(&id) {
                errors.push(ValidationError::DanglingStrideEdge { parent: id, child });
            }
        }
        for parent in event.stride_parents() {
            if !in_range(parent) || !trace[parent].stride_children.contains(&id) {
                errors.push(ValidationError::DanglingStrideEdge { parent, child: id });
            }
        }
    }
    errors
}

fn check_unmatched(trace: &Trace) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    for (id, event) in trace.events() {
        match event.kind {
            EventKind::Recv if trace.true_prev(id).is_none() => {
                warnings.push(ValidationWarning::UnmatchedReceive { event: id });
            }
            EventKind::Send | EventKind::Isend
                if event.matching >= 0 && trace.true_next(id).is_none() =>
            {
                warnings.push(ValidationWarning::UnmatchedSend { event: id });
            }
            _ => {}
        }
    }
    warnings
}
