//! Shared names for attributes and built-in metrics.
//!
//! These strings are part of the output format: downstream readers key on
//! them, so they must not change between releases.

/// Attribute carrying the phase of an event.
pub const PHASE_ATTRIBUTE: &str = "phase";

/// Attribute carrying the logical step of an event.
pub const STEP_ATTRIBUTE: &str = "step";

/// Suffix appended to a metric name to form its aggregate attribute name.
pub const AGGREGATE_SUFFIX: &str = "_agg";

/// Built-in metric: how far an event finishes behind the earliest event of its step.
pub const LATENESS_METRIC: &str = "Lateness";

/// Built-in differential metric derived from [`LATENESS_METRIC`].
pub const DIFFERENTIAL_LATENESS_METRIC: &str = "D.Lateness";

/// Communicator used for events whose input record names none.
pub const DEFAULT_COMMUNICATOR: u32 = 0;

/// Sentinel for unassigned stride/step coordinates and unmatched events.
pub const UNASSIGNED: i32 = -1;
