//! Common fixtures for commstep integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

/// Three PEs passing one message around a ring, then a collective.
///
/// ```text
/// PE 0: send(0) ----------------------------- recv(5) coll(6)
/// PE 1:          recv(1) send(2) ---------------------- coll(7)
/// PE 2:                          recv(3) send(4) ------ coll(8)
/// ```
///
/// Expected steps: 0 1 2 3 4 5 for the ring, 6 for all collectives.
/// `send(2)` has no `Work` metric of its own and falls back to its caller;
/// `recv(3)` falls back to partition 0.
pub fn ring_trace() -> Value {
    let event = |enter: u64, pe: u32, kind: &str, matching: i64| {
        json!({
            "enter": enter,
            "exit": enter + 5,
            "function": 10 + pe,
            "pe": pe,
            "kind": kind,
            "matching": matching,
        })
    };

    let mut events = vec![
        event(10, 0, "send", 0),
        event(20, 1, "recv", 0),
        event(30, 1, "send", 1),
        event(40, 2, "recv", 1),
        event(50, 2, "send", 2),
        event(60, 0, "recv", 2),
        event(70, 0, "collective", 100),
        event(72, 1, "collective", 100),
        event(74, 2, "collective", 100),
    ];
    events[2]["caller"] = json!(0);
    events[3]["partition"] = json!(0);

    json!({
        "partitions": [
            {"metrics": {"Work": {"value": 7.0, "aggregate": 2.0}}}
        ],
        "callers": [
            {"enter": 0, "exit": 100, "function": 1, "pe": 1,
             "metrics": {"Work": {"value": 100.0, "aggregate": 30.0}}}
        ],
        "events": events,
    })
}

/// Write `trace` into a fresh temp dir, returning the dir and the file path.
pub fn write_trace(trace: &Value) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("trace.json");
    write_json(&path, trace);
    (dir, path)
}

pub fn write_json(path: &Path, value: &Value) {
    let contents = serde_json::to_string_pretty(value).expect("Failed to serialize JSON");
    std::fs::write(path, contents).expect("Failed to write JSON");
}
