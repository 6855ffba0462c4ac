//! Graphviz export of the stride DAG.

use std::io::Write;

use anyhow::Result;

use crate::trace::{EventKind, Trace};

/// Give every event a graph vertex id.
pub fn assign_gvids(trace: &mut Trace) {
    let ids: Vec<_> = trace.event_ids().collect();
    for id in ids {
        trace.event_mut(id).gvid = id.to_string();
    }
}

fn shape(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Send | EventKind::Isend => "box",
        EventKind::Recv => "ellipse",
        EventKind::Collective => "diamond",
    }
}

/// Write the stride DAG as a Graphviz digraph.
///
/// Stride edges are solid; true (send to receive) edges are dashed. Events
/// are grouped into one cluster per PE and labelled with their step.
pub fn export_dot<W: Write>(trace: &mut Trace, out: &mut W) -> Result<()> {
    assign_gvids(trace);

    writeln!(out, "digraph strides {{")?;
    writeln!(out, "  rankdir=LR;")?;
    for (pe, head) in trace.pe_heads() {
        writeln!(out, "  subgraph cluster_pe{pe} {{")?;
        writeln!(out, "    label=\"PE {pe}\";")?;
        for id in trace.pe_sequence(head) {
            let event = trace.event(id);
            writeln!(
                out,
                "    {} [shape={}, label=\"{}\\nstep {}\"];",
                event.gvid,
                shape(event.kind),
                event.function,
                event.step
            )?;
        }
        writeln!(out, "  }}")?;
    }

    for (_, event) in trace.events() {
        for child in event.stride_children() {
            writeln!(out, "  {} -> {};", event.gvid, trace.event(child).gvid)?;
        }
    }
    for (id, event) in trace.events() {
        if event.is_receive() {
            continue;
        }
        if let Some(recv) = trace.true_next(id) {
            writeln!(
                out,
                "  {} -> {} [style=dashed];",
                event.gvid,
                trace.event(recv).gvid
            )?;
        }
    }
    writeln!(out, "}}")?;
    Ok(())
}
