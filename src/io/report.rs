// SPDX-License-Identifier: AGPL-3.0-or-later
//! Plain-text reports: reconciliation graphs and histogram CSVs.
//!
//! Graph output is one line per mapping node in key order, so equal
//! graphs always serialize to identical bytes.

use std::io::{self, Write};

use crate::recon::graph::{Event, MappingNode, ReconGraph};
use crate::recon::histogram::Histogram;
use crate::recon::tree::Tree;

fn node_label(m: MappingNode, parasite: &Tree, host: &Tree) -> String {
    format!("({}, {})", parasite.name(m.parasite), host.name(m.host))
}

fn event_label(e: &Event, parasite: &Tree, host: &Tree) -> String {
    let lbl = |m: MappingNode| node_label(m, parasite, host);
    match *e {
        Event::Cospeciation { left, right } => format!("S({}, {})", lbl(left), lbl(right)),
        Event::Duplication { left, right } => format!("D({}, {})", lbl(left), lbl(right)),
        Event::Transfer { kept, moved } => format!("T({}, {})", lbl(kept), lbl(moved)),
        Event::Loss { child } => format!("L({})", lbl(child)),
        Event::Contemporaneous => "C".to_string(),
    }
}

/// Write the graph as one `node: event` line per (mapping node, event),
/// preceded by a `roots:` line.
///
/// # Errors
///
/// Propagates writer errors.
pub fn write_graph<W: Write>(
    w: &mut W,
    graph: &ReconGraph,
    parasite: &Tree,
    host: &Tree,
) -> io::Result<()> {
    write!(w, "roots:")?;
    for &r in &graph.roots {
        write!(w, " {}", node_label(r, parasite, host))?;
    }
    writeln!(w)?;
    for (&m, events) in &graph.events {
        for e in events {
            writeln!(
                w,
                "{}: {}",
                node_label(m, parasite, host),
                event_label(e, parasite, host)
            )?;
        }
    }
    Ok(())
}

/// Output shaping for histogram CSVs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramFormat {
    /// Divide distances by the largest distance.
    pub normalize_x: bool,
    /// Divide counts by the total mass.
    pub normalize_y: bool,
    /// Skip zero-count rows instead of writing a dense range.
    pub omit_zeros: bool,
    /// Accumulate counts from distance 0 upward.
    pub cumulative: bool,
}

/// Write a histogram as `distance,count` CSV.
///
/// Without `omit_zeros` every distance from 0 to the maximum gets a
/// row, zeros included.
///
/// # Errors
///
/// Propagates writer errors.
pub fn write_histogram_csv<W: Write>(
    w: &mut W,
    hist: &Histogram,
    format: &HistogramFormat,
) -> io::Result<()> {
    writeln!(w, "distance,count")?;
    let Some(max_key) = hist.max_key() else {
        return Ok(());
    };
    let total = hist.total();
    let mut running: u128 = 0;
    for key in 0..=max_key {
        let mass = hist.get(key);
        running = running.saturating_add(mass);
        let count = if format.cumulative { running } else { mass };
        if format.omit_zeros && count == 0 {
            continue;
        }
        let x = if format.normalize_x && max_key > 0 {
            format!("{:.6}", key as f64 / max_key as f64)
        } else {
            key.to_string()
        };
        let y = if format.normalize_y && total > 0 {
            format!("{:.6}", count as f64 / total as f64)
        } else {
            count.to_string()
        };
        writeln!(w, "{x},{y}")?;
    }
    Ok(())
}
