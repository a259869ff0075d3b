// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event support: in how many MPRs does each event appear?
//!
//! For a mapping node `m`, the number of MPRs that pass through it
//! factors as `uppers(m) * count(m)`: choices made above `m` times
//! choices made below. `uppers` flows top-down, starting at 1 for each
//! root; an event at `m` is used by `uppers(m) * ways(e)` MPRs, where
//! `ways(e)` is the product of the child counts. Each child then
//! inherits `score(e) / count(child)` additional uppers — an exact
//! division, since `ways(e)` carries a factor of `count(child)`.
//!
//! One descending pass over the event map visits parents before
//! children, so no recursion is needed.
//!
//! Divisions stop being exact once counts saturate `u128`; frequencies
//! degrade to estimates in that regime but stay in `[0, 1]`.

use std::collections::BTreeMap;

use super::count::MprCount;
use super::graph::{MappingNode, ReconGraph};

/// Per-event MPR membership counts and frequencies for one graph.
#[derive(Debug, Clone)]
pub struct EventFrequencies {
    /// Per event at each mapping node (indexed like
    /// [`ReconGraph::events_at`]): number of MPRs using that event.
    pub scores: BTreeMap<MappingNode, Vec<u128>>,
    /// Number of MPRs passing through each mapping node.
    pub node_weight: BTreeMap<MappingNode, u128>,
    /// `scores` normalized by the total MPR count, in `[0, 1]`.
    pub frequencies: BTreeMap<MappingNode, Vec<f64>>,
    /// Total MPR count the frequencies are relative to.
    pub total: u128,
}

impl EventFrequencies {
    /// Frequency of the `i`-th event at `m` (0.0 if absent).
    #[must_use]
    pub fn frequency(&self, m: MappingNode, i: usize) -> f64 {
        self.frequencies
            .get(&m)
            .and_then(|v| v.get(i))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Compute event scores and frequencies from a graph and its counts.
#[must_use]
pub fn frequencies(graph: &ReconGraph, counts: &MprCount) -> EventFrequencies {
    let mut uppers: BTreeMap<MappingNode, u128> = BTreeMap::new();
    for &r in &graph.roots {
        uppers.insert(r, 1);
    }

    let mut scores: BTreeMap<MappingNode, Vec<u128>> = BTreeMap::new();
    let mut node_weight: BTreeMap<MappingNode, u128> = BTreeMap::new();

    for (&m, events) in graph.events.iter().rev() {
        let u = uppers.get(&m).copied().unwrap_or(0);
        node_weight.insert(m, u.saturating_mul(counts.at(m)));
        let ways = &counts.per_event[&m];
        let mut here = Vec::with_capacity(events.len());
        for (e, &w) in events.iter().zip(ways) {
            let s = u.saturating_mul(w);
            here.push(s);
            for child in e.children() {
                let below = counts.at(child);
                if below > 0 {
                    let slot = uppers.entry(child).or_insert(0);
                    *slot = slot.saturating_add(s / below);
                }
            }
        }
        scores.insert(m, here);
    }

    let total = counts.total;
    let frequencies = scores
        .iter()
        .map(|(&m, ss)| {
            let fs = ss
                .iter()
                .map(|&s| if total == 0 { 0.0 } else { s as f64 / total as f64 })
                .collect();
            (m, fs)
        })
        .collect();

    EventFrequencies {
        scores,
        node_weight,
        frequencies,
        total,
    }
}
