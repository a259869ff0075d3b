// SPDX-License-Identifier: AGPL-3.0-or-later
//! Brute-force MPR enumeration, as an oracle for the graph-based
//! engines.
//!
//! Everything here materializes MPRs one by one, so it is exponential
//! in the worst case and meant for small instances: cross-checking the
//! counting, frequency, median and distance DPs on inputs where the
//! whole space fits in memory.

use std::collections::{BTreeMap, HashMap};

use super::graph::{Event, MappingNode, ReconGraph};
use super::histogram::Histogram;

/// One fully resolved reconciliation: a root and one event per reached
/// mapping node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Mpr {
    /// Root mapping node.
    pub root: MappingNode,
    /// Chosen event at every reached mapping node.
    pub events: BTreeMap<MappingNode, Event>,
}

impl Mpr {
    /// Weighted size of the symmetric difference of two event sets.
    ///
    /// Events are identified by (mapping node, event); losses weigh 0
    /// under `zero_loss`, everything else 1.
    #[must_use]
    pub fn distance(&self, other: &Self, zero_loss: bool) -> u64 {
        let weight = |e: &Event| -> u64 {
            if e.is_loss() && zero_loss {
                0
            } else {
                1
            }
        };
        let mut d = 0;
        for (m, e) in &self.events {
            if other.events.get(m) != Some(e) {
                d += weight(e);
            }
        }
        for (m, e) in &other.events {
            if self.events.get(m) != Some(e) {
                d += weight(e);
            }
        }
        d
    }
}

/// Materialize every MPR the graph encodes.
#[must_use]
pub fn enumerate(graph: &ReconGraph) -> Vec<Mpr> {
    let mut memo: HashMap<MappingNode, Vec<BTreeMap<MappingNode, Event>>> = HashMap::new();
    let mut out = Vec::new();
    for &root in &graph.roots {
        for events in assignments(graph, root, &mut memo) {
            out.push(Mpr { root, events });
        }
    }
    out.sort();
    out
}

/// All event assignments for the subgraph below `m`.
fn assignments(
    graph: &ReconGraph,
    m: MappingNode,
    memo: &mut HashMap<MappingNode, Vec<BTreeMap<MappingNode, Event>>>,
) -> Vec<BTreeMap<MappingNode, Event>> {
    if let Some(hit) = memo.get(&m) {
        return hit.clone();
    }
    let mut result = Vec::new();
    for &e in graph.events_at(m) {
        let mut partials: Vec<BTreeMap<MappingNode, Event>> = vec![BTreeMap::new()];
        for child in e.children() {
            let below = assignments(graph, child, memo);
            let mut next = Vec::with_capacity(partials.len() * below.len());
            for p in &partials {
                for b in &below {
                    let mut merged = p.clone();
                    merged.extend(b.iter().map(|(k, v)| (*k, *v)));
                    next.push(merged);
                }
            }
            partials = next;
        }
        for mut p in partials {
            p.insert(m, e);
            result.push(p);
        }
    }
    memo.insert(m, result.clone());
    result
}

/// Histogram over unordered MPR pairs, self-pairs included.
#[must_use]
pub fn pairwise_histogram(mprs: &[Mpr], zero_loss: bool) -> Histogram {
    let mut h = Histogram::new();
    for (i, a) in mprs.iter().enumerate() {
        for b in &mprs[i..] {
            h.add(a.distance(b, zero_loss), 1);
        }
    }
    h
}

/// Mean of [`pairwise_histogram`], the slow twin of the distance DP's
/// diameter score.
#[must_use]
pub fn mean_pairwise_distance(mprs: &[Mpr], zero_loss: bool) -> f64 {
    pairwise_histogram(mprs, zero_loss).mean()
}

/// Number of MPRs using each (mapping node, event) pair.
#[must_use]
pub fn event_counts(mprs: &[Mpr]) -> BTreeMap<(MappingNode, Event), u128> {
    let mut counts: BTreeMap<(MappingNode, Event), u128> = BTreeMap::new();
    for mpr in mprs {
        for (&m, &e) in &mpr.events {
            *counts.entry((m, e)).or_insert(0) += 1;
        }
    }
    counts
}

/// Support total of one MPR: sum over its events of `frequency - 0.5`,
/// with frequencies taken over `mprs`.
#[must_use]
pub fn support_total(
    mpr: &Mpr,
    counts: &BTreeMap<(MappingNode, Event), u128>,
    n_mprs: u128,
) -> f64 {
    mpr.events
        .iter()
        .map(|(&m, &e)| counts[&(m, e)] as f64 / n_mprs as f64 - 0.5)
        .sum()
}

/// Indices of the MPRs maximizing [`support_total`].
#[must_use]
pub fn median_indices(mprs: &[Mpr]) -> Vec<usize> {
    let counts = event_counts(mprs);
    let n = mprs.len() as u128;
    let totals: Vec<f64> = mprs
        .iter()
        .map(|m| support_total(m, &counts, n))
        .collect();
    let best = totals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    totals
        .iter()
        .enumerate()
        .filter(|(_, &t)| (t - best).abs() < 1e-9)
        .map(|(i, _)| i)
        .collect()
}
