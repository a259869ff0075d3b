// SPDX-License-Identifier: AGPL-3.0-or-later
//! Median reconciliations: the MPRs most representative of the whole
//! space.
//!
//! An MPR's support total is the sum over its events of
//! `frequency(e) - 0.5`. A median is an MPR maximizing that total. The
//! maximization runs directly on the graph: one ascending pass computes
//! the best achievable total below each mapping node, keeping every
//! tying event, and the surviving events form the median graph — a
//! subgraph of the input that encodes exactly the median MPRs.
//!
//! The DP works in integers: with `s(e)` the event's MPR membership
//! count and `N` the total MPR count, `frequency - 0.5` scales to
//! `2 * s(e) - N` without changing any comparison, so ties are exact
//! rather than float-dependent (until counts saturate, where the whole
//! pipeline is already approximate).
//!
//! Sampling one median uniformly walks the median graph top-down,
//! weighting roots and events by their median counts; the per-step
//! weights telescope to a uniform distribution over median MPRs.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

use super::count::{self, MprCount};
use super::frequency::EventFrequencies;
use super::graph::{MappingNode, ReconGraph};

/// Multiplicative constant of Knuth's MMIX LCG.
const LCG_MULT: u64 = 6_364_136_223_846_793_005;
/// Additive constant of Knuth's MMIX LCG.
const LCG_INC: u64 = 1_442_695_040_888_963_407;

/// Deterministic 64-bit linear congruential generator.
///
/// Not cryptographic; used for reproducible sampling only.
#[derive(Debug, Clone)]
pub struct Lcg64 {
    state: u64,
}

impl Lcg64 {
    /// Seed the generator. Equal seeds yield equal streams.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(LCG_MULT).wrapping_add(LCG_INC),
        }
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(LCG_MULT).wrapping_add(LCG_INC);
        // xorshift the high bits down; raw LCG low bits are weak.
        let x = self.state;
        x ^ (x >> 29)
    }

    /// Uniform draw from `[0, n)`. `n` must be nonzero.
    pub fn below(&mut self, n: u128) -> u128 {
        let hi = u128::from(self.next_u64());
        let lo = u128::from(self.next_u64());
        ((hi << 64) | lo) % n
    }
}

/// The median MPRs of a reconciliation graph.
#[derive(Debug, Clone)]
pub struct Medians {
    /// Subgraph encoding exactly the median MPRs.
    pub graph: ReconGraph,
    /// Number of median MPRs.
    pub count: u128,
    /// Support total achieved by every median: sum of
    /// `frequency - 0.5` over its events.
    pub best_support: f64,
    /// Counts over the median graph, kept for sampling.
    counts: MprCount,
}

/// Scaled support of one event: `2 * s(e) - N`, saturating.
fn event_value(score: u128, total: u128) -> i128 {
    let two_s = score.saturating_mul(2);
    let two_s = i128::try_from(two_s).unwrap_or(i128::MAX);
    let n = i128::try_from(total).unwrap_or(i128::MAX);
    two_s.saturating_sub(n)
}

/// Compute the median graph of `graph` given its event frequencies.
///
/// # Errors
///
/// Returns [`Error::Internal`] if the constructed median graph is not
/// a subgraph of the input (a bug, never bad input).
pub fn median(graph: &ReconGraph, freqs: &EventFrequencies) -> Result<Medians> {
    // best achievable scaled support below each mapping node, with the
    // indices of every tying event.
    let mut best: BTreeMap<MappingNode, i128> = BTreeMap::new();
    let mut keep: BTreeMap<MappingNode, Vec<usize>> = BTreeMap::new();

    for (&m, events) in &graph.events {
        let scores = &freqs.scores[&m];
        let mut node_best = i128::MIN;
        let mut node_keep: Vec<usize> = Vec::new();
        for (i, (e, &s)) in events.iter().zip(scores).enumerate() {
            let mut value = event_value(s, freqs.total);
            for child in e.children() {
                value = value.saturating_add(best[&child]);
            }
            match value.cmp(&node_best) {
                std::cmp::Ordering::Greater => {
                    node_best = value;
                    node_keep.clear();
                    node_keep.push(i);
                }
                std::cmp::Ordering::Equal => node_keep.push(i),
                std::cmp::Ordering::Less => {}
            }
        }
        best.insert(m, node_best);
        keep.insert(m, node_keep);
    }

    let root_best = graph
        .roots
        .iter()
        .map(|r| best[r])
        .max()
        .ok_or_else(|| Error::Internal("median of a rootless graph".into()))?;
    let kept_roots: Vec<MappingNode> = graph
        .roots
        .iter()
        .copied()
        .filter(|r| best[r] == root_best)
        .collect();

    // Prune to what the kept roots reach through kept events.
    let mut median_graph = ReconGraph::new();
    for &r in &kept_roots {
        median_graph.add_root(r);
    }
    let mut stack = kept_roots;
    while let Some(m) = stack.pop() {
        if median_graph.events.contains_key(&m) {
            continue;
        }
        let events = graph.events_at(m);
        let kept: Vec<_> = keep[&m].iter().map(|&i| events[i]).collect();
        for e in &kept {
            for child in e.children() {
                if !median_graph.events.contains_key(&child) {
                    stack.push(child);
                }
            }
        }
        median_graph.events.insert(m, kept);
    }

    if !median_graph.is_subgraph_of(graph) {
        return Err(Error::Internal(
            "median graph escaped the reconciliation graph".into(),
        ));
    }
    median_graph.check_structure()?;

    let counts = count::count(&median_graph);
    let count = counts.total;
    let best_support = if freqs.total == 0 {
        0.0
    } else {
        root_best as f64 / (2.0 * freqs.total as f64)
    };

    Ok(Medians {
        graph: median_graph,
        count,
        best_support,
        counts,
    })
}

impl Medians {
    /// Draw one median MPR uniformly at random.
    ///
    /// The result has exactly one root and one event per reached
    /// mapping node.
    #[must_use]
    pub fn sample(&self, rng: &mut Lcg64) -> ReconGraph {
        let mut out = ReconGraph::new();
        if self.count == 0 {
            return out;
        }

        // Root weighted by its median count.
        let mut draw = rng.below(self.count);
        let mut root = self.graph.roots[0];
        for &r in &self.graph.roots {
            let w = self.counts.at(r);
            if draw < w {
                root = r;
                break;
            }
            draw -= w;
        }
        out.add_root(root);

        let mut stack = vec![root];
        while let Some(m) = stack.pop() {
            if out.events.contains_key(&m) {
                continue;
            }
            let events = self.graph.events_at(m);
            let ways = &self.counts.per_event[&m];
            let node_total = self.counts.at(m);
            let mut draw = rng.below(node_total);
            let mut picked = events[0];
            for (e, &w) in events.iter().zip(ways) {
                if draw < w {
                    picked = *e;
                    break;
                }
                draw -= w;
            }
            for child in picked.children() {
                stack.push(child);
            }
            out.events.insert(m, vec![picked]);
        }
        out
    }
}
