// SPDX-License-Identifier: AGPL-3.0-or-later
//! Counting the MPRs a reconciliation graph encodes.
//!
//! The count below a mapping node is the sum over its events of the
//! product of the counts below the event's children; a childless event
//! contributes 1. One ascending pass over the event map suffices since
//! keys order children before parents.
//!
//! Counts use saturating `u128` arithmetic. MPR spaces can be
//! astronomically large, and every consumer of a saturated count only
//! compares or divides, so pinning at `u128::MAX` is safe.

use std::collections::BTreeMap;

use super::graph::{MappingNode, ReconGraph};

/// Per-node and per-event MPR counts for one graph.
#[derive(Debug, Clone)]
pub struct MprCount {
    /// MPRs of the subgraph rooted at each mapping node.
    pub per_node: BTreeMap<MappingNode, u128>,
    /// Per event at each mapping node (indexed like
    /// [`ReconGraph::events_at`]): MPRs of the subgraph that commit to
    /// that event.
    pub per_event: BTreeMap<MappingNode, Vec<u128>>,
    /// Total MPRs: sum over the graph's roots.
    pub total: u128,
}

impl MprCount {
    /// Count below one mapping node (0 if absent).
    #[must_use]
    pub fn at(&self, m: MappingNode) -> u128 {
        self.per_node.get(&m).copied().unwrap_or(0)
    }
}

/// Count the MPRs encoded by `graph`.
#[must_use]
pub fn count(graph: &ReconGraph) -> MprCount {
    let mut per_node: BTreeMap<MappingNode, u128> = BTreeMap::new();
    let mut per_event: BTreeMap<MappingNode, Vec<u128>> = BTreeMap::new();

    for (&m, events) in &graph.events {
        let mut here: Vec<u128> = Vec::with_capacity(events.len());
        for e in events {
            let mut ways: u128 = 1;
            for child in e.children() {
                ways = ways.saturating_mul(per_node.get(&child).copied().unwrap_or(0));
            }
            here.push(ways);
        }
        let node_total = here.iter().fold(0u128, |acc, w| acc.saturating_add(*w));
        per_node.insert(m, node_total);
        per_event.insert(m, here);
    }

    let total = graph
        .roots
        .iter()
        .fold(0u128, |acc, r| acc.saturating_add(per_node[r]));

    MprCount {
        per_node,
        per_event,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recon::graph::Event;

    fn m(p: usize, h: usize) -> MappingNode {
        MappingNode::new(p, h)
    }

    #[test]
    fn single_chain_counts_one() {
        let mut g = ReconGraph::new();
        g.add_event(m(0, 0), Event::Contemporaneous);
        g.add_event(m(0, 2), Event::Loss { child: m(0, 0) });
        g.add_root(m(0, 2));
        let c = count(&g);
        assert_eq!(c.total, 1);
        assert_eq!(c.at(m(0, 2)), 1);
    }

    #[test]
    fn choices_multiply_and_add() {
        // Root has two events; one child node itself has two events.
        let mut g = ReconGraph::new();
        g.add_event(m(0, 0), Event::Contemporaneous);
        g.add_event(m(1, 1), Event::Contemporaneous);
        g.add_event(m(1, 2), Event::Loss { child: m(1, 1) });
        // Two ways to place parasite 1 below the root's duplication.
        g.add_event(
            m(2, 3),
            Event::Duplication {
                left: m(0, 0),
                right: m(1, 1),
            },
        );
        g.add_event(
            m(2, 3),
            Event::Duplication {
                left: m(0, 0),
                right: m(1, 2),
            },
        );
        g.add_root(m(2, 3));
        let c = count(&g);
        assert_eq!(c.at(m(1, 2)), 1);
        assert_eq!(c.total, 2);
        assert_eq!(c.per_event[&m(2, 3)], vec![1, 1]);
    }

    #[test]
    fn multiple_roots_sum() {
        let mut g = ReconGraph::new();
        g.add_event(m(0, 0), Event::Contemporaneous);
        g.add_event(m(0, 1), Event::Contemporaneous);
        g.add_root(m(0, 0));
        g.add_root(m(0, 1));
        assert_eq!(count(&g).total, 2);
    }
}
