// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pairwise-distance histogram over the whole MPR space.
//!
//! The distance between two MPRs is the size of the symmetric
//! difference of their event sets, with every event weighted 1 except
//! losses, which weigh 1 normally and 0 under `zero_loss`. The
//! histogram covers every unordered pair of MPRs including each MPR
//! paired with itself, `n(n + 1) / 2` pairs in total, without ever
//! enumerating MPRs.
//!
//! # Algorithm
//!
//! Parasite nodes are processed in postorder; within one parasite the
//! MPR fragments entering two mapping nodes `uA ≤ uB` are compared by
//! peeling loss chains:
//!
//! - `enter(uA, uB)`: distance histogram over fragment pairs entering
//!   at `uA` and `uB`. For `uA == uB` pairs are unordered and include
//!   equal pairs; for `uA < uB` the two roles are distinguishable and
//!   every pair is counted once.
//! - `exit_one(uA, uB)`: one fragment has already taken a non-loss
//!   event at `uA`; the other enters at `uB` and may still take
//!   losses. Only needed when `uB`'s host is a strict descendant of or
//!   incomparable with `uA`'s host, so the chains never collide.
//! - `both_exit(uA, uB)`: both fragments take non-loss events
//!   immediately. Distinct events contribute weight 2 and convolve the
//!   per-child histograms; a shared event contributes 0 and combines
//!   its two child spaces with the unordered product-pair rule.
//!
//! Ordered pair histograms over one node are recovered from unordered
//! ones as `2 * enter(u, u)` minus the `count(u)` equal pairs at
//! distance 0. Loss peeling always descends the host tree, so each
//! table entry depends only on entries with a smaller maximum host.

use std::collections::{BTreeMap, HashMap};

use super::ancestry::{AncestryTable, Relation};
use super::count::MprCount;
use super::graph::{Event, MappingNode, ReconGraph};
use super::histogram::Histogram;

type PairKey = (MappingNode, MappingNode);

fn canonical(a: MappingNode, b: MappingNode) -> PairKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Exit (non-loss) events at a node.
fn exits(graph: &ReconGraph, m: MappingNode) -> Vec<Event> {
    graph
        .events_at(m)
        .iter()
        .copied()
        .filter(|e| !e.is_loss())
        .collect()
}

/// Loss destinations at a node.
fn loss_children(graph: &ReconGraph, m: MappingNode) -> Vec<MappingNode> {
    graph
        .events_at(m)
        .iter()
        .filter_map(|e| match e {
            Event::Loss { child } => Some(*child),
            _ => None,
        })
        .collect()
}

struct PdvTables<'a> {
    graph: &'a ReconGraph,
    counts: &'a MprCount,
    host_ancestry: &'a AncestryTable,
    loss_weight: u64,
    /// `enter` histograms for canonical pairs, across all parasites.
    enter: HashMap<PairKey, Histogram>,
}

impl PdvTables<'_> {
    /// Ordered pair histogram over fragments entering `u` and `v`:
    /// total mass `count(u) * count(v)`.
    fn ordered(&self, u: MappingNode, v: MappingNode) -> Histogram {
        if u == v {
            self.enter[&(u, u)]
                .scaled(2)
                .without_at(0, self.counts.at(u))
        } else {
            self.enter[&canonical(u, v)].clone()
        }
    }

    /// Both fragments take non-loss events at `uA` and `uB` (`uA ≤ uB`).
    fn both_exit(&self, u_a: MappingNode, u_b: MappingNode) -> Histogram {
        let ex_a = exits(self.graph, u_a);
        let mut out = Histogram::new();
        if u_a == u_b {
            for (i, ea) in ex_a.iter().enumerate() {
                for eb in &ex_a[i..] {
                    if ea == eb {
                        // Shared exit: unordered continuation pairs.
                        let cs = ea.children_by_parasite();
                        let h = match cs.as_slice() {
                            [] => Histogram::unit(),
                            [c1, c2] => self.enter[&(*c1, *c1)].product_combine(
                                &self.enter[&(*c2, *c2)],
                                self.counts.at(*c1),
                                self.counts.at(*c2),
                            ),
                            _ => unreachable!("exit events have zero or two children"),
                        };
                        out.combine(&h);
                    } else {
                        out.combine(&self.distinct_exits(ea, eb));
                    }
                }
            }
        } else {
            let ex_b = exits(self.graph, u_b);
            for ea in &ex_a {
                for eb in &ex_b {
                    out.combine(&self.distinct_exits(ea, eb));
                }
            }
        }
        out
    }

    /// Two distinct exit events: both enter the symmetric difference
    /// (weight 2) and the children pair off by parasite slot.
    fn distinct_exits(&self, ea: &Event, eb: &Event) -> Histogram {
        let ca = ea.children_by_parasite();
        let cb = eb.children_by_parasite();
        let mut h = Histogram::point(2, 1);
        for (a, b) in ca.iter().zip(&cb) {
            h = h.convolve(&self.ordered(*a, *b));
        }
        h
    }
}

/// Histogram of symmetric-difference distances over every unordered
/// pair of MPRs (self-pairs included) encoded by `graph`.
///
/// `host_ancestry` must be built from the host tree the graph was
/// reconciled on. With `zero_loss`, losses drop out of the distance.
#[must_use]
pub fn pairwise_distances(
    graph: &ReconGraph,
    counts: &MprCount,
    host_ancestry: &AncestryTable,
    zero_loss: bool,
) -> Histogram {
    let loss_weight: u64 = if zero_loss { 0 } else { 1 };

    // Mapping nodes grouped by parasite, hosts ascending.
    let mut groups: BTreeMap<usize, Vec<MappingNode>> = BTreeMap::new();
    for &m in graph.events.keys() {
        groups.entry(m.parasite).or_default().push(m);
    }

    let mut tables = PdvTables {
        graph,
        counts,
        host_ancestry,
        loss_weight,
        enter: HashMap::new(),
    };

    for nodes in groups.values() {
        fill_group(&mut tables, nodes);
    }

    let mut out = Histogram::new();
    for (i, &ra) in graph.roots.iter().enumerate() {
        for &rb in &graph.roots[i..] {
            out.combine(&tables.enter[&canonical(ra, rb)]);
        }
    }
    out
}

/// Compute `enter` for every node pair of one parasite group.
fn fill_group(t: &mut PdvTables<'_>, nodes: &[MappingNode]) {
    // exit_one(exiter, enterer): the exiter has committed a non-loss
    // event, the enterer still peels losses. Enterers ascend so the
    // loss recursion's targets are ready.
    let mut exit_one: HashMap<(MappingNode, MappingNode), Histogram> = HashMap::new();
    for &enterer in nodes {
        for &exiter in nodes {
            if exiter == enterer {
                continue;
            }
            let rel = t.host_ancestry.relation(enterer.host, exiter.host);
            if !matches!(rel, Relation::Descendant | Relation::Incomparable) {
                continue;
            }
            let (a, b) = canonical(exiter, enterer);
            let mut h = t.both_exit(a, b);
            for lc in loss_children(t.graph, enterer) {
                h.combine(&exit_one[&(exiter, lc)].shift(t.loss_weight));
            }
            exit_one.insert((exiter, enterer), h);
        }
    }

    // enter pairs in ascending order of the larger host: loss peeling
    // only ever descends, so dependencies are already filled.
    let mut pairs: Vec<PairKey> = Vec::new();
    for (i, &a) in nodes.iter().enumerate() {
        for &b in &nodes[i..] {
            pairs.push((a, b));
        }
    }
    pairs.sort_by_key(|&(a, b)| (a.host.max(b.host), a, b));

    for (u_a, u_b) in pairs {
        let h = if u_a == u_b {
            let m = u_a;
            let losses = loss_children(t.graph, m);
            let mut h = t.both_exit(m, m);
            // Exactly one side losses.
            for &lc in &losses {
                h.combine(&exit_one[&(m, lc)].shift(t.loss_weight));
            }
            // Both sides loss.
            for (i, &lx) in losses.iter().enumerate() {
                for &ly in &losses[i..] {
                    if lx == ly {
                        h.combine(&t.enter[&(lx, lx)]);
                    } else {
                        h.combine(
                            &t.enter[&canonical(lx, ly)].shift(2 * t.loss_weight),
                        );
                    }
                }
            }
            h
        } else {
            // Peel the larger-host side: it either losses downward or
            // exits, leaving the other side to exit_one.
            let mut h = Histogram::new();
            for lc in loss_children(t.graph, u_b) {
                h.combine(&t.ordered(u_a, lc).shift(t.loss_weight));
            }
            h.combine(&exit_one[&(u_b, u_a)]);
            h
        };
        t.enter.insert((u_a, u_b), h);
    }
}
