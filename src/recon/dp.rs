// SPDX-License-Identifier: AGPL-3.0-or-later
//! The DTL dynamic program: all maximum-parsimony reconciliations at
//! once.
//!
//! # Algorithm
//!
//! Costs live in flat `n_parasite × n_host` tables indexed
//! `p * n_host + h`. For each parasite node in postorder:
//!
//! - `c(p, h)`: cheapest placement of `p` on `h` over contemporaneous
//!   tips, cospeciation, loss, duplication and transfer. Every event
//!   achieving the minimum is recorded as a witness; infinite-cost
//!   candidates are dropped.
//! - `o(p, h)`: minimum of `c(p, ·)` over `h`'s subtree, with the full
//!   argmin host set.
//! - `best_switch(p, h)`: minimum of `c(p, h')` over hosts `h'`
//!   incomparable with `h`, with landing sites. Computed by a preorder
//!   sweep: the value at a child is the parent's value merged with the
//!   sibling's `o`; the root has no incomparable host and stays
//!   infinite.
//!
//! Transfer witnesses are emitted once per optimal landing site, so the
//! finished graph enumerates every MPR, not just one.
//!
//! Costs are `u32` with a saturating infinity sentinel; additions never
//! wrap.
//!
//! # References
//!
//! Bansal, Alm, Kellis (2012) "Efficient algorithms for the
//! reconciliation problem with gene duplication, horizontal transfer
//! and loss", Bioinformatics 28(12).

use crate::error::{Error, Result};

use super::ancestry::AncestryTable;
use super::count;
use super::graph::{Event, MappingNode, ReconGraph};
use super::tree::{TipMapping, Tree};

/// Cost sentinel for "no placement exists". Half of `u32::MAX` so that
/// saturating sums of two infinities stay above the threshold without
/// wrapping.
pub const INF_COST: u32 = u32::MAX / 2;

/// Event costs. Cospeciation is always free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DtlCosts {
    /// Cost of a duplication event.
    pub duplication: u32,
    /// Cost of a transfer event.
    pub transfer: u32,
    /// Cost of a loss event.
    pub loss: u32,
}

impl Default for DtlCosts {
    fn default() -> Self {
        Self {
            duplication: 2,
            transfer: 3,
            loss: 1,
        }
    }
}

/// Output of [`reconcile`]: the MPR graph plus its headline numbers.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Graph of every maximum-parsimony reconciliation.
    pub graph: ReconGraph,
    /// Parsimony cost shared by all MPRs.
    pub best_cost: u32,
    /// Number of MPRs the graph encodes (saturating).
    pub mpr_count: u128,
}

/// Minimum accumulator that keeps every witness of the current best
/// finite cost.
struct Best {
    cost: u32,
    events: Vec<Event>,
}

impl Best {
    fn new() -> Self {
        Self {
            cost: INF_COST,
            events: Vec::new(),
        }
    }

    fn offer(&mut self, cost: u32, event: Event) {
        if cost >= INF_COST {
            return;
        }
        match cost.cmp(&self.cost) {
            std::cmp::Ordering::Less => {
                self.cost = cost;
                self.events.clear();
                self.events.push(event);
            }
            std::cmp::Ordering::Equal => self.events.push(event),
            std::cmp::Ordering::Greater => {}
        }
    }
}

/// Minimum of two (cost, argmin host set) pairs, unioning the sets on
/// a finite tie.
fn merge_min(ca: u32, la: &[usize], cb: u32, lb: &[usize]) -> (u32, Vec<usize>) {
    match ca.cmp(&cb) {
        std::cmp::Ordering::Less => (ca, la.to_vec()),
        std::cmp::Ordering::Greater => (cb, lb.to_vec()),
        std::cmp::Ordering::Equal => {
            if ca >= INF_COST {
                return (INF_COST, Vec::new());
            }
            let mut locs = la.to_vec();
            locs.extend_from_slice(lb);
            locs.sort_unstable();
            locs.dedup();
            (ca, locs)
        }
    }
}

/// Compute the graph of all maximum-parsimony DTL reconciliations.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if any cost reaches the infinity
/// sentinel, and [`Error::NoReconciliation`] if no placement of the
/// parasite root has finite cost.
pub fn reconcile(
    host: &Tree,
    parasite: &Tree,
    phi: &TipMapping,
    costs: &DtlCosts,
) -> Result<Reconciliation> {
    if costs.duplication >= INF_COST || costs.transfer >= INF_COST || costs.loss >= INF_COST {
        return Err(Error::InvalidInput(format!(
            "event costs must be below {INF_COST}"
        )));
    }

    let nh = host.len();
    let np = parasite.len();
    let idx = |p: usize, h: usize| p * nh + h;

    let mut c = vec![INF_COST; np * nh];
    let mut events: Vec<Vec<Event>> = vec![Vec::new(); np * nh];
    let mut o = vec![INF_COST; np * nh];
    let mut o_locs: Vec<Vec<usize>> = vec![Vec::new(); np * nh];
    let mut bs = vec![INF_COST; np * nh];
    let mut bs_locs: Vec<Vec<usize>> = vec![Vec::new(); np * nh];

    for p in parasite.postorder() {
        let p_children = parasite.children(p);

        for h in host.postorder() {
            let mut best = Best::new();

            match host.children(h) {
                None => {
                    if parasite.is_leaf(p) && phi.host_of(p) == Some(h) {
                        best.offer(0, Event::Contemporaneous);
                    }
                }
                Some((h1, h2)) => {
                    if let Some((p1, p2)) = p_children {
                        let straight = c[idx(p1, h1)].saturating_add(c[idx(p2, h2)]);
                        best.offer(
                            straight,
                            Event::Cospeciation {
                                left: MappingNode::new(p1, h1),
                                right: MappingNode::new(p2, h2),
                            },
                        );
                        let crossed = c[idx(p2, h1)].saturating_add(c[idx(p1, h2)]);
                        best.offer(
                            crossed,
                            Event::Cospeciation {
                                left: MappingNode::new(p2, h1),
                                right: MappingNode::new(p1, h2),
                            },
                        );
                    }
                    for hc in [h1, h2] {
                        let lost = costs.loss.saturating_add(c[idx(p, hc)]);
                        best.offer(
                            lost,
                            Event::Loss {
                                child: MappingNode::new(p, hc),
                            },
                        );
                    }
                }
            }

            if let Some((p1, p2)) = p_children {
                let dup = costs
                    .duplication
                    .saturating_add(c[idx(p1, h)])
                    .saturating_add(c[idx(p2, h)]);
                best.offer(
                    dup,
                    Event::Duplication {
                        left: MappingNode::new(p1, h),
                        right: MappingNode::new(p2, h),
                    },
                );
                // One witness per optimal landing site, both directions.
                for (kept, moved) in [(p1, p2), (p2, p1)] {
                    let sw = bs[idx(moved, h)];
                    if sw >= INF_COST {
                        continue;
                    }
                    let tcost = costs
                        .transfer
                        .saturating_add(c[idx(kept, h)])
                        .saturating_add(sw);
                    for &site in &bs_locs[idx(moved, h)] {
                        best.offer(
                            tcost,
                            Event::Transfer {
                                kept: MappingNode::new(kept, h),
                                moved: MappingNode::new(moved, site),
                            },
                        );
                    }
                }
            }

            c[idx(p, h)] = best.cost;
            events[idx(p, h)] = best.events;
        }

        for h in host.postorder() {
            let mut cost = c[idx(p, h)];
            let mut locs: Vec<usize> = if cost < INF_COST { vec![h] } else { Vec::new() };
            if let Some((h1, h2)) = host.children(h) {
                for hc in [h1, h2] {
                    let (merged, merged_locs) =
                        merge_min(cost, &locs, o[idx(p, hc)], &o_locs[idx(p, hc)]);
                    cost = merged;
                    locs = merged_locs;
                }
            }
            o[idx(p, h)] = cost;
            o_locs[idx(p, h)] = locs;
        }

        // Root stays infinite: nothing is incomparable with it.
        for h in host.preorder() {
            if let Some((h1, h2)) = host.children(h) {
                let here_cost = bs[idx(p, h)];
                let here_locs = bs_locs[idx(p, h)].clone();
                let (c1, l1) = merge_min(here_cost, &here_locs, o[idx(p, h2)], &o_locs[idx(p, h2)]);
                let (c2, l2) = merge_min(here_cost, &here_locs, o[idx(p, h1)], &o_locs[idx(p, h1)]);
                bs[idx(p, h1)] = c1;
                bs_locs[idx(p, h1)] = l1;
                bs[idx(p, h2)] = c2;
                bs_locs[idx(p, h2)] = l2;
            }
        }
    }

    let p_root = parasite.root();
    let mut best_cost = INF_COST;
    let mut roots: Vec<MappingNode> = Vec::new();
    for h in host.postorder() {
        let cost = c[idx(p_root, h)];
        if cost >= INF_COST {
            continue;
        }
        match cost.cmp(&best_cost) {
            std::cmp::Ordering::Less => {
                best_cost = cost;
                roots.clear();
                roots.push(MappingNode::new(p_root, h));
            }
            std::cmp::Ordering::Equal => roots.push(MappingNode::new(p_root, h)),
            std::cmp::Ordering::Greater => {}
        }
    }
    if roots.is_empty() {
        return Err(Error::NoReconciliation(
            "no finite-cost placement of the parasite root".into(),
        ));
    }

    // Keep only mapping nodes reachable from an optimal root.
    let mut graph = ReconGraph::new();
    for &r in &roots {
        graph.add_root(r);
    }
    let mut stack = roots;
    while let Some(m) = stack.pop() {
        if graph.events.contains_key(&m) {
            continue;
        }
        let mut evs = events[idx(m.parasite, m.host)].clone();
        evs.sort_unstable();
        evs.dedup();
        for e in &evs {
            for child in e.children() {
                if !graph.events.contains_key(&child) {
                    stack.push(child);
                }
            }
        }
        graph.events.insert(m, evs);
    }
    graph.check_invariants(&AncestryTable::build(host), phi)?;

    let mpr_count = count::count(&graph).total;
    Ok(Reconciliation {
        graph,
        best_cost,
        mpr_count,
    })
}

/// Run [`reconcile`] for each cost regime in turn.
///
/// # Errors
///
/// Fails on the first regime that fails.
pub fn reconcile_batch(
    host: &Tree,
    parasite: &Tree,
    phi: &TipMapping,
    regimes: &[DtlCosts],
) -> Result<Vec<Reconciliation>> {
    regimes
        .iter()
        .map(|costs| reconcile(host, parasite, phi, costs))
        .collect()
}
