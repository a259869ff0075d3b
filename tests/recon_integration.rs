// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests: every analysis cross-checked against brute-force
//! enumeration on a battery of small instances.

use cophy::io::tree_text;
use cophy::recon::ancestry::AncestryTable;
use cophy::recon::brute::{self, Mpr};
use cophy::recon::cluster::{cluster, ClusterConfig, PdvScore};
use cophy::recon::count;
use cophy::recon::dp::{reconcile, DtlCosts, Reconciliation};
use cophy::recon::frequency;
use cophy::recon::graph::{Event, MappingNode, ReconGraph};
use cophy::recon::median::{median, Lcg64};
use cophy::recon::pdv;
use cophy::recon::tree::{TipMapping, Tree};

struct Instance {
    host: Tree,
    parasite: Tree,
    phi: TipMapping,
    costs: DtlCosts,
}

fn instance(host: &str, para: &str, pairs: &[(&str, &str)], costs: (u32, u32, u32)) -> Instance {
    let host = tree_text::parse(host).unwrap();
    let parasite = tree_text::parse(para).unwrap();
    let phi = TipMapping::new(pairs, &parasite, &host).unwrap();
    Instance {
        host,
        parasite,
        phi,
        costs: DtlCosts {
            duplication: costs.0,
            transfer: costs.1,
            loss: costs.2,
        },
    }
}

/// Small battery covering cospeciation, duplication, loss chains,
/// transfers and crossed tip maps under several cost regimes.
fn battery() -> Vec<Instance> {
    vec![
        instance("(a,b)r", "(x,y)q", &[("x", "a"), ("y", "b")], (2, 3, 1)),
        instance("(a,b)r", "(x,y)q", &[("x", "a"), ("y", "a")], (2, 3, 1)),
        instance("((a,b)r,c)R", "(x,y)q", &[("x", "a"), ("y", "c")], (2, 3, 1)),
        instance("((a,c)m,b)r", "(x,y)q", &[("x", "a"), ("y", "b")], (1, 1, 1)),
        instance("((a,c)m,b)r", "(x,y)q", &[("x", "a"), ("y", "b")], (2, 1, 100)),
        instance(
            "((a,b)g,(c,d)h)r",
            "((x,y)i,(z,w)j)q",
            &[("x", "a"), ("y", "b"), ("z", "c"), ("w", "d")],
            (1, 1, 1),
        ),
        // Crossed mapping: the parasite quartet straddles both host
        // clades, forcing a mix of transfers, losses and duplications.
        instance(
            "((a,b)g,(c,d)h)r",
            "((x,y)i,(z,w)j)q",
            &[("x", "a"), ("y", "c"), ("z", "b"), ("w", "d")],
            (1, 1, 1),
        ),
        instance(
            "((a,b)g,(c,d)h)r",
            "((x,y)i,(z,w)j)q",
            &[("x", "a"), ("y", "c"), ("z", "b"), ("w", "d")],
            (2, 3, 1),
        ),
        instance(
            "((a,b)g,(c,d)h)r",
            "(((x,y)i,z)j,w)q",
            &[("x", "d"), ("y", "a"), ("z", "a"), ("w", "b")],
            (1, 2, 1),
        ),
    ]
}

fn mpr_cost(mpr: &Mpr, costs: &DtlCosts) -> u32 {
    mpr.events
        .values()
        .map(|e| match e {
            Event::Cospeciation { .. } | Event::Contemporaneous => 0,
            Event::Duplication { .. } => costs.duplication,
            Event::Transfer { .. } => costs.transfer,
            Event::Loss { .. } => costs.loss,
        })
        .sum()
}

fn solve(inst: &Instance) -> (Reconciliation, Vec<Mpr>) {
    let rec = reconcile(&inst.host, &inst.parasite, &inst.phi, &inst.costs).unwrap();
    let mprs = brute::enumerate(&rec.graph);
    (rec, mprs)
}

#[test]
fn every_encoded_mpr_hits_the_optimal_cost() {
    for (i, inst) in battery().iter().enumerate() {
        let (rec, mprs) = solve(inst);
        for mpr in &mprs {
            assert_eq!(
                mpr_cost(mpr, &inst.costs),
                rec.best_cost,
                "instance {i}: an encoded MPR misses the optimum"
            );
        }
    }
}

#[test]
fn mpr_counts_match_enumeration() {
    for (i, inst) in battery().iter().enumerate() {
        let (rec, mprs) = solve(inst);
        assert!(rec.mpr_count >= 1, "instance {i}");
        assert_eq!(rec.mpr_count, mprs.len() as u128, "instance {i}");
        // Enumerated MPRs are pairwise distinct.
        let mut sorted = mprs.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), mprs.len(), "instance {i}");
    }
}

#[test]
fn event_scores_match_brute_membership() {
    for (i, inst) in battery().iter().enumerate() {
        let (rec, mprs) = solve(inst);
        let counts = count::count(&rec.graph);
        let freqs = frequency::frequencies(&rec.graph, &counts);
        let oracle = brute::event_counts(&mprs);
        for (&m, ss) in &freqs.scores {
            for (e, &s) in rec.graph.events_at(m).iter().zip(ss) {
                assert_eq!(
                    oracle.get(&(m, *e)).copied().unwrap_or(0),
                    s,
                    "instance {i}: score mismatch at ({}, {})",
                    m.parasite,
                    m.host
                );
            }
        }
    }
}

#[test]
fn medians_are_subgraphs_with_independent_counts() {
    for (i, inst) in battery().iter().enumerate() {
        let (rec, mprs) = solve(inst);
        let counts = count::count(&rec.graph);
        let freqs = frequency::frequencies(&rec.graph, &counts);
        let med = median(&rec.graph, &freqs).unwrap();
        assert!(med.graph.is_subgraph_of(&rec.graph), "instance {i}");
        // Second, independent count: enumerate the median graph.
        let med_mprs = brute::enumerate(&med.graph);
        assert_eq!(med.count, med_mprs.len() as u128, "instance {i}");
        // And the brute-force argmax agrees on how many medians exist.
        let brute_medians = brute::median_indices(&mprs);
        assert_eq!(med.count, brute_medians.len() as u128, "instance {i}");
        // Sampled medians are complete MPRs of the median graph.
        let mut rng = Lcg64::new(i as u64 + 1);
        let sampled = med.sample(&mut rng);
        assert!(sampled.is_subgraph_of(&med.graph), "instance {i}");
        assert_eq!(sampled.roots.len(), 1, "instance {i}");
    }
}

#[test]
fn histogram_totals_and_bounds() {
    for (i, inst) in battery().iter().enumerate() {
        let (rec, mprs) = solve(inst);
        let counts = count::count(&rec.graph);
        let anc = AncestryTable::build(&inst.host);
        for zero_loss in [false, true] {
            let hist = pdv::pairwise_distances(&rec.graph, &counts, &anc, zero_loss);
            let n = rec.mpr_count;
            assert_eq!(hist.total(), n * (n + 1) / 2, "instance {i}");
            assert!(hist.get(0) >= n, "instance {i}: self pairs");
            if !zero_loss {
                assert_eq!(hist.get(0), n, "instance {i}: distinct MPRs differ");
                let max_events = mprs.iter().map(|m| m.events.len()).max().unwrap() as u64;
                assert!(
                    hist.max_key().unwrap() <= 2 * max_events,
                    "instance {i}: distance exceeds both event sets"
                );
            }
            let oracle = brute::pairwise_histogram(&mprs, zero_loss);
            assert_eq!(hist, oracle, "instance {i}, zero_loss {zero_loss}");
        }
    }
}

#[test]
fn graph_invariants_hold_across_the_battery() {
    for (i, inst) in battery().iter().enumerate() {
        let (rec, _) = solve(inst);
        let anc = AncestryTable::build(&inst.host);
        assert!(
            rec.graph.check_invariants(&anc, &inst.phi).is_ok(),
            "instance {i}"
        );
    }

    // A contemporaneous event off the tip map is rejected: the parasite
    // root is not a leaf.
    let dup = &battery()[1];
    let (rec, _) = solve(dup);
    let anc = AncestryTable::build(&dup.host);
    let mut tampered = rec.graph.clone();
    tampered.add_event(rec.graph.roots[0], Event::Contemporaneous);
    assert!(tampered.check_invariants(&anc, &dup.phi).is_err());

    // So is a transfer whose moved child lands on a comparable host.
    let tie = &battery()[3];
    let (rec, _) = solve(tie);
    let anc = AncestryTable::build(&tie.host);
    let q = tie.parasite.root();
    let y = tie.parasite.node("y").unwrap();
    let h_b = tie.host.node("b").unwrap();
    let mut tampered = rec.graph.clone();
    tampered.add_event(
        MappingNode::new(q, h_b),
        Event::Transfer {
            kept: MappingNode::new(y, h_b),
            moved: MappingNode::new(y, h_b),
        },
    );
    assert!(tampered.check_invariants(&anc, &tie.phi).is_err());
}

#[test]
fn clusters_cover_the_graph_and_conserve_counts() {
    for (i, inst) in battery().iter().enumerate() {
        let (rec, _) = solve(inst);
        let scorer = PdvScore::new(&inst.host, false);
        let config = ClusterConfig {
            k: 2,
            ..ClusterConfig::default()
        };
        let result = cluster(&rec.graph, &scorer, &config)
            .unwrap()
            .into_result()
            .unwrap();
        let mut union = ReconGraph::new();
        let mut count_sum: u128 = 0;
        for c in &result.clusters {
            assert!(c.graph.is_subgraph_of(&rec.graph), "instance {i}");
            union = union.union(&c.graph);
            count_sum += c.mpr_count;
        }
        assert_eq!(union, rec.graph, "instance {i}: union must cover G");
        // Splits partition the MPR set, so counts stay additive.
        assert_eq!(count_sum, rec.mpr_count, "instance {i}");
        // One WAS entry per cluster count between the final partition
        // and the initial splits.
        assert_eq!(
            result.was_series.len(),
            result.n_splits - result.clusters.len() + 1,
            "instance {i}"
        );
        assert!(
            result.was_series.iter().all(|w| w.is_finite() && *w >= 0.0),
            "instance {i}"
        );
    }
}

#[test]
fn batch_matches_individual_runs() {
    let inst = &battery()[6];
    let regimes = [
        DtlCosts {
            duplication: 1,
            transfer: 1,
            loss: 1,
        },
        DtlCosts {
            duplication: 2,
            transfer: 3,
            loss: 1,
        },
    ];
    let batch =
        cophy::recon::dp::reconcile_batch(&inst.host, &inst.parasite, &inst.phi, &regimes)
            .unwrap();
    for (rec, costs) in batch.iter().zip(&regimes) {
        let single = reconcile(&inst.host, &inst.parasite, &inst.phi, costs).unwrap();
        assert_eq!(rec.best_cost, single.best_cost);
        assert_eq!(rec.graph, single.graph);
    }
}
