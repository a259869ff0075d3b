// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end validation of the reconciliation pipeline against
//! hand-worked scenarios: DP costs and witnesses, MPR counts, event
//! frequencies, medians, distance histograms and clustering, each
//! cross-checked against brute-force enumeration.

use cophy::io::tree_text;
use cophy::recon::ancestry::AncestryTable;
use cophy::recon::brute;
use cophy::recon::cluster::{cluster, ClusterConfig, PdvScore, SupportScore};
use cophy::recon::count;
use cophy::recon::dp::{reconcile, DtlCosts, Reconciliation};
use cophy::recon::frequency;
use cophy::recon::graph::MappingNode;
use cophy::recon::median::{median, Lcg64};
use cophy::recon::pdv;
use cophy::recon::tree::{TipMapping, Tree};
use cophy::validation::Validator;

fn setup(host: &str, para: &str, pairs: &[(&str, &str)]) -> (Tree, Tree, TipMapping) {
    let host = tree_text::parse(host).expect("host tree");
    let para = tree_text::parse(para).expect("parasite tree");
    let phi = TipMapping::new(pairs, &para, &host).expect("tip mapping");
    (host, para, phi)
}

fn run(host: &Tree, para: &Tree, phi: &TipMapping, costs: DtlCosts) -> Reconciliation {
    reconcile(host, para, phi, &costs).expect("reconciliation")
}

fn main() {
    let mut v = Validator::new("validate_reconciliation");

    // ── Tips only: free cospeciation ───────────────────────────────
    v.section("── Tips only (matching cherries) ──");
    {
        let (host, para, phi) = setup("(a,b)r", "(x,y)q", &[("x", "a"), ("y", "b")]);
        let costs = DtlCosts {
            duplication: 1,
            transfer: 1,
            loss: 1,
        };
        let rec = run(&host, &para, &phi, costs);
        v.check_count("best cost", u128::from(rec.best_cost), 0);
        v.check_count("MPR count", rec.mpr_count, 1);
        v.check_that(
            "root maps parasite root on host root",
            rec.graph.roots == vec![MappingNode::new(para.root(), host.root())],
        );
        let c = count::count(&rec.graph);
        let anc = AncestryTable::build(&host);
        let hist = pdv::pairwise_distances(&rec.graph, &c, &anc, false);
        v.check_count("histogram bin 0", hist.get(0), 1);
        v.check_count("histogram total", hist.total(), 1);
    }

    // ── Forced duplication ─────────────────────────────────────────
    v.section("── Forced duplication (both tips on one host) ──");
    {
        let (host, para, phi) = setup("(a,b)r", "(x,y)q", &[("x", "a"), ("y", "a")]);
        let rec = run(&host, &para, &phi, DtlCosts::default());
        v.check_count("best cost", u128::from(rec.best_cost), 2);
        v.check_count("MPR count", rec.mpr_count, 1);
        let h_a = host.node("a").expect("host a");
        v.check_that(
            "duplication sits on host tip a",
            rec.graph.roots == vec![MappingNode::new(para.root(), h_a)],
        );
    }

    // ── Loss route ─────────────────────────────────────────────────
    v.section("── Loss route (one loss + cospeciation) ──");
    {
        let (host, para, phi) = setup("((a,b)r,c)R", "(x,y)q", &[("x", "a"), ("y", "c")]);
        let rec = run(&host, &para, &phi, DtlCosts::default());
        v.check_count("best cost", u128::from(rec.best_cost), 1);
        v.check_count("MPR count", rec.mpr_count, 1);
        let c = count::count(&rec.graph);
        let anc = AncestryTable::build(&host);
        let hist = pdv::pairwise_distances(&rec.graph, &c, &anc, false);
        v.check_count("histogram is a zero point", hist.get(0), 1);
    }

    // ── Transfer vs cospeciation cost flip ─────────────────────────
    v.section("── Transfer vs cospeciation under flipped costs ──");
    {
        // Host ((a,c)m,b): b is reachable from a only by a switch or
        // by climbing through m with losses.
        let (host, para, phi) = setup("((a,c)m,b)r", "(x,y)q", &[("x", "a"), ("y", "b")]);
        let q = para.root();
        let h_a = host.node("a").expect("host a");
        let h_b = host.node("b").expect("host b");

        let transfer_cheap = DtlCosts {
            duplication: 100,
            transfer: 1,
            loss: 100,
        };
        let rec = run(&host, &para, &phi, transfer_cheap);
        v.check_count("cheap transfer: best cost", u128::from(rec.best_cost), 1);
        v.check_that(
            "cheap transfer: both switch directions are optimal",
            rec.graph.roots == vec![MappingNode::new(q, h_a), MappingNode::new(q, h_b)],
        );

        let transfer_priced_out = DtlCosts {
            duplication: 100,
            transfer: 100,
            loss: 1,
        };
        let rec = run(&host, &para, &phi, transfer_priced_out);
        v.check_count("priced-out transfer: best cost", u128::from(rec.best_cost), 1);
        v.check_that(
            "priced-out transfer: root climbs to the host root",
            rec.graph.roots == vec![MappingNode::new(q, host.root())],
        );
    }

    // ── Parallel cherries, identity mapping ────────────────────────
    v.section("── Parallel quartets (identity mapping) ──");
    {
        let (host, para, phi) = setup(
            "((a,b)g,(c,d)h)r",
            "((x,y)i,(z,w)j)q",
            &[("x", "a"), ("y", "b"), ("z", "c"), ("w", "d")],
        );
        let costs = DtlCosts {
            duplication: 1,
            transfer: 1,
            loss: 1,
        };
        let rec = run(&host, &para, &phi, costs);
        let mprs = brute::enumerate(&rec.graph);
        v.check_count("MPR count matches brute force", rec.mpr_count, mprs.len() as u128);
        let c = count::count(&rec.graph);
        let f = frequency::frequencies(&rec.graph, &c);
        let mut min_cospec_freq = f64::INFINITY;
        for (&m, fs) in &f.frequencies {
            for (e, &fq) in rec.graph.events_at(m).iter().zip(fs) {
                if matches!(e, cophy::recon::graph::Event::Cospeciation { .. }) {
                    min_cospec_freq = min_cospec_freq.min(fq);
                }
            }
        }
        v.check_that(
            "every cospeciation frequency >= 0.5",
            min_cospec_freq >= 0.5,
        );
    }

    // ── Three-MPR tie: counts, frequencies, median, histogram ──────
    v.section("── Three-way tie (two transfers + loss route) ──");
    let (host, para, phi) = setup("((a,c)m,b)r", "(x,y)q", &[("x", "a"), ("y", "b")]);
    let costs = DtlCosts {
        duplication: 1,
        transfer: 1,
        loss: 1,
    };
    let rec = run(&host, &para, &phi, costs);
    let counts = count::count(&rec.graph);
    let freqs = frequency::frequencies(&rec.graph, &counts);
    let anc = AncestryTable::build(&host);
    {
        v.check_count("MPR count", rec.mpr_count, 3);
        let mprs = brute::enumerate(&rec.graph);
        v.check_count("brute-force count agrees", mprs.len() as u128, 3);

        // Every event score equals its brute-force membership count.
        let oracle = brute::event_counts(&mprs);
        let mut scores_match = true;
        for (&m, ss) in &freqs.scores {
            for (e, &s) in rec.graph.events_at(m).iter().zip(ss) {
                if oracle.get(&(m, *e)).copied().unwrap_or(0) != s {
                    scores_match = false;
                }
            }
        }
        v.check_that("event scores match brute-force membership", scores_match);

        let med = median(&rec.graph, &freqs).expect("median");
        v.check_count("median count", med.count, 2);
        v.check_that("median is a subgraph", med.graph.is_subgraph_of(&rec.graph));
        let brute_medians = brute::median_indices(&mprs);
        v.check_count(
            "median count matches brute force",
            med.count,
            brute_medians.len() as u128,
        );
        let sampled = med.sample(&mut Lcg64::new(11));
        v.check_that(
            "sampled median stays inside the median graph",
            sampled.is_subgraph_of(&med.graph),
        );

        let hist = pdv::pairwise_distances(&rec.graph, &counts, &anc, false);
        v.check_count("histogram bin 0 (self pairs)", hist.get(0), 3);
        v.check_count("histogram bin 2", hist.get(2), 1);
        v.check_count("histogram bin 3", hist.get(3), 2);
        v.check_count("histogram total n(n+1)/2", hist.total(), 6);
        let brute_hist = brute::pairwise_histogram(&mprs, false);
        v.check_that("histogram matches brute force", hist == brute_hist);
        let zl = pdv::pairwise_distances(&rec.graph, &counts, &anc, true);
        let brute_zl = brute::pairwise_histogram(&mprs, true);
        v.check_that("zero-loss histogram matches brute force", zl == brute_zl);
    }

    // ── Clustering ─────────────────────────────────────────────────
    v.section("── Clustering (k = 2, PDV score) ──");
    {
        let scorer = PdvScore::new(&host, false);
        let config = ClusterConfig {
            k: 2,
            ..ClusterConfig::default()
        };
        let result = cluster(&rec.graph, &scorer, &config)
            .expect("cluster run")
            .into_result()
            .expect("finished run");
        v.check_count("splits", result.n_splits as u128, 3);
        v.check_count("final clusters", result.clusters.len() as u128, 2);

        let mut union = cophy::recon::graph::ReconGraph::new();
        for c in &result.clusters {
            union = union.union(&c.graph);
        }
        v.check_that("cluster union covers the graph", union == rec.graph);
        let count_sum: u128 = result.clusters.iter().map(|c| c.mpr_count).sum();
        v.check_count("disjoint splits: counts sum to total", count_sum, 3);

        // WAS improves as k grows: one cluster averages the full
        // histogram (mean 4/3), two clusters reach 4/9.
        let full_mean = pdv::pairwise_distances(&rec.graph, &counts, &anc, false).mean();
        v.check("WAS at k=1", full_mean, 4.0 / 3.0, 1e-12);
        v.check("WAS at k=2", result.was_series[0], 4.0 / 9.0, 1e-12);
        v.check_that("WAS(k=2) <= WAS(k=1)", result.was_series[0] <= full_mean);

        // The nodp estimator recomputes each cluster's score by
        // enumerating its MPRs.
        let mut estimator_agrees = true;
        for c in &result.clusters {
            let mprs = brute::enumerate(&c.graph);
            let direct = brute::mean_pairwise_distance(&mprs, false);
            if (direct - c.score).abs() > 1e-12 {
                estimator_agrees = false;
            }
        }
        v.check_that("cluster scores match the nodp estimator", estimator_agrees);

        let support = cluster(&rec.graph, &SupportScore, &config)
            .expect("cluster run")
            .into_result()
            .expect("finished run");
        v.check_that(
            "support score groups the same pair",
            support
                .clusters
                .iter()
                .any(|c| c.mpr_count == 2 && c.graph.roots.len() == 2),
        );
    }

    v.finish();
}
