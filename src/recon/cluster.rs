// SPDX-License-Identifier: AGPL-3.0-or-later
//! Split-then-merge clustering of the MPR space.
//!
//! The space is first partitioned into splits: one split per way of
//! resolving every event choice reached within a depth limit, with the
//! rest of the graph kept whole. Splits are pairwise MPR-disjoint and
//! union to the full graph. Greedy agglomeration then merges the pair
//! of clusters that least increases the weighted average score (WAS),
//! where each cluster's weight is its MPR count and its score comes
//! from a pluggable [`SplitScore`], until `k` clusters remain.
//!
//! Split enumeration is strictly bounded: hitting the `max_splits` cap
//! ends the run with [`ClusterRun::DidNotFinish`] instead of working
//! unbounded.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};

use super::ancestry::AncestryTable;
use super::count;
use super::graph::{Event, MappingNode, ReconGraph};
use super::histogram::Histogram;
use super::pdv;
use super::tree::Tree;

/// Scoring backend for clusters. Lower scores mean tighter clusters.
pub trait SplitScore {
    /// Scalar score of one cluster graph.
    fn score(&self, graph: &ReconGraph) -> f64;
    /// Underlying distribution the score summarizes.
    fn histogram(&self, graph: &ReconGraph) -> Histogram;
}

/// Mean pairwise event distance between the cluster's MPRs.
pub struct PdvScore {
    host_ancestry: AncestryTable,
    zero_loss: bool,
}

impl PdvScore {
    /// Build the score for reconciliations on `host`.
    #[must_use]
    pub fn new(host: &Tree, zero_loss: bool) -> Self {
        Self {
            host_ancestry: AncestryTable::build(host),
            zero_loss,
        }
    }
}

impl SplitScore for PdvScore {
    fn score(&self, graph: &ReconGraph) -> f64 {
        self.histogram(graph).mean()
    }

    fn histogram(&self, graph: &ReconGraph) -> Histogram {
        let counts = count::count(graph);
        pdv::pairwise_distances(graph, &counts, &self.host_ancestry, self.zero_loss)
    }
}

/// Negated mean event support: the average, over every event
/// occurrence in every MPR of the cluster, of that event's frequency
/// within the cluster. Negated so that lower still means tighter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupportScore;

impl SplitScore for SupportScore {
    fn score(&self, graph: &ReconGraph) -> f64 {
        let counts = count::count(graph);
        let freqs = super::frequency::frequencies(graph, &counts);
        let mut occurrences: u128 = 0;
        let mut weighted = 0.0;
        for (m, scores) in &freqs.scores {
            for (i, &s) in scores.iter().enumerate() {
                occurrences = occurrences.saturating_add(s);
                weighted += s as f64 * freqs.frequency(*m, i);
            }
        }
        if occurrences == 0 {
            0.0
        } else {
            -(weighted / occurrences as f64)
        }
    }

    fn histogram(&self, graph: &ReconGraph) -> Histogram {
        let counts = count::count(graph);
        let freqs = super::frequency::frequencies(graph, &counts);
        let mut h = Histogram::new();
        for scores in freqs.scores.values() {
            for &s in scores {
                h.add(u64::try_from(s).unwrap_or(u64::MAX), 1);
            }
        }
        h
    }
}

/// Clustering parameters.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Target number of clusters.
    pub k: usize,
    /// Fixed split depth. When `None` the driver deepens until enough
    /// splits exist.
    pub depth: Option<u32>,
    /// Deepen until at least this many splits (default: `k`). Clamped
    /// to the MPR count.
    pub min_splits: Option<usize>,
    /// Hard cap on enumerated splits; exceeding it ends the run.
    pub max_splits: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: 2,
            depth: None,
            min_splits: None,
            max_splits: 1024,
        }
    }
}

/// One cluster: a subgraph of the reconciliation graph with its
/// weight and score.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Union of the member splits.
    pub graph: ReconGraph,
    /// MPRs in the cluster.
    pub mpr_count: u128,
    /// Score under the run's [`SplitScore`].
    pub score: f64,
}

/// Before/after scores of one greedy merge.
#[derive(Debug, Clone, Copy)]
pub struct MergeStep {
    /// Weighted mean score of the two clusters before merging.
    pub unmerged: f64,
    /// Score of the merged cluster.
    pub merged: f64,
}

/// Successful clustering output.
#[derive(Debug, Clone)]
pub struct ClusterResult {
    /// Final clusters, `min(k, n_splits)` of them.
    pub clusters: Vec<Cluster>,
    /// Weighted average score per cluster count, index 0 holding the
    /// final count and the last entry the initial split partition.
    pub was_series: Vec<f64>,
    /// Greedy merges in execution order.
    pub merge_steps: Vec<MergeStep>,
    /// Split depth the run settled on.
    pub depth_used: u32,
    /// Number of splits before merging.
    pub n_splits: usize,
}

/// Outcome of a clustering run under the split cap.
#[derive(Debug, Clone)]
pub enum ClusterRun {
    /// Run completed.
    Finished(ClusterResult),
    /// The split cap was hit before enough splits existed.
    DidNotFinish {
        /// Splits enumerated when the cap was hit.
        splits_found: usize,
        /// The configured cap.
        cap: usize,
    },
}

impl ClusterRun {
    /// Unwrap into a result, turning a capped run into
    /// [`Error::SplitLimit`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::SplitLimit`] if the run did not finish.
    pub fn into_result(self) -> Result<ClusterResult> {
        match self {
            Self::Finished(result) => Ok(result),
            Self::DidNotFinish { splits_found, cap } => Err(Error::SplitLimit {
                found: splits_found,
                cap,
            }),
        }
    }
}

/// Cluster the MPR space of `graph` into `config.k` clusters.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] on a malformed config.
pub fn cluster<S: SplitScore>(
    graph: &ReconGraph,
    scorer: &S,
    config: &ClusterConfig,
) -> Result<ClusterRun> {
    if config.k == 0 {
        return Err(Error::InvalidInput("k must be at least 1".into()));
    }
    if config.max_splits == 0 {
        return Err(Error::InvalidInput("max_splits must be at least 1".into()));
    }
    if config.depth == Some(0) {
        return Err(Error::InvalidInput(
            "split depth must be at least 1".into(),
        ));
    }
    if let Some(min) = config.min_splits {
        if min < config.k {
            return Err(Error::InvalidInput(format!(
                "min_splits {min} is below k {}",
                config.k
            )));
        }
    }

    let total = count::count(graph).total;
    let target = {
        let want = config.min_splits.unwrap_or(config.k) as u128;
        usize::try_from(want.min(total)).unwrap_or(usize::MAX)
    };

    let (splits, depth_used) = match config.depth {
        Some(d) => match enumerate_splits(graph, d, config.max_splits) {
            SplitEnum::Capped { found } => {
                return Ok(ClusterRun::DidNotFinish {
                    splits_found: found,
                    cap: config.max_splits,
                })
            }
            SplitEnum::Done { splits, .. } => (splits, d),
        },
        None => {
            // Every event step strictly descends the mapping-node
            // order, so full resolution is reached within len() levels.
            let mut found = (Vec::new(), 0);
            let max_depth = u32::try_from(graph.len()).unwrap_or(u32::MAX).max(1);
            let mut d = 1;
            loop {
                match enumerate_splits(graph, d, config.max_splits) {
                    SplitEnum::Capped { found } => {
                        return Ok(ClusterRun::DidNotFinish {
                            splits_found: found,
                            cap: config.max_splits,
                        })
                    }
                    SplitEnum::Done { splits, complete } => {
                        let enough = splits.len() >= target;
                        found = (splits, d);
                        if enough || complete || d >= max_depth {
                            break;
                        }
                    }
                }
                d += 1;
            }
            found
        }
    };

    Ok(ClusterRun::Finished(merge_splits(
        splits, scorer, config.k, depth_used,
    )))
}

enum SplitEnum {
    Done {
        splits: Vec<ReconGraph>,
        /// No node was left unresolved: splits are single MPRs.
        complete: bool,
    },
    Capped {
        found: usize,
    },
}

/// Enumerate the depth-limited splits of `graph`.
///
/// A split fixes the root and one event per mapping node reached
/// within `depth` event steps (losses count as a step); everything at
/// the frontier keeps its whole subgraph.
fn enumerate_splits(graph: &ReconGraph, depth: u32, cap: usize) -> SplitEnum {
    let mut splits = Vec::new();
    let mut truncated = false;
    for &root in &graph.roots {
        let state = SplitState {
            root,
            pending: vec![(root, 0)],
            chosen: BTreeMap::new(),
            frontier: Vec::new(),
        };
        if !expand(graph, depth, state, cap, &mut splits, &mut truncated) {
            return SplitEnum::Capped {
                found: splits.len(),
            };
        }
    }
    SplitEnum::Done {
        splits,
        complete: !truncated,
    }
}

#[derive(Clone)]
struct SplitState {
    root: MappingNode,
    pending: Vec<(MappingNode, u32)>,
    chosen: BTreeMap<MappingNode, Event>,
    frontier: Vec<MappingNode>,
}

/// Depth-first expansion of one partial split. Returns false when the
/// cap is hit.
fn expand(
    graph: &ReconGraph,
    depth: u32,
    mut state: SplitState,
    cap: usize,
    out: &mut Vec<ReconGraph>,
    truncated: &mut bool,
) -> bool {
    loop {
        let Some((m, d)) = state.pending.pop() else {
            if out.len() >= cap {
                return false;
            }
            out.push(build_split(graph, &state));
            return true;
        };
        if d >= depth {
            state.frontier.push(m);
            *truncated = true;
            continue;
        }
        let events = graph.events_at(m);
        if let [only] = events {
            state.chosen.insert(m, *only);
            for c in only.children() {
                state.pending.push((c, d + 1));
            }
            continue;
        }
        for &e in events {
            let mut branch = state.clone();
            branch.chosen.insert(m, e);
            for c in e.children() {
                branch.pending.push((c, d + 1));
            }
            if !expand(graph, depth, branch, cap, out, truncated) {
                return false;
            }
        }
        return true;
    }
}

fn build_split(graph: &ReconGraph, state: &SplitState) -> ReconGraph {
    let mut split = ReconGraph::new();
    split.add_root(state.root);
    for (&m, &e) in &state.chosen {
        split.add_event(m, e);
    }
    // Frontier nodes keep everything reachable below them. Branches of
    // one split cover disjoint parasite subtrees, so the subgraphs
    // never collide with chosen nodes.
    let mut stack = state.frontier.clone();
    while let Some(m) = stack.pop() {
        if split.events.contains_key(&m) {
            continue;
        }
        let events = graph.events_at(m).to_vec();
        for e in &events {
            for c in e.children() {
                if !split.events.contains_key(&c) {
                    stack.push(c);
                }
            }
        }
        split.events.insert(m, events);
    }
    split
}

/// Greedy agglomeration of splits down to `k` clusters.
fn merge_splits<S: SplitScore>(
    splits: Vec<ReconGraph>,
    scorer: &S,
    k: usize,
    depth_used: u32,
) -> ClusterResult {
    let n_splits = splits.len();
    let mut slots: Vec<Option<Cluster>> = splits
        .into_iter()
        .map(|g| {
            let mpr_count = count::count(&g).total;
            let score = scorer.score(&g);
            Some(Cluster {
                graph: g,
                mpr_count,
                score,
            })
        })
        .collect();

    let was = |slots: &[Option<Cluster>]| -> f64 {
        let mut weight = 0.0;
        let mut sum = 0.0;
        for c in slots.iter().flatten() {
            weight += c.mpr_count as f64;
            sum += c.mpr_count as f64 * c.score;
        }
        if weight == 0.0 {
            0.0
        } else {
            sum / weight
        }
    };

    let mut alive = n_splits;
    let mut series = vec![was(&slots)];
    let mut steps = Vec::new();
    // merged-pair cache, invalidated when either member merges
    let mut cache: HashMap<(usize, usize), (f64, u128)> = HashMap::new();

    while alive > k {
        let mut best: Option<(f64, usize, usize)> = None;
        for i in 0..slots.len() {
            let Some(ci) = &slots[i] else { continue };
            for j in (i + 1)..slots.len() {
                let Some(cj) = &slots[j] else { continue };
                let (merged_score, merged_count) = match cache.get(&(i, j)) {
                    Some(&hit) => hit,
                    None => {
                        let union = ci.graph.union(&cj.graph);
                        let entry = (
                            scorer.score(&union),
                            ci.mpr_count.saturating_add(cj.mpr_count),
                        );
                        cache.insert((i, j), entry);
                        entry
                    }
                };
                let delta = merged_count as f64 * merged_score
                    - ci.mpr_count as f64 * ci.score
                    - cj.mpr_count as f64 * cj.score;
                let better = match best {
                    None => true,
                    Some((d, bi, bj)) => delta < d || (delta == d && (i, j) < (bi, bj)),
                };
                if better {
                    best = Some((delta, i, j));
                }
            }
        }
        let Some((_, i, j)) = best else { break };

        let ci = slots[i].take().unwrap_or_else(|| unreachable!());
        let cj = slots[j].take().unwrap_or_else(|| unreachable!());
        let graph = ci.graph.union(&cj.graph);
        let mpr_count = ci.mpr_count.saturating_add(cj.mpr_count);
        let score = scorer.score(&graph);
        let unmerged = (ci.mpr_count as f64 * ci.score + cj.mpr_count as f64 * cj.score)
            / mpr_count as f64;
        steps.push(MergeStep {
            unmerged,
            merged: score,
        });
        slots[i] = Some(Cluster {
            graph,
            mpr_count,
            score,
        });
        cache.retain(|&(a, b), _| a != i && b != i && a != j && b != j);
        alive -= 1;
        series.push(was(&slots));
    }

    let clusters: Vec<Cluster> = slots.into_iter().flatten().collect();
    series.reverse();
    ClusterResult {
        clusters,
        was_series: series,
        merge_steps: steps,
        depth_used,
        n_splits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recon::dp::{reconcile, DtlCosts};
    use crate::recon::tree::{TipMapping, Tree};

    fn three_mpr_space() -> (Tree, ReconGraph) {
        let host = Tree::from_vertex_pairs(&[
            ("r", Some(("m", "b"))),
            ("m", Some(("a", "c"))),
            ("a", None),
            ("c", None),
            ("b", None),
        ])
        .unwrap();
        let para =
            Tree::from_vertex_pairs(&[("q", Some(("x", "y"))), ("x", None), ("y", None)])
                .unwrap();
        let phi = TipMapping::new(&[("x", "a"), ("y", "b")], &para, &host).unwrap();
        let costs = DtlCosts {
            duplication: 1,
            transfer: 1,
            loss: 1,
        };
        let rec = reconcile(&host, &para, &phi, &costs).unwrap();
        assert_eq!(rec.mpr_count, 3);
        (host, rec.graph)
    }

    #[test]
    fn splits_partition_the_mpr_space() {
        let (_, graph) = three_mpr_space();
        let SplitEnum::Done { splits, .. } = enumerate_splits(&graph, 1, 100) else {
            panic!("capped");
        };
        assert_eq!(splits.len(), 3);
        let total: u128 = splits.iter().map(|s| count::count(s).total).sum();
        assert_eq!(total, 3);
        let mut union = ReconGraph::new();
        for s in &splits {
            assert!(s.is_subgraph_of(&graph));
            union = union.union(s);
        }
        assert_eq!(union, graph);
    }

    #[test]
    fn pdv_clustering_groups_the_transfers() {
        let (host, graph) = three_mpr_space();
        let scorer = PdvScore::new(&host, false);
        let config = ClusterConfig {
            k: 2,
            ..ClusterConfig::default()
        };
        let result = cluster(&graph, &scorer, &config)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(result.n_splits, 3);
        assert_eq!(result.clusters.len(), 2);
        // The two transfer MPRs (distance 2 apart) merge; the loss
        // route (distance 3 from each) stays alone.
        let merged = result
            .clusters
            .iter()
            .find(|c| c.mpr_count == 2)
            .expect("a merged cluster");
        assert_eq!(merged.graph.roots.len(), 2);
        assert!(merged
            .graph
            .roots
            .iter()
            .all(|r| r.host != host.root()));
        // was_series runs from the final count upward.
        assert_eq!(result.was_series.len(), 2);
        assert!((result.was_series[1] - 0.0).abs() < 1e-12);
        assert!((result.was_series[0] - 4.0 / 9.0).abs() < 1e-12);
        assert_eq!(result.merge_steps.len(), 1);
        assert!((result.merge_steps[0].merged - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn support_scoring_agrees_on_the_grouping() {
        let (_, graph) = three_mpr_space();
        let config = ClusterConfig {
            k: 2,
            ..ClusterConfig::default()
        };
        let result = cluster(&graph, &SupportScore, &config)
            .unwrap()
            .into_result()
            .unwrap();
        let merged = result
            .clusters
            .iter()
            .find(|c| c.mpr_count == 2)
            .expect("a merged cluster");
        assert_eq!(merged.graph.roots.len(), 2);
    }

    #[test]
    fn split_cap_reports_did_not_finish() {
        let (host, graph) = three_mpr_space();
        let scorer = PdvScore::new(&host, false);
        let config = ClusterConfig {
            k: 2,
            max_splits: 2,
            ..ClusterConfig::default()
        };
        match cluster(&graph, &scorer, &config).unwrap() {
            ClusterRun::DidNotFinish { splits_found, cap } => {
                assert_eq!(cap, 2);
                assert!(splits_found <= 2);
            }
            ClusterRun::Finished(_) => panic!("expected a capped run"),
        }
        let err = cluster(&graph, &scorer, &config)
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(matches!(err, Error::SplitLimit { cap: 2, .. }));
    }

    #[test]
    fn deepening_stops_at_full_resolution() {
        let (host, graph) = three_mpr_space();
        let scorer = PdvScore::new(&host, false);
        // Asking for more splits than MPRs clamps to the MPR count.
        let config = ClusterConfig {
            k: 3,
            min_splits: Some(10),
            ..ClusterConfig::default()
        };
        let result = cluster(&graph, &scorer, &config)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(result.n_splits, 3);
        assert_eq!(result.clusters.len(), 3);
        for c in &result.clusters {
            assert_eq!(c.mpr_count, 1);
        }
    }

    #[test]
    fn rejects_bad_config() {
        let (host, graph) = three_mpr_space();
        let scorer = PdvScore::new(&host, false);
        let bad_k = ClusterConfig {
            k: 0,
            ..ClusterConfig::default()
        };
        assert!(cluster(&graph, &scorer, &bad_k).is_err());
        let bad_min = ClusterConfig {
            k: 3,
            min_splits: Some(2),
            ..ClusterConfig::default()
        };
        assert!(cluster(&graph, &scorer, &bad_min).is_err());
        let bad_depth = ClusterConfig {
            depth: Some(0),
            ..ClusterConfig::default()
        };
        assert!(cluster(&graph, &scorer, &bad_depth).is_err());
    }
}
