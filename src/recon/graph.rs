// SPDX-License-Identifier: AGPL-3.0-or-later
//! The reconciliation graph: a compact encoding of every MPR.
//!
//! A mapping node places a parasite node on a host node; each mapping
//! node carries the set of events that some MPR uses there. An MPR is
//! recovered by starting from one root and picking exactly one event
//! per reached mapping node.
//!
//! # Ordering
//!
//! `MappingNode` orders by parasite postorder rank, then host postorder
//! rank. Every event's child mapping nodes compare strictly below the
//! node carrying the event (speciation-like events descend in the
//! parasite tree, losses descend in the host tree), so iterating the
//! event map in ascending key order visits children before parents and
//! descending order visits parents before children. The counting and
//! frequency sweeps rely on this instead of explicit recursion.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

use super::ancestry::AncestryTable;
use super::tree::TipMapping;

/// A parasite node placed on a host node, both by postorder rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MappingNode {
    /// Parasite node id.
    pub parasite: usize,
    /// Host node id.
    pub host: usize,
}

impl MappingNode {
    /// Construct a mapping node.
    #[must_use]
    pub const fn new(parasite: usize, host: usize) -> Self {
        Self { parasite, host }
    }
}

/// One event an MPR can use at a mapping node.
///
/// Child mapping nodes always compare strictly below the node the
/// event is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Event {
    /// Parasite divergence tracking a host divergence: one child per
    /// host child, in host-child order.
    Cospeciation {
        /// Child on the left host child.
        left: MappingNode,
        /// Child on the right host child.
        right: MappingNode,
    },
    /// Parasite divergence on one host edge: both children stay.
    Duplication {
        /// Child for the left parasite child.
        left: MappingNode,
        /// Child for the right parasite child.
        right: MappingNode,
    },
    /// Parasite divergence with a host switch: one child stays, the
    /// other lands on an incomparable host.
    Transfer {
        /// Child that keeps the current host.
        kept: MappingNode,
        /// Child that switches host.
        moved: MappingNode,
    },
    /// The parasite passes to one host child; the other host lineage
    /// loses it.
    Loss {
        /// Same parasite on the surviving host child.
        child: MappingNode,
    },
    /// Terminal event: a parasite tip on its associated host tip.
    Contemporaneous,
}

impl Event {
    /// Child mapping nodes, in declaration order (0, 1 or 2).
    #[must_use]
    pub fn children(&self) -> Vec<MappingNode> {
        match *self {
            Self::Cospeciation { left, right } | Self::Duplication { left, right } => {
                vec![left, right]
            }
            Self::Transfer { kept, moved } => vec![kept, moved],
            Self::Loss { child } => vec![child],
            Self::Contemporaneous => Vec::new(),
        }
    }

    /// Child mapping nodes sorted by parasite id.
    ///
    /// For two-child events this pairs the slot holding the smaller
    /// parasite child first, regardless of which side kept the host.
    #[must_use]
    pub fn children_by_parasite(&self) -> Vec<MappingNode> {
        let mut cs = self.children();
        cs.sort_unstable_by_key(|m| m.parasite);
        cs
    }

    /// Whether this is a loss event.
    #[must_use]
    pub const fn is_loss(&self) -> bool {
        matches!(self, Self::Loss { .. })
    }
}

/// The full MPR space: every mapping node used by some MPR, the events
/// available there, and the root mapping nodes that start an MPR.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconGraph {
    /// Events per mapping node, each vec sorted and deduplicated.
    pub events: BTreeMap<MappingNode, Vec<Event>>,
    /// Root mapping nodes (parasite root on its optimal hosts), sorted.
    pub roots: Vec<MappingNode>,
}

impl ReconGraph {
    /// Empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mapping nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the graph has no mapping nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total number of events across all mapping nodes.
    #[must_use]
    pub fn n_events(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    /// Events at `m` (empty slice if `m` is not in the graph).
    #[must_use]
    pub fn events_at(&self, m: MappingNode) -> &[Event] {
        self.events.get(&m).map_or(&[], Vec::as_slice)
    }

    /// Whether `m` carries `event`.
    #[must_use]
    pub fn contains_event(&self, m: MappingNode, event: &Event) -> bool {
        self.events_at(m).contains(event)
    }

    /// Insert an event at `m`, keeping the event list sorted and
    /// duplicate-free.
    pub fn add_event(&mut self, m: MappingNode, event: Event) {
        let list = self.events.entry(m).or_default();
        if let Err(pos) = list.binary_search(&event) {
            list.insert(pos, event);
        }
    }

    /// Record `m` as a root, keeping roots sorted and duplicate-free.
    pub fn add_root(&mut self, m: MappingNode) {
        if let Err(pos) = self.roots.binary_search(&m) {
            self.roots.insert(pos, m);
        }
    }

    /// Whether every mapping node, event and root of `self` also
    /// appears in `other`.
    #[must_use]
    pub fn is_subgraph_of(&self, other: &Self) -> bool {
        self.roots.iter().all(|r| other.roots.contains(r))
            && self.events.iter().all(|(m, evs)| {
                let theirs = other.events_at(*m);
                evs.iter().all(|e| theirs.contains(e))
            })
    }

    /// Union of two graphs over the same problem instance.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (&m, evs) in &other.events {
            for &e in evs {
                out.add_event(m, e);
            }
        }
        for &r in &other.roots {
            out.add_root(r);
        }
        out
    }

    /// Check structural invariants: at least one root, every root and
    /// every event child is a mapping node of the graph, every event's
    /// children compare strictly below their parent, and every mapping
    /// node carries at least one event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] on any violation. A failure here is
    /// a bug in graph construction, never bad user input.
    pub fn check_structure(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(Error::Internal("reconciliation graph has no roots".into()));
        }
        for r in &self.roots {
            if !self.events.contains_key(r) {
                return Err(Error::Internal(format!(
                    "root ({}, {}) is not a mapping node",
                    r.parasite, r.host
                )));
            }
        }
        for (m, evs) in &self.events {
            if evs.is_empty() {
                return Err(Error::Internal(format!(
                    "mapping node ({}, {}) has no events",
                    m.parasite, m.host
                )));
            }
            for e in evs {
                for c in e.children() {
                    if c >= *m {
                        return Err(Error::Internal(format!(
                            "event child ({}, {}) does not precede ({}, {})",
                            c.parasite, c.host, m.parasite, m.host
                        )));
                    }
                    if !self.events.contains_key(&c) {
                        return Err(Error::Internal(format!(
                            "event child ({}, {}) is not a mapping node",
                            c.parasite, c.host
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Full invariant check: [`Self::check_structure`] plus the event
    /// semantics construction must uphold. A contemporaneous event may
    /// only sit on a tip pair matched by `phi`, and a transfer keeps
    /// one child on its own host while the moved child lands on a host
    /// incomparable with it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] on any violation. A failure here is
    /// a bug in graph construction, never bad user input.
    pub fn check_invariants(
        &self,
        host_ancestry: &AncestryTable,
        phi: &TipMapping,
    ) -> Result<()> {
        self.check_structure()?;
        for (m, evs) in &self.events {
            for e in evs {
                match *e {
                    Event::Contemporaneous => {
                        if phi.host_of(m.parasite) != Some(m.host) {
                            return Err(Error::Internal(format!(
                                "contemporaneous event at ({}, {}) is not a matched tip pair",
                                m.parasite, m.host
                            )));
                        }
                    }
                    Event::Transfer { kept, moved } => {
                        if kept.host != m.host {
                            return Err(Error::Internal(format!(
                                "transfer at ({}, {}) moves its kept child to host {}",
                                m.parasite, m.host, kept.host
                            )));
                        }
                        if !host_ancestry.incomparable(m.host, moved.host) {
                            return Err(Error::Internal(format!(
                                "transfer at ({}, {}) lands on comparable host {}",
                                m.parasite, m.host, moved.host
                            )));
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
