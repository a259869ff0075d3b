// SPDX-License-Identifier: AGPL-3.0-or-later
//! Ancestor/descendant relations between tree nodes.
//!
//! Precomputed as a flat `n × n` relation table so the distance and
//! clustering engines can classify node pairs in O(1). Built in one
//! postorder pass: each node's descendant set is the union of its
//! children's sets plus the children themselves.

use super::tree::Tree;

/// Relation of node `a` to node `b` within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Same node.
    Equal,
    /// `a` is a proper ancestor of `b`.
    Ancestor,
    /// `a` is a proper descendant of `b`.
    Descendant,
    /// Neither is an ancestor of the other.
    Incomparable,
}

/// Dense pairwise relation table for one tree.
#[derive(Debug, Clone)]
pub struct AncestryTable {
    n: usize,
    /// `desc[a * n + b]` = true iff `a` is a proper ancestor of `b`.
    desc: Vec<bool>,
}

impl AncestryTable {
    /// Build the table in O(n²) time and space.
    #[must_use]
    pub fn build(tree: &Tree) -> Self {
        let n = tree.len();
        let mut desc = vec![false; n * n];
        for v in tree.postorder() {
            if let Some((l, r)) = tree.children(v) {
                for c in [l, r] {
                    desc[v * n + c] = true;
                    // Children are postorder-smaller, so their rows
                    // are already complete.
                    for b in 0..n {
                        if desc[c * n + b] {
                            desc[v * n + b] = true;
                        }
                    }
                }
            }
        }
        Self { n, desc }
    }

    /// Relation of `a` to `b`.
    #[must_use]
    pub fn relation(&self, a: usize, b: usize) -> Relation {
        if a == b {
            Relation::Equal
        } else if self.desc[a * self.n + b] {
            Relation::Ancestor
        } else if self.desc[b * self.n + a] {
            Relation::Descendant
        } else {
            Relation::Incomparable
        }
    }

    /// Whether `a` is a proper ancestor of `b`.
    #[must_use]
    pub fn is_ancestor(&self, a: usize, b: usize) -> bool {
        self.desc[a * self.n + b]
    }

    /// Whether neither node is an ancestor of the other.
    #[must_use]
    pub fn incomparable(&self, a: usize, b: usize) -> bool {
        a != b && !self.desc[a * self.n + b] && !self.desc[b * self.n + a]
    }
}
