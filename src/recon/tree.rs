// SPDX-License-Identifier: AGPL-3.0-or-later
//! Vertex-form rooted binary trees in a flat postorder layout.
//!
//! Nodes are stored in postorder: node id = postorder rank, so the
//! root is always `len() - 1` and every child id is smaller than its
//! parent id. The DP engines rely on this — iterating `0..len()` is a
//! postorder traversal, and comparing ids compares postorder ranks.
//!
//! The preorder traversal used by the best-switch sweep is precomputed
//! at construction; the two orders are separate contracts and are
//! never interleaved.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Sentinel for "no node" in the child/parent arrays.
const NO_NODE: u32 = u32::MAX;

/// A rooted binary tree with named nodes, stored postorder-flat.
#[derive(Debug, Clone)]
pub struct Tree {
    /// Node names in postorder.
    names: Vec<String>,
    /// Left child id (`NO_NODE` for leaves).
    left: Vec<u32>,
    /// Right child id (`NO_NODE` for leaves).
    right: Vec<u32>,
    /// Parent id (`NO_NODE` for the root).
    parent: Vec<u32>,
    /// Preorder traversal (parent before children, left before right).
    preorder: Vec<usize>,
    /// Name → node id for all nodes.
    node_index: HashMap<String, usize>,
}

impl Tree {
    /// Build a tree from vertex form: one entry per node, mapping its
    /// name to its ordered child pair, with leaves mapping to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tree`] on duplicate or numeric labels, a child
    /// referenced but never defined, a child with two parents, zero or
    /// multiple roots, or a cycle.
    pub fn from_vertex_pairs<S: AsRef<str>>(entries: &[(S, Option<(S, S)>)]) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::Tree("empty vertex map".into()));
        }

        let mut children: HashMap<&str, Option<(&str, &str)>> = HashMap::new();
        for (name, pair) in entries {
            let name = name.as_ref();
            if name.is_empty() {
                return Err(Error::Tree("empty label".into()));
            }
            if name.parse::<f64>().is_ok() {
                return Err(Error::Tree(format!("numeric label '{name}'")));
            }
            let pair = pair.as_ref().map(|(l, r)| (l.as_ref(), r.as_ref()));
            if children.insert(name, pair).is_some() {
                return Err(Error::Tree(format!("duplicate label '{name}'")));
            }
        }

        // Every referenced child must be defined, with a single parent.
        let mut referenced: HashMap<&str, &str> = HashMap::new();
        for (&name, pair) in &children {
            if let Some((l, r)) = pair {
                for child in [l, r] {
                    if !children.contains_key(child) {
                        return Err(Error::Tree(format!(
                            "child '{child}' of '{name}' is not defined"
                        )));
                    }
                    if referenced.insert(child, name).is_some() {
                        return Err(Error::Tree(format!("'{child}' has two parents")));
                    }
                }
            }
        }

        let mut roots: Vec<&str> = children
            .keys()
            .filter(|name| !referenced.contains_key(*name))
            .copied()
            .collect();
        roots.sort_unstable();
        let root = match roots.as_slice() {
            [] => return Err(Error::Tree("no root: every node has a parent (cycle)".into())),
            [r] => *r,
            _ => {
                return Err(Error::Tree(format!(
                    "multiple roots: {}",
                    roots.join(", ")
                )))
            }
        };

        // Postorder DFS, detecting any cycle below the root.
        let n = children.len();
        let mut post: Vec<&str> = Vec::with_capacity(n);
        let mut seen: HashMap<&str, ()> = HashMap::with_capacity(n);
        // stack entries: (name, children_expanded)
        let mut stack: Vec<(&str, bool)> = vec![(root, false)];
        while let Some((name, expanded)) = stack.pop() {
            if expanded {
                post.push(name);
                continue;
            }
            if seen.insert(name, ()).is_some() {
                return Err(Error::Tree(format!("cycle through '{name}'")));
            }
            stack.push((name, true));
            if let Some((l, r)) = children[name] {
                // Right pushed first so the left subtree completes first.
                stack.push((r, false));
                stack.push((l, false));
            }
        }
        if post.len() != n {
            return Err(Error::Tree(
                "unreachable nodes: vertex map is not a single tree".into(),
            ));
        }

        let node_index: HashMap<String, usize> = post
            .iter()
            .enumerate()
            .map(|(id, name)| ((*name).to_string(), id))
            .collect();

        let mut left = vec![NO_NODE; n];
        let mut right = vec![NO_NODE; n];
        let mut parent = vec![NO_NODE; n];
        for (id, name) in post.iter().enumerate() {
            if let Some((l, r)) = children[name] {
                let lid = node_index[l];
                let rid = node_index[r];
                left[id] = lid as u32;
                right[id] = rid as u32;
                parent[lid] = id as u32;
                parent[rid] = id as u32;
            }
        }

        let names: Vec<String> = post.iter().map(|s| (*s).to_string()).collect();
        let mut tree = Self {
            names,
            left,
            right,
            parent,
            preorder: Vec::new(),
            node_index,
        };
        tree.preorder = tree.compute_preorder();
        Ok(tree)
    }

    fn compute_preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.len());
        let mut stack = vec![self.root()];
        while let Some(v) = stack.pop() {
            order.push(v);
            if let Some((l, r)) = self.children(v) {
                stack.push(r);
                stack.push(l);
            }
        }
        order
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the tree is empty (never true for a validated tree).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Root node id (last in postorder).
    #[must_use]
    pub fn root(&self) -> usize {
        self.len() - 1
    }

    /// Whether `v` is a leaf.
    #[must_use]
    pub fn is_leaf(&self, v: usize) -> bool {
        self.left[v] == NO_NODE
    }

    /// Ordered child pair of `v`, or `None` for leaves.
    #[must_use]
    pub fn children(&self, v: usize) -> Option<(usize, usize)> {
        if self.is_leaf(v) {
            None
        } else {
            Some((self.left[v] as usize, self.right[v] as usize))
        }
    }

    /// Parent of `v`, or `None` for the root.
    #[must_use]
    pub fn parent(&self, v: usize) -> Option<usize> {
        let p = self.parent[v];
        if p == NO_NODE {
            None
        } else {
            Some(p as usize)
        }
    }

    /// Name of node `v`.
    #[must_use]
    pub fn name(&self, v: usize) -> &str {
        &self.names[v]
    }

    /// Node id for `name`, if present.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<usize> {
        self.node_index.get(name).copied()
    }

    /// Postorder traversal: children before parents.
    pub fn postorder(&self) -> impl Iterator<Item = usize> {
        0..self.len()
    }

    /// Preorder traversal: parents before children.
    pub fn preorder(&self) -> impl Iterator<Item = usize> + '_ {
        self.preorder.iter().copied()
    }

    /// Leaf node ids in postorder.
    pub fn leaves(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(|&v| self.is_leaf(v))
    }

    /// Number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.leaves().count()
    }
}

/// Validated tip-to-tip association: parasite leaf → host leaf.
#[derive(Debug, Clone)]
pub struct TipMapping {
    map: HashMap<usize, usize>,
}

impl TipMapping {
    /// Validate `(parasite leaf name, host leaf name)` pairs against
    /// both trees.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TipMap`] if an entry names an unknown node or
    /// a non-leaf, a parasite leaf appears twice, or a parasite leaf
    /// is missing.
    pub fn new<S: AsRef<str>>(pairs: &[(S, S)], parasite: &Tree, host: &Tree) -> Result<Self> {
        let mut map = HashMap::with_capacity(pairs.len());
        for (p_name, h_name) in pairs {
            let p_name = p_name.as_ref();
            let h_name = h_name.as_ref();
            let p = parasite
                .node(p_name)
                .ok_or_else(|| Error::TipMap(format!("unknown parasite leaf '{p_name}'")))?;
            let h = host
                .node(h_name)
                .ok_or_else(|| Error::TipMap(format!("unknown host leaf '{h_name}'")))?;
            if !parasite.is_leaf(p) {
                return Err(Error::TipMap(format!("'{p_name}' is not a parasite leaf")));
            }
            if !host.is_leaf(h) {
                return Err(Error::TipMap(format!("'{h_name}' is not a host leaf")));
            }
            if map.insert(p, h).is_some() {
                return Err(Error::TipMap(format!(
                    "parasite leaf '{p_name}' mapped twice"
                )));
            }
        }
        for p in parasite.leaves() {
            if !map.contains_key(&p) {
                return Err(Error::TipMap(format!(
                    "parasite leaf '{}' has no mapping",
                    parasite.name(p)
                )));
            }
        }
        Ok(Self { map })
    }

    /// Host leaf associated with a parasite leaf.
    #[must_use]
    pub fn host_of(&self, parasite_leaf: usize) -> Option<usize> {
        self.map.get(&parasite_leaf).copied()
    }

    /// Number of associations (= number of parasite leaves).
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cherry() -> Tree {
        // (a,b)r
        Tree::from_vertex_pairs(&[("r", Some(("a", "b"))), ("a", None), ("b", None)]).unwrap()
    }

    #[test]
    fn postorder_layout() {
        let t = cherry();
        assert_eq!(t.len(), 3);
        assert_eq!(t.root(), 2);
        assert_eq!(t.name(t.root()), "r");
        assert_eq!(t.children(t.root()), Some((0, 1)));
        assert_eq!(t.name(0), "a");
        assert_eq!(t.name(1), "b");
        assert!(t.is_leaf(0) && t.is_leaf(1) && !t.is_leaf(2));
        assert_eq!(t.parent(0), Some(2));
        assert_eq!(t.parent(t.root()), None);
    }

    #[test]
    fn child_ids_smaller_than_parent() {
        // ((a,b)r,c)s
        let t = Tree::from_vertex_pairs(&[
            ("s", Some(("r", "c"))),
            ("r", Some(("a", "b"))),
            ("a", None),
            ("b", None),
            ("c", None),
        ])
        .unwrap();
        for v in t.postorder() {
            if let Some((l, r)) = t.children(v) {
                assert!(l < v && r < v);
            }
        }
    }

    #[test]
    fn preorder_parent_first() {
        let t = Tree::from_vertex_pairs(&[
            ("s", Some(("r", "c"))),
            ("r", Some(("a", "b"))),
            ("a", None),
            ("b", None),
            ("c", None),
        ])
        .unwrap();
        let pre: Vec<&str> = t.preorder().map(|v| t.name(v)).collect();
        assert_eq!(pre, vec!["s", "r", "a", "b", "c"]);
    }

    #[test]
    fn rejects_duplicate_label() {
        let err = Tree::from_vertex_pairs(&[
            ("r", Some(("a", "a"))),
            ("a", None),
            ("a", None),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_numeric_label() {
        let err =
            Tree::from_vertex_pairs(&[("r", Some(("1", "b"))), ("1", None), ("b", None)])
                .unwrap_err();
        assert!(err.to_string().contains("numeric"));
    }

    #[test]
    fn rejects_missing_child() {
        let err = Tree::from_vertex_pairs(&[("r", Some(("a", "b"))), ("a", None)]).unwrap_err();
        assert!(err.to_string().contains("not defined"));
    }

    #[test]
    fn rejects_two_parents() {
        let err = Tree::from_vertex_pairs(&[
            ("s", Some(("r", "a"))),
            ("r", Some(("a", "b"))),
            ("a", None),
            ("b", None),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("two parents"));
    }

    #[test]
    fn rejects_multiple_roots() {
        let err = Tree::from_vertex_pairs(&[
            ("r", Some(("a", "b"))),
            ("a", None),
            ("b", None),
            ("q", None),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("multiple roots"));
    }

    #[test]
    fn rejects_cycle() {
        // r -> (a, b), b -> (r, c): r has a parent and so does every node.
        let err = Tree::from_vertex_pairs(&[
            ("r", Some(("a", "b"))),
            ("a", None),
            ("b", Some(("r", "c"))),
            ("c", None),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("cycle") || err.to_string().contains("root"));
    }

    #[test]
    fn tip_mapping_validates() {
        let host = cherry();
        let para =
            Tree::from_vertex_pairs(&[("q", Some(("x", "y"))), ("x", None), ("y", None)])
                .unwrap();
        let phi = TipMapping::new(&[("x", "a"), ("y", "b")], &para, &host).unwrap();
        assert_eq!(phi.len(), 2);
        assert_eq!(phi.host_of(para.node("x").unwrap()), Some(host.node("a").unwrap()));
    }

    #[test]
    fn tip_mapping_rejects_non_leaf_and_missing() {
        let host = cherry();
        let para =
            Tree::from_vertex_pairs(&[("q", Some(("x", "y"))), ("x", None), ("y", None)])
                .unwrap();
        assert!(TipMapping::new(&[("x", "r"), ("y", "b")], &para, &host).is_err());
        assert!(TipMapping::new(&[("x", "a")], &para, &host).is_err());
        assert!(TipMapping::new(&[("x", "a"), ("x", "b"), ("y", "b")], &para, &host).is_err());
        assert!(TipMapping::new(&[("z", "a"), ("y", "b")], &para, &host).is_err());
    }
}
