// SPDX-License-Identifier: AGPL-3.0-or-later
//! cophy — Duplication-Transfer-Loss cophylogeny reconciliation.
//!
//! Given a host tree, a parasite tree and a tip-to-tip association, the
//! crate computes the compact graph of all Maximum Parsimony
//! Reconciliations (MPRs) under user-supplied duplication / transfer /
//! loss costs, and analyzes the MPR space: counting, event frequencies,
//! median reconciliations, pairwise-distance histograms and
//! split-then-merge clustering.
//!
//! Rendering, GUIs and cost-landscape plotting are external consumers;
//! this crate ends at parsed trees + tip map in, reconciliation graph
//! and derived reports out.

pub mod error;
pub mod io;
pub mod recon;
pub mod validation;
