// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reconciliation engines: trees, the DTL dynamic program, and the
//! analyses that run over the resulting MPR graph.

pub mod ancestry;
pub mod brute;
pub mod cluster;
pub mod count;
pub mod dp;
pub mod frequency;
pub mod graph;
pub mod histogram;
pub mod median;
pub mod pdv;
pub mod tree;
