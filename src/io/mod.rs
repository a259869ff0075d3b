// SPDX-License-Identifier: AGPL-3.0-or-later
//! Parsers and report writers for reconciliation inputs and outputs.

pub mod report;
pub mod tip_map;
pub mod tree_text;
