// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tip association files: one `parasite:host` pair per line.
//!
//! Blank lines and `#` comments are skipped. Validation against the
//! two trees (every parasite leaf mapped exactly once, targets are
//! host leaves) happens in [`TipMapping::new`].

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::recon::tree::{TipMapping, Tree};

/// Parse `parasite:host` lines into name pairs.
///
/// # Errors
///
/// Returns [`Error::TipMap`] on a line without exactly one `:` or with
/// an empty side.
pub fn parse(text: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split(':');
        let (Some(p), Some(h), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(Error::TipMap(format!(
                "line {}: expected 'parasite:host', got '{line}'",
                lineno + 1
            )));
        };
        let (p, h) = (p.trim(), h.trim());
        if p.is_empty() || h.is_empty() {
            return Err(Error::TipMap(format!(
                "line {}: empty name in '{line}'",
                lineno + 1
            )));
        }
        pairs.push((p.to_string(), h.to_string()));
    }
    Ok(pairs)
}

/// Parse a tip association file and validate it against both trees.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, otherwise as
/// [`parse`] and [`TipMapping::new`].
pub fn load(path: &Path, parasite: &Tree, host: &Tree) -> Result<TipMapping> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let pairs = parse(&text)?;
    TipMapping::new(&pairs, parasite, host)
}
