// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for cophy parsers and reconciliation engines.
//!
//! All parser and algorithm errors use [`Error`], with variants for each
//! failure mode. No external error crates — zero-dependency error type.

use std::fmt;
use std::path::PathBuf;

/// Errors produced by cophy parsers and engines.
#[derive(Debug)]
pub enum Error {
    /// File I/O error with path context.
    Io {
        /// Path that caused the error.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Malformed tree text or vertex map (duplicate/numeric label,
    /// missing child, cycle, non-binary node).
    Tree(String),
    /// Malformed tip mapping (unknown leaf, non-leaf entry, duplicate
    /// or missing parasite leaf).
    TipMap(String),
    /// Invalid configuration or parameters (ranges, constraints).
    InvalidInput(String),
    /// The tip mapping admits no reconciliation at any cost.
    NoReconciliation(String),
    /// The cluster split phase hit its work cap before producing
    /// enough splits.
    SplitLimit {
        /// Splits enumerated before the cap was hit.
        found: usize,
        /// Caller-supplied cap.
        cap: usize,
    },
    /// A derived structure violated an invariant of the reconciliation
    /// graph. Always a bug, never a user error.
    Internal(String),
}

/// Result type alias for cophy operations.
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Tree(msg) => write!(f, "tree parse error: {msg}"),
            Self::TipMap(msg) => write!(f, "tip mapping error: {msg}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::NoReconciliation(msg) => write!(f, "no reconciliation exists: {msg}"),
            Self::SplitLimit { found, cap } => {
                write!(f, "split limit reached: {found} splits found, cap {cap}")
            }
            Self::Internal(msg) => write!(f, "internal invariant violation: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Tree(_)
            | Self::TipMap(_)
            | Self::InvalidInput(_)
            | Self::NoReconciliation(_)
            | Self::SplitLimit { .. }
            | Self::Internal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_io_error() {
        let err = Error::Io {
            path: PathBuf::from("test_data/host.tree"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("host.tree"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn display_all_variants() {
        let cases: Vec<(Error, &str)> = vec![
            (Error::Tree("unbalanced paren".into()), "tree parse error"),
            (Error::TipMap("leaf q unknown".into()), "tip mapping error"),
            (Error::InvalidInput("k must be >= 1".into()), "invalid input"),
            (
                Error::NoReconciliation("no feasible root".into()),
                "no reconciliation",
            ),
            (
                Error::SplitLimit { found: 3, cap: 8 },
                "split limit reached",
            ),
            (
                Error::Internal("median not a subgraph".into()),
                "internal invariant violation",
            ),
        ];
        for (err, expected_prefix) in cases {
            let msg = err.to_string();
            assert!(
                msg.starts_with(expected_prefix),
                "'{msg}' should start with '{expected_prefix}'"
            );
        }
    }

    #[test]
    fn split_limit_reports_counts() {
        let err = Error::SplitLimit { found: 5, cap: 16 };
        let msg = err.to_string();
        assert!(msg.contains('5') && msg.contains("16"));
    }

    #[test]
    fn error_source_chain() {
        let io_err = Error::Io {
            path: PathBuf::from("x"),
            source: std::io::Error::other("inner"),
        };
        assert!(std::error::Error::source(&io_err).is_some());
        assert!(std::error::Error::source(&Error::Tree("bad".into())).is_none());
    }
}
