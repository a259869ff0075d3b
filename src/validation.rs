// SPDX-License-Identifier: AGPL-3.0-or-later
//! Validation framework for scenario-baseline comparison.
//!
//! Used by validation binaries (`validate_reconciliation`) to compare
//! engine output against hand-worked reconciliation scenarios. Each
//! check prints a formatted pass/fail line with the actual value and
//! the expected baseline.
//!
//! Every validation binary follows the same contract:
//! - Hardcoded expected values sourced from hand-worked DP runs
//! - Explicit pass/fail per check with human-readable output
//! - Exit code 0 = all passed, 1 = at least one failed

// ── Standalone helpers (for one-off use) ──────────────────────

/// Compare `actual` against `expected` within absolute `tolerance`.
///
/// Prints a formatted `[OK]` or `[FAIL]` line and returns whether
/// the check passed. Tolerance of `0.0` requires exact match.
///
/// ```
/// use cophy::validation::check;
///
/// assert!(check("median value", 0.5, 0.5, 1e-12));
/// assert!(!check("deliberate fail", 2.0, 1.0, 0.5));
/// ```
#[must_use]
pub fn check(label: &str, actual: f64, expected: f64, tolerance: f64) -> bool {
    let pass = (actual - expected).abs() <= tolerance;
    let tag = if pass { "OK" } else { "FAIL" };
    println!("  [{tag}]  {label}: {actual:.6} (expected {expected:.6}, tol {tolerance:.6})");
    pass
}

/// Compare an exact count — no floating-point conversion needed.
///
/// ```
/// use cophy::validation::check_count;
///
/// assert!(check_count("mpr count", 4, 4));
/// assert!(!check_count("mismatched", 1, 2));
/// ```
#[must_use]
pub fn check_count(label: &str, actual: u128, expected: u128) -> bool {
    let pass = actual == expected;
    let tag = if pass { "OK" } else { "FAIL" };
    println!("  [{tag}]  {label}: {actual} (expected {expected})");
    pass
}

/// Print summary and return whether all checks passed.
///
/// Separates logic from exit behavior for testability.
#[must_use]
pub fn print_result(name: &str, passed: u32, total: u32) -> bool {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("  {name}: {passed}/{total} checks passed");
    if passed == total {
        println!("  RESULT: PASS");
    } else {
        println!("  RESULT: FAIL ({} checks failed)", total - passed);
    }
    println!("═══════════════════════════════════════════════════════════");
    passed == total
}

// ── Validator: structured check accumulator ───────────────────

/// Accumulated validation state, removing manual pass/fail bookkeeping.
///
/// # Examples
///
/// ```
/// use cophy::validation::Validator;
///
/// let mut v = Validator::new("doc-test");
/// v.check("frequency", 0.25, 0.25, 1e-12);
/// v.check_count("roots", 1, 1);
/// let (passed, total) = v.counts();
/// assert_eq!((passed, total), (2, 2));
/// ```
pub struct Validator {
    name: String,
    passed: u32,
    total: u32,
}

impl Validator {
    /// Create a new validator for the given binary name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        println!("═══════════════════════════════════════════════════════════");
        println!("  {name}");
        println!("═══════════════════════════════════════════════════════════\n");
        Self {
            name,
            passed: 0,
            total: 0,
        }
    }

    /// Print a section header (no check counted).
    pub fn section(&self, label: &str) {
        println!("\n{label}");
    }

    /// Check an f64 value against expected within tolerance.
    pub fn check(&mut self, label: &str, actual: f64, expected: f64, tolerance: f64) {
        self.total += 1;
        if check(label, actual, expected, tolerance) {
            self.passed += 1;
        }
    }

    /// Check an exact count — no floating-point conversion.
    pub fn check_count(&mut self, label: &str, actual: u128, expected: u128) {
        self.total += 1;
        if check_count(label, actual, expected) {
            self.passed += 1;
        }
    }

    /// Check a boolean condition.
    pub fn check_that(&mut self, label: &str, cond: bool) {
        self.total += 1;
        let tag = if cond { "OK" } else { "FAIL" };
        println!("  [{tag}]  {label}");
        if cond {
            self.passed += 1;
        }
    }

    /// Retrieve current (passed, total) for external logic.
    #[must_use]
    pub const fn counts(&self) -> (u32, u32) {
        (self.passed, self.total)
    }

    /// Print summary and exit with 0 (pass) or 1 (fail).
    pub fn finish(self) -> ! {
        let ok = print_result(&self.name, self.passed, self.total);
        std::process::exit(i32::from(!ok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_exact_match() {
        assert!(check("exact", 1.0, 1.0, 0.0));
        assert!(!check("off by eps", 1.0 + 1e-9, 1.0, 0.0));
    }

    #[test]
    fn check_within_tolerance() {
        assert!(check("close", 1.0001, 1.0, 1e-3));
        assert!(!check("too far", 1.1, 1.0, 1e-3));
    }

    #[test]
    fn counts_accumulate() {
        let mut v = Validator::new("unit");
        v.check_count("a", 1, 1);
        v.check_count("b", 2, 3);
        v.check_that("c", true);
        assert_eq!(v.counts(), (2, 3));
    }

    #[test]
    fn print_result_pass_and_fail() {
        assert!(print_result("all good", 3, 3));
        assert!(!print_result("one bad", 2, 3));
    }
}
