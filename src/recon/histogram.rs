// SPDX-License-Identifier: AGPL-3.0-or-later
//! Sparse integer histograms with the algebra the distance DP needs.
//!
//! Bins map a `u64` key (a distance) to a `u128` mass (a pair count).
//! Combining adds masses pointwise; convolving adds keys and
//! multiplies masses, which is exactly how distances compose across
//! independent subproblems. All mass arithmetic saturates.

use std::collections::BTreeMap;

/// Sparse histogram: distance key → pair count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram {
    bins: BTreeMap<u64, u128>,
}

impl Histogram {
    /// Empty histogram (additive identity).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single bin.
    #[must_use]
    pub fn point(key: u64, mass: u128) -> Self {
        let mut bins = BTreeMap::new();
        if mass > 0 {
            bins.insert(key, mass);
        }
        Self { bins }
    }

    /// Convolution identity: all mass 1 at key 0.
    #[must_use]
    pub fn unit() -> Self {
        Self::point(0, 1)
    }

    /// Whether the histogram carries no mass.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Mass at `key` (0 if absent).
    #[must_use]
    pub fn get(&self, key: u64) -> u128 {
        self.bins.get(&key).copied().unwrap_or(0)
    }

    /// Iterate `(key, mass)` in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u128)> + '_ {
        self.bins.iter().map(|(&k, &m)| (k, m))
    }

    /// Add `mass` at `key`, saturating.
    pub fn add(&mut self, key: u64, mass: u128) {
        if mass == 0 {
            return;
        }
        let slot = self.bins.entry(key).or_insert(0);
        *slot = slot.saturating_add(mass);
    }

    /// Pointwise sum with `other`.
    pub fn combine(&mut self, other: &Self) {
        for (k, m) in other.iter() {
            self.add(k, m);
        }
    }

    /// All keys moved up by `delta`.
    #[must_use]
    pub fn shift(&self, delta: u64) -> Self {
        if delta == 0 {
            return self.clone();
        }
        Self {
            bins: self
                .bins
                .iter()
                .map(|(&k, &m)| (k.saturating_add(delta), m))
                .collect(),
        }
    }

    /// Convolution: keys add, masses multiply.
    #[must_use]
    pub fn convolve(&self, other: &Self) -> Self {
        let mut out = Self::new();
        for (ka, ma) in self.iter() {
            for (kb, mb) in other.iter() {
                out.add(ka.saturating_add(kb), ma.saturating_mul(mb));
            }
        }
        out
    }

    /// All keys multiplied by `factor`, masses unchanged. With a zero
    /// factor every bin collapses onto key 0.
    #[must_use]
    pub fn scale_keys(&self, factor: u64) -> Self {
        let mut out = Self::new();
        for (k, m) in self.iter() {
            out.add(k.saturating_mul(factor), m);
        }
        out
    }

    /// All masses multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: u128) -> Self {
        if factor == 0 {
            return Self::new();
        }
        Self {
            bins: self
                .bins
                .iter()
                .map(|(&k, &m)| (k, m.saturating_mul(factor)))
                .collect(),
        }
    }

    /// Remove up to `mass` from the bin at `key`, dropping the bin if
    /// it empties.
    #[must_use]
    pub fn without_at(&self, key: u64, mass: u128) -> Self {
        let mut out = self.clone();
        let remaining = out.get(key).saturating_sub(mass);
        if remaining == 0 {
            out.bins.remove(&key);
        } else {
            out.bins.insert(key, remaining);
        }
        out
    }

    /// Unordered pairs of a product space.
    ///
    /// Given unordered-pair histograms over two independent component
    /// spaces (each including the `diag` equal pairs at key 0), the
    /// unordered pairs of the product space are
    /// `self ⊛ other + (self − diag) ⊛ (other − diag)`: a pair of
    /// distinct component pairs matches up two ways, a pair involving
    /// an equal component only one.
    #[must_use]
    pub fn product_combine(&self, other: &Self, self_diag: u128, other_diag: u128) -> Self {
        let mut out = self.convolve(other);
        let strict_a = self.without_at(0, self_diag);
        let strict_b = other.without_at(0, other_diag);
        out.combine(&strict_a.convolve(&strict_b));
        out
    }

    /// Total mass.
    #[must_use]
    pub fn total(&self) -> u128 {
        self.bins.values().fold(0, |acc, m| acc.saturating_add(*m))
    }

    /// Largest key carrying mass.
    #[must_use]
    pub fn max_key(&self) -> Option<u64> {
        self.bins.keys().next_back().copied()
    }

    /// Mass-weighted mean key (0.0 for an empty histogram).
    #[must_use]
    pub fn mean(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted: f64 = self.iter().map(|(k, m)| k as f64 * m as f64).sum();
        weighted / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_and_get() {
        let h = Histogram::point(3, 5);
        assert_eq!(h.get(3), 5);
        assert_eq!(h.get(0), 0);
        assert_eq!(h.total(), 5);
        assert_eq!(h.max_key(), Some(3));
        assert!(Histogram::point(1, 0).is_empty());
    }

    #[test]
    fn combine_adds_pointwise() {
        let mut a = Histogram::point(0, 2);
        a.combine(&Histogram::point(0, 3));
        a.combine(&Histogram::point(2, 1));
        assert_eq!(a.get(0), 5);
        assert_eq!(a.get(2), 1);
        assert_eq!(a.total(), 6);
    }

    #[test]
    fn convolve_adds_keys_multiplies_masses() {
        let mut a = Histogram::point(0, 2);
        a.add(1, 3);
        let b = Histogram::point(2, 5);
        let c = a.convolve(&b);
        assert_eq!(c.get(2), 10);
        assert_eq!(c.get(3), 15);
        assert_eq!(c.total(), 25);
    }

    #[test]
    fn unit_is_convolution_identity() {
        let mut a = Histogram::point(4, 7);
        a.add(9, 2);
        assert_eq!(a.convolve(&Histogram::unit()), a);
    }

    #[test]
    fn shift_moves_keys() {
        let h = Histogram::point(1, 4).shift(3);
        assert_eq!(h.get(4), 4);
        assert_eq!(h.total(), 4);
    }

    #[test]
    fn scale_keys_stretches_distances() {
        let mut h = Histogram::point(2, 3);
        h.add(5, 1);
        let doubled = h.scale_keys(2);
        assert_eq!(doubled.get(4), 3);
        assert_eq!(doubled.get(10), 1);
        assert_eq!(doubled.total(), 4);
        // Zero factor merges everything into bin 0.
        let collapsed = h.scale_keys(0);
        assert_eq!(collapsed.get(0), 4);
        assert_eq!(collapsed.max_key(), Some(0));
    }

    #[test]
    fn without_at_clamps_and_drops_empty_bins() {
        let h = Histogram::point(0, 3);
        let g = h.without_at(0, 1);
        assert_eq!(g.get(0), 2);
        assert!(h.without_at(0, 5).is_empty());
    }

    #[test]
    fn product_combine_counts_product_pairs() {
        // Two component spaces with 2 elements each at distance d=1:
        // unordered pairs per component = {0:2, 1:1} (diag 2).
        // Product space has 4 elements; unordered pairs = 10.
        let comp = {
            let mut h = Histogram::point(0, 2);
            h.add(1, 1);
            h
        };
        let prod = comp.product_combine(&comp, 2, 2);
        assert_eq!(prod.total(), 10);
        // equal pairs: 4 at distance 0; plus (a-equal, b-distinct) and
        // vice versa: 2*2 = 4 at distance 1; distinct-distinct: 2 at
        // distance 2.
        assert_eq!(prod.get(0), 4);
        assert_eq!(prod.get(1), 4);
        assert_eq!(prod.get(2), 2);
    }

    #[test]
    fn mean_weights_by_mass() {
        let mut h = Histogram::point(0, 3);
        h.add(4, 1);
        assert!((h.mean() - 1.0).abs() < 1e-12);
        assert!((Histogram::new().mean() - 0.0).abs() < 1e-12);
    }
}
