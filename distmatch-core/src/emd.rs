use std::collections::HashSet;

use crate::column::Column;
use crate::histogram::{GroundDistance, QuantileHistogram};
use crate::ranks::GlobalRankTable;
use crate::value::RawValue;

const MASS_EPSILON: f64 = 1e-12;

/// Earth Mover's Distance between columns, measured over quantile histograms of global ranks.
#[derive(Debug, Clone, Copy)]
pub struct EmdEngine<'a> {
    rank_table: &'a GlobalRankTable,
    quantiles: usize,
}

impl<'a> EmdEngine<'a> {
    pub fn new(rank_table: &'a GlobalRankTable, quantiles: usize) -> Self {
        Self { rank_table, quantiles }
    }

    /// EMD between `a`'s own histogram and `b` counted into `a`'s buckets.
    /// Returns `+inf` when either side is empty or `b` never lands in `a`'s rank domain.
    pub fn emd(&self, a: &Column, b: &Column) -> f64 {
        if a.is_empty() || b.is_empty() {
            return f64::INFINITY;
        }
        let Some(reference) = a.histogram(self.quantiles) else {
            return f64::INFINITY;
        };
        let relative = QuantileHistogram::build_relative(b.ranks(), b.size(), &reference);
        match (reference.probabilities(), relative.probabilities()) {
            (Some(p), Some(q)) => transport_cost(&p, &q, &reference.ground_distance()),
            _ => f64::INFINITY,
        }
    }

    /// `(emd(a, a∩b) + emd(b, a∩b)) / 2`, where `a∩b` keeps every value of both columns that
    /// occurs in both. `+inf` when they share nothing.
    pub fn intersection_emd(&self, a: &Column, b: &Column) -> f64 {
        let left: HashSet<&RawValue> = a.data().iter().filter(|v| !v.is_null()).collect();
        let right: HashSet<&RawValue> = b.data().iter().filter(|v| !v.is_null()).collect();
        let common: HashSet<&RawValue> = left.intersection(&right).copied().collect();
        if common.is_empty() {
            return f64::INFINITY;
        }
        let data: Vec<RawValue> = a
            .data()
            .iter()
            .chain(b.data())
            .filter(|v| common.contains(v))
            .cloned()
            .collect();
        let intersection = Column::synthetic(data, self.rank_table);
        (self.emd(a, &intersection) + self.emd(b, &intersection)) / 2.0
    }
}

/// Optimal transport cost between two probability vectors over the same ordered buckets.
///
/// Uses the north-west corner coupling, which is the optimal plan when the ground distance is a
/// function of `|i - j|` that is convex, as [`GroundDistance`] is.
pub fn transport_cost(supply: &[f64], demand: &[f64], ground: &GroundDistance) -> f64 {
    if supply.is_empty() || demand.is_empty() {
        return f64::INFINITY;
    }
    let (mut i, mut j) = (0, 0);
    let (mut s, mut d) = (supply[0], demand[0]);
    let mut cost = 0.0;
    while i < supply.len() && j < demand.len() {
        let flow = s.min(d);
        if flow > 0.0 {
            cost += flow * ground.get(i, j);
        }
        s -= flow;
        d -= flow;
        if s <= MASS_EPSILON {
            i += 1;
            if i < supply.len() {
                s = supply[i];
            }
        }
        if d <= MASS_EPSILON {
            j += 1;
            if j < demand.len() {
                d = demand[j];
            }
        }
    }
    cost
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        table: GlobalRankTable,
    }

    impl Fixture {
        fn new(columns: &[&[RawValue]]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let all: Vec<&RawValue> = columns.iter().flat_map(|c| c.iter()).collect();
            let table = GlobalRankTable::build(all, dir.path(), 64).unwrap();
            Self { _dir: dir, table }
        }

        fn column(&self, data: &[RawValue], quantiles: usize) -> Column {
            Column::synthetic(data.to_vec(), &self.table).with_histogram(quantiles)
        }
    }

    fn ints(range: std::ops::RangeInclusive<i64>) -> Vec<RawValue> {
        range.map(RawValue::from).collect()
    }

    #[test]
    fn transport_between_point_masses() {
        let g = GroundDistance::new(4);
        let cost = transport_cost(&[1.0, 0.0, 0.0, 0.0], &[0.0, 0.0, 0.0, 1.0], &g);
        assert!((cost - 0.75).abs() < 1e-12);
    }

    #[test]
    fn transport_split_mass() {
        let g = GroundDistance::new(4);
        let cost = transport_cost(&[0.5, 0.5, 0.0, 0.0], &[0.0, 0.0, 0.5, 0.5], &g);
        assert!((cost - 0.5).abs() < 1e-12);
    }

    #[test]
    fn self_distance_is_zero() {
        let a = ints(1..=50);
        let fx = Fixture::new(&[&a]);
        let col = fx.column(&a, 16);
        let engine = EmdEngine::new(&fx.table, 16);
        assert_eq!(engine.emd(&col, &col), 0.0);
    }

    #[test]
    fn half_overlap_is_symmetric() {
        let a = ints(1..=100);
        let b = ints(51..=150);
        let fx = Fixture::new(&[&a, &b]);
        let (ca, cb) = (fx.column(&a, 10), fx.column(&b, 10));
        let engine = EmdEngine::new(&fx.table, 10);
        let ab = engine.emd(&ca, &cb);
        let ba = engine.emd(&cb, &ca);
        assert!((ab - 0.25).abs() < 1e-9, "emd(a,b) = {ab}");
        assert!((ab - ba).abs() < 1e-9, "emd(b,a) = {ba}");
    }

    #[test]
    fn empty_column_is_infinitely_far() {
        let a = ints(1..=5);
        let fx = Fixture::new(&[&a]);
        let engine = EmdEngine::new(&fx.table, 8);
        let empty = fx.column(&[], 8);
        let col = fx.column(&a, 8);
        assert!(engine.emd(&col, &empty).is_infinite());
        assert!(engine.emd(&empty, &col).is_infinite());
    }

    #[test]
    fn disjoint_rank_domains_are_infinitely_far() {
        let nums = ints(1..=5);
        let words: Vec<RawValue> = ["kiwi", "fig", "pear"].iter().map(|s| RawValue::from(*s)).collect();
        let fx = Fixture::new(&[&nums, &words]);
        let engine = EmdEngine::new(&fx.table, 8);
        assert!(engine.emd(&fx.column(&nums, 8), &fx.column(&words, 8)).is_infinite());
    }

    #[test]
    fn intersection_of_disjoint_columns_is_infinite() {
        let a = ints(1..=5);
        let b = ints(6..=10);
        let fx = Fixture::new(&[&a, &b]);
        let engine = EmdEngine::new(&fx.table, 8);
        assert!(engine
            .intersection_emd(&fx.column(&a, 8), &fx.column(&b, 8))
            .is_infinite());
    }

    #[test]
    fn intersection_of_identical_columns_is_zero() {
        let a = ints(1..=40);
        let fx = Fixture::new(&[&a]);
        let engine = EmdEngine::new(&fx.table, 8);
        let ca = fx.column(&a, 8);
        let cb = fx.column(&a, 8);
        assert_eq!(engine.intersection_emd(&ca, &cb), 0.0);
    }

    #[test]
    fn intersection_uses_canonical_equality() {
        let a: Vec<RawValue> = ["1", "2", "3"].iter().map(|s| RawValue::from(*s)).collect();
        let b: Vec<RawValue> = vec![1.0.into(), 2.0.into(), 3.0.into()];
        let fx = Fixture::new(&[&a, &b]);
        let engine = EmdEngine::new(&fx.table, 4);
        assert!(engine.intersection_emd(&fx.column(&a, 4), &fx.column(&b, 4)).is_finite());
    }
}
