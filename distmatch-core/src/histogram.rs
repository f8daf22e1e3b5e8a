use serde::{Deserialize, Serialize};

/// Equi-depth histogram over a column's global ranks.
///
/// ```text
/// |------||------||------| ... |------|
///     0       1       2    ...    Q-1
/// ```
///
/// Bucket 0 spans `[min, q_1]` and bucket `k` spans `[q_k, q_{k+1}]`, where `q_k` is the sample
/// quantile of the ranks at probability `k / Q`. Counts are normalized by the column size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantileHistogram {
    boundaries: Vec<(f64, f64)>,
    counts: Vec<f64>,
}

impl QuantileHistogram {
    /// `ranks` must be sorted ascending.
    pub fn build(ranks: &[u32], size: usize, quantiles: usize) -> Self {
        debug_assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
        let quantiles = quantiles.max(1);
        let boundaries = match ranks.first() {
            Some(&min) => {
                let cuts = mquantiles(ranks, quantiles);
                let mut bounds = Vec::with_capacity(quantiles);
                bounds.push((f64::from(min), cuts[0]));
                bounds.extend(cuts.windows(2).map(|w| (w[0], w[1])));
                bounds
            }
            // nothing can fall into an inverted interval
            None => vec![(f64::INFINITY, f64::NEG_INFINITY); quantiles],
        };
        let counts = count_into(&boundaries, ranks, size);
        Self { boundaries, counts }
    }

    /// Counts `ranks` into the buckets of `reference` instead of deriving its own cut points,
    /// so that both histograms describe the same rank intervals.
    pub fn build_relative(ranks: &[u32], size: usize, reference: &QuantileHistogram) -> Self {
        debug_assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
        let boundaries = reference.boundaries.clone();
        let counts = count_into(&boundaries, ranks, size);
        Self { boundaries, counts }
    }

    pub fn quantiles(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub fn boundaries(&self) -> &[(f64, f64)] {
        &self.boundaries
    }

    /// True when no rank fell inside any bucket.
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0.0)
    }

    /// Bucket counts rescaled to sum to one; `None` for an empty histogram.
    pub fn probabilities(&self) -> Option<Vec<f64>> {
        let total: f64 = self.counts.iter().sum();
        if total <= 0.0 {
            return None;
        }
        Some(self.counts.iter().map(|c| c / total).collect())
    }

    pub fn ground_distance(&self) -> GroundDistance {
        GroundDistance::new(self.quantiles())
    }
}

/// Distance between buckets `i` and `j` of a Q-bucket histogram: `|i - j| / Q`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroundDistance {
    quantiles: usize,
}

impl GroundDistance {
    pub fn new(quantiles: usize) -> Self {
        Self { quantiles: quantiles.max(1) }
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        i.abs_diff(j) as f64 / self.quantiles as f64
    }
}

/// Single pass over sorted ranks; a rank sitting on a shared boundary goes to the lower bucket.
fn count_into(boundaries: &[(f64, f64)], ranks: &[u32], size: usize) -> Vec<f64> {
    let mut counts = vec![0.0; boundaries.len()];
    let mut bucket = 0;
    for &rank in ranks {
        let r = f64::from(rank);
        while bucket < boundaries.len() && boundaries[bucket].1 < r {
            bucket += 1;
        }
        if bucket == boundaries.len() {
            break;
        }
        if boundaries[bucket].0 <= r {
            counts[bucket] += 1.0;
        }
    }
    let norm = size.max(1) as f64;
    counts.iter_mut().for_each(|c| *c /= norm);
    counts
}

/// Sample quantiles at `k / quantiles` for `k = 1..=quantiles` using the
/// Cunnane plotting positions (alpha = beta = 0.4). `sorted` must be non-empty.
pub fn mquantiles(sorted: &[u32], quantiles: usize) -> Vec<f64> {
    const ALPHA: f64 = 0.4;
    const BETA: f64 = 0.4;
    let n = sorted.len();
    (1..=quantiles)
        .map(|k| {
            if n == 1 {
                return f64::from(sorted[0]);
            }
            let p = k as f64 / quantiles as f64;
            let m = ALPHA + p * (1.0 - ALPHA - BETA);
            let aleph = n as f64 * p + m;
            let idx = aleph.clamp(1.0, (n - 1) as f64).floor() as usize;
            let gamma = (aleph - idx as f64).clamp(0.0, 1.0);
            (1.0 - gamma) * f64::from(sorted[idx - 1]) + gamma * f64::from(sorted[idx])
        })
        .collect()
}
