use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// `((source_table, source_column), (target_table, target_column))`
pub type MatchKey = ((String, String), (String, String));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    pub similarity: f64,
}

impl Match {
    pub fn key(&self) -> MatchKey {
        (
            (self.source_table.clone(), self.source_column.clone()),
            (self.target_table.clone(), self.target_column.clone()),
        )
    }

    fn source(&self) -> (&str, &str) {
        (&self.source_table, &self.source_column)
    }

    fn target(&self) -> (&str, &str) {
        (&self.target_table, &self.target_column)
    }
}

/// Ranked matches, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResults {
    matches: Vec<Match>,
}

impl MatchResults {
    pub fn new(mut matches: Vec<Match>) -> Self {
        matches.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.source().cmp(&b.source()))
                .then_with(|| a.target().cmp(&b.target()))
        });
        Self { matches }
    }

    pub fn get(&self, source: (&str, &str), target: (&str, &str)) -> Option<f64> {
        self.matches
            .iter()
            .find(|m| m.source() == source && m.target() == target)
            .map(|m| m.similarity)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    pub fn as_slice(&self) -> &[Match] {
        &self.matches
    }

    /// Greedy 1:1 assignment over the matches at or above the median distinct similarity.
    /// Stops at the first match below the median; fewer than two distinct values returns a copy.
    pub fn one_to_one(&self) -> MatchResults {
        let mut distinct: Vec<f64> = self.matches.iter().map(|m| m.similarity).collect();
        distinct.sort_by(|a, b| b.total_cmp(a));
        distinct.dedup();
        if distinct.len() < 2 {
            return self.clone();
        }
        let median = distinct[distinct.len().div_ceil(2)];

        let mut used: HashSet<(&str, &str)> = HashSet::new();
        let mut kept = Vec::new();
        for m in &self.matches {
            if used.contains(&m.source()) || used.contains(&m.target()) {
                continue;
            }
            if m.similarity < median {
                break;
            }
            used.insert(m.source());
            used.insert(m.target());
            kept.push(m.clone());
        }
        MatchResults { matches: kept }
    }

    pub fn take_top_n(&self, n: usize) -> MatchResults {
        MatchResults {
            matches: self.matches.iter().take(n).cloned().collect(),
        }
    }

    /// Keeps the best `ceil(percent / 100 * len)` matches.
    pub fn take_top_percent(&self, percent: u32) -> MatchResults {
        let keep = (f64::from(percent) / 100.0 * self.matches.len() as f64).ceil() as usize;
        self.take_top_n(keep)
    }

    pub fn into_map(self) -> BTreeMap<MatchKey, f64> {
        self.matches
            .into_iter()
            .map(|m| (m.key(), m.similarity))
            .collect()
    }
}

impl IntoIterator for MatchResults {
    type Item = Match;
    type IntoIter = std::vec::IntoIter<Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}

impl<'a> IntoIterator for &'a MatchResults {
    type Item = &'a Match;
    type IntoIter = std::slice::Iter<'a, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}
