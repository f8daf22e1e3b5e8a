use distmatch_common::Result;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::debug;

use crate::column::ColumnKey;
use crate::context::{Distance, RunContext};
use crate::graph::{cross_table_pairs, distance_lists, neighbours_within_cutoff};

/// Complete signed graph over the columns of one distribution cluster, stored row-major.
/// `+1` marks a compatible pair, `-1` an incompatible one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedGraph {
    nodes: Vec<ColumnKey>,
    signs: Vec<i8>,
}

impl SignedGraph {
    /// From 0/1 neighbour adjacency `e`: a pair is positive when it is linked directly or through
    /// one intermediate node (`E + E²` non-zero), negative otherwise.
    pub fn from_adjacency(nodes: Vec<ColumnKey>, e: &[Vec<u8>]) -> Self {
        let n = nodes.len();
        let mut signs = vec![-1i8; n * n];
        for i in 0..n {
            for j in 0..n {
                let direct = e[i][j] != 0;
                let two_hop = direct || (0..n).any(|k| e[i][k] != 0 && e[k][j] != 0);
                if two_hop {
                    signs[i * n + j] = 1;
                }
            }
        }
        Self { nodes, signs }
    }

    #[cfg(test)]
    pub(crate) fn from_signs(nodes: Vec<ColumnKey>, signs: Vec<i8>) -> Self {
        assert_eq!(signs.len(), nodes.len() * nodes.len(), "sign matrix must be n x n");
        Self { nodes, signs }
    }

    pub fn nodes(&self) -> &[ColumnKey] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn sign(&self, i: usize, j: usize) -> i8 {
        self.signs[i * self.nodes.len() + j]
    }
}

/// Refines one distribution cluster into a signed compatibility graph using intersection EMD and
/// the adaptive cutoff capped by `threshold2`.
pub fn compute_attribute_graph(ctx: &RunContext, cluster: &[ColumnKey]) -> Result<SignedGraph> {
    let threshold = ctx.config().threshold2;
    let pairs = cross_table_pairs(cluster);
    let distances: Vec<((ColumnKey, ColumnKey), f64)> = ctx.pool().install(|| {
        pairs
            .par_iter()
            .map(|&(a, b)| -> Result<((ColumnKey, ColumnKey), f64)> {
                Ok(((a, b), ctx.distance(a, b, Distance::Intersection)?))
            })
            .collect::<Result<_>>()
    })?;
    let lists = distance_lists(&distances);

    let position: HashMap<ColumnKey, usize> =
        cluster.iter().enumerate().map(|(i, k)| (*k, i)).collect();
    let n = cluster.len();
    let mut e = vec![vec![0u8; n]; n];
    for (column, list) in &lists {
        let i = position[column];
        for other in neighbours_within_cutoff(list, threshold) {
            e[i][position[&other]] = 1;
        }
    }
    debug!(
        columns = n,
        links = e.iter().flatten().filter(|&&x| x != 0).count(),
        "attribute graph built"
    );
    Ok(SignedGraph::from_adjacency(cluster.to_vec(), &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{SourceColumn, Table};
    use distmatch_common::Config;

    fn odd_even_context() -> RunContext {
        let odd = Table::new("s", vec![SourceColumn::from_values("odd", (0..100).map(|i| 2 * i + 1))]);
        let even = Table::new("t", vec![SourceColumn::from_values("even", (0..100).map(|i| 2 * i + 2))]);
        RunContext::build(&Config::default(), &[&odd, &even]).unwrap()
    }

    fn nodes(n: u32) -> Vec<ColumnKey> {
        (0..n).map(|i| ColumnKey::new(i % 2, i)).collect()
    }

    #[test]
    fn two_hop_links_are_positive() {
        // 0 -> 1 -> 2, nothing else
        let e = vec![vec![0, 1, 0], vec![0, 0, 1], vec![0, 0, 0]];
        let g = SignedGraph::from_adjacency(nodes(3), &e);
        assert_eq!(g.sign(0, 1), 1);
        assert_eq!(g.sign(0, 2), 1);
        assert_eq!(g.sign(2, 0), -1);
        assert_eq!(g.sign(1, 0), -1);
    }

    #[test]
    fn mutual_neighbours_make_diagonal_positive() {
        let e = vec![vec![0, 1], vec![1, 0]];
        let g = SignedGraph::from_adjacency(nodes(2), &e);
        assert_eq!(g.sign(0, 0), 1);
        assert_eq!(g.sign(1, 1), 1);
        assert_eq!(g.sign(0, 1), 1);
    }

    #[test]
    fn isolated_nodes_are_negative_everywhere() {
        let e = vec![vec![0, 0], vec![0, 0]];
        let g = SignedGraph::from_adjacency(nodes(2), &e);
        assert!((0..2).all(|i| (0..2).all(|j| g.sign(i, j) == -1)));
    }

    #[test]
    fn columns_without_shared_values_are_all_negative() {
        let ctx = odd_even_context();
        let graph = compute_attribute_graph(&ctx, &ctx.keys()).unwrap();
        assert_eq!(graph.len(), 2);
        assert!((0..2).all(|i| (0..2).all(|j| graph.sign(i, j) == -1)));
        ctx.close().unwrap();
    }

    #[test]
    fn shared_values_make_a_positive_graph() {
        let s = Table::new("s", vec![SourceColumn::from_values("a", 1..=60)]);
        let t = Table::new("t", vec![SourceColumn::from_values("b", 1..=60)]);
        let ctx = RunContext::build(&Config::default(), &[&s, &t]).unwrap();
        let graph = compute_attribute_graph(&ctx, &ctx.keys()).unwrap();
        assert!((0..2).all(|i| (0..2).all(|j| graph.sign(i, j) == 1)));
        ctx.close().unwrap();
    }
}
