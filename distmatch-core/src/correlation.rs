use distmatch_common::{DistMatchError, Result};
use good_lp::{microlp, variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
use tracing::debug;

use crate::attributes::SignedGraph;
use crate::column::ColumnKey;

/// Solves correlation clustering on `graph` as a 0/1 program: one binary per ordered pair
/// (diagonal included), minimizing positive pairs kept apart plus negative pairs put together.
///
/// Returns the row-major assignment; `0` means "same cluster".
pub fn solve_correlation_clustering(graph: &SignedGraph) -> Result<Vec<u8>> {
    let n = graph.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut vars = ProblemVariables::new();
    let x: Vec<Variable> = (0..n * n).map(|_| vars.add(variable().binary())).collect();

    // constant term of the (1 - x) pairs does not move the optimum
    let mut objective = Expression::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let v = x[i * n + j];
            if graph.sign(i, j) > 0 {
                objective += v;
            } else {
                objective -= v;
            }
        }
    }

    let solution = vars
        .minimise(objective)
        .using(microlp)
        .solve()
        .map_err(|e| DistMatchError::Solver(e.to_string()))?;

    let assignment: Vec<u8> = x
        .iter()
        .map(|&v| if solution.value(v) < 0.5 { 0 } else { 1 })
        .collect();
    debug!(
        columns = n,
        cost = disagreement_cost(graph, &assignment),
        "correlation clustering solved"
    );
    Ok(assignment)
}

/// Number of disagreements of `assignment`: positive pairs with `x = 1` plus negative pairs with
/// `x = 0`.
pub fn disagreement_cost(graph: &SignedGraph, assignment: &[u8]) -> usize {
    let n = graph.len();
    let mut cost = 0;
    for i in 0..n {
        for j in 0..n {
            let together = assignment[i * n + j] == 0;
            match (graph.sign(i, j) > 0, together) {
                (true, false) | (false, true) => cost += 1,
                _ => {}
            }
        }
    }
    cost
}

/// Column pairs (off-diagonal) the assignment places in the same cluster.
pub fn zero_pairs(graph: &SignedGraph, assignment: &[u8]) -> Vec<(ColumnKey, ColumnKey)> {
    let n = graph.len();
    let nodes = graph.nodes();
    let mut pairs = Vec::new();
    for i in 0..n {
        for j in 0..n {
            if i != j && assignment[i * n + j] == 0 {
                pairs.push((nodes[i], nodes[j]));
            }
        }
    }
    pairs
}
