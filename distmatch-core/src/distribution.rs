use distmatch_common::Result;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::column::ColumnKey;
use crate::context::{Distance, RunContext};
use crate::graph::{connected_components, cross_table_pairs, distance_lists, neighbours_within_cutoff};

/// Groups the run's columns by similarity of their value distributions.
///
/// EMD is computed for every cross-table pair; each column keeps the neighbours inside its own
/// adaptive cutoff (capped by `threshold1`) and the clusters are the connected components of the
/// resulting graph. Singletons are returned too. Fails when a cached column cannot be read.
pub fn compute_distribution_clusters(ctx: &RunContext) -> Result<Vec<Vec<ColumnKey>>> {
    let keys = ctx.keys();
    let threshold = ctx.config().threshold1;
    let pairs = cross_table_pairs(&keys);
    info!(pairs = pairs.len(), threshold, "computing distribution clusters");

    let distances: Vec<((ColumnKey, ColumnKey), f64)> = ctx.pool().install(|| {
        pairs
            .par_iter()
            .map(|&(a, b)| -> Result<((ColumnKey, ColumnKey), f64)> {
                Ok(((a, b), ctx.distance(a, b, Distance::Quantile)?))
            })
            .collect::<Result<_>>()
    })?;
    let lists = distance_lists(&distances);

    let edges: Vec<(ColumnKey, ColumnKey)> = ctx.pool().install(|| {
        lists
            .par_iter()
            .flat_map_iter(|(&column, list)| {
                neighbours_within_cutoff(list, threshold)
                    .into_iter()
                    .map(move |other| (column, other))
            })
            .collect()
    });
    debug!(edges = edges.len(), "distribution graph built");

    let clusters = connected_components(&keys, edges);
    info!(
        clusters = clusters.len(),
        multi_column = clusters.iter().filter(|c| c.len() > 1).count(),
        "distribution clusters ready"
    );
    Ok(clusters)
}
