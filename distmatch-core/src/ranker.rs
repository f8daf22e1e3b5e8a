use distmatch_common::Result;
use rayon::prelude::*;
use tracing::info;

use crate::column::ColumnKey;
use crate::context::{Distance, RunContext};
use crate::graph::cross_table_pairs;
use crate::results::{Match, MatchResults};

/// `1 / (1 + emd)`; an infinite distance gives 0.
pub fn similarity(emd: f64) -> f64 {
    if emd.is_finite() {
        1.0 / (1.0 + emd)
    } else {
        0.0
    }
}

/// Scores every cross-table pair inside each final cluster. Columns of `target_table` always end
/// up on the target side of a match; zero similarities are dropped.
pub fn rank_matches(
    ctx: &RunContext,
    clusters: &[Vec<ColumnKey>],
    target_table: u32,
) -> Result<MatchResults> {
    let pairs: Vec<(ColumnKey, ColumnKey)> = clusters
        .iter()
        .filter(|c| c.len() > 1)
        .flat_map(|c| {
            let mut members = c.clone();
            members.sort();
            cross_table_pairs(&members)
        })
        .collect();

    let scored: Vec<Option<Match>> = ctx.pool().install(|| {
        pairs
            .par_iter()
            .map(|&(a, b)| -> Result<Option<Match>> {
                let sim = similarity(ctx.distance(a, b, Distance::Quantile)?);
                if sim <= 0.0 {
                    return Ok(None);
                }
                let (source, target) = if a.table == target_table { (b, a) } else { (a, b) };
                let (Some(source), Some(target)) = (ctx.column_id(source), ctx.column_id(target))
                else {
                    return Ok(None);
                };
                Ok(Some(Match {
                    source_table: source.table_name.clone(),
                    source_column: source.column_name.clone(),
                    target_table: target.table_name.clone(),
                    target_column: target.column_name.clone(),
                    similarity: sim,
                }))
            })
            .collect::<Result<_>>()
    })?;
    let matches: Vec<Match> = scored.into_iter().flatten().collect();
    info!(pairs = pairs.len(), matches = matches.len(), "ranked matches");
    Ok(MatchResults::new(matches))
}
