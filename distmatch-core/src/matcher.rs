use distmatch_common::{Config, MatcherConfig, Result};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::attributes::compute_attribute_graph;
use crate::column::ColumnKey;
use crate::context::RunContext;
use crate::correlation::{solve_correlation_clustering, zero_pairs};
use crate::distribution::compute_distribution_clusters;
use crate::graph::connected_components;
use crate::ranker::rank_matches;
use crate::results::MatchResults;
use crate::table::Table;

/// Position of the target table in the run; the source is table 0.
const TARGET_TABLE: u32 = 1;

/// Distribution-based schema matcher: matches columns by the shape of their value distributions
/// over a shared global ranking, ignoring column names.
#[derive(Debug, Clone, Default)]
pub struct DistributionMatcher {
    config: Config,
}

impl DistributionMatcher {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn with_matcher_config(matcher: MatcherConfig) -> Self {
        Self {
            config: Config { matcher, ..Config::default() },
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Matches the columns of `source` against those of `target`. Run state lives in a temporary
    /// directory that is removed before this returns, whether or not matching succeeded.
    pub fn get_matches(&self, source: &Table, target: &Table) -> Result<MatchResults> {
        info!(
            source = %source.name,
            target = %target.name,
            threshold1 = self.config.matcher.threshold1,
            threshold2 = self.config.matcher.threshold2,
            quantiles = self.config.matcher.quantiles,
            "matching tables"
        );
        let ctx = RunContext::build(&self.config, &[source, target])?;
        let outcome = find_matches(&ctx);
        let closed = ctx.close();
        let results = outcome?;
        closed?;
        Ok(results)
    }
}

/// Runs the clustering pipeline over an already prepared context.
pub fn find_matches(ctx: &RunContext) -> Result<MatchResults> {
    let clusters: Vec<Vec<ColumnKey>> = compute_distribution_clusters(ctx)?
        .into_iter()
        .filter(|c| c.len() > 1)
        .collect();

    let solved: Vec<Vec<(ColumnKey, ColumnKey)>> = ctx.pool().install(|| {
        clusters
            .par_iter()
            .map(|cluster| -> Result<Vec<(ColumnKey, ColumnKey)>> {
                let graph = compute_attribute_graph(ctx, cluster)?;
                let assignment = solve_correlation_clustering(&graph)?;
                let pairs = zero_pairs(&graph, &assignment);
                debug!(columns = cluster.len(), together = pairs.len(), "cluster refined");
                Ok(pairs)
            })
            .collect::<Result<_>>()
    })?;

    let final_clusters = connected_components(&ctx.keys(), solved.into_iter().flatten());
    info!(
        distribution_clusters = clusters.len(),
        attribute_clusters = final_clusters.iter().filter(|c| c.len() > 1).count(),
        "attribute clusters ready"
    );
    rank_matches(ctx, &final_clusters, TARGET_TABLE)
}
