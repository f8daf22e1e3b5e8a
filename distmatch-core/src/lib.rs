pub mod attributes;
pub mod cache;
pub mod column;
pub mod context;
pub mod correlation;
pub mod distribution;
pub mod emd;
pub mod export;
pub mod graph;
pub mod histogram;
pub mod matcher;
pub mod ranker;
pub mod ranks;
pub mod results;
pub mod table;
pub mod value;

pub use distmatch_common::{CacheConfig, Config, DistMatchError, MatcherConfig, Result};
pub use attributes::{compute_attribute_graph, SignedGraph};
pub use cache::ArtifactCache;
pub use column::{Column, ColumnId, ColumnKey};
pub use context::{Distance, RunContext};
pub use correlation::{disagreement_cost, solve_correlation_clustering, zero_pairs};
pub use distribution::compute_distribution_clusters;
pub use emd::{transport_cost, EmdEngine};
pub use export::{export_csv, export_json};
pub use graph::{compute_cutoff_threshold, connected_components};
pub use histogram::{GroundDistance, QuantileHistogram};
pub use matcher::{find_matches, DistributionMatcher};
pub use ranker::{rank_matches, similarity};
pub use ranks::GlobalRankTable;
pub use results::{Match, MatchKey, MatchResults};
pub use table::{SourceColumn, Table};
pub use value::RawValue;
