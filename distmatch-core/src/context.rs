use distmatch_common::{Config, DistMatchError, MatcherConfig, Result};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::ArtifactCache;
use crate::column::{Column, ColumnId, ColumnKey};
use crate::emd::EmdEngine;
use crate::ranks::GlobalRankTable;
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Quantile,
    Intersection,
}

/// Everything one matching run owns: the rank table, the artifact cache, the registry of
/// columns and the worker pool. Dropping it removes the cache directory.
pub struct RunContext {
    config: MatcherConfig,
    rank_table: GlobalRankTable,
    cache: ArtifactCache,
    columns: Vec<ColumnId>,
    pool: ThreadPool,
}

impl RunContext {
    /// Ranks every value of `tables`, then prepares and caches each column in parallel.
    /// Table `i` of the slice gets `ColumnKey::table == i`.
    pub fn build(config: &Config, tables: &[&Table]) -> Result<Self> {
        config.validate()?;
        let cache = ArtifactCache::create(config.cache.root.as_deref(), config.cache.memo_capacity)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.matcher.process_num)
            .build()
            .map_err(|e| DistMatchError::Other(format!("thread pool: {e}")))?;

        let spill_dir = cache.spill_dir()?;
        let all_values = tables
            .iter()
            .flat_map(|t| t.get_columns())
            .flat_map(|c| c.data.iter());
        let rank_table =
            GlobalRankTable::build(all_values, &spill_dir, config.cache.sort_run_capacity)?;
        std::fs::remove_dir_all(&spill_dir)?;

        let mut columns = Vec::new();
        for (t_idx, table) in tables.iter().enumerate() {
            for (c_idx, column) in table.get_columns().iter().enumerate() {
                columns.push(ColumnId {
                    key: ColumnKey::new(t_idx as u32, c_idx as u32),
                    table_name: table.name.clone(),
                    table_id: table.unique_identifier.clone(),
                    column_name: column.name.clone(),
                    column_id: column.unique_identifier.clone(),
                });
            }
        }

        let ctx = Self {
            config: config.matcher.clone(),
            rank_table,
            cache,
            columns,
            pool,
        };
        ctx.ingest(tables)?;
        Ok(ctx)
    }

    fn ingest(&self, tables: &[&Table]) -> Result<()> {
        let quantiles = self.config.quantiles;
        info!(columns = self.columns.len(), quantiles, "preprocessing columns");
        self.pool.install(|| {
            self.columns.par_iter().try_for_each(|id| {
                let source = &tables[id.key.table as usize].get_columns()[id.key.column as usize];
                if source.data.is_empty() {
                    warn!(table = %id.table_name, column = %id.column_name, "empty column, it will not match");
                }
                let column = Column::new(id.clone(), source.data.clone(), &self.rank_table)
                    .with_histogram(quantiles);
                self.cache.put(&column)
            })
        })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    pub fn rank_table(&self) -> &GlobalRankTable {
        &self.rank_table
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    pub fn keys(&self) -> Vec<ColumnKey> {
        self.columns.iter().map(|c| c.key).collect()
    }

    pub fn column_id(&self, key: ColumnKey) -> Option<&ColumnId> {
        self.columns
            .binary_search_by_key(&key, |c| c.key)
            .ok()
            .map(|idx| &self.columns[idx])
    }

    pub fn load(&self, key: ColumnKey) -> Result<Arc<Column>> {
        self.cache.get(key)
    }

    pub fn engine(&self) -> EmdEngine<'_> {
        EmdEngine::new(&self.rank_table, self.config.quantiles)
    }

    /// Distance between two cached columns. Numeric dead ends (empty columns, disjoint domains,
    /// nothing in common) come back as `+inf`; a column that cannot be loaded is an error.
    pub fn distance(&self, a: ColumnKey, b: ColumnKey, kind: Distance) -> Result<f64> {
        let ca = self.load(a)?;
        let cb = self.load(b)?;
        let engine = self.engine();
        Ok(match kind {
            Distance::Quantile => engine.emd(&ca, &cb),
            Distance::Intersection => engine.intersection_emd(&ca, &cb),
        })
    }

    pub fn close(self) -> Result<()> {
        self.cache.close()
    }
}
