use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::histogram::QuantileHistogram;
use crate::ranks::GlobalRankTable;
use crate::value::RawValue;

/// Integer identity assigned at ingestion: position of the table in the run and of the column
/// in its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnKey {
    pub table: u32,
    pub column: u32,
}

impl ColumnKey {
    pub const SYNTHETIC: ColumnKey = ColumnKey { table: u32::MAX, column: u32::MAX };

    pub fn new(table: u32, column: u32) -> Self {
        Self { table, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnId {
    pub key: ColumnKey,
    pub table_name: String,
    pub table_id: String,
    pub column_name: String,
    pub column_id: String,
}

impl ColumnId {
    fn synthetic() -> Self {
        Self {
            key: ColumnKey::SYNTHETIC,
            table_name: String::new(),
            table_id: String::new(),
            column_name: String::new(),
            column_id: String::new(),
        }
    }
}

/// A column prepared for distribution matching: raw data, sorted global ranks and, once built,
/// its own quantile histogram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    id: ColumnId,
    data: Vec<RawValue>,
    ranks: Vec<u32>,
    histogram: Option<QuantileHistogram>,
}

impl Column {
    pub fn new(id: ColumnId, data: Vec<RawValue>, rank_table: &GlobalRankTable) -> Self {
        let ranks = rank_table.ranks_of(&data);
        Self { id, data, ranks, histogram: None }
    }

    /// A throwaway column that does not belong to any table, e.g. the intersection of two columns.
    pub fn synthetic(data: Vec<RawValue>, rank_table: &GlobalRankTable) -> Self {
        Self::new(ColumnId::synthetic(), data, rank_table)
    }

    /// Builds and keeps the histogram; an empty column never gets one.
    pub fn with_histogram(mut self, quantiles: usize) -> Self {
        if !self.is_empty() {
            self.histogram = Some(QuantileHistogram::build(&self.ranks, self.size(), quantiles));
        }
        self
    }

    /// The column's own histogram with `quantiles` buckets, reusing the stored one when it
    /// matches and building it on the fly otherwise.
    pub fn histogram(&self, quantiles: usize) -> Option<Cow<'_, QuantileHistogram>> {
        if self.is_empty() {
            return None;
        }
        match &self.histogram {
            Some(h) if h.quantiles() == quantiles => Some(Cow::Borrowed(h)),
            _ => Some(Cow::Owned(QuantileHistogram::build(&self.ranks, self.size(), quantiles))),
        }
    }

    pub fn id(&self) -> &ColumnId {
        &self.id
    }

    pub fn key(&self) -> ColumnKey {
        self.id.key
    }

    pub fn data(&self) -> &[RawValue] {
        &self.data
    }

    pub fn ranks(&self) -> &[u32] {
        &self.ranks
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank_table(values: &[RawValue]) -> (tempfile::TempDir, GlobalRankTable) {
        let dir = tempfile::tempdir().unwrap();
        let table = GlobalRankTable::build(values, dir.path(), 16).unwrap();
        (dir, table)
    }

    #[test]
    fn ranks_are_sorted_and_skip_nulls() {
        let data: Vec<RawValue> = vec![3.into(), RawValue::Null, 1.into(), 3.into()];
        let (_dir, table) = rank_table(&data);
        let col = Column::synthetic(data, &table);
        assert_eq!(col.ranks(), &[1, 2, 2]);
        assert_eq!(col.size(), 4);
    }

    #[test]
    fn empty_column_has_no_histogram() {
        let (_dir, table) = rank_table(&[]);
        let col = Column::synthetic(Vec::new(), &table).with_histogram(8);
        assert!(col.is_empty());
        assert!(col.histogram(8).is_none());
    }

    #[test]
    fn stored_histogram_is_reused_only_for_same_bucket_count() {
        let data: Vec<RawValue> = (1..=20).map(RawValue::from).collect();
        let (_dir, table) = rank_table(&data);
        let col = Column::synthetic(data, &table).with_histogram(4);
        assert!(matches!(col.histogram(4), Some(Cow::Borrowed(_))));
        match col.histogram(5) {
            Some(Cow::Owned(h)) => assert_eq!(h.quantiles(), 5),
            other => panic!("expected a fresh histogram, got {other:?}"),
        }
    }
}
