use distmatch_common::{DistMatchError, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::column::{Column, ColumnKey};

/// Per-run store of prepared columns, serialized with bincode into a temporary directory that is
/// removed when the cache is dropped.
///
/// Every key is written exactly once; readers go through a small FIFO memo of recently loaded
/// columns so pairwise phases do not re-read the same artifact for every pair.
pub struct ArtifactCache {
    dir: TempDir,
    memo: Mutex<Memo>,
}

struct Memo {
    capacity: usize,
    entries: HashMap<ColumnKey, Arc<Column>>,
    order: VecDeque<ColumnKey>,
}

impl Memo {
    fn insert(&mut self, key: ColumnKey, column: Arc<Column>) {
        if self.entries.insert(key, column).is_none() {
            self.order.push_back(key);
        }
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
            }
        }
    }
}

impl ArtifactCache {
    pub fn create(root: Option<&Path>, memo_capacity: usize) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("distmatch-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(Self {
            dir,
            memo: Mutex::new(Memo {
                capacity: memo_capacity.max(1),
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Scratch directory for the rank sort's spill files.
    pub fn spill_dir(&self) -> Result<PathBuf> {
        let dir = self.dir.path().join("sorts");
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn artifact_path(&self, key: ColumnKey) -> PathBuf {
        self.dir
            .path()
            .join(format!("column_{}_{}.bin", key.table, key.column))
    }

    pub fn put(&self, column: &Column) -> Result<()> {
        let path = self.artifact_path(column.key());
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => DistMatchError::Cache(format!(
                    "artifact for column {:?} written twice",
                    column.key()
                )),
                _ => DistMatchError::Io(e),
            })?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, column)?;
        writer.flush()?;
        Ok(())
    }

    pub fn get(&self, key: ColumnKey) -> Result<Arc<Column>> {
        if let Some(hit) = self.memo.lock().entries.get(&key) {
            return Ok(Arc::clone(hit));
        }
        let path = self.artifact_path(key);
        let file = File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                DistMatchError::Cache(format!("no artifact for column {key:?}"))
            }
            _ => DistMatchError::Io(e),
        })?;
        let column: Column = bincode::deserialize_from(BufReader::new(file))?;
        let column = Arc::new(column);
        self.memo.lock().insert(key, Arc::clone(&column));
        Ok(column)
    }

    /// Removes the directory, reporting any error instead of swallowing it like `Drop` does.
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnId;
    use crate::ranks::GlobalRankTable;
    use crate::value::RawValue;

    fn column(table: u32, idx: u32, data: Vec<RawValue>, ranks: &GlobalRankTable) -> Column {
        let id = ColumnId {
            key: ColumnKey::new(table, idx),
            table_name: format!("t{table}"),
            table_id: format!("t{table}"),
            column_name: format!("c{idx}"),
            column_id: format!("c{idx}"),
        };
        Column::new(id, data, ranks).with_histogram(4)
    }

    fn fixture() -> (TempDir, GlobalRankTable) {
        let dir = tempfile::tempdir().unwrap();
        let data: Vec<RawValue> = (1..=10).map(RawValue::from).collect();
        let table = GlobalRankTable::build(&data, dir.path(), 8).unwrap();
        (dir, table)
    }

    #[test]
    fn put_then_get_roundtrips_through_disk() {
        let (_d, ranks) = fixture();
        let cache = ArtifactCache::create(None, 1).unwrap();
        let a = column(0, 0, (1..=5).map(RawValue::from).collect(), &ranks);
        let b = column(1, 0, (6..=10).map(RawValue::from).collect(), &ranks);
        cache.put(&a).unwrap();
        cache.put(&b).unwrap();
        let got_a = cache.get(a.key()).unwrap();
        let got_b = cache.get(b.key()).unwrap(); // evicts a from the memo
        let again_a = cache.get(a.key()).unwrap();
        assert_eq!(got_a.ranks(), a.ranks());
        assert_eq!(got_b.data(), b.data());
        assert_eq!(again_a.id(), a.id());
    }

    #[test]
    fn second_write_of_a_key_is_rejected() {
        let (_d, ranks) = fixture();
        let cache = ArtifactCache::create(None, 4).unwrap();
        let a = column(0, 3, vec![1.into()], &ranks);
        cache.put(&a).unwrap();
        assert!(matches!(cache.put(&a), Err(DistMatchError::Cache(_))));
    }

    #[test]
    fn missing_key_is_a_cache_error() {
        let cache = ArtifactCache::create(None, 4).unwrap();
        assert!(matches!(cache.get(ColumnKey::new(9, 9)), Err(DistMatchError::Cache(_))));
    }

    #[test]
    fn directory_is_removed_on_close() {
        let root = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::create(Some(root.path()), 4).unwrap();
        let path = cache.path().to_path_buf();
        cache.spill_dir().unwrap();
        assert!(path.exists());
        cache.close().unwrap();
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
