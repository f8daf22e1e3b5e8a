use distmatch_common::Result;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::value::RawValue;

/// Number of sorted runs merged into one file per merge pass.
const MERGE_ARITY: usize = 8;

/// Dense 1-based rank of every distinct non-null value seen in a run.
#[derive(Debug, Clone, Default)]
pub struct GlobalRankTable {
    ranks: HashMap<RawValue, u32>,
}

impl GlobalRankTable {
    /// Sorts the distinct values externally under `spill_dir` and assigns ranks by re-reading
    /// the merged output. At most `run_capacity` distinct values are held in memory while sorting.
    pub fn build<'a, I>(values: I, spill_dir: &Path, run_capacity: usize) -> Result<Self>
    where
        I: IntoIterator<Item = &'a RawValue>,
    {
        let mut sorter = ExternalSorter::new(spill_dir, run_capacity);
        for value in values {
            if !value.is_null() {
                sorter.push(value)?;
            }
        }
        let sorted = sorter.finish()?;

        let mut reader = BufReader::new(File::open(&sorted)?);
        let mut ranks = HashMap::new();
        let mut rank = 1u32;
        while let Some(value) = read_record(&mut reader)? {
            ranks.insert(value, rank);
            rank += 1;
        }
        info!(distinct_values = ranks.len(), "global ranks built");
        Ok(Self { ranks })
    }

    pub fn rank(&self, value: &RawValue) -> Option<u32> {
        self.ranks.get(value).copied()
    }

    /// Ascending ranks of `data`; nulls and values missing from the table are dropped.
    pub fn ranks_of<'a, I>(&self, data: I) -> Vec<u32>
    where
        I: IntoIterator<Item = &'a RawValue>,
    {
        let mut out: Vec<u32> = data.into_iter().filter_map(|v| self.rank(v)).collect();
        out.sort_unstable();
        out
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

struct ExternalSorter {
    dir: PathBuf,
    capacity: usize,
    run: BTreeSet<RawValue>,
    runs: Vec<PathBuf>,
    files_created: usize,
}

impl ExternalSorter {
    fn new(dir: &Path, capacity: usize) -> Self {
        Self {
            dir: dir.to_path_buf(),
            capacity: capacity.max(1),
            run: BTreeSet::new(),
            runs: Vec::new(),
            files_created: 0,
        }
    }

    fn push(&mut self, value: &RawValue) -> Result<()> {
        if !self.run.contains(value) {
            self.run.insert(value.clone());
            if self.run.len() >= self.capacity {
                self.spill()?;
            }
        }
        Ok(())
    }

    fn next_path(&mut self, prefix: &str) -> PathBuf {
        self.files_created += 1;
        self.dir.join(format!("{prefix}_{:06}.bin", self.files_created))
    }

    fn spill(&mut self) -> Result<()> {
        if self.run.is_empty() {
            return Ok(());
        }
        let path = self.next_path("run");
        let mut writer = BufWriter::new(File::create(&path)?);
        let run = std::mem::take(&mut self.run);
        for value in &run {
            bincode::serialize_into(&mut writer, value)?;
        }
        writer.flush()?;
        debug!(values = run.len(), path = %path.display(), "spilled sorted run");
        self.runs.push(path);
        Ok(())
    }

    /// Returns the path of a single sorted, deduplicated file holding every pushed value.
    fn finish(mut self) -> Result<PathBuf> {
        self.spill()?;
        if self.runs.is_empty() {
            let path = self.next_path("sorted");
            File::create(&path)?;
            return Ok(path);
        }
        let mut level = 0;
        while self.runs.len() > 1 {
            let current = std::mem::take(&mut self.runs);
            debug!(runs = current.len(), level, "merging sorted runs");
            for group in current.chunks(MERGE_ARITY) {
                let merged = if group.len() == 1 {
                    group[0].clone()
                } else {
                    let out = self.next_path("merged");
                    merge_runs(group, &out)?;
                    for path in group {
                        std::fs::remove_file(path)?;
                    }
                    out
                };
                self.runs.push(merged);
            }
            level += 1;
        }
        Ok(self.runs.remove(0))
    }
}

/// k-way merge of sorted runs, dropping duplicates that appear in more than one run.
fn merge_runs(inputs: &[PathBuf], output: &Path) -> Result<()> {
    let mut readers = inputs
        .iter()
        .map(|p| File::open(p).map(BufReader::new))
        .collect::<std::io::Result<Vec<_>>>()?;
    let mut heap = BinaryHeap::new();
    for (idx, reader) in readers.iter_mut().enumerate() {
        if let Some(value) = read_record(reader)? {
            heap.push(Reverse((value, idx)));
        }
    }
    let mut writer = BufWriter::new(File::create(output)?);
    let mut last: Option<RawValue> = None;
    while let Some(Reverse((value, idx))) = heap.pop() {
        if let Some(next) = read_record(&mut readers[idx])? {
            heap.push(Reverse((next, idx)));
        }
        if last.as_ref() != Some(&value) {
            bincode::serialize_into(&mut writer, &value)?;
            last = Some(value);
        }
    }
    writer.flush()?;
    Ok(())
}

fn read_record(reader: &mut BufReader<File>) -> Result<Option<RawValue>> {
    if reader.fill_buf()?.is_empty() {
        return Ok(None);
    }
    Ok(Some(bincode::deserialize_from(reader)?))
}
