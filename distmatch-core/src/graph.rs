use petgraph::unionfind::UnionFind;
use std::collections::{BTreeMap, HashMap};

use crate::column::ColumnKey;

/// Every unordered pair of `keys` whose columns come from different tables, in registration order.
pub fn cross_table_pairs(keys: &[ColumnKey]) -> Vec<(ColumnKey, ColumnKey)> {
    let mut pairs = Vec::new();
    for (i, a) in keys.iter().enumerate() {
        for b in &keys[i + 1..] {
            if a.table != b.table {
                pairs.push((*a, *b));
            }
        }
    }
    pairs
}

/// Per-column lists of `(distance, other)` built from symmetric pairwise distances.
pub fn distance_lists(
    distances: &[((ColumnKey, ColumnKey), f64)],
) -> BTreeMap<ColumnKey, Vec<(f64, ColumnKey)>> {
    let mut lists: BTreeMap<ColumnKey, Vec<(f64, ColumnKey)>> = BTreeMap::new();
    for &((a, b), d) in distances {
        lists.entry(a).or_default().push((d, b));
        lists.entry(b).or_default().push((d, a));
    }
    lists
}

/// Per-column cutoff: the distance right before the largest gap among the sorted distances not
/// above `threshold`. `threshold` itself is appended as a sentinel so the gap up to the ceiling
/// counts too. Returns 0 when no distance is within the ceiling.
pub fn compute_cutoff_threshold<T>(distances: &[(f64, T)], threshold: f64) -> f64 {
    let mut sorted: Vec<f64> = distances.iter().map(|(d, _)| *d).collect();
    sorted.push(threshold);
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mut cutoff = 0.0;
    let mut gap = 0.0;
    let mut i = 0;
    while i + 1 < sorted.len() && sorted[i + 1] <= threshold {
        let step = sorted[i + 1] - sorted[i];
        if gap < step {
            gap = step;
            cutoff = sorted[i];
        }
        i += 1;
    }
    cutoff
}

/// Entries whose distance does not exceed the entry list's own adaptive cutoff.
pub fn neighbours_within_cutoff<T: Copy>(distances: &[(f64, T)], threshold: f64) -> Vec<T> {
    let cutoff = compute_cutoff_threshold(distances, threshold);
    distances
        .iter()
        .filter(|(d, _)| *d <= cutoff)
        .map(|(_, other)| *other)
        .collect()
}

/// Connected components of the undirected graph on `nodes`. Components are listed in order of
/// their first node, members in node order. Edges touching unknown nodes are ignored.
pub fn connected_components<I>(nodes: &[ColumnKey], edges: I) -> Vec<Vec<ColumnKey>>
where
    I: IntoIterator<Item = (ColumnKey, ColumnKey)>,
{
    let index: HashMap<ColumnKey, usize> =
        nodes.iter().enumerate().map(|(i, k)| (*k, i)).collect();
    let mut uf = UnionFind::<usize>::new(nodes.len());
    for (a, b) in edges {
        if let (Some(&ia), Some(&ib)) = (index.get(&a), index.get(&b)) {
            uf.union(ia, ib);
        }
    }
    let mut by_root: HashMap<usize, usize> = HashMap::new();
    let mut components: Vec<Vec<ColumnKey>> = Vec::new();
    for (i, key) in nodes.iter().enumerate() {
        let root = uf.find(i);
        let slot = *by_root.entry(root).or_insert_with(|| {
            components.push(Vec::new());
            components.len() - 1
        });
        components[slot].push(*key);
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(table: u32, column: u32) -> ColumnKey {
        ColumnKey::new(table, column)
    }

    #[test]
    fn pairs_skip_same_table() {
        let keys = [k(0, 0), k(0, 1), k(1, 0)];
        assert_eq!(cross_table_pairs(&keys), vec![(k(0, 0), k(1, 0)), (k(0, 1), k(1, 0))]);
    }

    #[test]
    fn cutoff_sits_before_largest_gap() {
        let d = [(0.01, 'a'), (0.02, 'b'), (0.10, 'c'), (0.11, 'd')];
        assert!((compute_cutoff_threshold(&d, 0.15) - 0.02).abs() < 1e-12);
        assert_eq!(neighbours_within_cutoff(&d, 0.15), vec!['a', 'b']);
    }

    #[test]
    fn cutoff_counts_gap_to_ceiling() {
        let d = [(0.01, 'a'), (0.02, 'b')];
        // largest gap is 0.02 -> 0.5
        assert!((compute_cutoff_threshold(&d, 0.5) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn cutoff_is_zero_without_close_neighbours() {
        let d = [(0.4, 'a'), (f64::INFINITY, 'b')];
        assert_eq!(compute_cutoff_threshold(&d, 0.15), 0.0);
        assert!(neighbours_within_cutoff(&d, 0.15).is_empty());
    }

    #[test]
    fn exact_duplicates_survive_zero_cutoff() {
        let d = [(0.0, 'a'), (f64::INFINITY, 'b')];
        assert_eq!(neighbours_within_cutoff(&d, 0.15), vec!['a']);
    }

    #[test]
    fn empty_list_has_zero_cutoff() {
        let d: [(f64, char); 0] = [];
        assert_eq!(compute_cutoff_threshold(&d, 0.15), 0.0);
    }

    #[test]
    fn components_are_transitively_closed() {
        let nodes = [k(0, 0), k(0, 1), k(1, 0), k(1, 1), k(1, 2)];
        let edges = vec![(k(0, 0), k(1, 0)), (k(1, 0), k(0, 1))];
        let comps = connected_components(&nodes, edges);
        assert_eq!(comps.len(), 3);
        assert_eq!(comps[0], vec![k(0, 0), k(0, 1), k(1, 0)]);
        assert_eq!(comps[1], vec![k(1, 1)]);
        assert_eq!(comps[2], vec![k(1, 2)]);
    }

    #[test]
    fn distance_lists_are_symmetric() {
        let lists = distance_lists(&[((k(0, 0), k(1, 0)), 0.3)]);
        assert_eq!(lists[&k(0, 0)], vec![(0.3, k(1, 0))]);
        assert_eq!(lists[&k(1, 0)], vec![(0.3, k(0, 0))]);
    }
}
