//! Frequent-pattern tree: build, conditional projection, single-path
//! detection and support enumeration.
//!
//! Items are re-indexed after the first scan so that rank 0 is the most
//! frequent surviving item; every tree (master and conditional) keeps the
//! two mappings `order[item] -> rank` (−1 when pruned) and
//! `table[rank] -> item`. Node links are arena indices, and each
//! conditional tree owns the arena its nodes live in, released as one
//! block when the recursion frame unwinds.
//!
//! Every node carries a [`Weight`]: the transaction count and the count of
//! minority-labeled transactions among them. The second component is what
//! lets the significance path read the class count `a` of any emitted
//! pattern straight off the tree.

use std::ops::AddAssign;

use tracing::debug;

use crate::arena::{Arena, NodeRef};
use crate::config;

/// Transaction count plus minority-class count. The minority component is
/// never larger than the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Weight {
    pub count: u64,
    pub minor: u64,
}

impl Weight {
    pub fn new(count: u64, minor: u64) -> Self {
        Weight { count, minor }
    }

    /// Weight of a single observation with the given label.
    pub fn observation(minority: bool) -> Self {
        Weight {
            count: 1,
            minor: minority as u64,
        }
    }
}

impl AddAssign for Weight {
    fn add_assign(&mut self, rhs: Weight) {
        self.count += rhs.count;
        self.minor += rhs.minor;
    }
}

struct FpNode {
    /// Master item rank; −1 only on the root.
    item: i32,
    weight: Weight,
    parent: NodeRef,
    /// Leftmost child.
    child: NodeRef,
    /// Right sibling under the same parent.
    sibling: NodeRef,
    /// Header-table thread to the next node of the same rank.
    next: NodeRef,
}

/// Triangular co-occurrence accumulator for the infrequent end of the
/// header table. `rows[k]` belongs to local rank `first_rank + k` and
/// holds one counter per lower-ranked partner.
struct TriMatrix {
    rows: Vec<Vec<u64>>,
    first_rank: usize,
}

impl TriMatrix {
    fn new(item_count: usize) -> Self {
        let first_rank = config::MATRIX_MIN_RANK + 1;
        let rows = (first_rank..item_count).map(|r| vec![0u64; r]).collect();
        TriMatrix { rows, first_rank }
    }

    #[inline]
    fn add(&mut self, hi_rank: usize, lo_rank: usize, count: u64) {
        self.rows[hi_rank - self.first_rank][lo_rank] += count;
    }

    fn row(&self, rank: usize) -> Option<&[u64]> {
        rank.checked_sub(self.first_rank)
            .and_then(|k| self.rows.get(k))
            .map(|r| r.as_slice())
    }
}

/// One FP-tree: the master tree over the whole database, or a conditional
/// tree over the pattern base of a single item.
pub struct FpTree {
    nodes: Arena<FpNode>,
    root: NodeRef,
    /// Local rank -> master item.
    table: Vec<u32>,
    /// Master item -> local rank, −1 when absent from this tree.
    order: Vec<i32>,
    /// Aggregate weight per local rank.
    totals: Vec<Weight>,
    /// First header-threaded node per local rank.
    head: Vec<NodeRef>,
    /// New-node creations per insertion depth, for the branching statistic.
    branch: Vec<u64>,
    /// Percentage of branching concentrated in the first quarter of depths.
    level_25: f64,
    matrix: Option<TriMatrix>,
}

impl FpTree {
    /// Create an empty tree over `items` (master items, most frequent
    /// first). `universe` is the master item-space size, `depth` the
    /// recursion depth used by the arena block heuristic.
    fn new(items: &[u32], universe: usize, depth: usize, with_matrix: bool) -> Self {
        let item_count = items.len();
        let mut nodes = Arena::for_tree(item_count, depth);
        let root = nodes.alloc(FpNode {
            item: -1,
            weight: Weight::default(),
            parent: NodeRef::NONE,
            child: NodeRef::NONE,
            sibling: NodeRef::NONE,
            next: NodeRef::NONE,
        });

        let mut order = vec![-1i32; universe];
        for (rank, &item) in items.iter().enumerate() {
            order[item as usize] = rank as i32;
        }

        let matrix = (with_matrix
            && item_count > config::MATRIX_MIN_RANK + config::MATRIX_MIN_EXTRA_ITEMS)
            .then(|| TriMatrix::new(item_count));

        FpTree {
            nodes,
            root,
            table: items.to_vec(),
            order,
            totals: vec![Weight::default(); item_count],
            head: vec![NodeRef::NONE; item_count],
            branch: vec![0; item_count],
            level_25: 0.0,
            matrix,
        }
    }

    /// Build the master tree. After the first scan the master item space
    /// is exactly `0..item_count`; `transactions` yields per observation
    /// the sorted, deduplicated item ranks plus the observation weight.
    pub fn build_master<'a>(
        item_count: usize,
        transactions: impl Iterator<Item = (&'a [usize], Weight)>,
    ) -> Self {
        let items: Vec<u32> = (0..item_count as u32).collect();
        let mut tree = FpTree::new(&items, item_count, 0, true);
        for (ranks, w) in transactions {
            tree.insert(ranks, w);
        }
        tree.finish_scan();
        tree
    }

    pub fn item_count(&self) -> usize {
        self.table.len()
    }

    /// Aggregate weight of the item at `rank`.
    pub fn total(&self, rank: usize) -> Weight {
        self.totals[rank]
    }

    /// Master item at `rank`.
    pub fn master_item(&self, rank: usize) -> u32 {
        self.table[rank]
    }

    pub(crate) fn order(&self) -> &[i32] {
        &self.order
    }

    pub(crate) fn table(&self) -> &[u32] {
        &self.table
    }

    pub fn level_25(&self) -> f64 {
        self.level_25
    }

    /// Insert one compacted path of ascending local ranks.
    fn insert(&mut self, ranks: &[usize], w: Weight) {
        debug_assert!(ranks.windows(2).all(|p| p[0] < p[1]));

        if let Some(matrix) = self.matrix.as_mut() {
            for (i, &hi) in ranks.iter().enumerate().rev() {
                if hi <= config::MATRIX_MIN_RANK {
                    break;
                }
                for &lo in &ranks[..i] {
                    matrix.add(hi, lo, w.count);
                }
            }
        }

        for &rank in ranks {
            self.totals[rank] += w;
        }

        let mut cur = self.root;
        let mut depth = 0;
        for (i, &rank) in ranks.iter().enumerate() {
            let target = self.table[rank] as i32;
            let mut child = self.nodes[cur].child;
            while child.is_some() && self.nodes[child].item != target {
                child = self.nodes[child].sibling;
            }
            if child.is_none() {
                depth = i;
                break;
            }
            self.nodes[child].weight += w;
            cur = child;
            depth = i + 1;
        }
        for &rank in &ranks[depth..] {
            cur = self.append(cur, rank, w);
            self.branch[depth] += 1;
            depth += 1;
        }
    }

    /// Append a fresh node under `parent` and thread it into the header.
    fn append(&mut self, parent: NodeRef, rank: usize, w: Weight) -> NodeRef {
        let item = self.table[rank] as i32;
        let node = self.nodes.alloc(FpNode {
            item,
            weight: w,
            parent,
            child: NodeRef::NONE,
            sibling: self.nodes[parent].child,
            next: self.head[rank],
        });
        self.nodes[parent].child = node;
        self.head[rank] = node;
        node
    }

    /// Branching statistic: the share of node creation that happened in
    /// the first quarter of occupied depths. A high value means the tree
    /// is bushy near the root, which is when the co-occurrence matrix
    /// pays off for the next level of conditional trees.
    fn finish_scan(&mut self) {
        let maxlen = self
            .branch
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.branch.len());
        let total: u64 = self.branch[..maxlen].iter().sum();
        let quarter: u64 = self.branch[..maxlen / 4].iter().sum();
        self.level_25 = if total == 0 {
            0.0
        } else {
            quarter as f64 / total as f64 * 100.0
        };
        for b in self.branch.iter_mut() {
            *b = 0;
        }
    }

    /// If every node has at most one child and no siblings, return the
    /// root-to-leaf chain as `(master item, weight)` pairs.
    pub fn single_path(&self) -> Option<Vec<(u32, Weight)>> {
        let mut path = Vec::new();
        let mut node = self.nodes[self.root].child;
        while node.is_some() {
            let n = &self.nodes[node];
            if n.sibling.is_some() {
                return None;
            }
            path.push((n.item as u32, n.weight));
            node = n.child;
        }
        Some(path)
    }

    /// Conditional pattern base of the item at `rank`: the items that
    /// co-occur with it at support `threshold` or above, as
    /// `(master item, support)` pairs sorted by descending support (the
    /// local order of the projected tree). Reads the matrix row when one
    /// was materialized, otherwise walks the header list.
    pub fn conditional_base(&self, rank: usize, threshold: u64) -> Vec<(u32, u64)> {
        let supp: Vec<u64> = match self.matrix.as_ref().and_then(|m| m.row(rank)) {
            Some(row) => row.to_vec(),
            None => {
                let mut supp = vec![0u64; rank];
                let mut node = self.head[rank];
                while node.is_some() {
                    let w = self.nodes[node].weight.count;
                    let mut p = self.nodes[node].parent;
                    while self.nodes[p].item != -1 {
                        let local = self.order[self.nodes[p].item as usize];
                        debug_assert!(local >= 0 && (local as usize) < rank);
                        supp[local as usize] += w;
                        p = self.nodes[p].parent;
                    }
                    node = self.nodes[node].next;
                }
                supp
            }
        };

        let mut entries: Vec<(u32, u64)> = supp
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s >= threshold)
            .map(|(local, &s)| (self.table[local], s))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries
    }

    /// Build the conditional tree of the item at `rank` from an already
    /// computed pattern base. `depth` sizes the child arena.
    pub fn project(&self, rank: usize, base: &[(u32, u64)], depth: usize) -> FpTree {
        let items: Vec<u32> = base.iter().map(|&(item, _)| item).collect();
        let want_matrix = self.level_25 > config::MATRIX_SWITCH_PERCENT;
        if !want_matrix && items.len() > config::MATRIX_MIN_RANK + config::MATRIX_MIN_EXTRA_ITEMS {
            debug!(
                items = items.len(),
                level_25 = self.level_25,
                "adjacency matrix skipped: branching not concentrated near the root"
            );
        }
        let mut tree = FpTree::new(&items, self.order.len(), depth, want_matrix);

        let mut ranks = Vec::with_capacity(items.len());
        let mut node = self.head[rank];
        while node.is_some() {
            let w = self.nodes[node].weight;
            ranks.clear();
            let mut p = self.nodes[node].parent;
            while self.nodes[p].item != -1 {
                let local = tree.order[self.nodes[p].item as usize];
                if local >= 0 {
                    ranks.push(local as usize);
                }
                p = self.nodes[p].parent;
            }
            if !ranks.is_empty() {
                ranks.sort_unstable();
                tree.insert(&ranks, w);
            }
            node = self.nodes[node].next;
        }
        tree.finish_scan();
        tree
    }

    #[cfg(test)]
    fn header_chain(&self, rank: usize) -> Vec<Weight> {
        let mut out = Vec::new();
        let mut node = self.head[rank];
        while node.is_some() {
            assert_eq!(self.nodes[node].item as u32, self.table[rank]);
            out.push(self.nodes[node].weight);
            node = self.nodes[node].next;
        }
        out
    }

    #[cfg(test)]
    fn assert_invariants(&self) {
        // Paths from the root are strictly increasing in local order, and
        // the header chain of a rank accounts for the rank's total weight.
        fn walk(tree: &FpTree, node: NodeRef, floor: i32) {
            let mut child = tree.nodes[node].child;
            let mut seen = Vec::new();
            while child.is_some() {
                let n = &tree.nodes[child];
                let local = tree.order[n.item as usize];
                assert!(local > floor, "path ranks must strictly increase");
                assert!(!seen.contains(&n.item), "siblings must hold distinct items");
                seen.push(n.item);
                walk(tree, child, local);
                child = n.sibling;
            }
        }
        walk(self, self.root, -1);

        for rank in 0..self.item_count() {
            let total: u64 = self.header_chain(rank).iter().map(|w| w.count).sum();
            assert_eq!(total, self.totals[rank].count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a master tree from raw transactions the way the miner does:
    /// count, rank, prune, insert.
    fn master_from(transactions: &[(&[u32], bool)], threshold: u64) -> (FpTree, Vec<u32>) {
        let mut counts = std::collections::HashMap::new();
        for (items, _) in transactions {
            let dedup: std::collections::HashSet<u32> = items.iter().copied().collect();
            for item in dedup {
                *counts.entry(item).or_insert(0u64) += 1;
            }
        }
        let mut ranked: Vec<(u32, u64)> = counts
            .into_iter()
            .filter(|&(_, c)| c >= threshold)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let original: Vec<u32> = ranked.iter().map(|&(item, _)| item).collect();

        let rank_of = |item: u32| original.iter().position(|&i| i == item);
        let compacted: Vec<(Vec<usize>, Weight)> = transactions
            .iter()
            .map(|&(items, label)| {
                let mut ranks: Vec<usize> = items.iter().filter_map(|&i| rank_of(i)).collect();
                ranks.sort_unstable();
                ranks.dedup();
                (ranks, Weight::observation(label))
            })
            .collect();
        let tree = FpTree::build_master(
            original.len(),
            compacted.iter().map(|(r, w)| (r.as_slice(), *w)),
        );
        (tree, original)
    }

    const DB: &[(&[u32], bool)] = &[
        (&[1, 2, 3], true),
        (&[1, 2], true),
        (&[1, 4], false),
        (&[2, 3], false),
        (&[1, 2, 3, 4], true),
        (&[5], false),
    ];

    #[test]
    fn test_master_tree_invariants() {
        let (tree, original) = master_from(DB, 2);
        tree.assert_invariants();
        // Items 1,2,3,4 survive at threshold 2; 5 is pruned.
        assert_eq!(tree.item_count(), 4);
        assert!(!original.contains(&5));
        // Rank 0 is the most frequent item (1 and 2 both have count 4;
        // the tie breaks toward the smaller identifier).
        assert_eq!(original[0], 1);
        assert_eq!(tree.total(0), Weight::new(4, 3));
    }

    #[test]
    fn test_conditional_base_matches_brute_force() {
        let (tree, original) = master_from(DB, 2);
        // Pattern base of item 3 (whatever its rank ended up being).
        let rank3 = original.iter().position(|&i| i == 3).unwrap();
        let base = tree.conditional_base(rank3, 2);
        // 3 co-occurs with 1 twice, with 2 three times, with 4 once.
        let by_item: std::collections::HashMap<u32, u64> = base
            .iter()
            .map(|&(local_item, s)| (original[local_item as usize], s))
            .collect();
        assert_eq!(by_item.get(&2), Some(&3));
        assert_eq!(by_item.get(&1), Some(&2));
        assert_eq!(by_item.get(&4), None);
        // Sorted by descending support.
        assert!(base.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_projection_weights() {
        let (tree, original) = master_from(DB, 2);
        let rank3 = original.iter().position(|&i| i == 3).unwrap();
        let base = tree.conditional_base(rank3, 1);
        let cond = tree.project(rank3, &base, 1);
        cond.assert_invariants();
        // In the conditional tree of 3, item 2 occurs in all three
        // supporting transactions, two of which are minority-labeled.
        let local2 = cond
            .table()
            .iter()
            .position(|&m| original[m as usize] == 2)
            .unwrap();
        assert_eq!(cond.total(local2), Weight::new(3, 2));
    }

    #[test]
    fn test_single_path_detection() {
        let db: &[(&[u32], bool)] = &[(&[1, 2, 3], true), (&[1, 2, 3], false), (&[1, 2], true)];
        let (tree, _) = master_from(db, 2);
        let path = tree.single_path().expect("chain database is a single path");
        assert_eq!(path.len(), 3);
        assert_eq!(path[0].1, Weight::new(3, 2));
        assert_eq!(path[2].1, Weight::new(2, 1));

        let (branched, _) = master_from(DB, 2);
        assert!(branched.single_path().is_none());
    }

    #[test]
    fn test_matrix_row_agrees_with_header_walk() {
        // A database wide enough to cross the matrix threshold.
        let mut rows: Vec<Vec<u32>> = Vec::new();
        for t in 0..40u32 {
            // Item i appears in transactions with t % (i + 1) == 0, so
            // lower items are more frequent and ranks line up with ids.
            let items: Vec<u32> = (0..24u32).filter(|&i| t % (i + 1) == 0).collect();
            rows.push(items);
        }
        let db: Vec<(&[u32], bool)> = rows.iter().map(|r| (r.as_slice(), false)).collect();
        let (tree, _) = master_from(&db, 1);
        assert!(tree.matrix.is_some());

        for rank in (config::MATRIX_MIN_RANK + 1)..tree.item_count() {
            let via_matrix = tree.conditional_base(rank, 1);
            // Rebuild via header walk by hiding the matrix.
            let mut bare = master_from(&db, 1).0;
            bare.matrix = None;
            let via_walk = bare.conditional_base(rank, 1);
            assert_eq!(via_matrix, via_walk, "rank {}", rank);
        }
    }

    #[test]
    fn test_empty_transactions_add_nothing() {
        let db: &[(&[u32], bool)] = &[(&[], true), (&[1, 2], false), (&[1, 2], true), (&[], false)];
        let (tree, _) = master_from(db, 2);
        assert_eq!(tree.item_count(), 2);
        assert_eq!(tree.total(0), Weight::new(2, 1));
    }
}
