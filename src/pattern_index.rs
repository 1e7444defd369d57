//! Compact indexes of already-emitted closed (CFI) or maximal (MFI)
//! itemsets, used to suppress non-closed / non-maximal candidates through
//! subset queries.
//!
//! An index mirrors the item order of the FP-tree it serves: stored sets
//! are paths of ascending local rank, siblings under one parent hold
//! distinct items, `head[rank]` threads every node of a rank, and `level`
//! is the distance from the root. A closed-set index additionally stores
//! on each node the largest support at which the prefix ending there was
//! recorded; a maximal-set index needs no counts.
//!
//! When the miner descends into the conditional tree of an item, the
//! parent index is projected through that item's thread: each recorded set
//! containing the item reappears, restricted to the items of the new tree.

use crate::arena::{Arena, NodeRef};
use crate::fptree::FpTree;

/// Whether an index stores closed or maximal sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Closed,
    Maximal,
}

struct IndexNode {
    /// Master item; −1 only on the root.
    item: i32,
    /// For closed indexes: largest support this prefix was recorded at.
    count: u64,
    /// Distance from the root; equals the number of items on the path.
    level: u32,
    parent: NodeRef,
    child: NodeRef,
    sibling: NodeRef,
    /// Thread to the next node of the same local rank.
    next: NodeRef,
}

/// One CFI-/MFI-tree, attached to the FP-tree whose item order it shares.
pub struct PatternIndex {
    kind: IndexKind,
    nodes: Arena<IndexNode>,
    root: NodeRef,
    /// First threaded node per local rank.
    head: Vec<NodeRef>,
    /// Master item -> local rank, −1 when absent.
    order: Vec<i32>,
    /// Position in the shared prefix stack where this index's item space
    /// begins; stack entries below it belong to outer recursion levels.
    base_len: usize,
    recorded: u64,
}

impl PatternIndex {
    /// Empty index over the master tree's item space.
    pub fn new_root(kind: IndexKind, tree: &FpTree) -> Self {
        PatternIndex::empty(kind, tree, 0)
    }

    fn empty(kind: IndexKind, tree: &FpTree, base_len: usize) -> Self {
        let item_count = tree.item_count();
        let mut nodes = Arena::for_tree(item_count, base_len);
        let root = nodes.alloc(IndexNode {
            item: -1,
            count: 0,
            level: 0,
            parent: NodeRef::NONE,
            child: NodeRef::NONE,
            sibling: NodeRef::NONE,
            next: NodeRef::NONE,
        });
        PatternIndex {
            kind,
            nodes,
            root,
            head: vec![NodeRef::NONE; item_count],
            order: tree.order().to_vec(),
            base_len,
            recorded: 0,
        }
    }

    /// Project this index into the space of `tree`, the conditional tree
    /// of `conditional_item`: every recorded set containing that item is
    /// re-recorded restricted to the new tree's items. `base_len` is the
    /// prefix-stack length at which the new level starts.
    pub fn project(
        &self,
        tree: &FpTree,
        conditional_item: u32,
        base_len: usize,
    ) -> Self {
        let mut projected = PatternIndex::empty(self.kind, tree, base_len);

        let rank = self.order[conditional_item as usize];
        debug_assert!(rank >= 0, "conditional item must be in the parent space");
        let mut members = Vec::new();
        let mut node = self.head[rank as usize];
        while node.is_some() {
            let count = self.nodes[node].count;
            members.clear();
            let mut p = self.nodes[node].parent;
            while self.nodes[p].item != -1 {
                let item = self.nodes[p].item as u32;
                if tree.order()[item as usize] >= 0 {
                    members.push(item);
                }
                p = self.nodes[p].parent;
            }
            if !members.is_empty() {
                projected.record(&members, count);
            }
            node = self.nodes[node].next;
        }
        projected
    }

    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Number of record operations, counting projections.
    pub fn len(&self) -> u64 {
        self.recorded
    }

    pub fn is_empty(&self) -> bool {
        self.recorded == 0
    }

    fn rank_of(&self, item: u32) -> usize {
        let rank = self.order[item as usize];
        debug_assert!(rank >= 0, "item {} outside index space", item);
        rank as usize
    }

    /// Record `set` (master items, any order) with the given support.
    /// A prefix already present has its stored support lifted for closed
    /// indexes; missing nodes are appended and threaded.
    pub fn record(&mut self, set: &[u32], count: u64) {
        let mut sorted: Vec<u32> = set.to_vec();
        sorted.sort_unstable_by_key(|&i| self.rank_of(i));
        self.recorded += 1;

        let mut cur = self.root;
        let mut matched = 0;
        for &item in &sorted {
            let mut child = self.nodes[cur].child;
            while child.is_some() && self.nodes[child].item != item as i32 {
                child = self.nodes[child].sibling;
            }
            if child.is_none() {
                break;
            }
            if self.kind == IndexKind::Closed && self.nodes[child].count < count {
                self.nodes[child].count = count;
            }
            cur = child;
            matched += 1;
        }
        for &item in &sorted[matched..] {
            let rank = self.rank_of(item);
            let level = self.nodes[cur].level + 1;
            let node = self.nodes.alloc(IndexNode {
                item: item as i32,
                count: if self.kind == IndexKind::Closed { count } else { 0 },
                level,
                parent: cur,
                child: NodeRef::NONE,
                sibling: self.nodes[cur].child,
                next: self.head[rank],
            });
            self.nodes[cur].child = node;
            self.head[rank] = node;
            cur = node;
        }
    }

    /// Is `set` (master items, any order) contained in a recorded set?
    /// For closed indexes the recorded support must be at least `count`.
    pub fn is_dominated(&self, set: &[u32], count: u64) -> bool {
        if set.is_empty() {
            return false;
        }
        let mut sorted: Vec<u32> = set.to_vec();
        sorted.sort_unstable_by_key(|&i| self.rank_of(i));
        let k = sorted.len();

        // Any recorded superset must thread through the suffix's deepest
        // (highest-rank) item.
        let mut node = self.head[self.rank_of(sorted[k - 1])];
        'candidates: while node.is_some() {
            let n = &self.nodes[node];
            if (n.level as usize) < k
                || (self.kind == IndexKind::Closed && n.count < count)
            {
                node = n.next;
                continue;
            }
            let mut anc = n.parent;
            for i in (0..k - 1).rev() {
                let target = self.rank_of(sorted[i]) as i32;
                // Skip recorded items absent from the query set.
                while self.nodes[anc].item != -1
                    && self.order[self.nodes[anc].item as usize] > target
                    && self.nodes[anc].level as usize > i
                {
                    anc = self.nodes[anc].parent;
                }
                if self.nodes[anc].item != sorted[i] as i32 {
                    node = n.next;
                    continue 'candidates;
                }
                anc = self.nodes[anc].parent;
            }
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TEST_RANDOM_SEED;
    use crate::fptree::{FpTree, Weight};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// A bare item space of `n` items with identity order.
    fn space(n: usize) -> FpTree {
        FpTree::build_master(n, std::iter::empty::<(&[usize], Weight)>())
    }

    #[test]
    fn test_recorded_set_dominates_its_subsets() {
        let tree = space(8);
        let mut index = PatternIndex::new_root(IndexKind::Closed, &tree);
        index.record(&[1, 3, 5], 7);

        assert!(index.is_dominated(&[1, 3, 5], 7));
        assert!(index.is_dominated(&[3, 5], 6));
        assert!(index.is_dominated(&[1], 7));
        // Higher count than recorded: not dominated.
        assert!(!index.is_dominated(&[1, 3], 8));
        // Not a subset.
        assert!(!index.is_dominated(&[1, 2], 1));
    }

    #[test]
    fn test_count_lifting_on_shared_prefix() {
        let tree = space(8);
        let mut index = PatternIndex::new_root(IndexKind::Closed, &tree);
        index.record(&[0, 1, 2], 3);
        index.record(&[0, 1], 9);
        // The shared prefix was lifted to the larger support.
        assert!(index.is_dominated(&[0, 1], 9));
        // The full set keeps its own support.
        assert!(!index.is_dominated(&[0, 1, 2], 9));
        assert!(index.is_dominated(&[0, 1, 2], 3));
    }

    #[test]
    fn test_maximal_index_ignores_counts() {
        let tree = space(6);
        let mut index = PatternIndex::new_root(IndexKind::Maximal, &tree);
        index.record(&[2, 4], 0);
        assert!(index.is_dominated(&[4], u64::MAX));
        assert!(!index.is_dominated(&[2, 3], 0));
    }

    #[test]
    fn test_projection_keeps_only_sets_through_the_item() {
        let full = space(6);
        let mut index = PatternIndex::new_root(IndexKind::Closed, &full);
        index.record(&[0, 2, 4], 5);
        index.record(&[1, 4], 3);
        index.record(&[0, 3], 9);

        let projected = index.project(&full, 4, 1);
        assert!(projected.is_dominated(&[0, 2], 5));
        assert!(projected.is_dominated(&[1], 3));
        // {0, 3} does not contain item 4, so it was not carried over;
        // only {0} from {0, 2, 4} dominates a query for {0}, at count 5.
        assert!(!projected.is_dominated(&[3], 1));
        assert!(!projected.is_dominated(&[0], 6));
        assert!(projected.is_dominated(&[0], 5));
    }

    #[test]
    fn test_random_queries_match_reference_sets() {
        let universe = 12usize;
        let tree = space(universe);
        let mut rng = StdRng::seed_from_u64(TEST_RANDOM_SEED);

        for kind in [IndexKind::Closed, IndexKind::Maximal] {
            let mut index = PatternIndex::new_root(kind, &tree);
            let mut reference: Vec<(Vec<u32>, u64)> = Vec::new();

            for _ in 0..300 {
                let size = rng.gen_range(1..=5);
                let mut set: Vec<u32> = (0..size)
                    .map(|_| rng.gen_range(0..universe as u32))
                    .collect();
                set.sort_unstable();
                set.dedup();
                if rng.gen_bool(0.5) {
                    let count = rng.gen_range(1..=20);
                    index.record(&set, count);
                    reference.push((set, count));
                } else {
                    let count = rng.gen_range(1..=20);
                    let expected = reference.iter().any(|(s, c)| {
                        set.iter().all(|i| s.contains(i))
                            && (kind == IndexKind::Maximal || *c >= count)
                    });
                    assert_eq!(
                        index.is_dominated(&set, count),
                        expected,
                        "kind {:?} set {:?} count {}",
                        kind,
                        set,
                        count
                    );
                }
            }
        }
    }
}
