//! Depth-first mining driver.
//!
//! Items are visited in reverse frequency order over each conditional
//! tree. For every item the driver extends the working prefix, consults
//! the closed/maximal index chain, builds the conditional pattern base,
//! and either emits the pattern or projects a child tree and recurses.
//! Every emitted `(prefix, x, a)` runs through the unconditional exact
//! test; significant patterns go to the sink in original item numbering.

use tracing::{debug, info, info_span};

use crate::dataset::Dataset;
use crate::error::{Result, SigpatError};
use crate::fptree::{FpTree, Weight};
use crate::pattern_index::{IndexKind, PatternIndex};
use crate::pvalue::{PvalueStrategy, UncondTest};
use crate::summary::MiningSummary;

/// Which family of itemsets the driver enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MiningMode {
    /// Every frequent itemset.
    Frequent,
    /// Closed frequent itemsets only.
    #[default]
    Closed,
    /// Maximal frequent itemsets only.
    Maximal,
}

/// Parameters of one mining run.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Minimum support count (theta).
    pub min_support: u64,
    /// Corrected significance threshold (delta).
    pub delta: f64,
    /// Frequency accuracy (epsilon) for the confidence-interval shortcut.
    pub epsilon: f64,
    pub mode: MiningMode,
    pub strategy: PvalueStrategy,
    /// Allow the p-value memo cache (subject to the capacity gate).
    pub use_cache: bool,
}

impl MinerConfig {
    pub fn new(min_support: u64, delta: f64, epsilon: f64) -> Self {
        MinerConfig {
            min_support,
            delta,
            epsilon,
            mode: MiningMode::default(),
            strategy: PvalueStrategy::default(),
            use_cache: true,
        }
    }
}

/// A pattern that passed the significance test.
#[derive(Debug, Clone, PartialEq)]
pub struct SignificantPattern {
    /// Items in original input numbering.
    pub items: Vec<u32>,
    /// Support `x`.
    pub support: u64,
    /// Minority-class count `a`.
    pub minor_count: u64,
    /// Probability of the observed contingency table, `exp(p0)`.
    pub p0: f64,
    pub p_lower: f64,
    pub p_upper: f64,
}

/// Receives significant patterns as they are discovered, in the
/// deterministic DFS emission order.
pub trait PatternSink {
    fn emit(&mut self, pattern: &SignificantPattern) -> Result<()>;
}

/// The mining entry point.
pub struct Miner {
    config: MinerConfig,
}

struct StackEntry {
    /// Master item rank.
    item: u32,
    weight: Weight,
}

struct MineState<'a, S: PatternSink> {
    config: &'a MinerConfig,
    test: UncondTest,
    /// Master rank -> original item identifier.
    item_names: Vec<u32>,
    stack: Vec<StackEntry>,
    significant: u64,
    sink: &'a mut S,
}

impl Miner {
    pub fn new(config: MinerConfig) -> Self {
        Miner { config }
    }

    /// Mine `dataset`, emitting significant patterns into `sink`.
    pub fn run(&self, dataset: &Dataset, sink: &mut impl PatternSink) -> Result<MiningSummary> {
        let _span = info_span!("mining_run").entered();
        let config = &self.config;
        if config.min_support == 0 {
            return Err(SigpatError::InvalidInput(
                "minimum support must be at least 1".into(),
            ));
        }

        let n_total = dataset.n_total();
        let n_minor = dataset.n_minor();
        let test = UncondTest::new(
            n_total,
            n_minor,
            config.delta,
            config.epsilon,
            config.strategy,
            config.use_cache,
        )?;

        let (tree, item_names) = build_master_tree(dataset, config.min_support)?;
        info!(
            items = tree.item_count(),
            n_total, n_minor, "master tree built"
        );

        let mut state = MineState {
            config,
            test,
            item_names,
            stack: Vec::new(),
            significant: 0,
            sink,
        };

        let mut indexes = match config.mode {
            MiningMode::Frequent => Vec::new(),
            MiningMode::Closed => vec![PatternIndex::new_root(IndexKind::Closed, &tree)],
            MiningMode::Maximal => vec![PatternIndex::new_root(IndexKind::Maximal, &tree)],
        };
        state.mine(&tree, &mut indexes, 0)?;
        debug_assert!(state.stack.is_empty());

        Ok(MiningSummary::new(
            state.test.counters(),
            state.significant,
            config.delta,
            config.min_support,
        ))
    }
}

/// First scan: count, threshold, rank; second scan: insert. Returns the
/// master tree plus the rank -> original-id mapping.
fn build_master_tree(dataset: &Dataset, min_support: u64) -> Result<(FpTree, Vec<u32>)> {
    let _span = info_span!("tree_construction").entered();

    let universe = match dataset.max_item() {
        Some(max) => max as usize + 1,
        None => 0,
    };
    if universe > 100_000_000 {
        return Err(SigpatError::Allocation {
            buffer: "item count array".into(),
            requested: universe,
        });
    }

    let mut counts = vec![0u64; universe];
    let mut scratch: Vec<u32> = Vec::new();
    for items in &dataset.transactions {
        scratch.clear();
        scratch.extend_from_slice(items);
        scratch.sort_unstable();
        scratch.dedup();
        for &item in &scratch {
            counts[item as usize] += 1;
        }
    }

    let mut ranked: Vec<u32> = (0..universe as u32)
        .filter(|&i| counts[i as usize] >= min_support)
        .collect();
    ranked.sort_by(|&a, &b| {
        counts[b as usize]
            .cmp(&counts[a as usize])
            .then(a.cmp(&b))
    });

    let mut order = vec![-1i32; universe];
    for (rank, &item) in ranked.iter().enumerate() {
        order[item as usize] = rank as i32;
    }

    let mut compacted: Vec<Vec<usize>> = Vec::with_capacity(dataset.transactions.len());
    for items in &dataset.transactions {
        let mut ranks: Vec<usize> = items
            .iter()
            .filter_map(|&i| {
                let o = order[i as usize];
                (o >= 0).then_some(o as usize)
            })
            .collect();
        ranks.sort_unstable();
        ranks.dedup();
        compacted.push(ranks);
    }

    let tree = FpTree::build_master(
        ranked.len(),
        compacted
            .iter()
            .zip(dataset.labels.iter())
            .map(|(ranks, &label)| (ranks.as_slice(), Weight::observation(label))),
    );
    Ok((tree, ranked))
}

impl<S: PatternSink> MineState<'_, S> {
    fn mine(
        &mut self,
        tree: &FpTree,
        indexes: &mut Vec<PatternIndex>,
        depth: usize,
    ) -> Result<()> {
        if let Some(path) = tree.single_path() {
            return self.handle_single_path(&path, indexes);
        }

        for rank in (0..tree.item_count()).rev() {
            let item = tree.master_item(rank);
            let w = tree.total(rank);
            self.stack.push(StackEntry { item, weight: w });

            if self.config.mode == MiningMode::Frequent {
                self.emit()?;
            } else if self.dominated(indexes, w) {
                self.stack.pop();
                continue;
            }

            let base = tree.conditional_base(rank, self.config.min_support);
            if base.is_empty() {
                match self.config.mode {
                    MiningMode::Frequent => {}
                    MiningMode::Closed | MiningMode::Maximal => {
                        self.emit()?;
                        self.record(indexes, w);
                    }
                }
            } else {
                let cond = tree.project(rank, &base, depth + 1);
                match self.config.mode {
                    MiningMode::Frequent => self.mine(&cond, indexes, depth + 1)?,
                    MiningMode::Closed | MiningMode::Maximal => {
                        let projected = indexes
                            .last()
                            .expect("index chain is non-empty in closed/max mode")
                            .project(&cond, item, self.stack.len());
                        indexes.push(projected);
                        self.mine(&cond, indexes, depth + 1)?;
                        indexes.pop();

                        // Supersets were mined first; the prefix itself is
                        // closed only if none of them matched its support.
                        if self.config.mode == MiningMode::Closed && !self.dominated(indexes, w) {
                            self.emit()?;
                            self.record(indexes, w);
                        }
                    }
                }
            }

            self.stack.pop();
        }
        Ok(())
    }

    /// A single-path tree short-circuits the recursion: every subset of
    /// the path is frequent with the support of its deepest item.
    fn handle_single_path(
        &mut self,
        path: &[(u32, Weight)],
        indexes: &mut Vec<PatternIndex>,
    ) -> Result<()> {
        match self.config.mode {
            MiningMode::Frequent => self.emit_path_subsets(path, 0),
            MiningMode::Closed => {
                // The closed subsets of a chain are its prefixes ending
                // where the count drops.
                for d in 0..path.len() {
                    let (item, w) = path[d];
                    self.stack.push(StackEntry { item, weight: w });
                    let boundary = d + 1 == path.len() || path[d + 1].1.count < w.count;
                    if boundary && !self.dominated(indexes, w) {
                        self.emit()?;
                        self.record(indexes, w);
                    }
                }
                for _ in 0..path.len() {
                    self.stack.pop();
                }
                Ok(())
            }
            MiningMode::Maximal => {
                for &(item, w) in path {
                    self.stack.push(StackEntry { item, weight: w });
                }
                if let Some(&(_, deepest)) = path.last() {
                    if !self.dominated(indexes, deepest) {
                        self.emit()?;
                        self.record(indexes, deepest);
                    }
                }
                for _ in 0..path.len() {
                    self.stack.pop();
                }
                Ok(())
            }
        }
    }

    fn emit_path_subsets(&mut self, path: &[(u32, Weight)], start: usize) -> Result<()> {
        for j in start..path.len() {
            let (item, w) = path[j];
            self.stack.push(StackEntry { item, weight: w });
            self.emit()?;
            self.emit_path_subsets(path, j + 1)?;
            self.stack.pop();
        }
        Ok(())
    }

    fn suffix_for(&self, index: &PatternIndex) -> Vec<u32> {
        self.stack[index.base_len()..]
            .iter()
            .map(|e| e.item)
            .collect()
    }

    fn dominated(&self, indexes: &[PatternIndex], w: Weight) -> bool {
        let index = indexes.last().expect("index chain is non-empty");
        index.is_dominated(&self.suffix_for(index), w.count)
    }

    /// Record the current prefix in every index of the active chain, so
    /// later siblings at every level observe it.
    fn record(&self, indexes: &mut [PatternIndex], w: Weight) {
        for index in indexes.iter_mut() {
            let suffix = self.suffix_for(index);
            index.record(&suffix, w.count);
        }
    }

    /// Run the significance path on the current prefix and hand it to the
    /// sink when the lower-bound p-value clears delta.
    fn emit(&mut self) -> Result<()> {
        let top = self.stack.last().expect("emit with empty prefix");
        let (x, a) = (top.weight.count as usize, top.weight.minor as usize);
        let out = self.test.evaluate(x, a);
        if out.lower <= self.config.delta {
            self.significant += 1;
            let mut items: Vec<u32> = self
                .stack
                .iter()
                .map(|e| self.item_names[e.item as usize])
                .collect();
            items.sort_unstable();
            let pattern = SignificantPattern {
                items,
                support: x as u64,
                minor_count: a as u64,
                p0: self.test.observed_table_probability(x, a),
                p_lower: out.lower,
                p_upper: out.upper,
            };
            debug!(
                support = pattern.support,
                minor = pattern.minor_count,
                p = pattern.p_lower,
                "significant pattern"
            );
            self.sink.emit(&pattern)?;
        }
        Ok(())
    }
}
