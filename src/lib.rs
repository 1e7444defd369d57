//! sigpat: statistically significant itemset mining
//!
//! This library mines itemsets whose frequency differs significantly
//! between two classes of a labeled transaction database, coupling an
//! FP-growth enumerator (all-frequent, closed or maximal) with an
//! unconditional exact test over 2x2 contingency tables at a corrected
//! family-wise threshold delta.
//!
//! ## Main Components
//!
//! - [`dataset`]: transaction and label file loading
//! - [`fptree`]: the frequent-pattern tree and conditional projection
//! - [`pattern_index`]: closed/maximal itemset indexes for subset queries
//! - [`miner`]: the depth-first mining driver and emission path
//! - [`pvalue`]: pruning bounds, memo cache and the exact p-value engines
//! - [`math`]: log-space arithmetic and binomial tails
//! - [`arena`]: pooled slab allocation backing every tree
//! - [`report`]: result file sinks
//! - [`config`]: centralized constants
//!
//! ## Error Handling
//!
//! Library functions return `Result<T, SigpatError>`; no failure is
//! recovered inside the mining core. The CLI maps error kinds to exit
//! codes (1 for argument/IO/input errors, 2 for allocation failures).
//!
//! ## Quick Start
//!
//! ```rust
//! use sigpat::{Dataset, MemorySink, Miner, MinerConfig};
//!
//! let transactions = vec![vec![1, 2], vec![1, 2], vec![1, 2], vec![3], vec![3]];
//! let labels = vec![true, true, true, false, false];
//! let dataset = Dataset::from_parts(transactions, labels)?;
//!
//! let mut sink = MemorySink::default();
//! let miner = Miner::new(MinerConfig::new(2, 0.1, 1.0));
//! let summary = miner.run(&dataset, &mut sink)?;
//!
//! assert!(sink.patterns.iter().any(|p| p.items == vec![1, 2]));
//! assert!(summary.significant_patterns >= 1);
//! # Ok::<(), sigpat::SigpatError>(())
//! ```

pub mod arena;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fptree;
pub mod math;
pub mod miner;
pub mod pattern_index;
pub mod pvalue;
pub mod report;
pub mod summary;

// Re-export commonly used types for convenience
pub use dataset::Dataset;
pub use error::{Result, SigpatError};
pub use fptree::{FpTree, Weight};
pub use miner::{Miner, MinerConfig, MiningMode, PatternSink, SignificantPattern};
pub use pattern_index::{IndexKind, PatternIndex};
pub use pvalue::{PvalueBounds, PvalueStrategy, TestCounters, UncondTest};
pub use report::{write_summary, FileSink, MemorySink};
pub use summary::MiningSummary;
