//! Centralized configuration for the sigpat miner.
//!
//! This module contains constants and default parameters used throughout the
//! application to ensure consistency and ease of modification.

// --- Log-space arithmetic ---

/// Representation of probability zero in log space. Contributions below
/// `exp(LOG_ZERO)` underflow the accumulators and are clamped to zero.
pub const LOG_ZERO: f64 = -10_000.0;

// --- P-value cache ---

/// Maximum number of entries of the dense p-value cache. A dataset whose
/// `(n + 1) * (N - n + 1)` table count reaches this limit runs with the
/// cache disabled (logged, not an error).
pub const PVALUE_CACHE_MAX_ENTRIES: usize = 1_000_000_000;

// --- Adjacency matrix heuristics ---

/// Item ranks above this threshold (the infrequent end of the header table)
/// participate in the triangular co-occurrence matrix.
pub const MATRIX_MIN_RANK: usize = 15;

/// A tree whose branching concentration in the first quarter of depths
/// exceeds this percentage materializes the matrix for its conditional
/// trees on the next level.
pub const MATRIX_SWITCH_PERCENT: f64 = 20.0;

/// Minimum number of items, beyond [`MATRIX_MIN_RANK`], a tree must hold
/// before the matrix pays for itself.
pub const MATRIX_MIN_EXTRA_ITEMS: usize = 5;

// --- Arena sizing ---

/// Smallest arena block, in nodes. Block capacities double from here.
pub const ARENA_BASE_BLOCK: usize = 64;

// --- Mining defaults ---

/// Default enumeration mode for the CLI.
pub const DEFAULT_MODE: &str = "closed";

// --- Test-related Constants ---

/// A fixed random seed used in tests to ensure deterministic behavior.
pub const TEST_RANDOM_SEED: u64 = 42;
