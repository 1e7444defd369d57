//! Unconditional exact test over 2x2 contingency tables.
//!
//! Under the null hypothesis the two class counts of a pattern are
//! independent binomials with a common nuisance parameter `pi`, estimated
//! at `x / N` for the observed table. The p-value of a table `(x, a)` is
//! the total probability of all tables whose null probability does not
//! exceed that of the observed one.
//!
//! [`UncondTest::evaluate`] is the single entry point. A candidate first
//! runs through a pipeline of cheap bounds (boundary cases, the observed
//! table's own probability, the simple upper bound, confidence-interval
//! rejection, the per-support probability threshold, the memo cache); only
//! candidates no bound can decide reach the enumeration engine selected by
//! [`PvalueStrategy`].

mod fast;
mod naive;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config;
use crate::error::{Result, SigpatError};
use crate::math::LogFactorial;

/// Enumeration engine selection.
///
/// `FastTailed` is the production algorithm; `Naive` is the reference
/// oracle used for cross-validation; the remaining two reproduce the
/// intermediate screening builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PvalueStrategy {
    /// Stop after the bounds pipeline; undecided candidates keep the
    /// conservative `(exp(p0), 1.0)` bracket.
    ConfidenceIntervalOnly,
    /// Bounds pipeline, then the reference double loop.
    BoundsPlusEnum,
    /// Bounds pipeline, then the mode-outward tailed sweep.
    #[default]
    FastTailed,
    /// Raw reference double loop with no bounds and no cache.
    Naive,
}

/// Lower and upper bounds on a p-value. Both ends coincide once an
/// enumeration engine has run; bounds-only outcomes can be loose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvalueBounds {
    pub lower: f64,
    pub upper: f64,
}

impl PvalueBounds {
    fn exact(p: f64) -> Self {
        PvalueBounds { lower: p, upper: p }
    }
}

/// Counters over the lifetime of one test context.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TestCounters {
    /// Patterns fed into `evaluate`.
    pub tested_patterns: u64,
    /// Candidates that reached a full enumeration engine.
    pub explored_tables: u64,
    /// Null hypotheses rejected by the confidence-interval shortcut.
    pub ci_rejects: u64,
    /// Candidates accepted as significant by the simple upper bound alone.
    pub simple_ub_rejects: u64,
    /// Enumerated p-values at or below delta.
    pub enumerate_rejects: u64,
    /// Enumerated p-values above delta.
    pub enumerate_nonrejects: u64,
}

/// Shared table geometry and log-probability helpers, borrowed by both
/// enumeration engines.
pub(crate) struct TableParams<'a> {
    lf: &'a LogFactorial,
    n1: i64,
    n0: i64,
    pi: f64,
    log_pi: f64,
    log_1mpi: f64,
}

impl TableParams<'_> {
    /// Log-probability of the minority cell holding `a1` under `pi`.
    #[inline]
    fn prob_a1(&self, a1: i64) -> f64 {
        a1 as f64 * self.log_pi
            + (self.n1 - a1) as f64 * self.log_1mpi
            + self.lf.log_binom(self.n1 as usize, a1 as usize)
    }

    /// Log-probability of the majority cell holding `a0` under `pi`.
    #[inline]
    fn prob_a0(&self, a0: i64) -> f64 {
        a0 as f64 * self.log_pi
            + (self.n0 - a0) as f64 * self.log_1mpi
            + self.lf.log_binom(self.n0 as usize, a0 as usize)
    }

    /// `p0`: joint log-probability of the observed table `(x, a)`.
    fn p0(&self, x: usize, a: usize) -> f64 {
        self.prob_a1(a as i64) + self.prob_a0((x - a) as i64)
    }
}

struct PvalueCache {
    values: Vec<f64>,
    flags: Vec<bool>,
    stride: usize,
}

impl PvalueCache {
    fn index(&self, x: usize, a: usize) -> usize {
        a * self.stride + (x - a)
    }

    fn get(&self, x: usize, a: usize) -> Option<f64> {
        let idx = self.index(x, a);
        self.flags[idx].then(|| self.values[idx])
    }

    fn put(&mut self, x: usize, a: usize, p: f64) {
        let idx = self.index(x, a);
        self.values[idx] = p;
        self.flags[idx] = true;
    }
}

/// The unconditional exact test context for one dataset: all tables,
/// thresholds and counters live here and are touched only from the single
/// miner task.
pub struct UncondTest {
    n_total: usize,
    n_minor: usize,
    delta: f64,
    epsilon: f64,
    strategy: PvalueStrategy,
    lf: LogFactorial,
    /// Smallest non-rejected `p0` seen per support; anything more likely
    /// at the same support cannot be significant.
    prob_thr: Vec<f64>,
    cache: Option<PvalueCache>,
    counters: TestCounters,
}

impl UncondTest {
    /// Build a test context for `n_total` observations of which `n_minor`
    /// carry the minority label. The memo cache is activated unless its
    /// `(n + 1)(N - n + 1)` entries would reach the configured limit or
    /// `use_cache` is false.
    pub fn new(
        n_total: usize,
        n_minor: usize,
        delta: f64,
        epsilon: f64,
        strategy: PvalueStrategy,
        use_cache: bool,
    ) -> Result<Self> {
        if n_minor > n_total {
            return Err(SigpatError::InvalidInput(format!(
                "minority class size {} exceeds observation count {}",
                n_minor, n_total
            )));
        }
        if !(0.0..=1.0).contains(&delta) {
            return Err(SigpatError::InvalidInput(format!(
                "significance threshold {} outside [0, 1]",
                delta
            )));
        }

        let entries = (n_minor + 1) * (n_total - n_minor + 1);
        let cache = if !use_cache {
            debug!("p-value cache disabled by request");
            None
        } else if entries >= config::PVALUE_CACHE_MAX_ENTRIES {
            warn!(entries, "p-value cache disabled: table would be too large");
            None
        } else {
            debug!(entries, "p-value cache on");
            Some(PvalueCache {
                values: vec![0.0; entries],
                flags: vec![false; entries],
                stride: n_total - n_minor + 1,
            })
        };

        Ok(UncondTest {
            n_total,
            n_minor,
            delta,
            epsilon,
            strategy,
            lf: LogFactorial::new(n_total),
            prob_thr: vec![0.0; n_total + 1],
            cache,
            counters: TestCounters::default(),
        })
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn counters(&self) -> &TestCounters {
        &self.counters
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    fn params(&self, x: usize) -> TableParams<'_> {
        let pi = x as f64 / self.n_total as f64;
        TableParams {
            lf: &self.lf,
            n1: self.n_minor as i64,
            n0: (self.n_total - self.n_minor) as i64,
            pi,
            log_pi: pi.ln(),
            log_1mpi: (1.0 - pi).ln(),
        }
    }

    /// `exp(p0)`: probability of the observed table, as written to the
    /// p-value output file.
    pub fn observed_table_probability(&self, x: usize, a: usize) -> f64 {
        if self.trivial(x) {
            return 1.0;
        }
        self.params(x).p0(x, a).exp()
    }

    fn trivial(&self, x: usize) -> bool {
        self.n_minor == 0 || self.n_minor == self.n_total || x <= 1 || x >= self.n_total
    }

    /// Run an enumeration engine directly, bypassing every bound, the
    /// threshold and the cache. Intended for cross-validating the fast
    /// engine against the reference on a fixed table.
    pub fn enumerate_exact(&self, x: usize, a: usize, strategy: PvalueStrategy) -> f64 {
        if self.trivial(x) {
            return 1.0;
        }
        let params = self.params(x);
        let p0 = params.p0(x, a);
        match strategy {
            PvalueStrategy::FastTailed => fast::enumerate(&params, p0),
            _ => naive::enumerate(&params, p0),
        }
    }

    /// Evaluate the pattern `(x, a)`: support `x`, minority-class count `a`.
    pub fn evaluate(&mut self, x: usize, a: usize) -> PvalueBounds {
        debug_assert!(x >= 1 && x <= self.n_total);
        debug_assert!(a <= x && a <= self.n_minor);
        debug_assert!(x - a <= self.n_total - self.n_minor);

        self.counters.tested_patterns += 1;

        if self.strategy == PvalueStrategy::Naive {
            if self.trivial(x) {
                return PvalueBounds::exact(1.0);
            }
            let p = {
                let params = self.params(x);
                let p0 = params.p0(x, a);
                naive::enumerate(&params, p0)
            };
            self.counters.explored_tables += 1;
            self.classify(p);
            return PvalueBounds::exact(p);
        }

        if let Some(decided) = self.check_bounds(x, a) {
            return decided;
        }

        let (p, p0) = {
            let params = self.params(x);
            let p0 = params.p0(x, a);
            if self.strategy == PvalueStrategy::ConfidenceIntervalOnly {
                return PvalueBounds {
                    lower: p0.exp(),
                    upper: 1.0,
                };
            }
            let p = match self.strategy {
                PvalueStrategy::FastTailed => fast::enumerate(&params, p0),
                PvalueStrategy::BoundsPlusEnum => naive::enumerate(&params, p0),
                _ => unreachable!("strategies handled above"),
            };
            (p, p0)
        };

        self.counters.explored_tables += 1;
        self.classify(p);
        if p > self.delta && self.prob_thr[x] > p0 {
            self.prob_thr[x] = p0;
        }
        if let Some(cache) = self.cache.as_mut() {
            cache.put(x, a, p);
        }

        PvalueBounds::exact(p)
    }

    fn classify(&mut self, p: f64) {
        if p <= self.delta {
            self.counters.enumerate_rejects += 1;
        } else {
            self.counters.enumerate_nonrejects += 1;
        }
    }

    /// The pruning pipeline. Returns the decided bounds, or `None` when
    /// the candidate has to be enumerated.
    fn check_bounds(&mut self, x: usize, a: usize) -> Option<PvalueBounds> {
        if self.trivial(x) {
            return Some(PvalueBounds::exact(1.0));
        }

        let params = self.params(x);
        let p0 = params.p0(x, a);
        let n1 = self.n_minor as f64;
        let n0 = (self.n_total - self.n_minor) as f64;

        // The observed table itself contributes exp(p0), so the p-value
        // can never fall below it.
        if p0.exp() > self.delta {
            return Some(PvalueBounds {
                lower: p0.exp(),
                upper: 1.0,
            });
        }

        let simple_ub = (p0 + (n1 + 1.0).ln() + (n0 + 1.0).ln()).exp();
        if simple_ub <= self.delta {
            self.counters.simple_ub_rejects += 1;
            return Some(PvalueBounds {
                lower: p0.exp(),
                upper: simple_ub,
            });
        }

        if self.ci_rejects(x, a) {
            self.counters.ci_rejects += 1;
            return Some(PvalueBounds::exact(0.0));
        }

        if self.prob_thr[x] <= p0 {
            return Some(PvalueBounds::exact(1.0));
        }

        if let Some(cache) = self.cache.as_ref() {
            if let Some(p) = cache.get(x, a) {
                if p <= self.delta {
                    self.counters.enumerate_rejects += 1;
                }
                return Some(PvalueBounds {
                    lower: p,
                    upper: simple_ub.min(1.0),
                });
            }
        }

        None
    }

    /// Confidence-interval rejection: when the class frequencies are so
    /// skewed that the epsilon-inflated intervals around them do not
    /// intersect, the null is rejected outright.
    fn ci_rejects(&self, x: usize, a: usize) -> bool {
        let n1 = self.n_minor as f64;
        let n0 = (self.n_total - self.n_minor) as f64;
        let f1 = a as f64 / n1;
        let f0 = (x - a) as f64 / n0;
        let eps1 = self.epsilon * (n0 + n1) / n1;
        let eps0 = self.epsilon * (n0 + n1) / n0;
        let ilb = if f0 < f1 { f0 + eps0 } else { f1 + eps1 };
        let iub = if f0 > f1 { f0 - eps0 } else { f1 - eps1 };
        ilb < iub
    }
}
