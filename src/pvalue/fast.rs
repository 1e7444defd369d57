//! Mode-outward tailed enumeration of the unconditional p-value.
//!
//! The sum over all tables with `p_table <= p0` is taken row by row in
//! `a1`, sweeping outward from the binomial mode. Within a row the
//! qualifying cells form the complement of a contiguous interval around
//! the `a0` mode, so the row mass is two closed-form binomial tails; the
//! boundaries are found by binary search on the first row of a sweep and
//! by O(1) amortized hint advancement on every following row. Once a
//! sweep leaves the region where the row maximum exceeds `p0`, the whole
//! remaining `a1` tail qualifies and is added in one closed form.

use super::TableParams;
use crate::config::LOG_ZERO;
use crate::math::{binom_tail_ge, binom_tail_le, sum_logs};

/// Tracks the boundary of the `<= p0` region on one side of the `a0`
/// mode, reusing the previous row's boundary as the starting hint.
struct RightBoundary {
    prev: Option<i64>,
}

struct LeftBoundary {
    prev: Option<i64>,
}

impl RightBoundary {
    /// Smallest `a0` in `(mode0, n0 + 1]` with `row + prob(a0) <= p0`;
    /// `n0 + 1` when the whole right side stays above `p0`.
    fn locate(&mut self, t: &TableParams<'_>, row: f64, p0: f64, mode0: i64) -> i64 {
        let n0 = t.n0;
        let cell = |a0: i64| row + t.prob_a0(a0);
        let boundary = match self.prev {
            None => {
                if cell(n0) > p0 {
                    n0 + 1
                } else {
                    // cell(lo) > p0 >= cell(hi) throughout.
                    let (mut lo, mut hi) = (mode0, n0);
                    while hi - lo > 3 {
                        let mid = (lo + hi) / 2;
                        if cell(mid) > p0 {
                            lo = mid;
                        } else {
                            hi = mid;
                        }
                    }
                    let mut a0 = lo + 1;
                    while cell(a0) > p0 {
                        a0 += 1;
                    }
                    a0
                }
            }
            Some(b) => {
                let mut a0 = b.clamp(mode0 + 1, n0 + 1);
                while a0 <= n0 && cell(a0) > p0 {
                    a0 += 1;
                }
                while a0 > mode0 + 1 && cell(a0 - 1) <= p0 {
                    a0 -= 1;
                }
                a0
            }
        };
        self.prev = Some(boundary);
        boundary
    }
}

impl LeftBoundary {
    /// Largest `a0` in `[-1, mode0 - 1]` with `row + prob(a0) <= p0`;
    /// `-1` when the whole left side stays above `p0`.
    fn locate(&mut self, t: &TableParams<'_>, row: f64, p0: f64, mode0: i64) -> i64 {
        let cell = |a0: i64| row + t.prob_a0(a0);
        let boundary = match self.prev {
            None => {
                if mode0 == 0 || cell(0) > p0 {
                    -1
                } else {
                    // cell(lo) <= p0 < cell(hi) throughout.
                    let (mut lo, mut hi) = (0, mode0);
                    while hi - lo > 3 {
                        let mid = (lo + hi) / 2;
                        if cell(mid) > p0 {
                            hi = mid;
                        } else {
                            lo = mid;
                        }
                    }
                    let mut a0 = hi - 1;
                    while cell(a0) > p0 {
                        a0 -= 1;
                    }
                    a0
                }
            }
            Some(b) => {
                let mut a0 = b.clamp(-1, (mode0 - 1).max(-1));
                while a0 >= 0 && cell(a0) > p0 {
                    a0 -= 1;
                }
                while a0 < mode0 - 1 && cell(a0 + 1) <= p0 {
                    a0 += 1;
                }
                a0
            }
        };
        self.prev = Some(boundary);
        boundary
    }
}

/// Exact p-value of the observed table whose log-probability is `p0`:
/// the total mass of all tables at most as probable.
pub(super) fn enumerate(t: &TableParams<'_>, p0: f64) -> f64 {
    let (n1, n0, pi) = (t.n1, t.n0, t.pi);
    let mode1 = ((((n1 + 1) as f64) * pi) + 0.5).floor() as i64;
    let mode1 = mode1.clamp(0, n1);
    let mode0 = ((((n0 + 1) as f64) * pi) + 0.5).floor() as i64;
    let mode0 = mode0.clamp(0, n0);
    let mode0_log = t.prob_a0(mode0);

    let mut right = RightBoundary { prev: None };
    let mut left = LeftBoundary { prev: None };
    let mut acc = LOG_ZERO;

    // Sweep a1 upward from its mode while the row maximum exceeds p0.
    let mut a1 = mode1;
    while a1 <= n1 {
        let row = t.prob_a1(a1);
        if row + mode0_log <= p0 {
            break;
        }
        let l = left.locate(t, row, p0, mode0);
        let r = right.locate(t, row, p0, mode0);
        let tails = binom_tail_le(l, n0, pi) + binom_tail_ge(r, n0, pi);
        if tails > 0.0 {
            acc = sum_logs(acc, row + tails.ln());
        }
        a1 += 1;
    }
    // Every row past the stop point lies entirely inside the <= p0 region.
    let upper_completion = binom_tail_ge(a1, n1, pi);

    // The same, downward.
    let mut a1 = mode1 - 1;
    while a1 >= 0 {
        let row = t.prob_a1(a1);
        if row + mode0_log <= p0 {
            break;
        }
        let l = left.locate(t, row, p0, mode0);
        let r = right.locate(t, row, p0, mode0);
        let tails = binom_tail_le(l, n0, pi) + binom_tail_ge(r, n0, pi);
        if tails > 0.0 {
            acc = sum_logs(acc, row + tails.ln());
        }
        a1 -= 1;
    }
    let lower_completion = binom_tail_le(a1, n1, pi);

    (acc.exp() + upper_completion + lower_completion).min(1.0)
}
