//! Reference enumeration: the full double loop over all contingency
//! tables with both margins free. Quadratic in the class sizes; kept as
//! the cross-validation oracle for the tailed engine and for the
//! `BoundsPlusEnum` strategy.

use super::TableParams;
use crate::config::LOG_ZERO;
use crate::math::sum_logs;

/// Sum `exp(p_table)` over every table with `p_table <= p0`, accumulated
/// in log space.
pub(super) fn enumerate(t: &TableParams<'_>, p0: f64) -> f64 {
    let mut acc = LOG_ZERO;
    for a1 in 0..=t.n1 {
        let row = t.prob_a1(a1);
        for a0 in 0..=t.n0 {
            let p_table = row + t.prob_a0(a0);
            if p_table <= p0 {
                acc = sum_logs(acc, p_table);
            }
        }
    }
    acc.exp().min(1.0)
}
