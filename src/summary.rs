//! Run summary: counters collected across one mining run, with a
//! CLI-friendly formatter and a serializable form for machine consumers.

use serde::Serialize;

use crate::pvalue::TestCounters;

/// Everything the `*.summary` output reports about a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct MiningSummary {
    /// Patterns fed to the significance path.
    pub tested_patterns: u64,
    /// Candidates that required full contingency-table enumeration.
    pub explored_tables: u64,
    /// Null hypotheses rejected by the confidence-interval shortcut.
    pub ci_rejects: u64,
    /// Candidates accepted by the simple upper bound alone.
    pub simple_ub_rejects: u64,
    /// Enumerated p-values at or below delta.
    pub enumerate_rejects: u64,
    /// Enumerated p-values above delta.
    pub enumerate_nonrejects: u64,
    /// Patterns written to the significant-itemsets file.
    pub significant_patterns: u64,
    /// Effective corrected significance threshold.
    pub delta: f64,
    /// Effective minimum support.
    pub min_support: u64,
}

impl MiningSummary {
    pub fn new(
        counters: &TestCounters,
        significant_patterns: u64,
        delta: f64,
        min_support: u64,
    ) -> Self {
        MiningSummary {
            tested_patterns: counters.tested_patterns,
            explored_tables: counters.explored_tables,
            ci_rejects: counters.ci_rejects,
            simple_ub_rejects: counters.simple_ub_rejects,
            enumerate_rejects: counters.enumerate_rejects,
            enumerate_nonrejects: counters.enumerate_nonrejects,
            significant_patterns,
            delta,
            min_support,
        }
    }

    /// Format the summary as written to the `*.summary` file.
    pub fn format_report(&self) -> String {
        let mut out = String::new();
        out.push_str("RESULTS\n");
        out.push_str(&format!(
            "\tCorrected significance threshold: {:e}\n",
            self.delta
        ));
        out.push_str(&format!("\tMinimum support: {}\n", self.min_support));
        out.push_str(&format!("\tTested patterns: {}\n", self.tested_patterns));
        out.push_str(&format!(
            "\tExplored contingency tables: {}\n",
            self.explored_tables
        ));
        out.push_str(&format!(
            "\tConfidence-interval rejects: {}\n",
            self.ci_rejects
        ));
        out.push_str(&format!(
            "\tSimple-upper-bound rejects: {}\n",
            self.simple_ub_rejects
        ));
        out.push_str(&format!("\tEnumerate rejects: {}\n", self.enumerate_rejects));
        out.push_str(&format!(
            "\tEnumerate non-rejects: {}\n",
            self.enumerate_nonrejects
        ));
        out.push_str(&format!(
            "\tNumber of significant patterns found: {}\n",
            self.significant_patterns
        ));
        out
    }
}
