//! Input loading: transaction and label files.
//!
//! Transactions are one line each, whitespace-separated non-negative item
//! identifiers; an empty line is an empty transaction that still consumes
//! a label slot. Labels are single characters `'0'`/`'1'`; any other byte
//! is ignored. The number of accepted label characters must equal the
//! number of transaction lines.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::info;

use crate::error::{Result, SigpatError};

/// A labeled transaction database, with the minority class normalized to
/// label `true`.
#[derive(Debug)]
pub struct Dataset {
    /// One item list per observation, in file order.
    pub transactions: Vec<Vec<u32>>,
    /// One label per observation; `true` is the minority class.
    pub labels: Vec<bool>,
    /// Whether labels were inverted at load time to make class 1 the minority.
    pub flipped: bool,
}

impl Dataset {
    /// Read both input files and normalize the minority class.
    pub fn load(
        transactions_path: impl AsRef<Path>,
        labels_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let transactions = read_transactions(transactions_path.as_ref())?;
        let labels = read_labels(labels_path.as_ref())?;
        Dataset::from_parts(transactions, labels)
    }

    /// Assemble a dataset from already-parsed parts, enforcing the
    /// label/transaction count invariant and the minority-class flip.
    pub fn from_parts(transactions: Vec<Vec<u32>>, mut labels: Vec<bool>) -> Result<Self> {
        if labels.len() != transactions.len() {
            return Err(SigpatError::InputInconsistency(format!(
                "{} labels for {} transactions",
                labels.len(),
                transactions.len()
            )));
        }

        let n_total = labels.len();
        let positives = labels.iter().filter(|&&l| l).count();
        let flipped = positives * 2 > n_total;
        if flipped {
            for label in labels.iter_mut() {
                *label = !*label;
            }
        }
        let n_minor = if flipped { n_total - positives } else { positives };
        info!(
            n_total,
            n_minor, flipped, "loaded dataset"
        );

        Ok(Dataset {
            transactions,
            labels,
            flipped,
        })
    }

    /// Number of observations `N`, empty transactions included.
    pub fn n_total(&self) -> usize {
        self.labels.len()
    }

    /// Minority class size `n`.
    pub fn n_minor(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }

    /// Largest item identifier present, if any item occurs at all.
    pub fn max_item(&self) -> Option<u32> {
        self.transactions
            .iter()
            .flat_map(|t| t.iter().copied())
            .max()
    }
}

fn read_transactions(path: &Path) -> Result<Vec<Vec<u32>>> {
    let file = File::open(path).map_err(|e| SigpatError::io(path.display().to_string(), e))?;
    let reader = BufReader::new(file);

    let mut transactions = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SigpatError::io(path.display().to_string(), e))?;
        let mut items = Vec::new();
        for token in line.split_whitespace() {
            let item: u32 = token.parse().map_err(|_| {
                SigpatError::InputInconsistency(format!(
                    "line {}: item identifier {:?} is not a non-negative integer",
                    line_no + 1,
                    token
                ))
            })?;
            items.push(item);
        }
        transactions.push(items);
    }
    Ok(transactions)
}

fn read_labels(path: &Path) -> Result<Vec<bool>> {
    let mut file = File::open(path).map_err(|e| SigpatError::io(path.display().to_string(), e))?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)
        .map_err(|e| SigpatError::io(path.display().to_string(), e))?;

    Ok(raw
        .iter()
        .filter_map(|b| match b {
            b'0' => Some(false),
            b'1' => Some(true),
            _ => None,
        })
        .collect())
}
