//! Result sinks: the `*.significant`, `*.pvalues` and `*.summary` output
//! files, plus an in-memory sink for library users and tests.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::error::{Result, SigpatError};
use crate::miner::{PatternSink, SignificantPattern};
use crate::summary::MiningSummary;

/// Writes each significant pattern to the itemset and p-value files as it
/// is emitted.
pub struct FileSink {
    significant_path: PathBuf,
    significant: BufWriter<File>,
    pvalues: BufWriter<File>,
}

impl FileSink {
    /// Create `<prefix>.significant` and `<prefix>.pvalues`.
    pub fn create(prefix: &str) -> Result<Self> {
        let significant_path = PathBuf::from(format!("{}.significant", prefix));
        let pvalues_path = PathBuf::from(format!("{}.pvalues", prefix));
        let significant = BufWriter::new(
            File::create(&significant_path)
                .map_err(|e| SigpatError::io(significant_path.display().to_string(), e))?,
        );
        let pvalues = BufWriter::new(
            File::create(&pvalues_path)
                .map_err(|e| SigpatError::io(pvalues_path.display().to_string(), e))?,
        );
        Ok(FileSink {
            significant_path,
            significant,
            pvalues,
        })
    }

    /// Flush both writers; call once mining is done.
    pub fn finish(mut self) -> Result<()> {
        self.significant
            .flush()
            .and_then(|_| self.pvalues.flush())
            .map_err(|e| SigpatError::io(self.significant_path.display().to_string(), e))
    }
}

impl PatternSink for FileSink {
    fn emit(&mut self, pattern: &SignificantPattern) -> Result<()> {
        let line = pattern
            .items
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(self.significant, "{}", line)
            .and_then(|_| {
                writeln!(
                    self.pvalues,
                    "{},{},{},{:e},{:e},{:e}",
                    pattern.minor_count,
                    pattern.support - pattern.minor_count,
                    pattern.support,
                    pattern.p0,
                    pattern.p_lower,
                    pattern.p_upper
                )
            })
            .map_err(|e| SigpatError::io(self.significant_path.display().to_string(), e))
    }
}

/// Write the human-readable `<prefix>.summary`, and optionally a JSON
/// rendering next to it.
pub fn write_summary(prefix: &str, summary: &MiningSummary, json: bool) -> Result<()> {
    let path = format!("{}.summary", prefix);
    std::fs::write(&path, summary.format_report()).map_err(|e| SigpatError::io(path.clone(), e))?;
    if json {
        let json_path = format!("{}.summary.json", prefix);
        let body = serde_json::to_string_pretty(summary)
            .map_err(|e| SigpatError::Internal(format!("summary serialization: {}", e)))?;
        std::fs::write(&json_path, body).map_err(|e| SigpatError::io(json_path.clone(), e))?;
    }
    Ok(())
}

/// Collects emitted patterns in memory.
#[derive(Default)]
pub struct MemorySink {
    pub patterns: Vec<SignificantPattern>,
}

impl PatternSink for MemorySink {
    fn emit(&mut self, pattern: &SignificantPattern) -> Result<()> {
        self.patterns.push(pattern.clone());
        Ok(())
    }
}
