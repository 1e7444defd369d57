//! Error types for the sigpat library

/// Error types for the sigpat library
#[derive(Debug, thiserror::Error)]
pub enum SigpatError {
    /// Failure to open or read an input file
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A buffer could not be allocated or would exceed addressable limits
    #[error("Allocation failure: {buffer} would need {requested} entries")]
    Allocation { buffer: String, requested: usize },

    /// Label/transaction counts disagree, or an item identifier overflows
    #[error("Input inconsistency: {0}")]
    InputInconsistency(String),

    /// Invalid parameters (generic fallback)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal invariant was violated; indicates a logic bug
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type for sigpat operations
pub type Result<T> = std::result::Result<T, SigpatError>;

impl SigpatError {
    /// Map this error to the process exit code documented for the CLI:
    /// 1 for argument/IO/input errors, 2 for allocation failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            SigpatError::Allocation { .. } => 2,
            _ => 1,
        }
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        SigpatError::Io {
            path: path.into(),
            source,
        }
    }
}
