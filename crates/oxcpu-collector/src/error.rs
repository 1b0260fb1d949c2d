use std::path::PathBuf;

/// Errors that can occur while reading CPU counters or answering lookups.
///
/// Read and parse failures abort a whole collection cycle. `UnknownMetric`
/// and `InvalidNamespace` are reported per requested metric.
///
/// # Examples
///
/// ```rust
/// use oxcpu_collector::error::CollectorError;
///
/// let err = CollectorError::UnknownMetric {
///     cpu: "7".to_string(),
///     metric: "user_percentage".to_string(),
/// };
/// assert!(err.to_string().contains("user_percentage"));
/// assert!(!err.aborts_cycle());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// The counter source could not be opened or read.
    #[error("Collector: cannot read {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Line count, field count or CPU row shape does not match expectations.
    #[error("Collector: incorrect stat format: {0}")]
    Format(String),

    /// A counter field is not a valid non-negative integer.
    #[error("Collector: cannot parse field {field} of line {line}: {reason}")]
    Parse {
        line: usize,
        field: usize,
        reason: String,
    },

    /// The metric was never established for this CPU.
    #[error("Collector: unknown metric {metric} for CPU {cpu}")]
    UnknownMetric { cpu: String, metric: String },

    /// A requested namespace string could not be resolved.
    #[error("Collector: invalid namespace: {0}")]
    InvalidNamespace(String),
}

impl CollectorError {
    /// Whether this error fails the whole collection cycle rather than a
    /// single requested metric.
    pub fn aborts_cycle(&self) -> bool {
        matches!(
            self,
            CollectorError::SourceUnavailable { .. }
                | CollectorError::Format(_)
                | CollectorError::Parse { .. }
        )
    }
}

/// Convenience `Result` alias for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;
