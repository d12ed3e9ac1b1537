//! # Error Module
//!
//! Error types for the hash signer.
//!
//! ## Design Principles
//! - **Never panic** inside the pipeline - failures become values
//! - **Per-item failures travel downstream** - nothing is silently dropped
//! - **Include context** - which stage, which primitive, which input
//! - **Structural bugs are prevented by construction** - there is no
//!   "premature close" variant because the queue API cannot express it

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Input error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised by a hash primitive
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("{primitive} failed on {input:?}: {reason}")]
    Failed {
        primitive: &'static str,
        input: String,
        reason: String,
    },

    #[error("{primitive} panicked on {input:?}")]
    Panicked {
        primitive: &'static str,
        input: String,
    },

    #[error("{primitive} overheated: {active} concurrent callers on an exclusive primitive")]
    Overheated {
        primitive: &'static str,
        active: usize,
    },

    #[error("{primitive} call on {input:?} skipped: run cancelled")]
    Cancelled {
        primitive: &'static str,
        input: String,
    },
}

/// A single item that could not be signed.
///
/// Once an item fails, every later stage forwards the failure unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("stage {stage} failed on {input:?}: {error}")]
pub struct ItemFailure {
    /// Stage in which the item failed
    pub stage: &'static str,
    /// The stage input, rendered for display
    pub input: String,
    /// The underlying primitive failure
    #[source]
    pub error: HashError,
}

/// Errors that abort a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid queue capacity: {capacity} (must be at least 1)")]
    InvalidCapacity { capacity: usize },

    #[error("Invalid in-flight limit: {limit} (must be at least 1)")]
    InvalidInFlightLimit { limit: usize },

    #[error("{} item(s) failed; first: {}", .failures.len(), .failures.first().map(ToString::to_string).unwrap_or_default())]
    ItemsFailed { failures: Vec<ItemFailure> },

    #[error("Aggregator received more than {limit} results")]
    TooManyItems { limit: usize },

    #[error("Stage {stage} panicked")]
    StagePanicked { stage: String },

    #[error("Failed to start stage {stage}: {source}")]
    SpawnFailed {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Pipeline was cancelled")]
    Cancelled,
}

/// Errors that occur while reading input items
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read items from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line}: {value:?} is not an integer")]
    InvalidItem { line: usize, value: String },

    #[error("Invalid range {start}..{end}: start must not exceed end")]
    InvalidRange { start: i64, end: i64 },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SignerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_failure_names_stage_and_input() {
        let failure = ItemFailure {
            stage: "dual-hash",
            input: "42".to_string(),
            error: HashError::Panicked {
                primitive: "md5",
                input: "42".to_string(),
            },
        };
        let message = failure.to_string();
        assert!(message.contains("dual-hash"));
        assert!(message.contains("42"));
        assert!(message.contains("md5"));
    }

    #[test]
    fn items_failed_reports_count_and_first_failure() {
        let failure = |input: &str| ItemFailure {
            stage: "fan-out",
            input: input.to_string(),
            error: HashError::Failed {
                primitive: "crc32",
                input: input.to_string(),
                reason: "boom".to_string(),
            },
        };
        let error = PipelineError::ItemsFailed {
            failures: vec![failure("a"), failure("b")],
        };
        let message = error.to_string();
        assert!(message.starts_with("2 item(s) failed"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn source_error_includes_path() {
        let error = SourceError::Io {
            path: PathBuf::from("/data/items.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(error.to_string().contains("/data/items.txt"));
    }

    #[test]
    fn errors_convert_to_top_level() {
        let error: SignerError = PipelineError::Cancelled.into();
        assert!(matches!(error, SignerError::Pipeline(PipelineError::Cancelled)));
    }
}
