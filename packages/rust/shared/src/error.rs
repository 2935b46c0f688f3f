//! Error types for post-scorer.
//!
//! Library crates use [`PostScorerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all post-scorer operations.
#[derive(Debug, thiserror::Error)]
pub enum PostScorerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Input stream could not be read or decoded.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A row has fewer columns than its schema requires.
    #[error("structural error at line {line}: expected at least {expected} columns, found {found}")]
    Structural {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Data rejected by an explicitly requested strict policy.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The execution context was cancelled or its deadline passed.
    #[error("cancelled: {reason}")]
    Cancelled { reason: String },

    /// The external scoring capability failed. The cause is part of the
    /// message and is not repeated as a source.
    #[error("scoring posts: {cause}")]
    Scoring { cause: ScorerError },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    /// Writing the report to the output sink failed.
    #[error("output error: {0}")]
    Output(std::io::Error),

    /// An error annotated with the pipeline stage it came from.
    #[error("{stage}: {inner}")]
    Stage {
        stage: &'static str,
        inner: Box<PostScorerError>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PostScorerError>;

impl PostScorerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error for the given input line.
    pub fn parse(line: usize, msg: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a cancellation error with a reason.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Wrap a scoring capability failure.
    pub fn scoring(cause: ScorerError) -> Self {
        Self::Scoring { cause }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }

    /// Annotate this error with the pipeline stage that produced it.
    pub fn context(self, stage: &'static str) -> Self {
        Self::Stage {
            stage,
            inner: Box::new(self),
        }
    }

    /// The innermost error, looking through any stage annotations.
    pub fn root(&self) -> &PostScorerError {
        match self {
            Self::Stage { inner, .. } => inner.root(),
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled { .. })
    }

    pub fn is_structural(&self) -> bool {
        matches!(self.root(), Self::Structural { .. })
    }
}

/// Failure reported by a scoring capability implementation.
///
/// The orchestrator wraps these unchanged in [`PostScorerError::Scoring`].
#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    /// The scorer could not be constructed from its configuration.
    #[error("scorer configuration: {0}")]
    Config(String),

    /// Transport-level failure (connect, timeout, TLS, body read).
    #[error("request failed: {0}")]
    Http(String),

    /// The API answered with a non-success status.
    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The response decoded but broke the scoring contract.
    #[error("response violates scoring contract: {0}")]
    Contract(String),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}
