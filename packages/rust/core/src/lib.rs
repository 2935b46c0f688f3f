//! Core pipeline for post-scorer.
//!
//! Parses the posts and comments inputs, links comments to their posts,
//! hands the result to a [`Scorer`] and renders what comes back.

pub mod context;
pub mod loader;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod scorer;

pub use context::ScoreContext;
pub use loader::{LinkPolicy, LinkStats};
pub use pipeline::{PipelineConfig, PipelineSummary, ProgressReporter, SilentProgress};
pub use report::ReportFormat;
pub use scorer::Scorer;
