//! Shared types, error model, and configuration for post-scorer.
//!
//! This crate is the foundation depended on by all other post-scorer crates.
//! It provides:
//! - [`PostScorerError`] and [`ScorerError`]: the error taxonomy
//! - Domain types ([`Post`], [`Comment`], [`ScoredPost`], [`PostMap`])
//! - Configuration ([`AppConfig`], config loading, credential and prompt resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, InputConfig, OpenAiConfig, ScoringConfig, config_dir, config_file_path,
    init_config, init_config_at, load_config, load_config_from, read_prompt, resolve_api_key,
};
pub use error::{PostScorerError, Result, ScorerError};
pub use types::{Comment, Post, PostMap, ScoredPost};
