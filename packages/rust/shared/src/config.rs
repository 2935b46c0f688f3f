//! Application configuration for post-scorer.
//!
//! User config lives at `~/.post-scorer/post-scorer.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PostScorerError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "post-scorer.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".post-scorer";

// ---------------------------------------------------------------------------
// Config structs (matching post-scorer.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// OpenAI API settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Scoring run settings.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Input file locations and merge policy.
    #[serde(default)]
    pub input: InputConfig,
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Chat model used for scoring.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_request_timeout() -> u64 {
    60
}

/// `[scoring]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Posts sent per API request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// File holding the scoring prompt.
    #[serde(default = "default_prompt_file")]
    pub prompt_file: String,

    /// Overall deadline for the scoring stage, in seconds. Unset means no deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            prompt_file: default_prompt_file(),
            timeout_secs: None,
        }
    }
}

fn default_batch_size() -> usize {
    10
}
fn default_prompt_file() -> String {
    "custom_prompt.txt".into()
}

/// `[input]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Posts CSV (`id,title,body`).
    #[serde(default = "default_posts_file")]
    pub posts_file: String,

    /// Comments CSV (`post_id,body`).
    #[serde(default = "default_comments_file")]
    pub comments_file: String,

    /// Reject comments whose post is unknown instead of dropping them.
    #[serde(default)]
    pub strict_comments: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            posts_file: default_posts_file(),
            comments_file: default_comments_file(),
            strict_comments: false,
        }
    }
}

fn default_posts_file() -> String {
    "example_posts.csv".into()
}
fn default_comments_file() -> String {
    "example_comments.csv".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.post-scorer/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PostScorerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.post-scorer/post-scorer.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PostScorerError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        PostScorerError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file to the standard location.
/// Returns its path and whether it was newly created.
pub fn init_config() -> Result<(PathBuf, bool)> {
    let path = config_file_path()?;
    let created = init_config_at(&path)?;
    Ok((path, created))
}

/// Write a default config file at `path`, creating parent directories.
///
/// An existing file is left untouched and `false` is returned.
pub fn init_config_at(path: &Path) -> Result<bool> {
    if path.exists() {
        tracing::info!(?path, "config file already exists, leaving it unchanged");
        return Ok(false);
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| PostScorerError::io(dir, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| PostScorerError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| PostScorerError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(true)
}

// ---------------------------------------------------------------------------
// Startup collaborators
// ---------------------------------------------------------------------------

/// Read the OpenAI API key from the env var named in the config.
///
/// A missing or empty key is a fatal precondition failure.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openai.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(PostScorerError::config(format!(
            "OpenAI API key not found. Set the {var_name} environment variable \
             (a .env file in the working directory is also read)."
        ))),
    }
}

/// Read the scoring prompt file as raw text.
pub fn read_prompt(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| PostScorerError::io(path, e))
}
