//! OpenAI-backed implementation of the [`Scorer`] capability.
//!
//! Posts are sent in sequential batches to the chat-completions endpoint in
//! JSON mode. Each response must score every post of its batch exactly once.

mod prompt;
mod response;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use post_scorer_core::Scorer;
use post_scorer_shared::{Post, ScoredPost, ScorerError};

pub use prompt::{DEFAULT_PROMPT, OUTPUT_CONTRACT};
pub use response::{MAX_SCORE, MIN_SCORE};

/// Default model for scoring.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default number of posts per request.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("post-scorer/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Settings for [`OpenAiScorer`].
#[derive(Clone)]
pub struct ScorerConfig {
    /// API credential.
    pub api_key: String,
    /// Scoring instructions; blank means [`DEFAULT_PROMPT`].
    pub prompt_text: String,
    /// Chat model id.
    pub model: String,
    /// API base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Posts per request.
    pub batch_size: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl ScorerConfig {
    /// Config with default model, endpoint, batch size and timeout.
    pub fn new(api_key: impl Into<String>, prompt_text: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            prompt_text: prompt_text.into(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for ScorerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScorerConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("batch_size", &self.batch_size)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Scores posts with an OpenAI-compatible chat-completions API.
pub struct OpenAiScorer {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    system_message: String,
    batch_size: usize,
}

impl fmt::Debug for OpenAiScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiScorer")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl OpenAiScorer {
    /// Build a scorer. Fails if the API key is empty or the base URL is invalid.
    pub fn new(config: ScorerConfig) -> Result<Self, ScorerError> {
        if config.api_key.trim().is_empty() {
            return Err(ScorerError::Config("OpenAI API key is required".into()));
        }
        if config.batch_size == 0 {
            return Err(ScorerError::Config("batch size must be at least 1".into()));
        }

        let endpoint = chat_endpoint(&config.base_url)?;
        let client = build_client(config.timeout_secs)?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            model: config.model,
            system_message: prompt::system_message(&config.prompt_text),
            batch_size: config.batch_size,
        })
    }

    /// Score one batch with a single request.
    #[instrument(skip_all, fields(batch = batch.len()))]
    async fn score_batch<'a>(&self, batch: &[&'a Post]) -> Result<Vec<ScoredPost<'a>>, ScorerError> {
        let user = prompt::user_message(batch)
            .map_err(|e| ScorerError::Other(format!("failed to serialize posts: {e}")))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_message,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            temperature: 0.0,
        };

        let reply = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ScorerError::Http(format!("{}: {e}", self.endpoint)))?;

        let status = reply.status();
        if !status.is_success() {
            let body = reply.text().await.unwrap_or_default();
            return Err(ScorerError::Status {
                status: status.as_u16(),
                body: response::excerpt(body.trim(), 500).to_string(),
            });
        }

        let chat: ChatResponse = reply
            .json()
            .await
            .map_err(|e| ScorerError::InvalidResponse(format!("undecodable completion: {e}")))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ScorerError::InvalidResponse("completion has no content".into()))?;

        debug!(bytes = content.len(), "completion received");
        response::parse_scores(&content, batch)
    }
}

#[async_trait]
impl Scorer for OpenAiScorer {
    async fn score<'a>(&self, posts: &[&'a Post]) -> Result<Vec<ScoredPost<'a>>, ScorerError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let batches = posts.len().div_ceil(self.batch_size);
        info!(posts = posts.len(), batches, model = %self.model, "scoring posts");

        let mut results = Vec::with_capacity(posts.len());
        for (i, batch) in posts.chunks(self.batch_size).enumerate() {
            debug!(batch = i + 1, of = batches, "sending batch");
            results.extend(self.score_batch(batch).await?);
        }

        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `{base_url}/chat/completions`, tolerating a trailing slash.
fn chat_endpoint(base_url: &str) -> Result<Url, ScorerError> {
    let joined = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    Url::parse(&joined).map_err(|e| ScorerError::Config(format!("invalid base URL '{base_url}': {e}")))
}

/// Build a reqwest client with appropriate settings.
fn build_client(timeout_secs: u64) -> Result<Client, ScorerError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ScorerError::Config(format!("failed to build HTTP client: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
