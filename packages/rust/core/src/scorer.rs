//! The scoring capability contract.

use async_trait::async_trait;

use post_scorer_shared::{Post, ScoredPost, ScorerError};

/// Assigns each post a relevance score and a reason.
///
/// Implementations own batching, retries and ordering. They must return one
/// result per submitted post. Cancellation is applied by dropping the
/// returned future, so implementations should not spawn detached work.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score<'a>(&self, posts: &[&'a Post]) -> Result<Vec<ScoredPost<'a>>, ScorerError>;
}
