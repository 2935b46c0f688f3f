//! End-to-end pipeline: load posts → link comments → score → report.

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info, instrument};

use post_scorer_shared::{Post, PostScorerError, Result, ScoredPost, ScorerError};

use crate::context::ScoreContext;
use crate::loader::{self, LinkPolicy};
use crate::report::{self, ReportFormat};
use crate::scorer::Scorer;

/// Configuration for [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Posts CSV (`id,title,body`).
    pub posts_path: PathBuf,
    /// Comments CSV (`post_id,body`).
    pub comments_path: PathBuf,
    /// Handling of comments for unknown posts.
    pub link_policy: LinkPolicy,
    /// Report rendering.
    pub format: ReportFormat,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Posts submitted for scoring.
    pub posts: usize,
    /// Comments attached to a post.
    pub comments_linked: usize,
    /// Comments dropped because their post was unknown.
    pub comments_dropped: usize,
    /// Results written to the sink.
    pub scored: usize,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, summary: &PipelineSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _summary: &PipelineSummary) {}
}

/// Submit `posts` to `scorer` under `ctx`.
///
/// Makes exactly one call. Cancellation or the context deadline abort it with
/// [`PostScorerError::Cancelled`]; scorer failures come back as
/// [`PostScorerError::Scoring`]. Either way no results are returned.
#[instrument(skip_all, fields(posts = posts.len()))]
pub async fn score_posts<'a>(
    ctx: &ScoreContext,
    scorer: &dyn Scorer,
    posts: &[&'a Post],
) -> Result<Vec<ScoredPost<'a>>> {
    if ctx.is_cancelled() {
        return Err(PostScorerError::cancelled("context cancelled before scoring"));
    }

    let deadline = async {
        match ctx.timeout() {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    let outcome = tokio::select! {
        biased;
        () = ctx.token().cancelled() => {
            return Err(PostScorerError::cancelled("scoring cancelled"));
        }
        () = deadline => {
            let limit = ctx.timeout().unwrap_or_default();
            return Err(PostScorerError::cancelled(format!(
                "scoring exceeded deadline of {}s",
                limit.as_secs_f64()
            )));
        }
        result = scorer.score(posts) => result,
    };

    let scored = outcome.map_err(PostScorerError::scoring)?;

    if scored.len() != posts.len() {
        return Err(PostScorerError::scoring(ScorerError::Contract(format!(
            "expected {} results, got {}",
            posts.len(),
            scored.len()
        ))));
    }

    debug!(scored = scored.len(), "scoring complete");
    Ok(scored)
}

/// Run the full pipeline.
///
/// 1. Load posts
/// 2. Link comments
/// 3. Score
/// 4. Write the report
///
/// The first failing stage ends the run; nothing is written to `sink` unless
/// scoring succeeded.
#[instrument(skip_all, fields(posts = %config.posts_path.display(), comments = %config.comments_path.display()))]
pub async fn run_pipeline<W: Write + ?Sized>(
    config: &PipelineConfig,
    ctx: &ScoreContext,
    scorer: &dyn Scorer,
    sink: &mut W,
    progress: &dyn ProgressReporter,
) -> Result<PipelineSummary> {
    let start = Instant::now();

    // --- Stage 1: Load ---
    progress.phase("Loading posts");
    let mut posts =
        loader::load_posts_file(&config.posts_path).map_err(|e| e.context("loading posts"))?;

    // --- Stage 2: Associate ---
    progress.phase("Linking comments");
    let stats = loader::load_comments_file(&config.comments_path, &mut posts, config.link_policy)
        .map_err(|e| e.context("loading comments"))?;

    debug!(
        posts = posts.len(),
        comments = posts.comment_count(),
        "posts ready for scoring"
    );

    // Read-only from here on.
    let submitted = posts.posts();

    // --- Stage 3: Score ---
    progress.phase("Scoring posts");
    let scored = score_posts(ctx, scorer, &submitted).await?;

    // --- Stage 4: Report ---
    progress.phase("Writing report");
    report::write_report(sink, &scored, config.format)?;

    let summary = PipelineSummary {
        posts: submitted.len(),
        comments_linked: stats.linked,
        comments_dropped: stats.dropped,
        scored: scored.len(),
        elapsed: start.elapsed(),
    };

    info!(
        posts = summary.posts,
        comments_linked = summary.comments_linked,
        comments_dropped = summary.comments_dropped,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "pipeline complete"
    );
    progress.done(&summary);

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    /// Scores every post by its title length.
    struct TitleLengthScorer {
        calls: AtomicUsize,
    }

    impl TitleLengthScorer {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Scorer for TitleLengthScorer {
        async fn score<'a>(
            &self,
            posts: &[&'a Post],
        ) -> std::result::Result<Vec<ScoredPost<'a>>, ScorerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(posts
                .iter()
                .map(|&p| ScoredPost::new(p, p.title.len() as i32, "length"))
                .collect())
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl Scorer for FailingScorer {
        async fn score<'a>(
            &self,
            _posts: &[&'a Post],
        ) -> std::result::Result<Vec<ScoredPost<'a>>, ScorerError> {
            Err(ScorerError::Status {
                status: 429,
                body: "rate limited".into(),
            })
        }
    }

    /// Never finishes.
    struct HangingScorer;

    #[async_trait]
    impl Scorer for HangingScorer {
        async fn score<'a>(
            &self,
            _posts: &[&'a Post],
        ) -> std::result::Result<Vec<ScoredPost<'a>>, ScorerError> {
            std::future::pending().await
        }
    }

    /// Returns one result fewer than requested.
    struct ShortScorer;

    #[async_trait]
    impl Scorer for ShortScorer {
        async fn score<'a>(
            &self,
            posts: &[&'a Post],
        ) -> std::result::Result<Vec<ScoredPost<'a>>, ScorerError> {
            Ok(posts
                .iter()
                .skip(1)
                .map(|&p| ScoredPost::new(p, 1, "x"))
                .collect())
        }
    }

    #[tokio::test]
    async fn empty_input_scores_to_empty_output() {
        let scorer = TitleLengthScorer::new();
        let scored = score_posts(&ScoreContext::new(), &scorer, &[]).await.expect("score");
        assert!(scored.is_empty());
    }

    #[tokio::test]
    async fn results_reference_submitted_posts() {
        let a = Post::new("p1", "abc", "");
        let b = Post::new("p2", "abcdef", "");
        let scorer = TitleLengthScorer::new();

        let scored = score_posts(&ScoreContext::new(), &scorer, &[&a, &b])
            .await
            .expect("score");

        assert_eq!(scored.len(), 2);
        assert!(std::ptr::eq(scored[0].post, &a));
        assert_eq!(scored[1].score, 6);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scorer_error_is_wrapped_with_stage() {
        let post = Post::new("p1", "t", "");
        let err = score_posts(&ScoreContext::new(), &FailingScorer, &[&post])
            .await
            .unwrap_err();

        assert!(matches!(err, PostScorerError::Scoring { .. }));
        assert_eq!(err.to_string(), "scoring posts: API returned status 429: rate limited");
    }

    #[tokio::test]
    async fn cancelled_before_call_skips_scorer() {
        let ctx = ScoreContext::new();
        ctx.cancel();
        let scorer = TitleLengthScorer::new();
        let post = Post::new("p1", "t", "");

        let err = score_posts(&ctx, &scorer, &[&post]).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_during_call_returns_cancelled() {
        let ctx = ScoreContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let post = Post::new("p1", "t", "");
        let err = score_posts(&ctx, &HangingScorer, &[&post]).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn deadline_returns_cancelled() {
        let ctx = ScoreContext::new().with_timeout(Duration::from_millis(50));
        let post = Post::new("p1", "t", "");

        let err = score_posts(&ctx, &HangingScorer, &[&post]).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(err.to_string().contains("deadline"));
    }

    #[tokio::test]
    async fn result_count_mismatch_is_rejected() {
        let a = Post::new("p1", "t", "");
        let b = Post::new("p2", "t", "");
        let err = score_posts(&ScoreContext::new(), &ShortScorer, &[&a, &b])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected 2 results, got 1"));
    }

    fn write_inputs(dir: &std::path::Path, posts: &str, comments: &str) -> PipelineConfig {
        let posts_path = dir.join("posts.csv");
        let comments_path = dir.join("comments.csv");
        std::fs::write(&posts_path, posts).expect("write posts");
        std::fs::write(&comments_path, comments).expect("write comments");
        PipelineConfig {
            posts_path,
            comments_path,
            link_policy: LinkPolicy::Lenient,
            format: ReportFormat::Text,
        }
    }

    #[tokio::test]
    async fn pipeline_runs_all_stages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = write_inputs(
            dir.path(),
            "id,title,body\np1,Title A,Body A\np2,Title B,Body B\n",
            "post_id,body\np1,nice\np3,orphan\n",
        );

        let mut out = Vec::new();
        let summary = run_pipeline(
            &config,
            &ScoreContext::new(),
            &TitleLengthScorer::new(),
            &mut out,
            &SilentProgress,
        )
        .await
        .expect("pipeline");

        assert_eq!(summary.posts, 2);
        assert_eq!(summary.comments_linked, 1);
        assert_eq!(summary.comments_dropped, 1);
        assert_eq!(summary.scored, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Post: Title A\nScore: 7\nReason: length\n\n\
             Post: Title B\nScore: 7\nReason: length\n\n"
        );
    }

    #[tokio::test]
    async fn failed_scoring_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = write_inputs(dir.path(), "id,title,body\np1,a,b\n", "post_id,body\n");

        let mut out = Vec::new();
        let err = run_pipeline(
            &config,
            &ScoreContext::new(),
            &FailingScorer,
            &mut out,
            &SilentProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PostScorerError::Scoring { .. }));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn load_failure_names_the_stage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = write_inputs(dir.path(), "id,title,body\np1,only-two\n", "post_id,body\n");

        let scorer = TitleLengthScorer::new();
        let mut out = Vec::new();
        let err = run_pipeline(&config, &ScoreContext::new(), &scorer, &mut out, &SilentProgress)
            .await
            .unwrap_err();

        assert!(err.is_structural());
        assert!(err.to_string().starts_with("loading posts: "));
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }
}
