//! Decoding and validation of the model's scoring output.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use post_scorer_shared::{Post, ScoredPost, ScorerError};

/// Lowest score the contract allows.
pub const MIN_SCORE: i64 = 0;

/// Highest score the contract allows.
pub const MAX_SCORE: i64 = 100;

/// Matches a response wrapped in a Markdown code fence.
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$").expect("fence regex")
});

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    scores: Vec<ScoreItem>,
}

#[derive(Debug, Deserialize)]
struct ScoreItem {
    post_id: String,
    score: i64,
    #[serde(default)]
    reason: String,
}

/// At most `max_chars` characters of `text`, for error messages.
pub(crate) fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Remove a surrounding ```` ``` ```` fence, if any.
fn strip_fence(content: &str) -> &str {
    match FENCE_RE.captures(content).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => content.trim(),
    }
}

/// Parse the message content for one batch and pair each score with its post.
///
/// Every post in `batch` must be scored exactly once, with no unknown ids and
/// scores within `MIN_SCORE..=MAX_SCORE`. Results follow the response order.
pub fn parse_scores<'a>(
    content: &str,
    batch: &[&'a Post],
) -> Result<Vec<ScoredPost<'a>>, ScorerError> {
    let parsed: ScoreResponse = serde_json::from_str(strip_fence(content)).map_err(|e| {
        ScorerError::InvalidResponse(format!(
            "score payload is not valid JSON: {e} (got: {})",
            excerpt(content, 200)
        ))
    })?;

    let mut pending: HashMap<&str, &'a Post> =
        batch.iter().map(|&p| (p.id.as_str(), p)).collect();
    let mut results = Vec::with_capacity(batch.len());

    for item in parsed.scores {
        let Some(post) = pending.remove(item.post_id.as_str()) else {
            let reason = if batch.iter().any(|p| p.id == item.post_id) {
                "scored more than once"
            } else {
                "not in the request"
            };
            return Err(ScorerError::Contract(format!(
                "post '{}' {reason}",
                item.post_id
            )));
        };

        if !(MIN_SCORE..=MAX_SCORE).contains(&item.score) {
            return Err(ScorerError::Contract(format!(
                "score {} for post '{}' is outside {MIN_SCORE}..={MAX_SCORE}",
                item.score, item.post_id
            )));
        }

        // Range-checked above.
        results.push(ScoredPost::new(post, item.score as i32, item.reason));
    }

    if !pending.is_empty() {
        let mut missing: Vec<&str> = pending.into_keys().collect();
        missing.sort_unstable();
        return Err(ScorerError::Contract(format!(
            "no score returned for: {}",
            missing.join(", ")
        )));
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posts() -> (Post, Post) {
        (Post::new("a", "A", ""), Post::new("b", "B", ""))
    }

    #[test]
    fn parses_plain_json_in_response_order() {
        let (a, b) = posts();
        let content = r#"{"version":"1.0","scores":[
            {"post_id":"b","title":"B","score":10,"reason":"weak"},
            {"post_id":"a","title":"A","score":95,"reason":"strong"}]}"#;

        let scored = parse_scores(content, &[&a, &b]).expect("parse");
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].post.id, "b");
        assert_eq!(scored[1].score, 95);
        assert_eq!(scored[1].reason, "strong");
    }

    #[test]
    fn strips_code_fence() {
        let (a, _) = posts();
        let content = "```json\n{\"scores\":[{\"post_id\":\"a\",\"score\":50,\"reason\":\"ok\"}]}\n```";
        let scored = parse_scores(content, &[&a]).expect("parse");
        assert_eq!(scored[0].score, 50);
    }

    #[test]
    fn rejects_malformed_json() {
        let (a, _) = posts();
        let err = parse_scores("I think post a is great", &[&a]).unwrap_err();
        assert!(matches!(err, ScorerError::InvalidResponse(_)));
    }

    #[test]
    fn rejects_missing_post() {
        let (a, b) = posts();
        let content = r#"{"scores":[{"post_id":"a","score":50,"reason":"ok"}]}"#;
        let err = parse_scores(content, &[&a, &b]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "response violates scoring contract: no score returned for: b"
        );
    }

    #[test]
    fn rejects_unknown_and_duplicate_ids() {
        let (a, _) = posts();
        let unknown = r#"{"scores":[{"post_id":"zzz","score":50,"reason":"?"}]}"#;
        assert!(parse_scores(unknown, &[&a]).unwrap_err().to_string().contains("not in the request"));

        let twice = r#"{"scores":[
            {"post_id":"a","score":50,"reason":"x"},
            {"post_id":"a","score":60,"reason":"y"}]}"#;
        assert!(parse_scores(twice, &[&a]).unwrap_err().to_string().contains("more than once"));
    }

    #[test]
    fn rejects_out_of_range_score() {
        let (a, _) = posts();
        let content = r#"{"scores":[{"post_id":"a","score":150,"reason":"!"}]}"#;
        let err = parse_scores(content, &[&a]).unwrap_err();
        assert!(err.to_string().contains("outside 0..=100"));
    }
}
