//! Prompt construction for scoring requests.

use serde::Serialize;

use post_scorer_shared::Post;

/// Used when the configured prompt text is blank.
pub const DEFAULT_PROMPT: &str = "\
You are rating discussion posts for how useful they are to someone looking for \
local recommendations, events or practical information. Consider the post title, \
its body and the replies it received. Posts asking a concrete question that the \
replies answer well deserve high scores; off-topic, deleted or empty posts deserve \
low scores.";

/// Appended to every prompt so the response can be parsed.
pub const OUTPUT_CONTRACT: &str = r#"Score every post on a scale from 0 (irrelevant) to 100 (highly relevant).
Respond with a single JSON object and nothing else, in exactly this shape:
{"version": "1.0", "scores": [{"post_id": "<id>", "title": "<title>", "score": <0-100>, "reason": "<one or two sentences>"}]}
Include exactly one entry per post, using the post's id unchanged."#;

#[derive(Serialize)]
struct PromptPost<'a> {
    id: &'a str,
    title: &'a str,
    body: &'a str,
    comments: Vec<&'a str>,
}

#[derive(Serialize)]
struct PromptBatch<'a> {
    posts: Vec<PromptPost<'a>>,
}

/// System message: the caller's instructions followed by the output contract.
pub fn system_message(prompt_text: &str) -> String {
    let instructions = match prompt_text.trim() {
        "" => DEFAULT_PROMPT,
        text => text,
    };
    format!("{instructions}\n\n{OUTPUT_CONTRACT}")
}

/// User message: the batch serialized as JSON.
pub fn user_message(batch: &[&Post]) -> serde_json::Result<String> {
    let payload = PromptBatch {
        posts: batch
            .iter()
            .map(|p| PromptPost {
                id: &p.id,
                title: &p.title,
                body: &p.body,
                comments: p.comments.iter().map(|c| c.body.as_str()).collect(),
            })
            .collect(),
    };
    serde_json::to_string(&payload)
}
