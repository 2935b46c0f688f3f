//! Rendering of scored posts.

use std::io::Write;

use serde::Serialize;

use post_scorer_shared::{PostScorerError, Result, ScoredPost};

/// Output format for [`write_report`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// `Post:` / `Score:` / `Reason:` blocks separated by blank lines.
    #[default]
    Text,
    /// A JSON array of result objects.
    Json,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    id: &'a str,
    title: &'a str,
    score: i32,
    reason: &'a str,
    comment_count: usize,
}

/// Render results as text blocks, in the given order.
pub fn render_text(results: &[ScoredPost<'_>]) -> String {
    let mut out = String::new();
    for scored in results {
        out.push_str(&format!(
            "Post: {}\nScore: {}\nReason: {}\n\n",
            scored.post.title, scored.score, scored.reason
        ));
    }
    out
}

/// Render results as a pretty-printed JSON array.
pub fn render_json(results: &[ScoredPost<'_>]) -> Result<String> {
    let entries: Vec<JsonEntry<'_>> = results
        .iter()
        .map(|s| JsonEntry {
            id: &s.post.id,
            title: &s.post.title,
            score: s.score,
            reason: &s.reason,
            comment_count: s.post.comments.len(),
        })
        .collect();

    let mut json = serde_json::to_string_pretty(&entries)
        .map_err(|e| PostScorerError::Output(std::io::Error::other(e)))?;
    json.push('\n');
    Ok(json)
}

/// Write the rendered report to `sink` in one piece.
pub fn write_report<W: Write + ?Sized>(
    sink: &mut W,
    results: &[ScoredPost<'_>],
    format: ReportFormat,
) -> Result<()> {
    let rendered = match format {
        ReportFormat::Text => render_text(results),
        ReportFormat::Json => render_json(results)?,
    };

    sink.write_all(rendered.as_bytes())
        .and_then(|()| sink.flush())
        .map_err(PostScorerError::Output)
}
