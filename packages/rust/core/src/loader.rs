//! Entity loading and comment association.
//!
//! Posts are loaded into a [`PostMap`] keyed by identifier; comments are then
//! appended to the post they reference. The map is the only state shared
//! between the two stages.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, instrument};

use post_scorer_shared::{Comment, Post, PostMap, PostScorerError, Result};

use crate::records::{Record, RecordReader};

/// Columns required in the posts input: `id, title, body`.
pub const POST_COLUMNS: usize = 3;

/// Columns required in the comments input: `post_id, body`.
pub const COMMENT_COLUMNS: usize = 2;

/// What to do with a comment whose post was never loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkPolicy {
    /// Drop it silently.
    #[default]
    Lenient,
    /// Fail the association stage.
    Strict,
}

/// Counts reported by [`link_comments`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Comments appended to a post.
    pub linked: usize,
    /// Comments whose post id was unknown.
    pub dropped: usize,
}

/// Build the post map from parsed posts records (header already consumed).
///
/// Columns are positional `(id, title, body)`. The first short row fails the
/// whole load; no partial map is returned. Duplicate ids keep the later row.
#[instrument(skip_all)]
pub fn load_posts<I>(records: I) -> Result<PostMap>
where
    I: IntoIterator<Item = Result<Record>>,
{
    let mut posts = PostMap::new();

    for record in records {
        let record = record?;
        let line = record.line();
        let [id, title, body] = record.into_columns::<POST_COLUMNS>()?;

        if let Some(previous) = posts.insert(Post::new(id, title, body)) {
            debug!(id = %previous.id, line, "duplicate post id, later row wins");
        }
    }

    debug!(posts = posts.len(), "posts loaded");
    Ok(posts)
}

/// Append parsed comments records (header already consumed) to their posts.
///
/// Columns are positional `(post_id, body)`.
#[instrument(skip_all, fields(policy = ?policy))]
pub fn link_comments<I>(records: I, posts: &mut PostMap, policy: LinkPolicy) -> Result<LinkStats>
where
    I: IntoIterator<Item = Result<Record>>,
{
    let mut stats = LinkStats::default();

    for record in records {
        let record = record?;
        let line = record.line();
        let [post_id, body] = record.into_columns::<COMMENT_COLUMNS>()?;

        match posts.get_mut(&post_id) {
            Some(post) => {
                post.comments.push(Comment::new(body));
                stats.linked += 1;
            }
            None if policy == LinkPolicy::Strict => {
                return Err(PostScorerError::validation(format!(
                    "comment on line {line} references unknown post '{post_id}'"
                )));
            }
            None => {
                debug!(%post_id, line, "dropping comment for unknown post");
                stats.dropped += 1;
            }
        }
    }

    debug!(linked = stats.linked, dropped = stats.dropped, "comments linked");
    Ok(stats)
}

/// Open a CSV input and consume its header row.
///
/// The file handle lives inside the returned reader and is closed when it drops.
pub fn open_records(path: &Path, min_columns: usize) -> Result<RecordReader<BufReader<File>>> {
    let file = File::open(path).map_err(|e| PostScorerError::io(path, e))?;
    let mut reader = RecordReader::new(BufReader::new(file), min_columns);
    reader.skip_header()?;
    Ok(reader)
}

/// Load posts from a CSV file with a header row.
pub fn load_posts_file(path: &Path) -> Result<PostMap> {
    let records = open_records(path, POST_COLUMNS)?;
    let posts = load_posts(records)?;
    info!(path = %path.display(), posts = posts.len(), "loaded posts");
    Ok(posts)
}

/// Load comments from a CSV file with a header row and attach them to `posts`.
pub fn load_comments_file(path: &Path, posts: &mut PostMap, policy: LinkPolicy) -> Result<LinkStats> {
    let records = open_records(path, COMMENT_COLUMNS)?;
    let stats = link_comments(records, posts, policy)?;
    info!(
        path = %path.display(),
        linked = stats.linked,
        dropped = stats.dropped,
        "loaded comments"
    );
    Ok(stats)
}

/// Parse posts from any buffered source with a header row.
pub fn load_posts_from<R: BufRead>(reader: R) -> Result<PostMap> {
    let mut records = RecordReader::new(reader, POST_COLUMNS);
    records.skip_header()?;
    load_posts(records)
}

/// Parse comments from any buffered source with a header row and attach them.
pub fn link_comments_from<R: BufRead>(
    reader: R,
    posts: &mut PostMap,
    policy: LinkPolicy,
) -> Result<LinkStats> {
    let mut records = RecordReader::new(reader, COMMENT_COLUMNS);
    records.skip_header()?;
    link_comments(records, posts, policy)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
