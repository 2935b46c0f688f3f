//! Core domain types: posts, their comments, and scoring results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Post / Comment
// ---------------------------------------------------------------------------

/// A top-level discussion post with its replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Identifier, unique within one load.
    pub id: String,
    /// Post title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Replies in file order.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    /// Create a post with no comments.
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            comments: Vec::new(),
        }
    }
}

/// A reply owned by exactly one [`Post`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Body text.
    pub body: String,
}

impl Comment {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

// ---------------------------------------------------------------------------
// ScoredPost
// ---------------------------------------------------------------------------

/// A post paired with the score the scoring capability assigned to it.
///
/// Borrows the originating post rather than copying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredPost<'a> {
    pub post: &'a Post,
    pub score: i32,
    pub reason: String,
}

impl<'a> ScoredPost<'a> {
    pub fn new(post: &'a Post, score: i32, reason: impl Into<String>) -> Self {
        Self {
            post,
            score,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// PostMap
// ---------------------------------------------------------------------------

/// Identifier → [`Post`] mapping built while loading.
///
/// Populated by the loader, extended with comments by the linker, then only
/// shared immutably.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostMap {
    inner: HashMap<String, Post>,
}

impl PostMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a post, returning the entry it replaced (last write wins).
    pub fn insert(&mut self, post: Post) -> Option<Post> {
        self.inner.insert(post.id.clone(), post)
    }

    pub fn get(&self, id: &str) -> Option<&Post> {
        self.inner.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Post> {
        self.inner.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Total number of comments across all posts.
    pub fn comment_count(&self) -> usize {
        self.inner.values().map(|p| p.comments.len()).sum()
    }

    /// All posts, ordered by identifier so submission order is stable.
    pub fn posts(&self) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self.inner.values().collect();
        posts.sort_by(|a, b| a.id.cmp(&b.id));
        posts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_last_write_wins() {
        let mut map = PostMap::new();
        assert!(map.insert(Post::new("p1", "First", "a")).is_none());

        let replaced = map.insert(Post::new("p1", "Second", "b"));
        assert_eq!(replaced.map(|p| p.title), Some("First".to_string()));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("p1").map(|p| p.title.as_str()), Some("Second"));
    }

    #[test]
    fn posts_are_ordered_by_id() {
        let mut map = PostMap::new();
        map.insert(Post::new("c", "C", ""));
        map.insert(Post::new("a", "A", ""));
        map.insert(Post::new("b", "B", ""));

        let ids: Vec<&str> = map.posts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn comment_count_sums_all_posts() {
        let mut map = PostMap::new();
        map.insert(Post::new("p1", "A", ""));
        map.insert(Post::new("p2", "B", ""));
        map.get_mut("p1").unwrap().comments.push(Comment::new("x"));
        map.get_mut("p2").unwrap().comments.push(Comment::new("y"));
        map.get_mut("p2").unwrap().comments.push(Comment::new("z"));
        assert_eq!(map.comment_count(), 3);
    }

    #[test]
    fn post_deserializes_without_comments() {
        let post: Post =
            serde_json::from_str(r#"{"id":"p1","title":"T","body":"B"}"#).expect("parse");
        assert!(post.comments.is_empty());
    }
}
