// Data models: Rust structs that map to database rows.
//
// These are the types that flow through the application. They're separate
// from the database queries so other modules can use them without depending
// on rusqlite directly.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Author profile stats from the external profile lookup.
///
/// `Default` is the degraded profile: zeros, empty location, not resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub post_count: i64,
    pub follower_count: i64,
    pub location: String,
    /// False when the lookup failed or timed out and the fields are defaults.
    pub resolved: bool,
}

/// A fully assembled post, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Content hash over author + text (see `assemble::post_id`).
    pub id: String,
    pub author: String,
    pub display_name: Option<String>,
    pub replies: i64,
    pub retweets: i64,
    pub likes: i64,
    /// Normalized tag text, no leading '#'.
    pub hashtags: BTreeSet<String>,
    pub text: String,
    pub author_followers: i64,
    pub author_posts: i64,
    pub author_location: String,
    pub profile_resolved: bool,
}

/// A post row as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPost {
    pub id: String,
    pub author: String,
    pub display_name: Option<String>,
    pub replies: i64,
    pub retweets: i64,
    pub likes: i64,
    pub text: String,
    pub author_followers: i64,
    pub author_posts: i64,
    pub author_location: String,
    pub first_seen_at: String,
    pub updated_at: String,
}

/// Outcome of upserting one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostWrite {
    /// First time this post id was seen.
    Inserted,
    /// The post already existed; counters were refreshed.
    Refreshed,
}

/// Row counts for every domain relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub usernames: i64,
    pub searches: i64,
    pub hashtags: i64,
    pub posts: i64,
    pub searches_posts: i64,
    pub posts_hashtags: i64,
    pub username_searches: i64,
    pub posts_username_searches: i64,
}

/// What one pipeline run did, end to end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub username: String,
    pub search: String,
    /// Post containers found in the fetched page.
    pub fragments: usize,
    /// Fragments dropped for lacking an author.
    pub rejected: usize,
    /// Distinct posts handed to persistence.
    pub attempted: usize,
    pub inserted: usize,
    pub refreshed: usize,
    /// Posts whose write failed and were skipped.
    pub skipped: usize,
    pub profiles_degraded: usize,
    pub lookups_issued: usize,
}

impl RunSummary {
    pub fn persisted(&self) -> usize {
        self.inserted + self.refreshed
    }
}
