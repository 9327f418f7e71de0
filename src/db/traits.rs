// Database trait: the repository interface the persistence coordinator
// talks to.
//
// Implementor: SqliteDatabase (wraps rusqlite). All methods are async so a
// sync backend behind a Mutex and a native async backend fit the same seam.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{Post, PostWrite, RunSummary, StoreCounts, StoredPost};

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Parent entities (natural key -> id) ---

    async fn get_or_create_username(&self, username: &str) -> Result<i64>;

    async fn get_or_create_search(&self, search_string: &str) -> Result<i64>;

    /// Id of the (username, search) association; stable across repeated runs.
    async fn get_or_create_username_search(&self, username_id: i64, search_id: i64)
        -> Result<i64>;

    async fn get_or_create_hashtag(&self, hashtag: &str) -> Result<i64>;

    // --- Posts ---

    /// Upsert one post and write all of its associations atomically.
    async fn persist_post(
        &self,
        post: &Post,
        search_id: i64,
        username_search_id: i64,
    ) -> Result<PostWrite>;

    async fn get_post(&self, post_id: &str) -> Result<Option<StoredPost>>;

    async fn post_hashtags(&self, post_id: &str) -> Result<Vec<String>>;

    // --- Run history and stats ---

    async fn record_run(&self, summary: &RunSummary) -> Result<()>;

    async fn store_counts(&self) -> Result<StoreCounts>;
}
