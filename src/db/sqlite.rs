// SqliteDatabase: rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// Holding the lock for a whole call also serializes writes, so two upserts
// of the same parent row can never race.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{Post, PostWrite, RunSummary, StoreCounts, StoredPost};
use super::queries;
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn get_or_create_username(&self, username: &str) -> Result<i64> {
        let conn = self.conn.lock().await;
        queries::get_or_create_username(&conn, username)
    }

    async fn get_or_create_search(&self, search_string: &str) -> Result<i64> {
        let conn = self.conn.lock().await;
        queries::get_or_create_search(&conn, search_string)
    }

    async fn get_or_create_username_search(
        &self,
        username_id: i64,
        search_id: i64,
    ) -> Result<i64> {
        let conn = self.conn.lock().await;
        queries::get_or_create_username_search(&conn, username_id, search_id)
    }

    async fn get_or_create_hashtag(&self, hashtag: &str) -> Result<i64> {
        let conn = self.conn.lock().await;
        queries::get_or_create_hashtag(&conn, hashtag)
    }

    async fn persist_post(
        &self,
        post: &Post,
        search_id: i64,
        username_search_id: i64,
    ) -> Result<PostWrite> {
        let mut conn = self.conn.lock().await;
        queries::persist_post(&mut conn, post, search_id, username_search_id)
    }

    async fn get_post(&self, post_id: &str) -> Result<Option<StoredPost>> {
        let conn = self.conn.lock().await;
        queries::get_post(&conn, post_id)
    }

    async fn post_hashtags(&self, post_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        queries::post_hashtags(&conn, post_id)
    }

    async fn record_run(&self, summary: &RunSummary) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::record_run(&conn, summary)
    }

    async fn store_counts(&self) -> Result<StoreCounts> {
        let conn = self.conn.lock().await;
        queries::store_counts(&conn)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::db::schema::create_tables;

    async fn test_db() -> SqliteDatabase {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        SqliteDatabase::new(conn)
    }

    #[tokio::test]
    async fn test_trait_table_count() {
        let db = test_db().await;
        assert_eq!(db.table_count().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_trait_parent_rows_are_unique() {
        let db = test_db().await;
        let a = db.get_or_create_username("alice").await.unwrap();
        let b = db.get_or_create_username("alice").await.unwrap();
        assert_eq!(a, b);

        let s1 = db.get_or_create_search("rustlang").await.unwrap();
        let s2 = db.get_or_create_search("rustlang").await.unwrap();
        assert_eq!(s1, s2);

        let h1 = db.get_or_create_hashtag("rust").await.unwrap();
        let h2 = db.get_or_create_hashtag("rust").await.unwrap();
        assert_eq!(h1, h2);

        let counts = db.store_counts().await.unwrap();
        assert_eq!(counts.usernames, 1);
        assert_eq!(counts.searches, 1);
        assert_eq!(counts.hashtags, 1);
    }

    #[tokio::test]
    async fn test_trait_persist_post_roundtrip() {
        let db = test_db().await;
        let user = db.get_or_create_username("alice").await.unwrap();
        let search = db.get_or_create_search("rustlang").await.unwrap();
        let pair = db.get_or_create_username_search(user, search).await.unwrap();

        let post = Post {
            id: "abc".to_string(),
            author: "bob".to_string(),
            display_name: None,
            replies: 1,
            retweets: 2,
            likes: 3,
            hashtags: BTreeSet::from(["rust".to_string()]),
            text: "hi".to_string(),
            author_followers: 0,
            author_posts: 0,
            author_location: String::new(),
            profile_resolved: false,
        };
        let write = db.persist_post(&post, search, pair).await.unwrap();
        assert_eq!(write, PostWrite::Inserted);

        let stored = db.get_post("abc").await.unwrap().unwrap();
        assert_eq!(stored.author, "bob");
        assert_eq!(stored.retweets, 2);
        assert_eq!(db.post_hashtags("abc").await.unwrap(), vec!["rust"]);
    }
}
