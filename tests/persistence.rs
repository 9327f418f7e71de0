// Persistence coordinator tests against in-memory SQLite, with a wrapper
// that injects failures into chosen repository calls.

use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;

use trawler::assemble::post_id;
use trawler::db::models::{Post, PostWrite, RunSummary, StoreCounts, StoredPost};
use trawler::db::{schema, Database, SqliteDatabase};
use trawler::error::IngestError;
use trawler::pipeline::persist::persist_run;

/// Delegates to SQLite, failing searches or specific posts on request.
struct Flaky {
    inner: SqliteDatabase,
    fail_search: bool,
    fail_posts: Vec<String>,
}

impl Flaky {
    fn new() -> Self {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_tables(&conn).unwrap();
        Self {
            inner: SqliteDatabase::new(conn),
            fail_search: false,
            fail_posts: Vec::new(),
        }
    }
}

#[async_trait]
impl Database for Flaky {
    async fn table_count(&self) -> Result<i64> {
        self.inner.table_count().await
    }

    async fn get_or_create_username(&self, username: &str) -> Result<i64> {
        self.inner.get_or_create_username(username).await
    }

    async fn get_or_create_search(&self, search_string: &str) -> Result<i64> {
        if self.fail_search {
            anyhow::bail!("disk I/O error");
        }
        self.inner.get_or_create_search(search_string).await
    }

    async fn get_or_create_username_search(
        &self,
        username_id: i64,
        search_id: i64,
    ) -> Result<i64> {
        self.inner
            .get_or_create_username_search(username_id, search_id)
            .await
    }

    async fn get_or_create_hashtag(&self, hashtag: &str) -> Result<i64> {
        self.inner.get_or_create_hashtag(hashtag).await
    }

    async fn persist_post(
        &self,
        post: &Post,
        search_id: i64,
        username_search_id: i64,
    ) -> Result<PostWrite> {
        if self.fail_posts.contains(&post.id) {
            anyhow::bail!("constraint failed");
        }
        self.inner
            .persist_post(post, search_id, username_search_id)
            .await
    }

    async fn get_post(&self, post_id: &str) -> Result<Option<StoredPost>> {
        self.inner.get_post(post_id).await
    }

    async fn post_hashtags(&self, post_id: &str) -> Result<Vec<String>> {
        self.inner.post_hashtags(post_id).await
    }

    async fn record_run(&self, summary: &RunSummary) -> Result<()> {
        self.inner.record_run(summary).await
    }

    async fn store_counts(&self) -> Result<StoreCounts> {
        self.inner.store_counts().await
    }
}

fn post(author: &str, text: &str, tags: &[&str]) -> Post {
    Post {
        id: post_id(author, text),
        author: author.to_string(),
        display_name: Some(format!("{author} display")),
        replies: 1,
        retweets: 2,
        likes: 3,
        hashtags: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
        text: text.to_string(),
        author_followers: 10,
        author_posts: 20,
        author_location: "Lisbon".to_string(),
        profile_resolved: true,
    }
}

#[tokio::test]
async fn hashtag_case_variants_share_one_row() {
    let db = Flaky::new();
    let posts = vec![
        post("bob", "a", &["Foo"]),
        post("carol", "b", &["foo"]),
        post("dana", "c", &["#FOO", "#"]),
    ];

    let report = persist_run(&db, "alice", "q", &posts).await.unwrap();
    assert_eq!(report.inserted, 3);

    let counts = db.store_counts().await.unwrap();
    assert_eq!(counts.hashtags, 1);
    assert_eq!(counts.posts_hashtags, 3);
    assert_eq!(db.post_hashtags(&posts[0].id).await.unwrap(), vec!["foo"]);
    assert_eq!(db.post_hashtags(&posts[2].id).await.unwrap(), vec!["foo"]);
}

#[tokio::test]
async fn failed_post_is_skipped_others_persist() {
    let mut db = Flaky::new();
    let posts = vec![
        post("bob", "first", &["rust"]),
        post("carol", "second", &["rust", "wasm"]),
        post("dana", "third", &[]),
    ];
    db.fail_posts.push(posts[1].id.clone());

    let report = persist_run(&db, "alice", "rustlang", &posts).await.unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped, 1);

    assert!(db.get_post(&posts[1].id).await.unwrap().is_none());
    let counts = db.store_counts().await.unwrap();
    assert_eq!(counts.posts, 2);
    assert_eq!(counts.hashtags, 1);
    assert_eq!(counts.searches_posts, 2);
    assert_eq!(counts.posts_username_searches, 2);
}

#[tokio::test]
async fn skipped_post_lands_on_rerun() {
    let mut db = Flaky::new();
    let posts = vec![post("bob", "first", &["rust"]), post("carol", "second", &[])];
    db.fail_posts.push(posts[1].id.clone());
    persist_run(&db, "alice", "rustlang", &posts).await.unwrap();

    db.fail_posts.clear();
    let report = persist_run(&db, "alice", "rustlang", &posts).await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.refreshed, 1);
    assert_eq!(db.store_counts().await.unwrap().posts, 2);
}

#[tokio::test]
async fn parent_failure_is_fatal_and_writes_no_posts() {
    let mut db = Flaky::new();
    db.fail_search = true;

    let err = persist_run(&db, "alice", "rustlang", &[post("bob", "first", &[])])
        .await
        .unwrap_err();
    match &err {
        IngestError::PersistenceParentFailed { entity, key, .. } => {
            assert_eq!(*entity, "search");
            assert_eq!(key, "rustlang");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_fatal());
    assert_eq!(db.store_counts().await.unwrap().posts, 0);
}

#[tokio::test]
async fn parents_are_reused_across_runs() {
    let db = Flaky::new();
    let first = persist_run(&db, "alice", "rustlang", &[]).await.unwrap();
    let second = persist_run(&db, "alice", "rustlang", &[]).await.unwrap();
    let other = persist_run(&db, "alice", "wasm", &[]).await.unwrap();

    assert_eq!(first.username_id, second.username_id);
    assert_eq!(first.search_id, second.search_id);
    assert_eq!(first.username_search_id, second.username_search_id);
    assert_eq!(first.username_id, other.username_id);
    assert_ne!(first.username_search_id, other.username_search_id);

    let counts = db.store_counts().await.unwrap();
    assert_eq!(counts.usernames, 1);
    assert_eq!(counts.searches, 2);
    assert_eq!(counts.username_searches, 2);
}

#[tokio::test]
async fn display_name_survives_a_nameless_observation() {
    let db = Flaky::new();
    let named = post("bob", "hello", &[]);
    persist_run(&db, "alice", "q", &[named.clone()]).await.unwrap();

    let nameless = Post {
        display_name: None,
        ..named.clone()
    };
    persist_run(&db, "alice", "q", &[nameless]).await.unwrap();

    let stored = db.get_post(&named.id).await.unwrap().unwrap();
    assert_eq!(stored.display_name.as_deref(), Some("bob display"));
}

#[tokio::test]
async fn degraded_profile_does_not_erase_known_stats() {
    let db = Flaky::new();
    let resolved = post("bob", "hello", &[]);
    persist_run(&db, "alice", "q", &[resolved.clone()]).await.unwrap();

    let degraded = Post {
        author_followers: 0,
        author_posts: 0,
        author_location: String::new(),
        profile_resolved: false,
        likes: 99,
        ..resolved.clone()
    };
    persist_run(&db, "alice", "q", &[degraded]).await.unwrap();

    let stored = db.get_post(&resolved.id).await.unwrap().unwrap();
    assert_eq!(stored.likes, 99);
    assert_eq!(stored.author_followers, 10);
    assert_eq!(stored.author_location, "Lisbon");
}
