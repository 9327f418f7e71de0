// Database queries: CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.
//
// Natural-key entities use a single upsert that always returns the row id:
// on conflict the key is rewritten to itself, which makes RETURNING yield
// the existing row instead of nothing.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{Post, PostWrite, RunSummary, StoreCounts, StoredPost};
use crate::extract::normalize_hashtag;

// --- Parent entities ---

/// Get the id of a username, creating the row on first appearance.
pub fn get_or_create_username(conn: &Connection, username: &str) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO usernames (username) VALUES (?1)
         ON CONFLICT(username) DO UPDATE SET username = excluded.username
         RETURNING id",
        params![username],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Get the id of a search string, creating the row on first appearance.
pub fn get_or_create_search(conn: &Connection, search_string: &str) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO searches (search_string) VALUES (?1)
         ON CONFLICT(search_string) DO UPDATE SET search_string = excluded.search_string
         RETURNING id",
        params![search_string],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Get the id of a (username, search) pair, creating it on first appearance.
pub fn get_or_create_username_search(
    conn: &Connection,
    username_id: i64,
    search_id: i64,
) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO username_searches (username_id, search_id) VALUES (?1, ?2)
         ON CONFLICT(username_id, search_id) DO UPDATE SET username_id = excluded.username_id
         RETURNING id",
        params![username_id, search_id],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Get the id of a hashtag, creating the row on first appearance.
///
/// The tag is normalized first, so `#Foo`, `Foo` and `foo` share one row.
pub fn get_or_create_hashtag(conn: &Connection, hashtag: &str) -> Result<i64> {
    let Some(hashtag) = normalize_hashtag(hashtag) else {
        anyhow::bail!("hashtag `{hashtag}` is empty after normalization");
    };
    let id = conn.query_row(
        "INSERT INTO hashtags (hashtag) VALUES (?1)
         ON CONFLICT(hashtag) DO UPDATE SET hashtag = excluded.hashtag
         RETURNING id",
        params![hashtag],
        |row| row.get(0),
    )?;
    Ok(id)
}

// --- Posts ---

/// Insert a post, or refresh the mutable columns of an existing one.
///
/// Author and text never change for an id (the id is derived from them).
/// Profile columns are only overwritten by a resolved profile.
pub fn upsert_post(conn: &Connection, post: &Post) -> Result<()> {
    conn.execute(
        "INSERT INTO posts (id, author, display_name, replies, likes, retweets, text,
                            author_followers, author_posts, author_location)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
            replies = excluded.replies,
            likes = excluded.likes,
            retweets = excluded.retweets,
            display_name = COALESCE(excluded.display_name, posts.display_name),
            author_followers = CASE WHEN ?11 THEN excluded.author_followers
                                    ELSE posts.author_followers END,
            author_posts = CASE WHEN ?11 THEN excluded.author_posts
                                ELSE posts.author_posts END,
            author_location = CASE WHEN ?11 THEN excluded.author_location
                                   ELSE posts.author_location END,
            updated_at = datetime('now')",
        params![
            post.id,
            post.author,
            post.display_name,
            post.replies,
            post.likes,
            post.retweets,
            post.text,
            post.author_followers,
            post.author_posts,
            post.author_location,
            post.profile_resolved,
        ],
    )?;
    Ok(())
}

/// Whether a post id is already stored.
pub fn post_exists(conn: &Connection, post_id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
        params![post_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Write one post with all of its associations in a single transaction.
///
/// Either the post, its search/user-search links and its hashtags all land,
/// or none of them do.
pub fn persist_post(
    conn: &mut Connection,
    post: &Post,
    search_id: i64,
    username_search_id: i64,
) -> Result<PostWrite> {
    let tx = conn.transaction()?;

    let existed = post_exists(&tx, &post.id)?;
    upsert_post(&tx, post).context("post upsert failed")?;

    tx.execute(
        "INSERT OR IGNORE INTO searches_posts (search_id, post_id) VALUES (?1, ?2)",
        params![search_id, post.id],
    )
    .context("search link failed")?;

    tx.execute(
        "INSERT OR IGNORE INTO posts_username_searches (post_id, username_search_id)
         VALUES (?1, ?2)",
        params![post.id, username_search_id],
    )
    .context("user-search link failed")?;

    let hashtags: BTreeSet<String> = post
        .hashtags
        .iter()
        .filter_map(|tag| normalize_hashtag(tag))
        .collect();
    for hashtag in &hashtags {
        let hashtag_id = get_or_create_hashtag(&tx, hashtag)
            .with_context(|| format!("hashtag upsert failed for #{hashtag}"))?;
        tx.execute(
            "INSERT OR IGNORE INTO posts_hashtags (post_id, hashtag_id) VALUES (?1, ?2)",
            params![post.id, hashtag_id],
        )
        .with_context(|| format!("hashtag link failed for #{hashtag}"))?;
    }

    tx.commit()?;

    Ok(if existed {
        PostWrite::Refreshed
    } else {
        PostWrite::Inserted
    })
}

/// Load one post by id.
pub fn get_post(conn: &Connection, post_id: &str) -> Result<Option<StoredPost>> {
    let mut stmt = conn.prepare(
        "SELECT id, author, display_name, replies, retweets, likes, text,
                author_followers, author_posts, author_location, first_seen_at, updated_at
         FROM posts WHERE id = ?1",
    )?;
    let post = stmt
        .query_row(params![post_id], |row| {
            Ok(StoredPost {
                id: row.get(0)?,
                author: row.get(1)?,
                display_name: row.get(2)?,
                replies: row.get(3)?,
                retweets: row.get(4)?,
                likes: row.get(5)?,
                text: row.get(6)?,
                author_followers: row.get(7)?,
                author_posts: row.get(8)?,
                author_location: row.get(9)?,
                first_seen_at: row.get(10)?,
                updated_at: row.get(11)?,
            })
        })
        .optional()?;
    Ok(post)
}

/// Hashtags linked to a post, alphabetically.
pub fn post_hashtags(conn: &Connection, post_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT h.hashtag FROM posts_hashtags ph
         JOIN hashtags h ON h.id = ph.hashtag_id
         WHERE ph.post_id = ?1
         ORDER BY h.hashtag",
    )?;
    let rows = stmt.query_map(params![post_id], |row| row.get(0))?;

    let mut tags = Vec::new();
    for row in rows {
        tags.push(row?);
    }
    Ok(tags)
}

// --- Run history and stats ---

/// Append a finished run to the history table.
pub fn record_run(conn: &Connection, summary: &RunSummary) -> Result<()> {
    conn.execute(
        "INSERT INTO ingest_runs
            (username, search_string, fragments, rejected, attempted, inserted,
             refreshed, skipped, profiles_degraded, finished_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            summary.username,
            summary.search,
            summary.fragments as i64,
            summary.rejected as i64,
            summary.attempted as i64,
            summary.inserted as i64,
            summary.refreshed as i64,
            summary.skipped as i64,
            summary.profiles_degraded as i64,
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

/// Row counts for all domain relations.
pub fn store_counts(conn: &Connection) -> Result<StoreCounts> {
    let count = |table: &str| -> Result<i64> {
        let n = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        Ok(n)
    };

    Ok(StoreCounts {
        usernames: count("usernames")?,
        searches: count("searches")?,
        hashtags: count("hashtags")?,
        posts: count("posts")?,
        searches_posts: count("searches_posts")?,
        posts_hashtags: count("posts_hashtags")?,
        username_searches: count("username_searches")?,
        posts_username_searches: count("posts_username_searches")?,
    })
}
