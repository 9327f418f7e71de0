// Database schema: table creation and migrations.
//
// We use a simple version-based migration approach: a `schema_version` table
// tracks which migrations have run, and each migration is a function that
// executes SQL statements.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent and safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Handles of the people who ran searches
        CREATE TABLE IF NOT EXISTS usernames (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Literal query strings
        CREATE TABLE IF NOT EXISTS searches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            search_string TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Normalized tag text (lowercase, no '#')
        CREATE TABLE IF NOT EXISTS hashtags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hashtag TEXT NOT NULL UNIQUE
        );

        -- Posts keyed by content hash; counters and profile stats are mutable
        CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,               -- sha256(author, text), hex
            author TEXT NOT NULL,
            display_name TEXT,
            replies INTEGER NOT NULL DEFAULT 0,
            likes INTEGER NOT NULL DEFAULT 0,
            retweets INTEGER NOT NULL DEFAULT 0,
            text TEXT NOT NULL DEFAULT '',
            author_followers INTEGER NOT NULL DEFAULT 0,
            author_posts INTEGER NOT NULL DEFAULT 0,
            author_location TEXT NOT NULL DEFAULT '',
            first_seen_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- A post was returned by a search
        CREATE TABLE IF NOT EXISTS searches_posts (
            search_id INTEGER NOT NULL REFERENCES searches(id),
            post_id TEXT NOT NULL REFERENCES posts(id),
            PRIMARY KEY (search_id, post_id)
        );

        -- A post contains a hashtag
        CREATE TABLE IF NOT EXISTS posts_hashtags (
            post_id TEXT NOT NULL REFERENCES posts(id),
            hashtag_id INTEGER NOT NULL REFERENCES hashtags(id),
            PRIMARY KEY (post_id, hashtag_id)
        );

        -- A user performed a search; the id names the pair for post linking
        CREATE TABLE IF NOT EXISTS username_searches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username_id INTEGER NOT NULL REFERENCES usernames(id),
            search_id INTEGER NOT NULL REFERENCES searches(id),
            UNIQUE (username_id, search_id)
        );

        -- A post surfaced in a specific user's search
        CREATE TABLE IF NOT EXISTS posts_username_searches (
            post_id TEXT NOT NULL REFERENCES posts(id),
            username_search_id INTEGER NOT NULL REFERENCES username_searches(id),
            PRIMARY KEY (post_id, username_search_id)
        );

        CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author);

        CREATE INDEX IF NOT EXISTS idx_posts_hashtags_tag
            ON posts_hashtags(hashtag_id);
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: per-run history so repeated searches leave an audit trail
    // even though their association rows are deduplicated.
    run_migration(conn, 2, |c| {
        c.execute_batch(
            "CREATE TABLE IF NOT EXISTS ingest_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                search_string TEXT NOT NULL,
                fragments INTEGER NOT NULL,
                rejected INTEGER NOT NULL,
                attempted INTEGER NOT NULL,
                inserted INTEGER NOT NULL,
                refreshed INTEGER NOT NULL,
                skipped INTEGER NOT NULL,
                profiles_degraded INTEGER NOT NULL,
                finished_at TEXT NOT NULL
            );",
        )
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
/// The migration function receives the connection and should execute its SQL.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
