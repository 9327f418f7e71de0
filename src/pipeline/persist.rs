// Persistence coordinator: commits one run's posts and all their links.
//
// Order matters: username, search and their pairing are resolved first
// (any failure there is fatal), then each post is written with its
// associations in its own transaction. A post that fails is logged and
// skipped; everything already written stays valid, so a failed run can be
// re-run to completion.

use tracing::{info, warn};

use crate::db::models::{Post, PostWrite};
use crate::db::Database;
use crate::error::IngestError;

/// What one persistence pass wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub username_id: i64,
    pub search_id: i64,
    /// Id of the (username, search) pair the posts were linked to.
    pub username_search_id: i64,
    pub inserted: usize,
    pub refreshed: usize,
    pub skipped: usize,
}

/// Persist all assembled posts for one (username, search) run.
pub async fn persist_run(
    db: &dyn Database,
    username: &str,
    search: &str,
    posts: &[Post],
) -> Result<PersistReport, IngestError> {
    let username_id = db
        .get_or_create_username(username)
        .await
        .map_err(|e| parent_failed("username", username, e))?;

    let search_id = db
        .get_or_create_search(search)
        .await
        .map_err(|e| parent_failed("search", search, e))?;

    let username_search_id = db
        .get_or_create_username_search(username_id, search_id)
        .await
        .map_err(|e| parent_failed("username search", &format!("{username}/{search}"), e))?;

    let mut report = PersistReport {
        username_id,
        search_id,
        username_search_id,
        ..Default::default()
    };

    for post in posts {
        match db.persist_post(post, search_id, username_search_id).await {
            Ok(PostWrite::Inserted) => report.inserted += 1,
            Ok(PostWrite::Refreshed) => report.refreshed += 1,
            Err(e) => {
                let err = IngestError::PersistenceChildFailed {
                    post_id: post.id.clone(),
                    reason: format!("{e:#}"),
                };
                warn!(author = post.author, error = %err, "Skipping post");
                report.skipped += 1;
            }
        }
    }

    info!(
        username,
        search,
        inserted = report.inserted,
        refreshed = report.refreshed,
        skipped = report.skipped,
        "Persistence pass complete"
    );

    Ok(report)
}

fn parent_failed(entity: &'static str, key: &str, e: anyhow::Error) -> IngestError {
    IngestError::PersistenceParentFailed {
        entity,
        key: key.to_string(),
        reason: format!("{e:#}"),
    }
}
