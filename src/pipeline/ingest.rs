// Ingest pipeline: fetch -> extract -> resolve profiles -> assemble -> persist.
//
// Runs once per invocation. Each stage only consumes the previous stage's
// output. Per-record problems degrade or drop that record; only a failed
// fetch or an unestablishable username/search aborts the run.

use std::time::Duration;

use tracing::{info, warn};

use crate::assemble;
use crate::db::models::{AuthorProfile, Post, RunSummary};
use crate::db::Database;
use crate::error::IngestError;
use crate::extract;
use crate::fetch::{FetchRequest, PageFetcher};
use crate::pipeline::persist;
use crate::profile::ProfileResolver;

/// One run's inputs beyond the collaborators themselves.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub fetch: FetchRequest,
    /// Handle of the person running the search.
    pub username: String,
    pub fetch_timeout: Duration,
    /// Max profile lookups in flight.
    pub concurrency: usize,
}

/// Run summary plus the assembled posts (for CSV export).
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub summary: RunSummary,
    pub posts: Vec<Post>,
}

pub async fn run(
    fetcher: &dyn PageFetcher,
    resolver: &ProfileResolver,
    db: &dyn Database,
    request: &IngestRequest,
) -> Result<IngestOutcome, IngestError> {
    let query = &request.fetch.query;

    // Step 1: fetch the scrolled results page
    let document = match tokio::time::timeout(request.fetch_timeout, fetcher.fetch(&request.fetch))
        .await
    {
        Ok(Ok(document)) => document,
        Ok(Err(e)) => {
            return Err(IngestError::FetchFailed {
                query: query.clone(),
                reason: format!("{e:#}"),
            })
        }
        Err(_) => {
            return Err(IngestError::FetchTimeout {
                query: query.clone(),
                timeout: request.fetch_timeout,
            })
        }
    };

    // Step 2: extract every post container
    let fragments = extract::split_posts(&document);
    info!(query, fragments = fragments.len(), "Found post fragments");
    let pass = extract::extract_all(&fragments);

    // Step 3: resolve each distinct author once
    let handles: Vec<String> = pass
        .records
        .iter()
        .map(|r| r.author_handle.clone())
        .collect();
    let profiles = resolver.resolve_all(&handles, request.concurrency).await;

    // Step 4: assemble
    let mut rejected = pass.rejected;
    let mut posts = Vec::with_capacity(pass.records.len());
    for record in pass.records {
        let profile = profiles
            .get(&record.author_handle)
            .cloned()
            .unwrap_or_else(AuthorProfile::default);
        match assemble::assemble(record, &profile) {
            Ok(post) => posts.push(post),
            Err(e) => {
                warn!(error = %e, "Dropping record");
                rejected += 1;
            }
        }
    }
    let posts = assemble::dedupe_posts(posts);

    // Step 5: persist
    let report = persist::persist_run(db, &request.username, query, &posts).await?;

    let summary = RunSummary {
        username: request.username.clone(),
        search: query.clone(),
        fragments: fragments.len(),
        rejected,
        attempted: posts.len(),
        inserted: report.inserted,
        refreshed: report.refreshed,
        skipped: report.skipped,
        profiles_degraded: profiles.values().filter(|p| !p.resolved).count(),
        lookups_issued: resolver.lookups_issued(),
    };

    if let Err(e) = db.record_run(&summary).await {
        warn!(error = %e, "Failed to record run history");
    }

    info!(
        query,
        attempted = summary.attempted,
        persisted = summary.persisted(),
        "Run complete"
    );

    Ok(IngestOutcome { summary, posts })
}
