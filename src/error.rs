// Ingest error taxonomy.
//
// Non-fatal kinds are logged and the run keeps going with degraded data.
// Fatal kinds abort the run and surface to main as a non-zero exit.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// One field of a record could not be extracted; a default was used.
    #[error("field `{field}` degraded to default: {reason}")]
    ExtractionDegraded { field: &'static str, reason: String },

    /// The record has no attributable author and is dropped.
    #[error("record rejected: {reason}")]
    RecordRejected { reason: String },

    /// The external profile lookup failed; profile fields are zero/empty.
    #[error("profile lookup failed for @{handle}: {reason}")]
    ProfileLookupFailed { handle: String, reason: String },

    /// Username or search row could not be established.
    #[error("could not establish {entity} `{key}`: {reason}")]
    PersistenceParentFailed {
        entity: &'static str,
        key: String,
        reason: String,
    },

    /// One post (with its links and hashtags) could not be written.
    #[error("could not persist post {post_id}: {reason}")]
    PersistenceChildFailed { post_id: String, reason: String },

    #[error("fetch for query `{query}` timed out after {}s", timeout.as_secs())]
    FetchTimeout { query: String, timeout: Duration },

    #[error("fetch for query `{query}` failed: {reason}")]
    FetchFailed { query: String, reason: String },
}

impl IngestError {
    /// Whether this error aborts the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::PersistenceParentFailed { .. }
                | IngestError::FetchTimeout { .. }
                | IngestError::FetchFailed { .. }
        )
    }
}
