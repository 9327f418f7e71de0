// Profile lookup trait: the seam to the external profile service.
//
// The HTTP client is the production implementation; tests plug in
// in-process fakes.

use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::AuthorProfile;

/// Resolve an author handle to their profile stats. May fail per handle.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn lookup(&self, handle: &str) -> Result<AuthorProfile>;
}

/// Used when no profile API token is configured.
/// Every lookup fails, so every profile degrades to zeros/empty.
pub struct UnconfiguredProfileLookup;

#[async_trait]
impl ProfileLookup for UnconfiguredProfileLookup {
    async fn lookup(&self, _handle: &str) -> Result<AuthorProfile> {
        anyhow::bail!("profile lookup is not configured (set TRAWLER_PROFILE_BEARER_TOKEN)")
    }
}
