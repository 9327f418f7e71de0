// Per-run profile resolution with memoization.
//
// Each distinct handle costs at most one external lookup per run. The memo
// holds one OnceCell per handle: the first caller runs the lookup and every
// concurrent caller for the same handle awaits that same initialization.
// Failed and timed-out lookups are memoized too, as degraded profiles.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::rate_limiter::RateLimiter;
use super::traits::ProfileLookup;
use crate::db::models::AuthorProfile;
use crate::error::IngestError;

pub struct ProfileResolver {
    lookup: Arc<dyn ProfileLookup>,
    limiter: RateLimiter,
    timeout: Duration,
    cache: Mutex<HashMap<String, Arc<OnceCell<AuthorProfile>>>>,
    lookups: AtomicUsize,
}

impl ProfileResolver {
    pub fn new(lookup: Arc<dyn ProfileLookup>, limiter: RateLimiter, timeout: Duration) -> Self {
        Self {
            lookup,
            limiter,
            timeout,
            cache: Mutex::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Profile for one handle. Never fails: lookup errors degrade.
    pub async fn resolve(&self, handle: &str) -> AuthorProfile {
        let cell = {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            cache.entry(handle.to_lowercase()).or_default().clone()
        };

        cell.get_or_init(|| self.lookup_or_degrade(handle))
            .await
            .clone()
    }

    /// Resolve a batch of handles with at most `concurrency` lookups in flight.
    /// Duplicate handles are resolved once.
    pub async fn resolve_all(
        &self,
        handles: &[String],
        concurrency: usize,
    ) -> HashMap<String, AuthorProfile> {
        let unique: BTreeSet<&str> = handles.iter().map(String::as_str).collect();

        let pb = ProgressBar::new(unique.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  Profiles [{bar:30}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let pb = &pb;

        let resolved: HashMap<String, AuthorProfile> =
            stream::iter(unique.into_iter().map(|handle| async move {
                let profile = self.resolve(handle).await;
                pb.inc(1);
                (handle.to_string(), profile)
            }))
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;
        pb.finish_and_clear();

        let degraded = resolved.values().filter(|p| !p.resolved).count();
        info!(
            handles = resolved.len(),
            degraded,
            lookups = self.lookups_issued(),
            "Profile resolution complete"
        );

        resolved
    }

    /// Number of external lookups issued so far.
    pub fn lookups_issued(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    async fn lookup_or_degrade(&self, handle: &str) -> AuthorProfile {
        self.limiter.acquire().await;
        self.lookups.fetch_add(1, Ordering::Relaxed);

        let reason = match tokio::time::timeout(self.timeout, self.lookup.lookup(handle)).await {
            Ok(Ok(profile)) => {
                debug!(handle, followers = profile.follower_count, "Profile resolved");
                return AuthorProfile {
                    resolved: true,
                    ..profile
                };
            }
            Ok(Err(e)) => format!("{e:#}"),
            Err(_) => format!("timed out after {}s", self.timeout.as_secs_f64()),
        };

        let e = IngestError::ProfileLookupFailed {
            handle: handle.to_string(),
            reason,
        };
        warn!(handle, error = %e, "Using empty profile");
        AuthorProfile::default()
    }
}
