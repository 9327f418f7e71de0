use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_QUERY_URL: &str = "https://twitter.com/search?q=";
pub const DEFAULT_LOGIN_URL: &str = "https://twitter.com/i/flow/login";
pub const DEFAULT_RENDER_URL: &str = "http://localhost:3000";
pub const DEFAULT_PROFILE_QPS: f64 = 5.0;
/// Slowest accepted positive lookup rate (one lookup per ~16 minutes).
pub const MIN_PROFILE_QPS: f64 = 0.001;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_PROFILE_TIMEOUT_SECS: u64 = 10;

/// Central configuration loaded from environment variables.
///
/// Secrets come from env vars (never hardcoded). The .env file is loaded
/// at startup via dotenvy; CLI flags cover the per-run settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Search page prefix; the percent-encoded query is appended.
    pub query_url: String,
    pub login_url: String,
    /// Headless-browser render service base URL.
    pub render_url: String,
    pub profile_api_url: String,
    /// Empty when profile lookups are not configured.
    pub profile_bearer_token: String,
    pub profile_qps: f64,
    pub fetch_timeout: Duration,
    pub profile_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query_url: DEFAULT_QUERY_URL.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            render_url: DEFAULT_RENDER_URL.to_string(),
            profile_api_url: crate::profile::client::DEFAULT_PROFILE_API_URL.to_string(),
            profile_bearer_token: String::new(),
            profile_qps: DEFAULT_PROFILE_QPS,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            profile_timeout: Duration::from_secs(DEFAULT_PROFILE_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);

        let profile_qps = match lookup("TRAWLER_PROFILE_QPS") {
            Some(raw) => {
                let qps = raw
                    .trim()
                    .parse::<f64>()
                    .with_context(|| format!("TRAWLER_PROFILE_QPS is not a number: {raw}"))?;
                // 0 disables limiting
                if !qps.is_finite() || qps < 0.0 || (qps > 0.0 && qps < MIN_PROFILE_QPS) {
                    anyhow::bail!(
                        "TRAWLER_PROFILE_QPS must be 0 (unlimited) or a finite rate of at \
                         least {MIN_PROFILE_QPS}, got {raw}"
                    );
                }
                qps
            }
            None => defaults.profile_qps,
        };

        Ok(Self {
            query_url: string("TRAWLER_QUERY_URL", defaults.query_url),
            login_url: string("TRAWLER_LOGIN_URL", defaults.login_url),
            render_url: string("TRAWLER_RENDER_URL", defaults.render_url),
            profile_api_url: string("TRAWLER_PROFILE_API_URL", defaults.profile_api_url),
            profile_bearer_token: lookup("TRAWLER_PROFILE_BEARER_TOKEN").unwrap_or_default(),
            profile_qps,
            fetch_timeout: secs(&lookup, "TRAWLER_FETCH_TIMEOUT_SECS", defaults.fetch_timeout)?,
            profile_timeout: secs(
                &lookup,
                "TRAWLER_PROFILE_TIMEOUT_SECS",
                defaults.profile_timeout,
            )?,
        })
    }

    /// Whether a bearer token for the profile API is set.
    pub fn has_profile_api(&self) -> bool {
        !self.profile_bearer_token.trim().is_empty()
    }
}

fn secs<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{key} must be a whole number of seconds: {raw}"))?;
            Ok(Duration::from_secs(secs))
        }
        None => Ok(default),
    }
}
