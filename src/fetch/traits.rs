// Page fetcher trait: the seam to the browser-automation layer.
//
// A fetcher turns a search query into the markup of the fully scrolled
// results page. How it gets there (headless browser, saved file) is the
// implementation's business.

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Browser the render service should drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Firefox,
    Chrome,
}

/// Login credentials for the front-end. Absent in anonymous mode.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// The literal value that means "don't log in".
    pub const ANONYMOUS: &'static str = "anonymous";

    /// Credentials from CLI values; `None` unless both are real.
    pub fn from_cli(username: &str, password: &str) -> Option<Self> {
        if username == Self::ANONYMOUS || password == Self::ANONYMOUS {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a fetcher needs for one search.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub query: String,
    pub credentials: Option<Credentials>,
    /// How many page-down scrolls to perform before capturing the page.
    pub scrolls: u32,
    /// How long the browser waits for the page to settle.
    pub idle: Duration,
    pub browser: Browser,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Return the raw markup of the scrolled results page.
    async fn fetch(&self, request: &FetchRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_credentials_mean_no_login() {
        assert!(Credentials::from_cli("anonymous", "anonymous").is_none());
        assert!(Credentials::from_cli("alice", "anonymous").is_none());
        assert!(Credentials::from_cli("anonymous", "hunter2").is_none());
        let creds = Credentials::from_cli("alice", "hunter2").unwrap();
        assert_eq!(creds.username, "alice");
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::from_cli("alice", "hunter2").unwrap();
        let shown = format!("{creds:?}");
        assert!(shown.contains("alice"));
        assert!(!shown.contains("hunter2"));
    }
}
