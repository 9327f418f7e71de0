// Saved-page fetcher: reads previously captured results-page markup.
//
// Lets a run be replayed offline against a page saved from the browser.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::traits::{FetchRequest, PageFetcher};

pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PageFetcher for FileFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String> {
        info!(
            query = request.query,
            path = %self.path.display(),
            "Reading saved results page"
        );
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read saved page {}", self.path.display()))
    }
}
