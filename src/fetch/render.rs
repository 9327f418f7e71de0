// Render service client: drives a headless browser over HTTP.
//
// The service logs in (when credentials are given), opens the search page,
// presses page-down `scrolls` times and returns the final page markup from
// its /content endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;
use tracing::{debug, info};

use super::traits::{Browser, Credentials, FetchRequest, PageFetcher};

pub struct RenderServiceFetcher {
    client: reqwest::Client,
    render_url: String,
    login_url: String,
    query_url: String,
}

impl RenderServiceFetcher {
    pub fn new(render_url: &str, login_url: &str, query_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("trawler/0.1 (post-collector)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            render_url: render_url.trim_end_matches('/').to_string(),
            login_url: login_url.to_string(),
            query_url: query_url.to_string(),
        })
    }

    /// Search page URL for a query (query percent-encoded onto the prefix).
    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}{}",
            self.query_url,
            utf8_percent_encode(query, NON_ALPHANUMERIC)
        )
    }

    fn content_request<'a>(&'a self, request: &'a FetchRequest) -> ContentRequest<'a> {
        ContentRequest {
            url: self.search_url(&request.query),
            login: request.credentials.as_ref().map(|credentials| Login {
                url: &self.login_url,
                credentials,
            }),
            scrolls: request.scrolls,
            idle_ms: request.idle.as_millis() as u64,
            browser: request.browser,
        }
    }
}

#[async_trait]
impl PageFetcher for RenderServiceFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String> {
        let body = self.content_request(request);
        let endpoint = format!("{}/content", self.render_url);

        info!(
            query = request.query,
            logged_in = request.credentials.is_some(),
            scrolls = request.scrolls,
            "Requesting rendered search page"
        );

        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Render request failed: {endpoint}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            anyhow::bail!("Render service returned {status}: {message}");
        }

        let markup = response
            .text()
            .await
            .context("Failed to read rendered page")?;
        debug!(bytes = markup.len(), "Rendered page received");
        Ok(markup)
    }
}

// -- Request body for the /content endpoint --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: String,
    login: Option<Login<'a>>,
    scrolls: u32,
    idle_ms: u64,
    browser: Browser,
}

#[derive(Debug, Serialize)]
struct Login<'a> {
    url: &'a str,
    #[serde(flatten)]
    credentials: &'a Credentials,
}
