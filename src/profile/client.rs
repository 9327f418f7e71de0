// Profile API client: bearer-token users-by-username lookups over HTTP.
//
// Returns post count, follower count and location for one handle per call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::traits::ProfileLookup;
use crate::db::models::AuthorProfile;

/// Default profile API base URL.
pub const DEFAULT_PROFILE_API_URL: &str = "https://api.twitter.com/2";

/// Thin reqwest wrapper around the users-by-username endpoint.
pub struct HttpProfileLookup {
    client: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl HttpProfileLookup {
    pub fn new(base_url: &str, bearer_token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("trawler/0.1 (post-collector)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.to_string(),
        })
    }
}

#[async_trait]
impl ProfileLookup for HttpProfileLookup {
    async fn lookup(&self, handle: &str) -> Result<AuthorProfile> {
        let url = format!("{}/users/by/username/{}", self.base_url, handle);

        debug!(handle, "Profile lookup request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(&[("user.fields", "public_metrics,location")])
            .send()
            .await
            .with_context(|| format!("Profile request failed for @{handle}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Profile API returned {status} for @{handle}: {body}");
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read profile response for @{handle}"))?;
        parse_user_response(&body)
    }
}

/// Turn a users-by-username response body into profile stats.
///
/// The API answers 200 with an `errors` array (and no `data`) for unknown or
/// suspended accounts, so a missing `data` object is an error.
pub fn parse_user_response(body: &str) -> Result<AuthorProfile> {
    let resp: UserResponse =
        serde_json::from_str(body).context("Failed to deserialize profile response")?;

    let Some(user) = resp.data else {
        let detail = resp
            .errors
            .iter()
            .map(|e| e.detail.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        anyhow::bail!("Profile API returned no user: {detail}");
    };

    Ok(AuthorProfile {
        post_count: user.public_metrics.tweet_count,
        follower_count: user.public_metrics.followers_count,
        location: user.location.unwrap_or_default(),
        resolved: true,
    })
}

// -- Serde types for the users-by-username response --

#[derive(Debug, Deserialize)]
struct UserResponse {
    data: Option<UserData>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    location: Option<String>,
    #[serde(default)]
    public_metrics: PublicMetrics,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    followers_count: i64,
    #[serde(default)]
    tweet_count: i64,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_user() {
        let body = r#"{
            "data": {
                "id": "12",
                "username": "bob",
                "location": "Lisbon",
                "public_metrics": {"followers_count": 812, "following_count": 40, "tweet_count": 15003}
            }
        }"#;
        let profile = parse_user_response(body).unwrap();
        assert_eq!(profile.follower_count, 812);
        assert_eq!(profile.post_count, 15003);
        assert_eq!(profile.location, "Lisbon");
        assert!(profile.resolved);
    }

    #[test]
    fn test_parse_user_without_location() {
        let body = r#"{"data": {"username": "bob", "public_metrics": {"followers_count": 1, "tweet_count": 2}}}"#;
        let profile = parse_user_response(body).unwrap();
        assert_eq!(profile.location, "");
    }

    #[test]
    fn test_parse_missing_user_is_error() {
        let body = r#"{"errors": [{"detail": "Could not find user with username: [ghost]."}]}"#;
        let err = parse_user_response(body).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(parse_user_response("<html>rate limited</html>").is_err());
    }
}
