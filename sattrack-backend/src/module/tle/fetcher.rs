///! Download raw element text from the configured sources
use anyhow::{Context, Result};
use futures::future::join_all;
use reqwest::{Client, Url};
use std::time::Duration;

const USER_AGENT: &str = "sattrack/0.1";

/// HTTP client for the configured TLE sources
pub struct TleFetcher {
    client: Client,
    urls: Vec<String>,
}

impl TleFetcher {
    pub fn new(urls: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, urls })
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Fetch every source concurrently and join the bodies in configuration order.
    ///
    /// Fails as a whole if any source fails or returns nothing, so a partial
    /// download never replaces a complete catalog.
    pub async fn fetch_all(&self) -> Result<String> {
        if self.urls.is_empty() {
            anyhow::bail!("No TLE sources configured");
        }

        let bodies = join_all(self.urls.iter().map(|url| self.fetch_one(url))).await;

        let mut text = String::new();
        for (url, body) in self.urls.iter().zip(bodies) {
            let body = body?;
            if body.trim().is_empty() {
                anyhow::bail!("TLE source {} returned no lines", url);
            }
            text.push_str(body.trim_end());
            text.push('\n');
        }

        Ok(text)
    }

    async fn fetch_one(&self, url: &str) -> Result<String> {
        let url = validate_url(url)?;
        tracing::debug!("Fetching TLE data from {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to GET {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error from {}: {}", url, response.status());
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))
    }
}

/// Only absolute http(s) URLs are fetched
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid TLE source URL: {}", url))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => anyhow::bail!("Unsupported scheme '{}' in TLE source URL: {}", scheme, url),
    }
}
