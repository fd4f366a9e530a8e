use std::time::Duration;

use reqwest::Client;
use url::Url;
use wx_core::{Error, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP client for all scrapers. The request timeout is the only
/// knob and is passed through to the client unchanged.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch a page body. Non-success statuses are scrape errors, the body
    /// is returned as-is otherwise.
    pub async fn fetch_html(&self, url: &str) -> Result<String> {
        let url =
            Url::parse(url).map_err(|e| Error::Scrape(format!("invalid URL {}: {}", url, e)))?;
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Scrape(format!("{} returned {}", url, status)));
        }
        Ok(response.text().await?)
    }
}
