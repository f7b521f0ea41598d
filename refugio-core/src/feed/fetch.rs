//! Downloading third-party feeds.

use std::time::Duration;

use chrono_tz::Tz;
use tracing::debug;

use super::{FeedEvent, parse_feed_in};
use crate::error::{RefugioError, RefugioResult};

const USER_AGENT: &str = concat!("refugio/", env!("CARGO_PKG_VERSION"));

/// HTTP client for iCalendar exports. Cheap to clone.
#[derive(Clone, Debug)]
pub struct FeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl FeedFetcher {
    pub fn new(timeout: Duration) -> RefugioResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| RefugioError::FeedFetch(format!("Failed to build HTTP client: {}", e)))?;

        Ok(FeedFetcher { client, timeout })
    }

    /// GET the feed body. `webcal://` is treated as `https://`.
    pub async fn fetch(&self, url: &str) -> RefugioResult<String> {
        let url = normalize_url(url)?;
        debug!(url = %url, "Fetching feed");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                RefugioError::FeedFetch(format!(
                    "{} timed out after {}s",
                    url,
                    self.timeout.as_secs()
                ))
            } else {
                RefugioError::FeedFetch(format!("{}: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefugioError::FeedFetch(format!(
                "{} returned HTTP {}",
                url,
                status.as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| RefugioError::FeedFetch(format!("{}: {}", url, e)))
    }

    /// Fetch and parse in one step.
    pub async fn fetch_events(&self, url: &str, tz: Tz) -> RefugioResult<Vec<FeedEvent>> {
        let body = self.fetch(url).await?;
        let events = parse_feed_in(&body, tz)?;
        debug!(url = %url, count = events.len(), "Parsed feed");
        Ok(events)
    }
}

fn normalize_url(raw: &str) -> RefugioResult<url::Url> {
    let raw = raw.trim();
    let rewritten = match raw.strip_prefix("webcal://") {
        Some(rest) => format!("https://{}", rest),
        None => raw.to_string(),
    };

    let url = url::Url::parse(&rewritten)
        .map_err(|e| RefugioError::FeedFetch(format!("Invalid feed URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RefugioError::FeedFetch(format!(
            "Unsupported feed URL scheme '{}'",
            other
        ))),
    }
}
