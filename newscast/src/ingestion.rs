use std::time::Duration;

use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Raw article record as delivered by the feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: String,
    /// Feed description, often HTML
    pub summary: Option<String>,
    /// Full content when the feed carries it, otherwise the description
    pub content: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("failed to fetch feed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("feed fetch failed with status: {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to parse feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// Source of the most recent feed entries
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Return at most `limit` entries in feed order. Any failure is reported as a
    /// single error, never as a partial list.
    async fn fetch(&self, limit: usize) -> Result<Vec<FeedEntry>, FeedError>;
}

/// RSS/Atom feed reached over HTTP
pub struct RssFeedSource {
    url: String,
    client: Client,
}

impl RssFeedSource {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("Newscast/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch(&self, limit: usize) -> Result<Vec<FeedEntry>, FeedError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status));
        }

        let bytes = response.bytes().await?;
        let entries = parse_entries(bytes.as_ref(), limit)?;
        info!("Fetched feed '{}': {} entries", self.url, entries.len());
        Ok(entries)
    }
}

/// Parse a feed document and keep the first `limit` entries, without re-sorting.
pub fn parse_entries(source: &[u8], limit: usize) -> Result<Vec<FeedEntry>, FeedError> {
    let feed = parser::parse(source)?;
    Ok(feed.entries.iter().take(limit).map(to_feed_entry).collect())
}

fn to_feed_entry(entry: &Entry) -> FeedEntry {
    let title = entry.title.as_ref().map(|t| t.content.clone()).unwrap_or_default();
    let link = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();
    let published = entry
        .published
        .or(entry.updated)
        .map(|d| d.to_rfc2822())
        .unwrap_or_default();

    let summary = entry.summary.as_ref().map(|s| s.content.clone());
    let content = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .or_else(|| summary.clone());

    FeedEntry {
        title,
        link,
        published,
        summary,
        content,
    }
}
