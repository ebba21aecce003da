#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use newscast::ingestion::{FeedEntry, FeedError, FeedSource};
use newscast::llm::{AiProvider, AiService, ProviderError};

/// Text containing this marker makes [`StubProvider::summarize`] panic
pub const PANIC_MARKER: &str = "__panic__";
/// Text containing this marker makes [`StubProvider::summarize`] hang for `slow`
pub const SLOW_MARKER: &str = "__slow__";

/// Scripted provider recording how it was called
pub struct StubProvider {
    pub delay: Duration,
    pub slow: Duration,
    pub chat_result: Result<String, String>,
    pub speech_pcm: Option<Vec<u8>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub summarize_calls: AtomicUsize,
    pub chat_calls: AtomicUsize,
    pub speech_calls: AtomicUsize,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(0),
            slow: Duration::from_secs(30),
            chat_result: Ok("Stub answer".to_string()),
            speech_pcm: Some(vec![0u8; 480]),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            summarize_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            speech_calls: AtomicUsize::new(0),
        }
    }
}

impl StubProvider {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn failing_chat(message: &str) -> Self {
        Self {
            chat_result: Err(message.to_string()),
            ..Default::default()
        }
    }

    pub fn max_seen(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn speech_count(&self) -> usize {
        self.speech_calls.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl AiProvider for StubProvider {
    fn name(&self) -> &'static str {
        "Stub"
    }

    async fn summarize(&self, text: &str) -> Result<String, ProviderError> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if text.contains(PANIC_MARKER) {
            panic!("stub provider asked to panic");
        }
        if text.contains(SLOW_MARKER) {
            tokio::time::sleep(self.slow).await;
        }
        tokio::time::sleep(self.delay + scripted_delay(text)).await;
        Ok(format!("Summary of: {}", text))
    }

    async fn chat(&self, _article_content: &str, _user_query: &str) -> Result<String, ProviderError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.chat_result
            .clone()
            .map_err(|body| ProviderError::Api { status: 500, body })
    }

    async fn synthesize_speech(&self, _text: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        self.speech_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.speech_pcm.clone())
    }
}

/// `"sleep:<ms> ..."` texts take that much longer to summarize
fn scripted_delay(text: &str) -> Duration {
    text.strip_prefix("sleep:")
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|ms| ms.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or_default()
}

pub fn service(provider: Arc<StubProvider>) -> Arc<AiService> {
    Arc::new(AiService::new(provider))
}

pub fn entry(n: usize, content: &str) -> FeedEntry {
    FeedEntry {
        title: format!("Story {}", n),
        link: format!("https://news.example.com/{}", n),
        published: "Mon, 13 Oct 2025 09:00:00 +0000".to_string(),
        summary: Some(format!("Teaser {}", n)),
        content: Some(content.to_string()),
    }
}

/// Feed source returning fixed entries, or a status error when `fail` is set
pub struct StaticFeed {
    pub entries: Vec<FeedEntry>,
    pub fail: bool,
}

#[async_trait::async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self, limit: usize) -> Result<Vec<FeedEntry>, FeedError> {
        if self.fail {
            return Err(FeedError::Status(reqwest::StatusCode::BAD_GATEWAY));
        }
        Ok(self.entries.iter().take(limit).cloned().collect())
    }
}
