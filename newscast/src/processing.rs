use std::sync::Arc;
use std::time::{Duration, Instant};

use common::PipelineConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::ingestion::FeedEntry;
use crate::llm::AiService;

/// Article returned to API clients, with the AI summary in place of the feed teaser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
    pub original_content: String,
}

/// Fan-out settings for [`summarize_articles`]
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum number of summaries in flight at once
    pub workers: usize,
    pub task_timeout: Option<Duration>,
    pub batch_timeout: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: 5,
            task_timeout: Some(Duration::from_secs(60)),
            batch_timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl From<&PipelineConfig> for BatchOptions {
    fn from(cfg: &PipelineConfig) -> Self {
        let defaults = Self::default();
        Self {
            workers: cfg.workers.unwrap_or(defaults.workers).max(1),
            task_timeout: cfg
                .task_timeout_seconds
                .map(Duration::from_secs)
                .or(defaults.task_timeout),
            batch_timeout: cfg
                .batch_timeout_seconds
                .map(Duration::from_secs)
                .or(defaults.batch_timeout),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum TaskError {
    #[error("summary for {link} timed out after {after:?}")]
    TimedOut { link: String, after: Duration },
    #[error("worker pool closed")]
    PoolClosed,
}

/// Text sent to the summarizer: full content, else the feed summary, else nothing.
pub fn text_to_summarize(entry: &FeedEntry) -> &str {
    entry
        .content
        .as_deref()
        .filter(|c| !c.is_empty())
        .or_else(|| entry.summary.as_deref().filter(|s| !s.is_empty()))
        .unwrap_or("")
}

/// Summarize a single entry. The entry is consumed, so the resulting article is
/// written by exactly one task.
pub async fn summarize_entry(ai: &AiService, entry: FeedEntry) -> Article {
    let text = text_to_summarize(&entry).to_string();
    let summary = ai.summarize(&text).await;
    Article {
        title: entry.title,
        link: entry.link,
        published: entry.published,
        summary,
        original_content: text,
    }
}

/// Summarize all entries concurrently, at most `options.workers` at a time.
///
/// Output keeps the input order. A task that panics, is cancelled or misses its
/// deadline is logged and left out; the batch itself never fails. Provider errors
/// are not task failures: they come back as sentinel summaries from [`AiService`].
pub async fn summarize_articles(
    ai: Arc<AiService>,
    entries: Vec<FeedEntry>,
    options: &BatchOptions,
) -> Vec<Article> {
    if entries.is_empty() {
        return Vec::new();
    }

    let total = entries.len();
    info!("Summarizing {} articles with {}", total, ai.provider_name());
    let start = Instant::now();

    let limiter = Arc::new(Semaphore::new(options.workers.max(1)));
    let mut tasks = JoinSet::new();

    for (index, entry) in entries.into_iter().enumerate() {
        let ai = ai.clone();
        let limiter = limiter.clone();
        let task_timeout = options.task_timeout;

        tasks.spawn(async move {
            let _permit = limiter.acquire_owned().await.map_err(|_| TaskError::PoolClosed)?;
            let link = entry.link.clone();
            let work = summarize_entry(&ai, entry);
            let article = match task_timeout {
                Some(after) => tokio::time::timeout(after, work)
                    .await
                    .map_err(|_| TaskError::TimedOut { link, after })?,
                None => work.await,
            };
            Ok::<_, TaskError>((index, article))
        });
    }

    let deadline = options
        .batch_timeout
        .map(|limit| tokio::time::Instant::now() + limit);
    let mut slots: Vec<Option<Article>> = vec![None; total];

    loop {
        let joined = match deadline {
            Some(at) => match tokio::time::timeout_at(at, tasks.join_next()).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        "Batch deadline reached, abandoning {} unfinished summaries",
                        tasks.len()
                    );
                    tasks.abort_all();
                    break;
                }
            },
            None => tasks.join_next().await,
        };

        let Some(joined) = joined else { break };
        match joined {
            Ok(Ok((index, article))) => slots[index] = Some(article),
            Ok(Err(e)) => error!("Article processing failed: {}", e),
            Err(e) => error!("Article processing task aborted: {}", e),
        }
    }

    let articles: Vec<Article> = slots.into_iter().flatten().collect();
    info!(
        "Summarized {}/{} articles in {:.2}s",
        articles.len(),
        total,
        start.elapsed().as_secs_f64()
    );
    articles
}
