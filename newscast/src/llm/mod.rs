use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use common::AiConfig;
use tracing::{info, warn};

use crate::audio::PcmFormat;

pub mod gemini;
pub mod openai;
pub mod service;
pub mod unavailable;

pub use service::{is_failure_sentinel, AiService};

/// Capability interface implemented by every AI vendor backend.
///
/// Implementations report failures as typed errors; conversion to the text/`None`
/// sentinels served to callers happens once, in [`AiService`].
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    /// Vendor label used in logs and error messages
    fn name(&self) -> &'static str;

    /// Summarize an article in under ~100 words
    async fn summarize(&self, text: &str) -> Result<String, ProviderError>;

    /// Answer a user query grounded in the given article
    async fn chat(&self, article_content: &str, user_query: &str) -> Result<String, ProviderError>;

    /// Read `text` aloud. Returns raw PCM in [`AiProvider::speech_format`], or `None`
    /// when the vendor response carries no audio.
    async fn synthesize_speech(&self, text: &str) -> Result<Option<Vec<u8>>, ProviderError>;

    /// Sample format of the PCM returned by `synthesize_speech`
    fn speech_format(&self) -> PcmFormat {
        PcmFormat::default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Backend cannot serve requests (missing API key, unknown provider name)
    #[error("{0}")]
    Unavailable(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Providers selectable through `ai.provider` / `AI_PROVIDER`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("unknown AI provider '{}'", other)),
        }
    }
}

pub const SUMMARY_INSTRUCTION: &str =
    "Summarize the following news article in less than 100 words. Capture the key points clearly:";

pub fn summary_prompt(text: &str) -> String {
    format!("{}\n\n{}", SUMMARY_INSTRUCTION, text)
}

/// System instruction for article chat: grounded answers plus a nudge towards
/// the client's "next news" command when the user wants to change topic.
pub fn chat_instructions(article_content: &str) -> String {
    format!(
        r#"You are a helpful and conversational news assistant.

Context Article:
{}

Instructions:
1. If the user asks a question about the article, answer it naturally using the article context.
2. If the user wants to move on, skip, or go to the next story, acknowledge them briefly and suggest they say "next news".
3. Be concise and friendly.
"#,
        article_content
    )
}

pub fn speech_prompt(text: &str) -> String {
    format!("Read the following text aloud exactly as written: {}", text)
}

/// Build the process-wide provider from configuration.
///
/// Unknown provider names produce an [`unavailable::UnavailableProvider`] and a missing
/// API key produces a backend that refuses every call; neither aborts startup.
pub fn build_provider<F>(ai: &AiConfig, provider_name: &str, lookup_env: F) -> Arc<dyn AiProvider>
where
    F: Fn(&str) -> Option<String>,
{
    let kind = match provider_name.parse::<ProviderKind>() {
        Ok(kind) => kind,
        Err(e) => {
            warn!("{}; AI features are disabled", e);
            return Arc::new(unavailable::UnavailableProvider::new("Invalid AI Provider"));
        }
    };

    match kind {
        ProviderKind::Gemini => {
            let cfg = ai.gemini.clone().unwrap_or_default();
            let api_key = resolve_api_key(cfg.api_key_env.as_deref(), "GEMINI_API_KEY", &lookup_env);
            let provider = gemini::GeminiProvider::from_config(&cfg, api_key);
            info!("AI provider initialized: gemini ({})", provider.model());
            Arc::new(provider)
        }
        ProviderKind::OpenAi => {
            let cfg = ai.openai.clone().unwrap_or_default();
            let api_key = resolve_api_key(cfg.api_key_env.as_deref(), "OPENAI_API_KEY", &lookup_env);
            let provider = openai::OpenAiProvider::from_config(&cfg, api_key);
            info!("AI provider initialized: openai ({})", provider.model());
            Arc::new(provider)
        }
    }
}

fn resolve_api_key<F>(configured_env: Option<&str>, default_env: &str, lookup_env: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let env_name = configured_env.unwrap_or(default_env);
    let key = lookup_env(env_name).filter(|k| !k.trim().is_empty());
    if key.is_none() {
        warn!("AI provider configured but API key env var '{}' not set", env_name);
    }
    key
}

/// Bound a whole provider call (request and body read) by `limit`.
pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ProviderError::Timeout(limit))?
}

/// Turn a non-2xx vendor response into [`ProviderError::Api`], keeping the body for logs.
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProviderConfig;

    #[test]
    fn provider_kind_parsing() {
        assert_eq!("gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert_eq!(" OpenAI ".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert!("anthropic".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn summary_prompt_embeds_text() {
        let prompt = summary_prompt("Rust 1.80 released.");
        assert!(prompt.starts_with(SUMMARY_INSTRUCTION));
        assert!(prompt.ends_with("Rust 1.80 released."));
    }

    #[test]
    fn chat_instructions_carry_article_and_next_hint() {
        let prompt = chat_instructions("A new battery chemistry doubles range.");
        assert!(prompt.contains("A new battery chemistry doubles range."));
        assert!(prompt.contains("\"next news\""));
    }

    #[test]
    fn build_provider_selects_backend_once() {
        let ai = AiConfig::default();
        let gemini = build_provider(&ai, "gemini", |_| Some("key".to_string()));
        assert_eq!(gemini.name(), "Gemini");

        let openai = build_provider(&ai, "openai", |_| Some("key".to_string()));
        assert_eq!(openai.name(), "OpenAI");

        let unknown = build_provider(&ai, "mistral", |_| None);
        assert_eq!(unknown.name(), "Unconfigured");
    }

    #[test]
    fn api_key_comes_from_configured_env_var() {
        let ai = AiConfig {
            provider: Some("openai".to_string()),
            openai: Some(ProviderConfig {
                api_key_env: Some("CUSTOM_KEY".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let key = resolve_api_key(
            ai.openai.as_ref().and_then(|c| c.api_key_env.as_deref()),
            "OPENAI_API_KEY",
            &|name: &str| (name == "CUSTOM_KEY").then(|| "sk-test".to_string()),
        );
        assert_eq!(key.as_deref(), Some("sk-test"));

        let blank = resolve_api_key(None, "OPENAI_API_KEY", &|_: &str| Some(String::new()));
        assert!(blank.is_none());
    }

    #[tokio::test]
    async fn with_timeout_reports_elapsed_limit() {
        let result: Result<(), ProviderError> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Timeout(_))));
    }
}
