use std::time::{Duration, Instant};

use common::ProviderConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{chat_instructions, ensure_success, summary_prompt, with_timeout};
use super::{AiProvider, ProviderError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_SPEECH_MODEL: &str = "gpt-4o-mini-tts";
pub const DEFAULT_VOICE: &str = "alloy";

const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful news assistant.";

/// OpenAI backend: chat completions for text, `audio/speech` for synthesis.
///
/// Speech is requested as raw `pcm`, which the API documents as 24kHz 16-bit
/// mono little-endian, the same format the WAV encoder expects by default.
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    model: String,
    speech_model: String,
    voice: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            speech_model: DEFAULT_SPEECH_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            timeout: Duration::from_secs(30),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(cfg: &ProviderConfig, api_key: Option<String>) -> Self {
        let mut provider = Self::new(api_key);
        if let Some(url) = &cfg.api_url {
            provider = provider.with_base_url(url);
        }
        if let Some(model) = &cfg.model {
            provider.model = model.clone();
        }
        if let Some(speech_model) = &cfg.speech_model {
            provider.speech_model = speech_model.clone();
        }
        if let Some(voice) = &cfg.voice {
            provider.voice = voice.clone();
        }
        if let Some(secs) = cfg.timeout_seconds {
            provider.timeout = Duration::from_secs(secs);
        }
        provider
    }

    /// Base of the versioned API, e.g. `https://api.openai.com/v1`
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Unavailable("Missing OpenAI API Key".to_string()))
    }

    async fn complete(&self, messages: Vec<Message>, task: &str) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;
        let req_body = ChatRequest {
            model: self.model.clone(),
            messages,
        };
        let url = format!("{}/chat/completions", self.base_url);

        let start = Instant::now();
        let resp_body: ChatResponse = with_timeout(self.timeout, async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .json(&req_body)
                .send()
                .await?;
            let response = ensure_success(response).await?;
            response
                .json::<ChatResponse>()
                .await
                .map_err(|e| ProviderError::Malformed(e.to_string()))
        })
        .await?;

        let usage = resp_body.usage.unwrap_or_default();
        info!(
            "OpenAI {} took {:.2}s ({} prompt + {} completion tokens)",
            task,
            start.elapsed().as_secs_f64(),
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0)
        );

        resp_body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Malformed("response has no message content".to_string()))
    }
}

#[async_trait::async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    async fn summarize(&self, text: &str) -> Result<String, ProviderError> {
        let messages = vec![
            Message::new("system", SUMMARY_SYSTEM_PROMPT),
            Message::new("user", summary_prompt(text)),
        ];
        self.complete(messages, "summary").await
    }

    async fn chat(&self, article_content: &str, user_query: &str) -> Result<String, ProviderError> {
        let messages = vec![
            Message::new("system", chat_instructions(article_content)),
            Message::new("user", user_query),
        ];
        self.complete(messages, "chat").await
    }

    async fn synthesize_speech(&self, text: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        let api_key = self.api_key()?;
        let req_body = SpeechRequest {
            model: self.speech_model.clone(),
            input: text.to_string(),
            voice: self.voice.clone(),
            response_format: "pcm",
        };
        let url = format!("{}/audio/speech", self.base_url);

        let start = Instant::now();
        let pcm = with_timeout(self.timeout, async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .json(&req_body)
                .send()
                .await?;
            let response = ensure_success(response).await?;
            Ok::<_, ProviderError>(response.bytes().await?.to_vec())
        })
        .await?;
        info!(
            "OpenAI TTS call took {:.2}s for {} chars",
            start.elapsed().as_secs_f64(),
            text.chars().count()
        );

        Ok(if pcm.is_empty() { None } else { Some(pcm) })
    }
}

// OpenAI API request/response structures
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl Message {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<usize>,
    #[serde(default)]
    completion_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SpeechRequest {
    model: String,
    input: String,
    voice: String,
    response_format: &'static str,
}
