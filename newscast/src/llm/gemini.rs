use std::time::{Duration, Instant};

use base64::{engine::general_purpose, Engine as _};
use common::ProviderConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{chat_instructions, ensure_success, speech_prompt, summary_prompt, with_timeout};
use super::{AiProvider, ProviderError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Puck";

/// Gemini backend using the `generateContent` REST API.
///
/// Text and speech go through the same endpoint; speech requests ask for the
/// `AUDIO` response modality and receive base64 PCM as inline data.
pub struct GeminiProvider {
    base_url: String,
    api_key: Option<String>,
    model: String,
    speech_model: String,
    voice: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl GeminiProvider {
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
            .ok_or_else(|| ProviderError::Unavailable("Missing Gemini API Key".to_string()))
    }

    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let api_key = self.api_key()?;
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        with_timeout(self.timeout, async {
            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .json(request)
                .send()
                .await?;
            let response = ensure_success(response).await?;
            response
                .json::<GenerateResponse>()
                .await
                .map_err(|e| ProviderError::Malformed(e.to_string()))
        })
        .await
    }

    async fn generate_text(&self, request: GenerateRequest, task: &str) -> Result<String, ProviderError> {
        let start = Instant::now();
        let response = self.generate(&self.model, &request).await?;
        info!(
            "Gemini {} took {:.2}s",
            task,
            start.elapsed().as_secs_f64()
        );
        response
            .text()
            .ok_or_else(|| ProviderError::Malformed("response has no text parts".to_string()))
    }
}

#[async_trait::async_trait]
impl AiProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn summarize(&self, text: &str) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            contents: vec![Content::user(summary_prompt(text))],
            system_instruction: None,
            generation_config: None,
        };
        self.generate_text(request, "summary").await
    }

    async fn chat(&self, article_content: &str, user_query: &str) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            contents: vec![Content::user(user_query.to_string())],
            system_instruction: Some(Content::system(chat_instructions(article_content))),
            generation_config: None,
        };
        self.generate_text(request, "chat").await
    }

    async fn synthesize_speech(&self, text: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        let request = GenerateRequest {
            contents: vec![Content::user(speech_prompt(text))],
            system_instruction: None,
            generation_config: Some(GenerationConfig::audio(&self.voice)),
        };

        let start = Instant::now();
        let response = self.generate(&self.speech_model, &request).await?;
        info!(
            "Gemini TTS call took {:.2}s for {} chars",
            start.elapsed().as_secs_f64(),
            text.chars().count()
        );

        let Some(inline) = response.first_inline_data() else {
            return Ok(None);
        };
        debug!(mime_type = %inline.mime_type, "Gemini returned inline audio");

        let pcm = general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| ProviderError::Malformed(format!("invalid base64 audio: {}", e)))?;
        Ok(Some(pcm))
    }
}

// Gemini API request/response structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(text: String) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }

    // systemInstruction carries no role
    fn system(text: String) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
    speech_config: SpeechConfig,
}

impl GenerationConfig {
    fn audio(voice: &str) -> Self {
        Self {
            response_modalities: vec!["AUDIO".to_string()],
            speech_config: SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice.to_string(),
                    },
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// Concatenated text of the first candidate, if it has any
    fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }

    fn first_inline_data(&self) -> Option<&InlineData> {
        self.first_parts().iter().find_map(|p| p.inline_data.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speech_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content::user(speech_prompt("hello"))],
            system_instruction: None,
            generation_config: Some(GenerationConfig::audio("Puck")),
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            value["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Puck"
        );
        assert_eq!(
            value["contents"][0]["parts"][0]["text"],
            "Read the following text aloud exactly as written: hello"
        );
        assert!(value.get("systemInstruction").is_none());
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello, "},{"text":"world"}]}},
                               {"content":{"parts":[{"text":"ignored"}]}}]}"#,
        )
        .expect("parse");
        assert_eq!(response.text().as_deref(), Some("Hello, world"));
        assert!(response.first_inline_data().is_none());
    }

    #[test]
    fn response_without_candidates_has_no_text() {
        let response: GenerateResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).expect("parse");
        assert!(response.text().is_none());
    }

    #[tokio::test]
    async fn missing_key_is_unavailable_without_network() {
        let provider = GeminiProvider::new(None).with_base_url("http://127.0.0.1:9");
        let err = provider.summarize("anything").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(ref r) if r == "Missing Gemini API Key"));
        assert!(matches!(
            provider.synthesize_speech("hi").await,
            Err(ProviderError::Unavailable(_))
        ));
    }
}
