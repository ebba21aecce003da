use std::sync::Arc;

use tracing::{info, warn};

use super::{AiProvider, ProviderError};
use crate::audio;

/// Prefix of the answer returned when no backend can serve the call
pub const UNAVAILABLE_PREFIX: &str = "AI Service Unavailable";
/// Marker contained in every degraded text answer
pub const ERROR_MARKER: &str = "Error";

/// True when a text answer from [`AiService`] signals a handled failure
/// rather than model output.
pub fn is_failure_sentinel(answer: &str) -> bool {
    answer.starts_with(UNAVAILABLE_PREFIX) || answer.contains(ERROR_MARKER)
}

/// Boundary of the AI abstraction shared by the HTTP handlers and the
/// summarization pipeline.
///
/// Provider errors never escape: text capabilities degrade to a sentinel string
/// and speech degrades to `None`.
#[derive(Clone)]
pub struct AiService {
    provider: Arc<dyn AiProvider>,
}

impl AiService {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn summarize(&self, text: &str) -> String {
        match self.provider.summarize(text).await {
            Ok(summary) => summary,
            Err(ProviderError::Unavailable(reason)) => unavailable(&reason),
            Err(e) => {
                warn!("{} summary failed: {}", self.provider.name(), e);
                format!("Error generating summary with {}: {}", self.provider.name(), e)
            }
        }
    }

    pub async fn chat(&self, article_content: &str, user_query: &str) -> String {
        match self.provider.chat(article_content, user_query).await {
            Ok(answer) => answer,
            Err(ProviderError::Unavailable(reason)) => unavailable(&reason),
            Err(e) => {
                warn!("{} chat failed: {}", self.provider.name(), e);
                format!("Error processing query with {}: {}", self.provider.name(), e)
            }
        }
    }

    /// Read `text` aloud and return a playable WAV file.
    pub async fn synthesize_speech(&self, text: &str) -> Option<Vec<u8>> {
        if text.trim().is_empty() {
            warn!("text for audio generation is empty");
            return None;
        }

        let pcm = match self.provider.synthesize_speech(text).await {
            Ok(Some(pcm)) => pcm,
            Ok(None) => {
                warn!("no audio data found in {} response", self.provider.name());
                return None;
            }
            Err(e) => {
                warn!("{} audio generation failed: {}", self.provider.name(), e);
                return None;
            }
        };

        match audio::encode_wav(&pcm, self.provider.speech_format()) {
            Ok(wav) => {
                info!("synthesized {} bytes of PCM audio", pcm.len());
                Some(wav)
            }
            Err(e) => {
                warn!("failed to wrap synthesized audio: {}", e);
                None
            }
        }
    }
}

fn unavailable(reason: &str) -> String {
    format!("{}: {}", UNAVAILABLE_PREFIX, reason)
}
