use tracing::{info, warn};

use crate::llm::{is_failure_sentinel, AiService};

/// Answer a question about an article and return the answer as WAV audio.
///
/// Chat strictly precedes synthesis. A degraded chat answer stops the chain
/// before any audio request is made; either stage failing yields `None`.
pub async fn voice_response(ai: &AiService, article_content: &str, user_query: &str) -> Option<Vec<u8>> {
    info!("Getting text answer from {}", ai.provider_name());
    let answer = ai.chat(article_content, user_query).await;
    if answer.trim().is_empty() || is_failure_sentinel(&answer) {
        warn!("Chat failed, skipping audio: {}", answer);
        return None;
    }

    info!("Converting answer to audio ({} chars)", answer.chars().count());
    ai.synthesize_speech(&answer).await
}
