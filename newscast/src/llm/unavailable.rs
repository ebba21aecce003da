use super::{AiProvider, ProviderError};

/// Backend used when the configured provider name is not recognized.
/// Every capability fails closed with [`ProviderError::Unavailable`].
pub struct UnavailableProvider {
    reason: String,
}

impl UnavailableProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait::async_trait]
impl AiProvider for UnavailableProvider {
    fn name(&self) -> &'static str {
        "Unconfigured"
    }

    async fn summarize(&self, _text: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable(self.reason.clone()))
    }

    async fn chat(&self, _article_content: &str, _user_query: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable(self.reason.clone()))
    }

    async fn synthesize_speech(&self, _text: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        Err(ProviderError::Unavailable(self.reason.clone()))
    }
}
