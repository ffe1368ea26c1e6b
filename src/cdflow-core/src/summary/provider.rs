//! The summary collaborator: anything that turns a prompt into text.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;

use crate::config::SummaryConfig;
use crate::error::ProviderError;
use crate::summary::request::SummaryPrompt;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// A text-completion backend used for round summaries.
#[async_trait]
pub trait SummaryProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Send one prompt and return the raw response text.
    async fn complete(&self, prompt: &SummaryPrompt) -> Result<String, ProviderError>;
}

/// Chat-completion backend for any OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiSummaryProvider {
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl fmt::Debug for OpenAiSummaryProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiSummaryProvider")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl OpenAiSummaryProvider {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
        }
    }

    pub fn from_config(
        config: &SummaryConfig,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::new(api_base, api_key, config.model.clone(), config.max_tokens)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> Result<Client<OpenAIConfig>, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Request(format!("Failed to create HTTP client: {}", e)))?;

        let config = OpenAIConfig::new()
            .with_api_key(&self.api_key)
            .with_api_base(&self.api_base);

        Ok(Client::with_config(config).with_http_client(http_client))
    }
}

#[async_trait]
impl SummaryProvider for OpenAiSummaryProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &SummaryPrompt) -> Result<String, ProviderError> {
        let client = self.client()?;

        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: prompt.system.clone().into(),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: prompt.user.clone().into(),
                name: None,
            }),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(self.max_tokens)
            .messages(messages)
            .build()?;

        tracing::debug!(model = %self.model, "Requesting round summary");
        let response = client.chat().create(request).await?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::Request("Empty completion".to_string()))
    }
}

/// Provider that replays canned results, for tests and offline runs.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: Mutex<Vec<SummaryPrompt>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.push(Ok(response.into()));
        self
    }

    pub fn with_error(self, error: ProviderError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, result: Result<String, ProviderError>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(result);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn last_prompt(&self) -> Option<SummaryPrompt> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

#[async_trait]
impl SummaryProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &SummaryPrompt) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.clone());
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Request("No scripted response left".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> SummaryPrompt {
        SummaryPrompt {
            system: "sys".to_string(),
            user: "usr".to_string(),
        }
    }

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new()
            .with_response("first")
            .with_error(ProviderError::RateLimited("429".to_string()));

        assert_eq!(provider.complete(&prompt()).await.unwrap(), "first");
        assert_eq!(
            provider.complete(&prompt()).await,
            Err(ProviderError::RateLimited("429".to_string()))
        );
        assert!(provider.complete(&prompt()).await.is_err());
        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.last_prompt().unwrap().user, "usr");
    }

    #[test]
    fn test_openai_provider_debug_hides_key() {
        let provider = OpenAiSummaryProvider::new(DEFAULT_API_BASE, "sk-secret", "gpt-4o-mini", 512);
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("gpt-4o-mini"));
        assert_eq!(provider.name(), "openai");
    }
}
