//! Error types for the flow keeper.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by store operations and the summary pipeline.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Debate topic cannot be empty")]
    EmptyTopic,

    #[error("Debate topic must be at least {min} characters, got {actual}")]
    TopicTooShort { min: usize, actual: usize },

    #[error("Speaker name cannot be empty")]
    EmptySpeakerName,

    #[error("A speaker named '{0}' already exists in this round")]
    DuplicateSpeakerName(String),

    #[error("An argument cannot refute itself ({0})")]
    SelfRefutation(String),

    #[error("No saved round with id {0}")]
    RoundNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Failures of the durable key-value layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures reported by the summarisation collaborator itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Service temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Request(String),
}

impl From<async_openai::error::OpenAIError> for ProviderError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        ProviderError::classify(err.to_string())
    }
}

impl ProviderError {
    /// Sort a raw failure message into a cooldown class or a plain failure.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("429")
            || lower.contains("rate limit")
            || lower.contains("rate_limit")
            || lower.contains("quota")
            || lower.contains("resource_exhausted")
        {
            ProviderError::RateLimited(message)
        } else if lower.contains("503")
            || lower.contains("overloaded")
            || lower.contains("unavailable")
            || lower.contains("timed out")
        {
            ProviderError::Unavailable(message)
        } else {
            ProviderError::Request(message)
        }
    }
}

/// Why the summary trigger is in a cooldown window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownReason {
    RateLimited,
    Unavailable,
}

/// Errors from the summary adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SummaryError {
    #[error("Nothing to summarize: add at least one argument with content first")]
    NothingToSummarize,

    #[error("A summary request is already in progress")]
    Busy,

    #[error("{}", cooldown_display(.reason, .remaining))]
    CoolingDown {
        reason: CooldownReason,
        remaining: Duration,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Summary response did not contain a JSON object: {0}")]
    MalformedResponse(String),

    #[error("Summary response failed validation: {0}")]
    InvalidSummary(String),
}

fn cooldown_display(reason: &CooldownReason, remaining: &Duration) -> String {
    cooldown_message(*reason, *remaining)
}

/// Human-readable wait message for a cooldown window.
pub fn cooldown_message(reason: CooldownReason, remaining: Duration) -> String {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    match reason {
        CooldownReason::RateLimited => format!(
            "The summary service is rate limited. Please wait {} seconds before trying again.",
            secs
        ),
        CooldownReason::Unavailable => format!(
            "The summary service is temporarily unavailable. Please wait {} seconds before trying again.",
            secs
        ),
    }
}
