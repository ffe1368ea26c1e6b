//! Configuration module for loading TOML config files.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::FlowError;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub round: RoundConfig,
    pub summary: SummaryConfig,
    pub prompts: PromptsConfig,
}

/// Where the state blob lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the JSON state file.
    pub dir: String,
    /// Single named key the whole state is written under.
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: ".cdflow".to_string(),
            key: "debate-flow-state".to_string(),
        }
    }
}

/// Validation rules for rounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    pub min_topic_length: usize,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            min_topic_length: 5,
        }
    }
}

/// Summary model and pacing settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub model: String,
    pub max_tokens: u32,
    /// Minimum spacing between two summary calls.
    pub min_interval_ms: u64,
    pub rate_limit_cooldown_secs: u64,
    pub unavailable_cooldown_secs: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2000,
            min_interval_ms: 2000,
            rate_limit_cooldown_secs: 60,
            unavailable_cooldown_secs: 30,
        }
    }
}

impl SummaryConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }

    pub fn unavailable_cooldown(&self) -> Duration {
        Duration::from_secs(self.unavailable_cooldown_secs)
    }
}

/// Prompt templates for the summary request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub system: String,
    /// Placeholders: `{topic}` and `{arguments_json}`.
    pub summary_template: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            summary_template: DEFAULT_SUMMARY_TEMPLATE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FlowError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| FlowError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load configuration from string content.
    pub fn from_str(content: &str) -> Result<Self, FlowError> {
        toml::from_str(content)
            .map_err(|e| FlowError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Build the summary prompt, with placeholders replaced.
    pub fn summary_prompt(&self, topic: &str, arguments_json: &str) -> String {
        self.prompts
            .summary_template
            .replace("{topic}", topic)
            .replace("{arguments_json}", arguments_json)
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an experienced Congressional Debate judge and coach.
You analyse flowed rounds and give concise, fair, evidence-based feedback.
You always answer with a single JSON object and nothing else."#;

const DEFAULT_SUMMARY_TEMPLATE: &str = r#"Analyse this Congressional Debate round.

LEGISLATION: {topic}

FLOWED ARGUMENTS (JSON):
{arguments_json}

Respond with ONE JSON object using exactly this shape:
{
  "majorArguments": [
    { "side": "affirmative" | "negative", "argument": string, "strength": integer 0-100, "speakers": [string] }
  ],
  "areasOfClash": [
    { "topic": string, "affirmativePosition": string, "negativePosition": string, "status": "resolved" | "contested" | "unaddressed" }
  ],
  "recommendations": [string],
  "overallAssessment": string
}

RULES:
- Only use the two side values and three status values shown above
- Strength is a whole number from 0 to 100
- Base everything on the flowed arguments; do not invent speeches
- Output ONLY the JSON object
"#;
