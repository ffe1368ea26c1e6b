//! Packaging a round for the summary collaborator.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::SummaryError;
use crate::model::{ArgumentType, DebateRound, Side};

/// One non-empty note, as sent to the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowedArgument {
    pub speaker: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: Option<ArgumentType>,
}

/// The round, partitioned by side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub topic: String,
    pub affirmative_arguments: Vec<FlowedArgument>,
    pub negative_arguments: Vec<FlowedArgument>,
}

impl SummaryRequest {
    /// Collect every note with content. Fails when there is nothing to send.
    pub fn from_round(round: &DebateRound) -> Result<Self, SummaryError> {
        let mut request = SummaryRequest {
            topic: round.topic.clone(),
            affirmative_arguments: Vec::new(),
            negative_arguments: Vec::new(),
        };

        for speaker in round.speakers_in_order() {
            let notes = speaker
                .arguments
                .iter()
                .filter(|a| a.has_content())
                .map(|a| FlowedArgument {
                    speaker: speaker.name.clone(),
                    content: a.content.trim().to_string(),
                    kind: a.kind,
                });
            match speaker.side {
                Side::Affirmative => request.affirmative_arguments.extend(notes),
                Side::Negative => request.negative_arguments.extend(notes),
            }
        }

        if request.is_empty() {
            return Err(SummaryError::NothingToSummarize);
        }
        Ok(request)
    }

    pub fn is_empty(&self) -> bool {
        self.affirmative_arguments.is_empty() && self.negative_arguments.is_empty()
    }

    pub fn argument_count(&self) -> usize {
        self.affirmative_arguments.len() + self.negative_arguments.len()
    }
}

/// System and user messages for one summary call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryPrompt {
    pub system: String,
    pub user: String,
}

impl SummaryPrompt {
    pub fn build(request: &SummaryRequest, config: &Config) -> Result<Self, SummaryError> {
        let arguments_json = serde_json::to_string_pretty(request)
            .map_err(|e| SummaryError::MalformedResponse(format!("Failed to encode request: {}", e)))?;
        Ok(Self {
            system: config.prompts.system.clone(),
            user: config.summary_prompt(&request.topic, &arguments_json),
        })
    }
}
