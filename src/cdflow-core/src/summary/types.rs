//! Shape of an AI round summary.

use serde::{Deserialize, Serialize};

use crate::error::SummaryError;
use crate::model::Side;

pub const MAX_STRENGTH: u8 = 100;

/// Structured analysis of a round, produced by the summary collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DebateSummary {
    pub major_arguments: Vec<MajorArgument>,
    pub areas_of_clash: Vec<ClashArea>,
    pub recommendations: Vec<String>,
    pub overall_assessment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MajorArgument {
    pub side: Side,
    pub argument: String,
    /// 0 to 100.
    pub strength: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speakers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClashStatus {
    Resolved,
    Contested,
    Unaddressed,
}

impl ClashStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClashStatus::Resolved => "resolved",
            ClashStatus::Contested => "contested",
            ClashStatus::Unaddressed => "unaddressed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClashArea {
    pub topic: String,
    pub affirmative_position: String,
    pub negative_position: String,
    pub status: ClashStatus,
}

impl DebateSummary {
    /// Convert a parsed JSON value, rejecting anything that doesn't fit.
    ///
    /// Types, required fields and enum values are checked by deserialization;
    /// the strength range is checked afterwards. Nothing is coerced.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SummaryError> {
        if !value.is_object() {
            return Err(SummaryError::InvalidSummary(
                "top-level value is not an object".to_string(),
            ));
        }
        let summary: DebateSummary = serde_json::from_value(value)
            .map_err(|e| SummaryError::InvalidSummary(e.to_string()))?;
        summary.validate()?;
        Ok(summary)
    }

    pub fn validate(&self) -> Result<(), SummaryError> {
        for (i, major) in self.major_arguments.iter().enumerate() {
            if major.strength > MAX_STRENGTH {
                return Err(SummaryError::InvalidSummary(format!(
                    "majorArguments[{}].strength must be between 0 and {}, got {}",
                    i, MAX_STRENGTH, major.strength
                )));
            }
        }
        Ok(())
    }
}
