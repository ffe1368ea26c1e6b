//! Pulling a [`DebateSummary`] out of free-form model output.

use crate::error::SummaryError;
use crate::summary::types::DebateSummary;

const FENCED_JSON_PATTERN: &str = r"(?s)```(?:json|JSON)?\s*(.*?)\s*```";

/// Extract the JSON object text from a response, fenced or bare.
pub fn extract_json(response: &str) -> Option<&str> {
    if let Ok(re) = regex::Regex::new(FENCED_JSON_PATTERN) {
        if let Some(body) = re.captures(response).and_then(|caps| caps.get(1)) {
            let body = body.as_str();
            if body.starts_with('{') {
                return Some(body);
            }
        }
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

/// Parse and validate a collaborator response.
pub fn parse_summary(response: &str) -> Result<DebateSummary, SummaryError> {
    let json =
        extract_json(response).ok_or_else(|| SummaryError::MalformedResponse(preview(response)))?;
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| SummaryError::MalformedResponse(e.to_string()))?;
    DebateSummary::from_value(value)
}

fn preview(response: &str) -> String {
    let trimmed = response.trim();
    if trimmed.chars().count() <= 80 {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(80).collect();
        format!("{}...", head)
    }
}
