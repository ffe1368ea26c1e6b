//! Inline `REF <name>` markers.
//!
//! Typing `REF Jordan` inside a note marks the note as rebutting the speaker
//! named Jordan without going through a link dialog. Only the first marker in
//! the text counts, and the name must match a speaker in the round exactly
//! (ignoring case).

use crate::model::DebateRound;

const REF_MARKER_PATTERN: &str = r"(?i)\bref\s+(\S+)";

/// Extract the token following the first `REF` marker, if any.
pub fn ref_target_token(content: &str) -> Option<&str> {
    let re = regex::Regex::new(REF_MARKER_PATTERN).ok()?;
    re.captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Resolve the first `REF` marker in `content` to a speaker ID in `round`.
pub fn resolve_ref_shortcut(content: &str, round: &DebateRound) -> Option<String> {
    let token = ref_target_token(content)?;
    round.speaker_by_name(token).map(|s| s.id.clone())
}
