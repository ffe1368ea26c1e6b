//! Plain-text rendering of a round's flow.

use std::fmt::Write;

use crate::model::{DebateRound, RoundStatus};

/// Characters of an ID shown in text output.
pub const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Render the round speaker by speaker, with each note's links.
pub fn round_to_text(round: &DebateRound) -> String {
    let mut out = String::new();
    let status = match round.status {
        RoundStatus::InProgress => "in progress",
        RoundStatus::Completed => "completed",
    };
    let _ = writeln!(out, "{} [{}]", round.topic, status);
    let _ = writeln!(out, "Updated {}", round.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));

    if round.speakers.is_empty() {
        let _ = writeln!(out, "\n(no speakers)");
        return out;
    }

    for speaker in round.speakers_in_order() {
        let _ = writeln!(
            out,
            "\n#{} {} [{}]",
            speaker.order,
            speaker.display_name_with_side(),
            short_id(&speaker.id)
        );
        if speaker.arguments.is_empty() {
            let _ = writeln!(out, "  (no notes)");
        }
        for argument in &speaker.arguments {
            let kind = argument
                .kind
                .map(|k| format!("{}: ", k.as_str()))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "  [{}] {}{}",
                short_id(&argument.id),
                kind,
                argument.content.trim()
            );
            for target in &argument.refutes {
                let _ = writeln!(out, "      -> refutes {}", short_id(target));
            }
            for source in &argument.refuted_by {
                let _ = writeln!(out, "      <- refuted by {}", short_id(source));
            }
            if let Some(target) = argument
                .refutes_speaker
                .as_deref()
                .and_then(|id| round.speaker(id))
            {
                let _ = writeln!(out, "      => refutes speaker {}", target.name);
            }
        }
    }
    out
}
