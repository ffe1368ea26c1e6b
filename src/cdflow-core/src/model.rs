//! Debate round data model.
//!
//! Speakers, the arguments they make, and the round that holds them. The
//! refutation graph lives inside the arguments themselves (`refutes` and its
//! inverse `refuted_by`); [`RefutationLink`] is only ever a derived view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Namespace prefix that keeps speaker IDs apart from argument IDs wherever
/// both share one key space (layout maps, highlight edges).
pub const SPEAKER_ID_PREFIX: &str = "speaker-";

/// Key under which a speaker appears in layout maps and highlight edges.
pub fn speaker_key(speaker_id: &str) -> String {
    format!("{}{}", SPEAKER_ID_PREFIX, speaker_id)
}

/// Strip the speaker namespace, returning the bare speaker ID.
pub fn parse_speaker_key(key: &str) -> Option<&str> {
    key.strip_prefix(SPEAKER_ID_PREFIX)
}

/// Generate a fresh opaque entity ID.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Side of the chamber a speaker argues for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Arguing in favor of the legislation.
    Affirmative,
    /// Arguing against the legislation.
    Negative,
}

impl Side {
    pub fn display_name(&self) -> &str {
        match self {
            Side::Affirmative => "AFF",
            Side::Negative => "NEG",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Affirmative => "affirmative",
            Side::Negative => "negative",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aff" | "affirmative" | "pro" => Ok(Side::Affirmative),
            "neg" | "negative" | "con" => Ok(Side::Negative),
            other => Err(format!("Unknown side '{}': expected aff or neg", other)),
        }
    }
}

/// Kind of speech segment a note was taken from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentType {
    Claim,
    Evidence,
    Impact,
    Rebuttal,
    Question,
    Answer,
}

impl ArgumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentType::Claim => "claim",
            ArgumentType::Evidence => "evidence",
            ArgumentType::Impact => "impact",
            ArgumentType::Rebuttal => "rebuttal",
            ArgumentType::Question => "question",
            ArgumentType::Answer => "answer",
        }
    }
}

impl fmt::Display for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArgumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "claim" => Ok(ArgumentType::Claim),
            "evidence" => Ok(ArgumentType::Evidence),
            "impact" => Ok(ArgumentType::Impact),
            "rebuttal" => Ok(ArgumentType::Rebuttal),
            "question" => Ok(ArgumentType::Question),
            "answer" => Ok(ArgumentType::Answer),
            other => Err(format!("Unknown argument type '{}'", other)),
        }
    }
}

/// A single recorded note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    pub id: String,
    /// Owning speaker.
    pub speaker_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ArgumentType>,
    /// Arguments this one rebuts.
    #[serde(default)]
    pub refutes: BTreeSet<String>,
    /// Arguments that rebut this one. Always the inverse of `refutes`.
    #[serde(default)]
    pub refuted_by: BTreeSet<String>,
    /// Speaker this argument rebuts wholesale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refutes_speaker: Option<String>,
}

impl Argument {
    pub fn new(speaker_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            speaker_id: speaker_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            kind: None,
            refutes: BTreeSet::new(),
            refuted_by: BTreeSet::new(),
            refutes_speaker: None,
        }
    }

    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// A participant on one side of the round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Speaker {
    pub id: String,
    pub name: String,
    pub side: Side,
    /// Speaking position, used for display sort.
    pub order: u32,
    /// Notes in display order.
    #[serde(default)]
    pub arguments: Vec<Argument>,
}

impl Speaker {
    pub fn new(name: impl Into<String>, side: Side, order: u32) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            side,
            order,
            arguments: Vec::new(),
        }
    }

    /// Get the full display name with side.
    pub fn display_name_with_side(&self) -> String {
        format!("{} ({})", self.name, self.side.display_name())
    }
}

/// Whether a round is still being flowed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RoundStatus {
    #[default]
    InProgress,
    Completed,
}

/// One complete debate transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DebateRound {
    pub id: String,
    /// The resolution under debate.
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub speakers: Vec<Speaker>,
    #[serde(default)]
    pub status: RoundStatus,
}

impl DebateRound {
    pub fn new(topic: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            topic: topic.into(),
            created_at: now,
            updated_at: now,
            speakers: Vec::new(),
            status: RoundStatus::InProgress,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn speaker(&self, speaker_id: &str) -> Option<&Speaker> {
        self.speakers.iter().find(|s| s.id == speaker_id)
    }

    pub fn speaker_mut(&mut self, speaker_id: &str) -> Option<&mut Speaker> {
        self.speakers.iter_mut().find(|s| s.id == speaker_id)
    }

    pub fn speaker_by_name(&self, name: &str) -> Option<&Speaker> {
        let wanted = name.to_lowercase();
        self.speakers.iter().find(|s| s.name.to_lowercase() == wanted)
    }

    pub fn argument(&self, argument_id: &str) -> Option<&Argument> {
        self.arguments().find(|a| a.id == argument_id)
    }

    pub fn argument_mut(&mut self, argument_id: &str) -> Option<&mut Argument> {
        self.speakers
            .iter_mut()
            .flat_map(|s| s.arguments.iter_mut())
            .find(|a| a.id == argument_id)
    }

    /// Every argument in the round, speaker by speaker.
    pub fn arguments(&self) -> impl Iterator<Item = &Argument> {
        self.speakers.iter().flat_map(|s| s.arguments.iter())
    }

    pub fn arguments_mut(&mut self) -> impl Iterator<Item = &mut Argument> {
        self.speakers.iter_mut().flat_map(|s| s.arguments.iter_mut())
    }

    /// Speakers sorted for display: affirmative first, then by speaking order.
    pub fn speakers_in_order(&self) -> Vec<&Speaker> {
        let mut speakers: Vec<&Speaker> = self.speakers.iter().collect();
        speakers.sort_by_key(|s| (s.side == Side::Negative, s.order));
        speakers
    }

    /// Flatten every argument's `refutes` set into one edge list.
    pub fn refutation_links(&self) -> Vec<RefutationLink> {
        self.arguments()
            .flat_map(|a| {
                a.refutes.iter().map(move |target| RefutationLink {
                    source: a.id.clone(),
                    target: target.clone(),
                    kind: LinkKind::Refutes,
                })
            })
            .collect()
    }

    pub fn has_summarizable_content(&self) -> bool {
        self.arguments().any(Argument::has_content)
    }
}

/// Relation carried by a [`RefutationLink`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    /// Source argument rebuts target argument.
    Refutes,
    /// Source argument is rebutted by target argument.
    RefutedBy,
    /// Argument rebuts a whole speaker; the speaker end uses [`speaker_key`].
    RefutesSpeaker,
}

/// Directed edge between two entities. Never stored, always derived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct RefutationLink {
    #[serde(rename = "sourceArgumentId")]
    pub source: String,
    #[serde(rename = "targetArgumentId")]
    pub target: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
}

/// Fields for a speaker being added.
#[derive(Debug, Clone)]
pub struct NewSpeaker {
    pub name: String,
    pub side: Side,
    /// Defaults to the next free position on that side.
    pub order: Option<u32>,
}

impl NewSpeaker {
    pub fn new(name: impl Into<String>, side: Side) -> Self {
        Self {
            name: name.into(),
            side,
            order: None,
        }
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
}

/// Shallow patch for a speaker.
#[derive(Debug, Clone, Default)]
pub struct SpeakerUpdate {
    pub name: Option<String>,
    pub side: Option<Side>,
    pub order: Option<u32>,
}

/// Fields for an argument being added.
#[derive(Debug, Clone, Default)]
pub struct NewArgument {
    pub content: String,
    pub kind: Option<ArgumentType>,
    pub refutes_speaker: Option<String>,
}

impl NewArgument {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: ArgumentType) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Shallow patch for an argument. The nested options clear a field with
/// `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct ArgumentUpdate {
    pub content: Option<String>,
    pub kind: Option<Option<ArgumentType>>,
    pub refutes_speaker: Option<Option<String>>,
}
