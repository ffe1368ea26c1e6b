//! AI round summaries.

pub mod pacing;
pub mod panel;
pub mod parse;
pub mod provider;
pub mod request;
pub mod service;
pub mod types;

pub use pacing::{Clock, ManualClock, Pacer, PacerState, PacingConfig, Permit, SystemClock};
pub use panel::SummaryPanel;
pub use parse::{extract_json, parse_summary};
pub use provider::{DEFAULT_API_BASE, OpenAiSummaryProvider, ScriptedProvider, SummaryProvider};
pub use request::{FlowedArgument, SummaryPrompt, SummaryRequest};
pub use service::{SummaryService, TriggerStatus};
pub use types::{ClashArea, ClashStatus, DebateSummary, MajorArgument};
