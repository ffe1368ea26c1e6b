//! cdflow core library
//!
//! Flow keeping for Congressional Debate rounds: the debate store and its
//! persistence, refutation highlighting and connector layout, the REF
//! shortcut, and AI round summaries.

pub mod config;
pub mod error;
pub mod export;
pub mod highlight;
pub mod layout;
pub mod lines;
pub mod model;
pub mod persist;
pub mod shortcut;
pub mod store;
pub mod summary;

pub use config::Config;
pub use error::{FlowError, ProviderError, StorageError, SummaryError};
pub use highlight::{Highlight, HighlightEngine, compute_highlight};
pub use layout::{LayoutEvent, LayoutNode, LayoutSource, PositionMap, PositionTracker, Rect};
pub use lines::{Connector, connectors};
pub use model::{
    Argument, ArgumentType, ArgumentUpdate, DebateRound, LinkKind, NewArgument, NewSpeaker,
    RefutationLink, RoundStatus, Side, Speaker, SpeakerUpdate,
};
pub use persist::{JsonFileStorage, MemoryStorage, PersistedState, StateStorage, UiFlag, UiFlags};
pub use store::{DebateStore, StoreEvent, SubscriptionId};
pub use summary::{DebateSummary, SummaryPanel, SummaryProvider, SummaryService};
