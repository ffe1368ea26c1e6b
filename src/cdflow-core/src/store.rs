//! The debate store.
//!
//! Owns the current round and the archive of saved rounds. Every change to
//! the refutation graph goes through here so that `refutes` and `refuted_by`
//! stay mutual inverses. Mutations apply synchronously, bump the round's
//! `updated_at`, persist the whole state under one key, and notify
//! subscribers.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::Config;
use crate::error::FlowError;
use crate::model::{
    Argument, ArgumentUpdate, DebateRound, NewArgument, NewSpeaker, RefutationLink, RoundStatus,
    Side, Speaker, SpeakerUpdate,
};
use crate::persist::{
    JsonFileStorage, MemoryStorage, PersistedState, StateStorage, StorageExt, UiFlag, UiFlags,
};
use crate::shortcut::resolve_ref_shortcut;

/// Callback for store events.
pub type StoreCallback = Box<dyn Fn(&StoreEvent) + Send + Sync>;

/// Handle returned by [`DebateStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Events emitted after a mutation has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    DebateCreated { round_id: String },
    DebateArchived { round_id: String },
    DebateLoaded { round_id: String },
    SavedDebateDeleted { round_id: String },
    StatusChanged { status: RoundStatus },
    SpeakerAdded { speaker_id: String },
    SpeakerUpdated { speaker_id: String },
    SpeakerRemoved { speaker_id: String },
    ArgumentAdded { argument_id: String },
    ArgumentUpdated { argument_id: String },
    ArgumentMoved { argument_id: String, index: usize },
    ArgumentDeleted { argument_id: String },
    Linked { source: String, target: String },
    Unlinked { source: String, target: String },
    UiFlagsChanged,
}

/// Single source of truth for the current round and the archive.
pub struct DebateStore {
    state: PersistedState,
    storage: Arc<dyn StateStorage>,
    storage_key: String,
    min_topic_length: usize,
    /// Bumped on every applied mutation; identifies a snapshot.
    revision: u64,
    subscribers: Vec<(SubscriptionId, StoreCallback)>,
    next_subscription: u64,
    persist_error: Option<String>,
}

impl std::fmt::Debug for DebateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebateStore")
            .field("storage", &self.storage.name())
            .field("storage_key", &self.storage_key)
            .field("revision", &self.revision)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl DebateStore {
    /// Open a store over `storage`, loading whatever state is saved under `key`.
    pub fn open(
        storage: Arc<dyn StateStorage>,
        key: impl Into<String>,
        min_topic_length: usize,
    ) -> Result<Self, FlowError> {
        let storage_key = key.into();
        let state: PersistedState = storage.get(&storage_key)?.unwrap_or_default();

        tracing::debug!(
            backend = storage.name(),
            key = %storage_key,
            saved = state.saved_debates.len(),
            has_current = state.current_debate.is_some(),
            "Loaded debate state"
        );

        Ok(Self {
            state,
            storage,
            storage_key,
            min_topic_length,
            revision: 0,
            subscribers: Vec::new(),
            next_subscription: 0,
            persist_error: None,
        })
    }

    /// Open the file-backed store described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, FlowError> {
        let storage = Arc::new(JsonFileStorage::new(&config.storage.dir));
        Self::open(storage, config.storage.key.clone(), config.round.min_topic_length)
    }

    /// Store that keeps everything in memory.
    pub fn in_memory() -> Self {
        Self {
            state: PersistedState::default(),
            storage: Arc::new(MemoryStorage::new()),
            storage_key: "debate-flow-state".to_string(),
            min_topic_length: Config::default().round.min_topic_length,
            revision: 0,
            subscribers: Vec::new(),
            next_subscription: 0,
            persist_error: None,
        }
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    pub fn subscribe(&mut self, callback: StoreCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, callback));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    // ------------------------------------------------------------------
    // Round lifecycle
    // ------------------------------------------------------------------

    /// Start a new round, archiving the current one if it has speakers.
    pub fn create_debate(&mut self, topic: &str) -> Result<String, FlowError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(FlowError::EmptyTopic);
        }
        let length = topic.chars().count();
        if length < self.min_topic_length {
            return Err(FlowError::TopicTooShort {
                min: self.min_topic_length,
                actual: length,
            });
        }

        if self
            .state
            .current_debate
            .as_ref()
            .is_some_and(|round| !round.speakers.is_empty())
        {
            self.archive_current();
        }

        let round = DebateRound::new(topic);
        let round_id = round.id.clone();
        self.state.current_debate = Some(round);
        tracing::debug!(round_id = %round_id, "Created debate");
        self.commit(StoreEvent::DebateCreated {
            round_id: round_id.clone(),
        });
        Ok(round_id)
    }

    /// Copy the current round into the archive without replacing it.
    pub fn save_current(&mut self) -> bool {
        match self.archive_current() {
            Some(round_id) => {
                self.commit(StoreEvent::DebateArchived { round_id });
                true
            }
            None => false,
        }
    }

    /// Make a saved round current, archiving the displaced round first.
    ///
    /// Reloading the round that is already current keeps its unsaved edits,
    /// since archiving updates the saved copy in place.
    pub fn load_debate(&mut self, round_id: &str) -> Result<(), FlowError> {
        if !self.state.saved_debates.iter().any(|r| r.id == round_id) {
            return Err(FlowError::RoundNotFound(round_id.to_string()));
        }

        if self
            .state
            .current_debate
            .as_ref()
            .is_some_and(|cur| !cur.speakers.is_empty())
        {
            self.archive_current();
        }

        let round = self
            .state
            .saved_debates
            .iter()
            .find(|r| r.id == round_id)
            .cloned()
            .ok_or_else(|| FlowError::RoundNotFound(round_id.to_string()))?;
        self.state.current_debate = Some(round);
        self.commit(StoreEvent::DebateLoaded {
            round_id: round_id.to_string(),
        });
        Ok(())
    }

    /// Remove a round from the archive; clears current if it is the same round.
    pub fn delete_saved(&mut self, round_id: &str) -> bool {
        let before = self.state.saved_debates.len();
        self.state.saved_debates.retain(|r| r.id != round_id);
        let removed = self.state.saved_debates.len() != before;

        let was_current = self
            .state
            .current_debate
            .as_ref()
            .is_some_and(|cur| cur.id == round_id);
        if was_current {
            self.state.current_debate = None;
        }

        if removed || was_current {
            self.commit(StoreEvent::SavedDebateDeleted {
                round_id: round_id.to_string(),
            });
        }
        removed || was_current
    }

    pub fn set_status(&mut self, status: RoundStatus) -> bool {
        let Some(round) = self.state.current_debate.as_mut() else {
            return false;
        };
        if round.status == status {
            return false;
        }
        round.status = status;
        round.touch();
        self.commit(StoreEvent::StatusChanged { status });
        true
    }

    pub fn complete_debate(&mut self) -> bool {
        self.set_status(RoundStatus::Completed)
    }

    // ------------------------------------------------------------------
    // Speakers
    // ------------------------------------------------------------------

    /// Add a speaker. `Ok(None)` when there is no current round.
    pub fn add_speaker(&mut self, speaker: NewSpeaker) -> Result<Option<String>, FlowError> {
        let Some(round) = self.state.current_debate.as_mut() else {
            return Ok(None);
        };

        let name = validate_speaker_name(round, &speaker.name, None)?;
        let order = speaker.order.unwrap_or_else(|| {
            round
                .speakers
                .iter()
                .filter(|s| s.side == speaker.side)
                .map(|s| s.order)
                .max()
                .unwrap_or(0)
                + 1
        });

        let new = Speaker::new(name, speaker.side, order);
        let speaker_id = new.id.clone();
        round.speakers.push(new);
        round.touch();

        tracing::debug!(speaker_id = %speaker_id, side = %speaker.side, "Added speaker");
        self.commit(StoreEvent::SpeakerAdded {
            speaker_id: speaker_id.clone(),
        });
        Ok(Some(speaker_id))
    }

    /// Remove a speaker, their arguments, and every link that touched them.
    pub fn remove_speaker(&mut self, speaker_id: &str) -> bool {
        let Some(round) = self.state.current_debate.as_mut() else {
            return false;
        };
        let Some(index) = round.speakers.iter().position(|s| s.id == speaker_id) else {
            return false;
        };

        let removed = round.speakers.remove(index);
        let gone: HashSet<&str> = removed.arguments.iter().map(|a| a.id.as_str()).collect();

        for argument in round.arguments_mut() {
            argument.refutes.retain(|id| !gone.contains(id.as_str()));
            argument.refuted_by.retain(|id| !gone.contains(id.as_str()));
            if argument.refutes_speaker.as_deref() == Some(speaker_id) {
                argument.refutes_speaker = None;
            }
        }
        round.touch();

        tracing::debug!(
            speaker_id = %speaker_id,
            arguments = removed.arguments.len(),
            "Removed speaker"
        );
        self.commit(StoreEvent::SpeakerRemoved {
            speaker_id: speaker_id.to_string(),
        });
        true
    }

    pub fn update_speaker(
        &mut self,
        speaker_id: &str,
        update: SpeakerUpdate,
    ) -> Result<bool, FlowError> {
        let Some(round) = self.state.current_debate.as_mut() else {
            return Ok(false);
        };
        if round.speaker(speaker_id).is_none() {
            return Ok(false);
        }

        let name = match update.name.as_deref() {
            Some(name) => Some(validate_speaker_name(round, name, Some(speaker_id))?),
            None => None,
        };

        if let Some(speaker) = round.speaker_mut(speaker_id) {
            if let Some(name) = name {
                speaker.name = name;
            }
            if let Some(side) = update.side {
                speaker.side = side;
            }
            if let Some(order) = update.order {
                speaker.order = order;
            }
        }
        round.touch();

        self.commit(StoreEvent::SpeakerUpdated {
            speaker_id: speaker_id.to_string(),
        });
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Arguments
    // ------------------------------------------------------------------

    /// Append a note under a speaker. `None` if the round or speaker is missing.
    pub fn add_argument(&mut self, speaker_id: &str, fields: NewArgument) -> Option<String> {
        let round = self.state.current_debate.as_mut()?;
        let refutes_speaker = fields
            .refutes_speaker
            .filter(|id| round.speaker(id).is_some());
        let speaker = round.speaker_mut(speaker_id)?;

        let mut argument = Argument::new(speaker_id, fields.content);
        argument.kind = fields.kind;
        argument.refutes_speaker = refutes_speaker;
        let argument_id = argument.id.clone();
        speaker.arguments.push(argument);
        round.touch();

        self.commit(StoreEvent::ArgumentAdded {
            argument_id: argument_id.clone(),
        });
        Some(argument_id)
    }

    /// Merge `update` into a note. A `refutes_speaker` naming an unknown
    /// speaker is ignored.
    pub fn update_argument(&mut self, argument_id: &str, update: ArgumentUpdate) -> bool {
        let Some(round) = self.state.current_debate.as_mut() else {
            return false;
        };
        let refutes_speaker = match update.refutes_speaker {
            Some(Some(id)) if round.speaker(&id).is_none() => {
                tracing::debug!(speaker_id = %id, "Ignoring REF to unknown speaker");
                None
            }
            other => other,
        };
        let Some(argument) = round.argument_mut(argument_id) else {
            return false;
        };

        if let Some(content) = update.content {
            argument.content = content;
        }
        if let Some(kind) = update.kind {
            argument.kind = kind;
        }
        if let Some(refutes_speaker) = refutes_speaker {
            argument.refutes_speaker = refutes_speaker;
        }
        round.touch();

        self.commit(StoreEvent::ArgumentUpdated {
            argument_id: argument_id.to_string(),
        });
        true
    }

    /// Commit edited note text, re-resolving any `REF <name>` marker in it.
    pub fn commit_argument_content(&mut self, argument_id: &str, content: &str) -> bool {
        let refutes_speaker = match self.state.current_debate.as_ref() {
            Some(round) => resolve_ref_shortcut(content, round),
            None => return false,
        };

        self.update_argument(
            argument_id,
            ArgumentUpdate {
                content: Some(content.to_string()),
                kind: None,
                refutes_speaker: Some(refutes_speaker),
            },
        )
    }

    /// Reposition a note within its speaker's sequence. The index is clamped.
    pub fn move_argument(&mut self, argument_id: &str, new_index: usize) -> bool {
        let Some(round) = self.state.current_debate.as_mut() else {
            return false;
        };
        let Some((speaker, from)) = round.speakers.iter_mut().find_map(|s| {
            s.arguments
                .iter()
                .position(|a| a.id == argument_id)
                .map(|i| (s, i))
        }) else {
            return false;
        };

        let to = new_index.min(speaker.arguments.len() - 1);
        if from == to {
            return false;
        }
        let argument = speaker.arguments.remove(from);
        speaker.arguments.insert(to, argument);
        round.touch();

        self.commit(StoreEvent::ArgumentMoved {
            argument_id: argument_id.to_string(),
            index: to,
        });
        true
    }

    /// Delete a note and scrub its ID from every other note's link sets.
    pub fn delete_argument(&mut self, argument_id: &str) -> bool {
        let Some(round) = self.state.current_debate.as_mut() else {
            return false;
        };

        let mut found = false;
        for speaker in &mut round.speakers {
            let before = speaker.arguments.len();
            speaker.arguments.retain(|a| a.id != argument_id);
            if speaker.arguments.len() != before {
                found = true;
                break;
            }
        }
        if !found {
            return false;
        }

        for argument in round.arguments_mut() {
            argument.refutes.remove(argument_id);
            argument.refuted_by.remove(argument_id);
        }
        round.touch();

        self.commit(StoreEvent::ArgumentDeleted {
            argument_id: argument_id.to_string(),
        });
        true
    }

    // ------------------------------------------------------------------
    // Refutation links
    // ------------------------------------------------------------------

    /// Record that `source` rebuts `target`. Returns whether anything changed.
    pub fn link_refutation(&mut self, source: &str, target: &str) -> Result<bool, FlowError> {
        if source == target {
            return Err(FlowError::SelfRefutation(source.to_string()));
        }
        let Some(round) = self.state.current_debate.as_mut() else {
            return Ok(false);
        };
        if !apply_link(round, source, target) {
            return Ok(false);
        }
        round.touch();

        tracing::debug!(source = %source, target = %target, "Linked refutation");
        self.commit(StoreEvent::Linked {
            source: source.to_string(),
            target: target.to_string(),
        });
        Ok(true)
    }

    /// Remove the pair recorded by [`link_refutation`](Self::link_refutation).
    pub fn unlink_refutation(&mut self, source: &str, target: &str) -> bool {
        let Some(round) = self.state.current_debate.as_mut() else {
            return false;
        };
        if !apply_unlink(round, source, target) {
            return false;
        }
        round.touch();

        self.commit(StoreEvent::Unlinked {
            source: source.to_string(),
            target: target.to_string(),
        });
        true
    }

    // ------------------------------------------------------------------
    // UI flags
    // ------------------------------------------------------------------

    pub fn ui_flags(&self) -> UiFlags {
        self.state.ui
    }

    pub fn set_ui_flag(&mut self, flag: UiFlag, value: bool) {
        if self.state.ui.get(flag) == value {
            return;
        }
        self.state.ui.set(flag, value);
        self.commit(StoreEvent::UiFlagsChanged);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn current(&self) -> Option<&DebateRound> {
        self.state.current_debate.as_ref()
    }

    pub fn saved_rounds(&self) -> &[DebateRound] {
        &self.state.saved_debates
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    /// Identifies the current snapshot; changes on every applied mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get_argument_by_id(&self, argument_id: &str) -> Option<&Argument> {
        self.current()?.argument(argument_id)
    }

    pub fn get_speaker_by_id(&self, speaker_id: &str) -> Option<&Speaker> {
        self.current()?.speaker(speaker_id)
    }

    pub fn get_speaker_arguments(&self, speaker_id: &str) -> &[Argument] {
        self.get_speaker_by_id(speaker_id)
            .map(|s| s.arguments.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_arguments_by_side(&self, side: Side) -> Vec<&Argument> {
        match self.current() {
            Some(round) => round
                .speakers_in_order()
                .into_iter()
                .filter(|s| s.side == side)
                .flat_map(|s| s.arguments.iter())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn get_refutation_links(&self) -> Vec<RefutationLink> {
        self.current()
            .map(DebateRound::refutation_links)
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Last persistence failure, if the most recent save did not go through.
    pub fn persist_error(&self) -> Option<&str> {
        self.persist_error.as_deref()
    }

    /// Write the state now, surfacing any failure.
    pub fn save_now(&mut self) -> Result<(), FlowError> {
        match self.storage.set(&self.storage_key, &self.state) {
            Ok(()) => {
                self.persist_error = None;
                Ok(())
            }
            Err(e) => {
                self.persist_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    fn archive_current(&mut self) -> Option<String> {
        let round = self.state.current_debate.clone()?;
        let round_id = round.id.clone();
        match self
            .state
            .saved_debates
            .iter_mut()
            .find(|saved| saved.id == round.id)
        {
            Some(saved) => *saved = round,
            None => self.state.saved_debates.push(round),
        }
        tracing::debug!(round_id = %round_id, "Archived debate");
        Some(round_id)
    }

    fn commit(&mut self, event: StoreEvent) {
        self.revision += 1;
        if let Err(e) = self.save_now() {
            tracing::warn!(error = %e, key = %self.storage_key, "Failed to persist debate state");
        }
        for (_, callback) in &self.subscribers {
            callback(&event);
        }
    }
}

fn validate_speaker_name(
    round: &DebateRound,
    name: &str,
    except: Option<&str>,
) -> Result<String, FlowError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FlowError::EmptySpeakerName);
    }
    if let Some(existing) = round.speaker_by_name(name) {
        if Some(existing.id.as_str()) != except {
            return Err(FlowError::DuplicateSpeakerName(name.to_string()));
        }
    }
    Ok(name.to_string())
}

/// Add both halves of a link. False when either end is missing or the link
/// was already complete.
fn apply_link(round: &mut DebateRound, source: &str, target: &str) -> bool {
    if round.argument(source).is_none() || round.argument(target).is_none() {
        return false;
    }
    let mut changed = false;
    if let Some(src) = round.argument_mut(source) {
        changed |= src.refutes.insert(target.to_string());
    }
    if let Some(tgt) = round.argument_mut(target) {
        changed |= tgt.refuted_by.insert(source.to_string());
    }
    changed
}

fn apply_unlink(round: &mut DebateRound, source: &str, target: &str) -> bool {
    let mut changed = false;
    if let Some(src) = round.argument_mut(source) {
        changed |= src.refutes.remove(target);
    }
    if let Some(tgt) = round.argument_mut(target) {
        changed |= tgt.refuted_by.remove(source);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use std::sync::Mutex;

    const TOPIC: &str = "A Bill to Expand Public Transit";

    fn assert_links_symmetric(round: &DebateRound) {
        for a in round.arguments() {
            for target in &a.refutes {
                let b = round.argument(target).expect("dangling refutes entry");
                assert!(b.refuted_by.contains(&a.id), "{} -> {} missing inverse", a.id, b.id);
            }
            for source in &a.refuted_by {
                let b = round.argument(source).expect("dangling refuted_by entry");
                assert!(b.refutes.contains(&a.id), "{} <- {} missing inverse", a.id, b.id);
            }
        }
    }

    fn store_with_two_speakers() -> (DebateStore, String, String) {
        let mut store = DebateStore::in_memory();
        store.create_debate(TOPIC).unwrap();
        let s1 = store
            .add_speaker(NewSpeaker::new("Avery", Side::Affirmative))
            .unwrap()
            .unwrap();
        let s2 = store
            .add_speaker(NewSpeaker::new("Blake", Side::Negative))
            .unwrap()
            .unwrap();
        (store, s1, s2)
    }

    #[test]
    fn test_create_debate_validates_topic() {
        let mut store = DebateStore::in_memory();
        assert!(matches!(store.create_debate("   "), Err(FlowError::EmptyTopic)));
        assert!(matches!(
            store.create_debate("abc"),
            Err(FlowError::TopicTooShort { min: 5, actual: 3 })
        ));
        assert!(store.current().is_none());

        store.create_debate(TOPIC).unwrap();
        let round = store.current().unwrap();
        assert_eq!(round.topic, TOPIC);
        assert_eq!(round.status, RoundStatus::InProgress);
        assert!(round.speakers.is_empty());
    }

    #[test]
    fn test_new_debate_archives_round_with_speakers() {
        let (mut store, _, _) = store_with_two_speakers();
        let first = store.current().unwrap().id.clone();
        assert!(store.saved_rounds().is_empty());

        store.create_debate("new topic, long enough").unwrap();
        assert_eq!(store.saved_rounds().len(), 1);
        assert_eq!(store.saved_rounds()[0].id, first);
        assert_eq!(store.saved_rounds()[0].speakers.len(), 2);
        assert!(store.current().unwrap().speakers.is_empty());
    }

    #[test]
    fn test_new_debate_skips_archiving_empty_round() {
        let mut store = DebateStore::in_memory();
        store.create_debate(TOPIC).unwrap();
        store.create_debate("Another empty topic").unwrap();
        assert!(store.saved_rounds().is_empty());
    }

    #[test]
    fn test_rearchiving_updates_in_place() {
        let (mut store, s1, _) = store_with_two_speakers();
        let round_id = store.current().unwrap().id.clone();
        assert!(store.save_current());
        store.add_argument(&s1, NewArgument::with_content("later note"));
        assert!(store.save_current());

        assert_eq!(store.saved_rounds().len(), 1);
        assert_eq!(store.saved_rounds()[0].id, round_id);
        assert_eq!(store.saved_rounds()[0].arguments().count(), 1);
    }

    #[test]
    fn test_load_debate_archives_displaced_round() {
        let (mut store, _, _) = store_with_two_speakers();
        let first = store.current().unwrap().id.clone();
        store.create_debate("Second round topic").unwrap();
        let second = store.current().unwrap().id.clone();
        store
            .add_speaker(NewSpeaker::new("Casey", Side::Affirmative))
            .unwrap();

        store.load_debate(&first).unwrap();
        assert_eq!(store.current().unwrap().id, first);
        assert!(store.saved_rounds().iter().any(|r| r.id == second));

        assert!(matches!(
            store.load_debate("missing"),
            Err(FlowError::RoundNotFound(_))
        ));
    }

    #[test]
    fn test_reloading_current_round_keeps_unsaved_edits() {
        let (mut store, s1, _) = store_with_two_speakers();
        let round_id = store.current().unwrap().id.clone();
        assert!(store.save_current());
        store.add_argument(&s1, NewArgument::with_content("added after save"));

        store.load_debate(&round_id).unwrap();
        assert_eq!(store.get_speaker_arguments(&s1).len(), 1);
        let saved = store
            .saved_rounds()
            .iter()
            .find(|r| r.id == round_id)
            .unwrap();
        assert_eq!(saved, store.current().unwrap());
        assert_eq!(store.saved_rounds().len(), 1);
    }

    #[test]
    fn test_delete_saved_clears_matching_current() {
        let (mut store, _, _) = store_with_two_speakers();
        let round_id = store.current().unwrap().id.clone();
        store.save_current();

        assert!(store.delete_saved(&round_id));
        assert!(store.saved_rounds().is_empty());
        assert!(store.current().is_none());
        assert!(!store.delete_saved(&round_id));
    }

    #[test]
    fn test_speaker_operations_without_round_are_noops() {
        let mut store = DebateStore::in_memory();
        assert_eq!(
            store
                .add_speaker(NewSpeaker::new("Avery", Side::Affirmative))
                .unwrap(),
            None
        );
        assert!(!store.remove_speaker("nope"));
        assert!(store.add_argument("nope", NewArgument::default()).is_none());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_duplicate_speaker_name_is_rejected_case_insensitively() {
        let (mut store, s1, _) = store_with_two_speakers();
        let err = store
            .add_speaker(NewSpeaker::new("avery", Side::Negative))
            .unwrap_err();
        assert!(matches!(err, FlowError::DuplicateSpeakerName(_)));
        assert_eq!(store.current().unwrap().speakers.len(), 2);

        // Renaming to your own name (different case) is fine.
        assert!(store
            .update_speaker(
                &s1,
                SpeakerUpdate {
                    name: Some("AVERY".to_string()),
                    ..Default::default()
                }
            )
            .unwrap());
        assert_eq!(store.get_speaker_by_id(&s1).unwrap().name, "AVERY");
    }

    #[test]
    fn test_speaker_order_defaults_per_side() {
        let (mut store, _, _) = store_with_two_speakers();
        let s3 = store
            .add_speaker(NewSpeaker::new("Casey", Side::Affirmative))
            .unwrap()
            .unwrap();
        assert_eq!(store.get_speaker_by_id(&s3).unwrap().order, 2);
    }

    #[test]
    fn test_add_argument_defaults() {
        let (mut store, s1, _) = store_with_two_speakers();
        let id = store.add_argument(&s1, NewArgument::default()).unwrap();
        let arg = store.get_argument_by_id(&id).unwrap();
        assert_eq!(arg.speaker_id, s1);
        assert!(arg.content.is_empty());
        assert!(arg.refutes.is_empty() && arg.refuted_by.is_empty());
        assert_eq!(store.get_speaker_arguments(&s1).len(), 1);
        assert!(store.add_argument("unknown", NewArgument::default()).is_none());
    }

    #[test]
    fn test_link_is_symmetric_and_idempotent() {
        let (mut store, s1, s2) = store_with_two_speakers();
        let a = store.add_argument(&s1, NewArgument::with_content("A")).unwrap();
        let b = store.add_argument(&s2, NewArgument::with_content("B")).unwrap();

        assert!(store.link_refutation(&a, &b).unwrap());
        let snapshot = store.current().unwrap().speakers.clone();
        assert!(!store.link_refutation(&a, &b).unwrap());
        assert_eq!(store.current().unwrap().speakers, snapshot);
        assert_links_symmetric(store.current().unwrap());
        assert!(store.get_argument_by_id(&b).unwrap().refuted_by.contains(&a));

        assert!(store.unlink_refutation(&a, &b));
        assert!(!store.unlink_refutation(&a, &b));
        assert!(store.get_refutation_links().is_empty());
        assert_links_symmetric(store.current().unwrap());
    }

    #[test]
    fn test_self_link_is_rejected() {
        let (mut store, s1, _) = store_with_two_speakers();
        let a = store.add_argument(&s1, NewArgument::with_content("A")).unwrap();
        let err = store.link_refutation(&a, &a).unwrap_err();
        assert!(matches!(err, FlowError::SelfRefutation(_)));
        assert!(store.get_argument_by_id(&a).unwrap().refutes.is_empty());
    }

    #[test]
    fn test_link_to_missing_argument_is_noop() {
        let (mut store, s1, _) = store_with_two_speakers();
        let a = store.add_argument(&s1, NewArgument::with_content("A")).unwrap();
        assert!(!store.link_refutation(&a, "gone").unwrap());
        assert!(store.get_argument_by_id(&a).unwrap().refutes.is_empty());
    }

    #[test]
    fn test_mixed_operations_keep_graph_consistent() {
        let (mut store, s1, s2) = store_with_two_speakers();
        let s3 = store
            .add_speaker(NewSpeaker::new("Casey", Side::Affirmative))
            .unwrap()
            .unwrap();
        let mut speakers = vec![s1, s2, s3];

        // Fixed LCG so the sequence is the same on every run.
        let mut seed: u64 = 0x5eed;
        let mut next = |bound: usize| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as usize % bound.max(1)
        };

        for step in 0..300 {
            let ids: Vec<String> = store
                .current()
                .unwrap()
                .arguments()
                .map(|a| a.id.clone())
                .collect();
            match next(10) {
                0..=2 if !speakers.is_empty() => {
                    let speaker = speakers[next(speakers.len())].clone();
                    let refutes = speakers.get(next(speakers.len())).cloned();
                    store.add_argument(
                        &speaker,
                        NewArgument {
                            content: format!("note {}", step),
                            refutes_speaker: refutes,
                            ..Default::default()
                        },
                    );
                }
                3..=5 if !ids.is_empty() => {
                    let source = &ids[next(ids.len())];
                    let target = &ids[next(ids.len())];
                    let _ = store.link_refutation(source, target);
                }
                6 | 7 if !ids.is_empty() => {
                    let source = &ids[next(ids.len())];
                    let target = &ids[next(ids.len())];
                    store.unlink_refutation(source, target);
                }
                8 if !ids.is_empty() => {
                    store.delete_argument(&ids[next(ids.len())]);
                }
                _ => {}
            }
            if step % 100 == 99 {
                let speaker = speakers.remove(next(speakers.len()));
                assert!(store.remove_speaker(&speaker));
            }

            let round = store.current().unwrap();
            assert_links_symmetric(round);
            for argument in round.arguments() {
                assert!(round.speaker(&argument.speaker_id).is_some());
                if let Some(target) = &argument.refutes_speaker {
                    assert!(round.speaker(target).is_some(), "step {}: dangling REF", step);
                }
            }
        }
    }

    #[test]
    fn test_delete_argument_scrubs_links() {
        let (mut store, s1, s2) = store_with_two_speakers();
        let a = store.add_argument(&s1, NewArgument::with_content("A")).unwrap();
        let b = store.add_argument(&s2, NewArgument::with_content("B")).unwrap();
        let c = store.add_argument(&s2, NewArgument::with_content("C")).unwrap();
        store.link_refutation(&a, &b).unwrap();
        store.link_refutation(&c, &a).unwrap();

        assert!(store.delete_argument(&a));
        assert!(!store.delete_argument(&a));
        let round = store.current().unwrap();
        assert!(round.argument(&b).unwrap().refuted_by.is_empty());
        assert!(round.argument(&c).unwrap().refutes.is_empty());
        assert_links_symmetric(round);
    }

    #[test]
    fn test_remove_speaker_cascades() {
        let (mut store, s1, s2) = store_with_two_speakers();
        let a1 = store.add_argument(&s1, NewArgument::with_content("A1")).unwrap();
        store.add_argument(&s1, NewArgument::with_content("A2")).unwrap();
        let b1 = store
            .add_argument(
                &s2,
                NewArgument {
                    content: "B1".to_string(),
                    refutes_speaker: Some(s1.clone()),
                    ..Default::default()
                },
            )
            .unwrap();
        store.link_refutation(&a1, &b1).unwrap();

        assert!(store.remove_speaker(&s1));
        let round = store.current().unwrap();
        let b1 = round.argument(&b1).unwrap();
        assert!(b1.refuted_by.is_empty());
        assert_eq!(b1.refutes_speaker, None);
        assert!(round.arguments().all(|a| a.speaker_id != s1));
        assert_links_symmetric(round);
        assert!(!store.remove_speaker(&s1));
    }

    #[test]
    fn test_update_argument_merges_fields() {
        let (mut store, s1, s2) = store_with_two_speakers();
        let a = store.add_argument(&s1, NewArgument::with_content("draft")).unwrap();
        assert!(store.update_argument(
            &a,
            ArgumentUpdate {
                content: Some("final".to_string()),
                kind: Some(Some(crate::model::ArgumentType::Evidence)),
                refutes_speaker: Some(Some(s2.clone())),
            }
        ));
        let arg = store.get_argument_by_id(&a).unwrap();
        assert_eq!(arg.content, "final");
        assert_eq!(arg.kind, Some(crate::model::ArgumentType::Evidence));
        assert_eq!(arg.refutes_speaker.as_deref(), Some(s2.as_str()));
        assert!(!store.update_argument("missing", ArgumentUpdate::default()));
    }

    #[test]
    fn test_unknown_refuted_speaker_is_ignored() {
        let (mut store, s1, s2) = store_with_two_speakers();
        let a = store
            .add_argument(
                &s1,
                NewArgument {
                    content: "ghost".to_string(),
                    refutes_speaker: Some("no-such-speaker".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(store.get_argument_by_id(&a).unwrap().refutes_speaker, None);

        let refute = |id: &str| ArgumentUpdate {
            refutes_speaker: Some(Some(id.to_string())),
            ..Default::default()
        };
        store.update_argument(&a, refute(&s2));
        assert!(store.update_argument(&a, refute("no-such-speaker")));
        assert_eq!(
            store.get_argument_by_id(&a).unwrap().refutes_speaker.as_deref(),
            Some(s2.as_str())
        );
    }

    #[test]
    fn test_rename_keeps_speaker_refutations() {
        let (mut store, s1, s2) = store_with_two_speakers();
        let a = store.add_argument(&s1, NewArgument::default()).unwrap();
        store.commit_argument_content(&a, "REF Blake misreads the bill");

        let rename = SpeakerUpdate {
            name: Some("Blake Morgan".to_string()),
            ..Default::default()
        };
        assert!(store.update_speaker(&s2, rename).unwrap());

        let target = store
            .get_argument_by_id(&a)
            .and_then(|arg| arg.refutes_speaker.clone())
            .unwrap();
        assert_eq!(target, s2);
        assert_eq!(store.get_speaker_by_id(&target).unwrap().name, "Blake Morgan");
    }

    #[test]
    fn test_commit_content_resolves_ref_shortcut() {
        let (mut store, s1, s2) = store_with_two_speakers();
        let a = store.add_argument(&s1, NewArgument::default()).unwrap();

        store.commit_argument_content(&a, "REF blak overstated costs");
        assert_eq!(store.get_argument_by_id(&a).unwrap().refutes_speaker, None);

        store.commit_argument_content(&a, "REF blake overstated costs");
        assert_eq!(
            store.get_argument_by_id(&a).unwrap().refutes_speaker.as_deref(),
            Some(s2.as_str())
        );

        store.commit_argument_content(&a, "costs are overstated");
        assert_eq!(store.get_argument_by_id(&a).unwrap().refutes_speaker, None);
    }

    #[test]
    fn test_move_argument_reorders_within_speaker() {
        let (mut store, s1, _) = store_with_two_speakers();
        let a = store.add_argument(&s1, NewArgument::with_content("a")).unwrap();
        let b = store.add_argument(&s1, NewArgument::with_content("b")).unwrap();
        let c = store.add_argument(&s1, NewArgument::with_content("c")).unwrap();

        assert!(store.move_argument(&c, 0));
        let order: Vec<&str> = store
            .get_speaker_arguments(&s1)
            .iter()
            .map(|x| x.id.as_str())
            .collect();
        assert_eq!(order, vec![c.as_str(), a.as_str(), b.as_str()]);

        assert!(store.move_argument(&c, 99));
        assert_eq!(store.get_speaker_arguments(&s1)[2].id, c);
        assert!(!store.move_argument(&c, 5));
    }

    #[test]
    fn test_arguments_by_side() {
        let (mut store, s1, s2) = store_with_two_speakers();
        store.add_argument(&s1, NewArgument::with_content("aff")).unwrap();
        store.add_argument(&s2, NewArgument::with_content("neg")).unwrap();
        let aff = store.get_arguments_by_side(Side::Affirmative);
        assert_eq!(aff.len(), 1);
        assert_eq!(aff[0].content, "aff");
    }

    #[test]
    fn test_mutations_bump_updated_at_and_revision() {
        let (mut store, s1, _) = store_with_two_speakers();
        let before = store.current().unwrap().updated_at;
        let revision = store.revision();
        std::thread::sleep(std::time::Duration::from_millis(2));

        store.add_argument(&s1, NewArgument::default()).unwrap();
        assert!(store.current().unwrap().updated_at > before);
        assert_eq!(store.revision(), revision + 1);
    }

    #[test]
    fn test_subscribers_receive_events() {
        let (mut store, s1, _) = store_with_two_speakers();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = store.subscribe(Box::new(move |event: &StoreEvent| {
            sink.lock().unwrap().push(event.clone());
        }));

        let a = store.add_argument(&s1, NewArgument::default()).unwrap();
        assert!(store.unsubscribe(sub));
        store.delete_argument(&a);

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![StoreEvent::ArgumentAdded { argument_id: a }]);
    }

    #[test]
    fn test_state_round_trips_through_storage() {
        let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());
        let mut store = DebateStore::open(Arc::clone(&storage), "state", 5).unwrap();
        store.create_debate(TOPIC).unwrap();
        let s1 = store
            .add_speaker(NewSpeaker::new("Avery", Side::Affirmative))
            .unwrap()
            .unwrap();
        let s2 = store
            .add_speaker(NewSpeaker::new("Blake", Side::Negative))
            .unwrap()
            .unwrap();
        let a = store.add_argument(&s1, NewArgument::with_content("A")).unwrap();
        let b = store.add_argument(&s2, NewArgument::with_content("B")).unwrap();
        store.link_refutation(&b, &a).unwrap();
        store.set_ui_flag(UiFlag::ShowSummary, true);

        let reopened = DebateStore::open(storage, "state", 5).unwrap();
        assert_eq!(reopened.state(), store.state());
        assert_eq!(
            reopened.current().unwrap().updated_at,
            store.current().unwrap().updated_at
        );
        assert_eq!(reopened.get_refutation_links(), store.get_refutation_links());
        assert!(reopened.ui_flags().show_summary);
    }

    #[derive(Debug)]
    struct FailingStorage;

    impl StateStorage for FailingStorage {
        fn name(&self) -> &str {
            "failing"
        }

        fn set_value(&self, _key: &str, _value: serde_json::Value) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk full")))
        }

        fn get_value(&self, _key: &str) -> Result<Option<serde_json::Value>, StorageError> {
            Ok(None)
        }

        fn delete(&self, _key: &str) -> Result<bool, StorageError> {
            Ok(false)
        }
    }

    #[test]
    fn test_persist_failure_keeps_mutation_and_surfaces_error() {
        let mut store = DebateStore::open(Arc::new(FailingStorage), "state", 5).unwrap();
        store.create_debate(TOPIC).unwrap();

        assert!(store.current().is_some());
        assert!(store.persist_error().unwrap().contains("disk full"));
        assert!(matches!(store.save_now(), Err(FlowError::Storage(_))));
    }
}
