//! Hover highlighting for the refutation graph.
//!
//! Given the entity under the pointer, work out which edges to draw and which
//! other entities to emphasise. Incoming edges are restated from the hovered
//! entity's point of view so a renderer can always draw "my edges".

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::model::{DebateRound, LinkKind, RefutationLink, parse_speaker_key, speaker_key};
use crate::store::DebateStore;

/// Edges and entities to emphasise for one hovered entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlight {
    pub hovered: Option<String>,
    pub outgoing: Vec<RefutationLink>,
    pub incoming: Vec<RefutationLink>,
    /// Every endpoint of `outgoing` and `incoming` except the hovered entity.
    pub connected: BTreeSet<String>,
}

impl Highlight {
    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = &RefutationLink> {
        self.outgoing.iter().chain(self.incoming.iter())
    }

    pub fn is_connected(&self, entity_id: &str) -> bool {
        self.connected.contains(entity_id)
    }
}

/// Compute the highlight for `hovered` (argument ID or `speaker-` key).
pub fn compute_highlight(round: Option<&DebateRound>, hovered: Option<&str>) -> Highlight {
    let (Some(round), Some(hovered)) = (round, hovered) else {
        return Highlight::default();
    };

    let (outgoing, incoming) = match parse_speaker_key(hovered) {
        Some(speaker_id) => {
            if round.speaker(speaker_id).is_none() {
                return Highlight::default();
            }
            let incoming: Vec<RefutationLink> = round
                .arguments()
                .filter(|a| a.refutes_speaker.as_deref() == Some(speaker_id))
                .map(|a| RefutationLink {
                    source: a.id.clone(),
                    target: hovered.to_string(),
                    kind: LinkKind::RefutesSpeaker,
                })
                .collect();
            (Vec::new(), incoming)
        }
        None => {
            let Some(argument) = round.argument(hovered) else {
                return Highlight::default();
            };
            let links = round.refutation_links();

            let mut outgoing: Vec<RefutationLink> = links
                .iter()
                .filter(|l| l.source == hovered)
                .cloned()
                .collect();
            if let Some(speaker_id) = &argument.refutes_speaker {
                outgoing.push(RefutationLink {
                    source: hovered.to_string(),
                    target: speaker_key(speaker_id),
                    kind: LinkKind::RefutesSpeaker,
                });
            }

            let incoming: Vec<RefutationLink> = links
                .into_iter()
                .filter(|l| l.target == hovered)
                .map(|l| RefutationLink {
                    source: l.target,
                    target: l.source,
                    kind: LinkKind::RefutedBy,
                })
                .collect();
            (outgoing, incoming)
        }
    };

    let connected = outgoing
        .iter()
        .chain(incoming.iter())
        .flat_map(|l| [l.source.as_str(), l.target.as_str()])
        .filter(|id| *id != hovered)
        .map(str::to_string)
        .collect();

    Highlight {
        hovered: Some(hovered.to_string()),
        outgoing,
        incoming,
        connected,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SnapshotKey {
    round_id: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    revision: u64,
    hovered: Option<String>,
}

/// Memoising wrapper around [`compute_highlight`].
///
/// The cache is keyed on the store snapshot and the hovered ID, so any store
/// mutation or hover change forces a recompute while unrelated redraws reuse
/// the last result.
#[derive(Debug, Default)]
pub struct HighlightEngine {
    cache: Option<(SnapshotKey, Highlight)>,
    computations: u64,
}

impl HighlightEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highlight(&mut self, store: &DebateStore, hovered: Option<&str>) -> &Highlight {
        let round = store.current();
        let key = SnapshotKey {
            round_id: round.map(|r| r.id.clone()),
            updated_at: round.map(|r| r.updated_at),
            revision: store.revision(),
            hovered: hovered.map(str::to_string),
        };

        if self.cache.as_ref().is_some_and(|(cached, _)| *cached != key) {
            self.cache = None;
        }
        if self.cache.is_none() {
            self.computations += 1;
        }

        let (_, highlight) = self
            .cache
            .get_or_insert_with(|| (key, compute_highlight(round, hovered)));
        highlight
    }

    /// Number of times the highlight has actually been recomputed.
    pub fn computations(&self) -> u64 {
        self.computations
    }

    pub fn clear(&mut self) {
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArgumentUpdate, NewArgument, NewSpeaker, Side};

    struct Fixture {
        store: DebateStore,
        s1: String,
        s2: String,
        a: String,
        b: String,
        c: String,
    }

    /// A refutes B; C is unrelated.
    fn fixture() -> Fixture {
        let mut store = DebateStore::in_memory();
        store.create_debate("A Bill to Reform Zoning").unwrap();
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
        let c = store.add_argument(&s2, NewArgument::with_content("C")).unwrap();
        store.link_refutation(&a, &b).unwrap();
        Fixture { store, s1, s2, a, b, c }
    }

    #[test]
    fn test_nothing_hovered_is_empty() {
        let f = fixture();
        assert_eq!(compute_highlight(f.store.current(), None), Highlight::default());
        assert_eq!(
            compute_highlight(f.store.current(), Some("missing")),
            Highlight::default()
        );
        assert_eq!(
            compute_highlight(f.store.current(), Some("speaker-missing")),
            Highlight::default()
        );
        assert_eq!(compute_highlight(None, Some(&f.a)), Highlight::default());
    }

    #[test]
    fn test_hovering_source_shows_outgoing() {
        let f = fixture();
        let h = compute_highlight(f.store.current(), Some(&f.a));
        assert_eq!(
            h.outgoing,
            vec![RefutationLink {
                source: f.a.clone(),
                target: f.b.clone(),
                kind: LinkKind::Refutes,
            }]
        );
        assert!(h.incoming.is_empty());
        assert_eq!(h.connected, BTreeSet::from([f.b.clone()]));
    }

    #[test]
    fn test_hovering_target_restates_incoming() {
        let f = fixture();
        let h = compute_highlight(f.store.current(), Some(&f.b));
        assert!(h.outgoing.is_empty());
        assert_eq!(
            h.incoming,
            vec![RefutationLink {
                source: f.b.clone(),
                target: f.a.clone(),
                kind: LinkKind::RefutedBy,
            }]
        );
        assert_eq!(h.connected, BTreeSet::from([f.a.clone()]));
    }

    #[test]
    fn test_hovering_unrelated_is_empty() {
        let f = fixture();
        let h = compute_highlight(f.store.current(), Some(&f.c));
        assert!(h.is_empty());
        assert!(h.connected.is_empty());
        assert_eq!(h.hovered.as_deref(), Some(f.c.as_str()));
    }

    #[test]
    fn test_speaker_level_ref_edges() {
        let mut f = fixture();
        // X is owned by s1 and rebuts s2 wholesale.
        let x = f
            .store
            .add_argument(
                &f.s1,
                NewArgument {
                    content: "X".to_string(),
                    refutes_speaker: Some(f.s2.clone()),
                    ..Default::default()
                },
            )
            .unwrap();

        let h = compute_highlight(f.store.current(), Some(&x));
        let s2_key = speaker_key(&f.s2);
        assert!(h.outgoing.contains(&RefutationLink {
            source: x.clone(),
            target: s2_key.clone(),
            kind: LinkKind::RefutesSpeaker,
        }));
        assert!(h.is_connected(&s2_key));

        let h = compute_highlight(f.store.current(), Some(&s2_key));
        assert_eq!(
            h.incoming,
            vec![RefutationLink {
                source: x.clone(),
                target: s2_key.clone(),
                kind: LinkKind::RefutesSpeaker,
            }]
        );
        assert_eq!(h.connected, BTreeSet::from([x]));

        // Hovering the refuting argument's own speaker shows nothing.
        let h = compute_highlight(f.store.current(), Some(&speaker_key(&f.s1)));
        assert!(h.is_empty());
    }

    #[test]
    fn test_direct_and_speaker_refutation_are_not_deduplicated() {
        let mut f = fixture();
        let update = ArgumentUpdate {
            refutes_speaker: Some(Some(f.s2.clone())),
            ..Default::default()
        };
        f.store.update_argument(&f.a, update);

        let h = compute_highlight(f.store.current(), Some(&f.a));
        assert_eq!(h.outgoing.len(), 2);
        assert_eq!(h.connected.len(), 2);
    }

    #[test]
    fn test_engine_memoises_until_store_or_hover_changes() {
        let mut f = fixture();
        let mut engine = HighlightEngine::new();

        assert_eq!(engine.highlight(&f.store, Some(&f.a)).connected.len(), 1);
        engine.highlight(&f.store, Some(&f.a));
        assert_eq!(engine.computations(), 1);

        engine.highlight(&f.store, Some(&f.b));
        assert_eq!(engine.computations(), 2);

        f.store.link_refutation(&f.c, &f.b).unwrap();
        let h = engine.highlight(&f.store, Some(&f.b));
        assert_eq!(h.incoming.len(), 2);
        assert_eq!(engine.computations(), 3);
    }
}
