//! On-screen positions of flowed entities.
//!
//! The tracker observes whatever layout engine renders the flow (through
//! [`LayoutSource`]) and keeps a map from entity key to bounding box, relative
//! to the root container. Layout events only mark the map dirty; the actual
//! measurement happens at most once per animation frame.

use std::collections::{BTreeMap, HashMap};

use crate::model::{speaker_key, SPEAKER_ID_PREFIX};

/// Identifies a node in the rendered tree.
pub type NodeId = u64;

/// Entity key (argument ID or `speaker-` key) to bounding box.
pub type PositionMap = HashMap<String, Rect>;

/// Maps a rendered node to the entity it displays, if any.
pub type NodeMatcher = Box<dyn Fn(&LayoutNode) -> Option<String> + Send + Sync>;

/// Attribute the view puts on argument nodes.
pub const ARGUMENT_ATTRIBUTE: &str = "data-argument-id";
/// Attribute the view puts on speaker nodes.
pub const SPEAKER_ATTRIBUTE: &str = "data-speaker-id";

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    pub fn left_middle(&self) -> Point {
        Point {
            x: self.left(),
            y: self.y + self.height / 2.0,
        }
    }

    pub fn right_middle(&self) -> Point {
        Point {
            x: self.right(),
            y: self.y + self.height / 2.0,
        }
    }

    /// Same box expressed relative to `origin`'s top-left corner.
    pub fn relative_to(&self, origin: &Rect) -> Rect {
        Rect::new(self.x - origin.x, self.y - origin.y, self.width, self.height)
    }
}

/// A node in the rendered tree and its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutNode {
    pub id: NodeId,
    pub attributes: BTreeMap<String, String>,
}

impl LayoutNode {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Geometry provider for the tracker.
pub trait LayoutSource {
    /// Root container box, if it is laid out.
    fn container_rect(&self) -> Option<Rect>;

    /// Every node currently under the root container.
    fn nodes(&self) -> Vec<LayoutNode>;

    /// Current box of a node, if it is still laid out.
    fn node_rect(&self, node: NodeId) -> Option<Rect>;
}

/// Layout-affecting notifications from the rendering side.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutEvent {
    ContainerResized,
    NodeResized(NodeId),
    NodesAdded(Vec<LayoutNode>),
    NodesRemoved(Vec<NodeId>),
    ContainerScrolled,
    WindowScrolled,
    WindowResized,
}

/// Matcher reading an attribute verbatim.
pub fn attribute_matcher(attribute: &'static str) -> NodeMatcher {
    Box::new(move |node: &LayoutNode| node.attribute(attribute).map(str::to_string))
}

/// Live map from entity key to on-screen box.
pub struct PositionTracker<S: LayoutSource> {
    source: S,
    argument_matcher: NodeMatcher,
    speaker_matcher: NodeMatcher,
    observed: HashMap<NodeId, String>,
    positions: PositionMap,
    subscribed: bool,
    frame_pending: bool,
    updates: u64,
}

impl<S: LayoutSource> PositionTracker<S> {
    pub fn new(source: S, argument_matcher: NodeMatcher, speaker_matcher: NodeMatcher) -> Self {
        Self {
            source,
            argument_matcher,
            speaker_matcher,
            observed: HashMap::new(),
            positions: PositionMap::new(),
            subscribed: false,
            frame_pending: false,
            updates: 0,
        }
    }

    /// Tracker matching nodes by the `data-argument-id` / `data-speaker-id`
    /// attributes.
    pub fn with_data_attributes(source: S) -> Self {
        Self::new(
            source,
            attribute_matcher(ARGUMENT_ATTRIBUTE),
            attribute_matcher(SPEAKER_ATTRIBUTE),
        )
    }

    /// Start observing the current subtree. The first measurement lands on
    /// the next animation frame.
    pub fn subscribe(&mut self) {
        self.observed.clear();
        for node in self.source.nodes() {
            self.observe(&node);
        }
        self.subscribed = true;
        self.frame_pending = true;
        tracing::debug!(nodes = self.observed.len(), "Position tracker subscribed");
    }

    /// Stop observing and forget all positions.
    pub fn unsubscribe(&mut self) {
        self.subscribed = false;
        self.frame_pending = false;
        self.observed.clear();
        self.positions.clear();
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Feed a layout event. Only marks the map dirty.
    pub fn handle_event(&mut self, event: LayoutEvent) {
        if !self.subscribed {
            return;
        }
        match event {
            LayoutEvent::NodeResized(node) => {
                if self.observed.contains_key(&node) {
                    self.frame_pending = true;
                }
            }
            LayoutEvent::NodesAdded(nodes) => {
                for node in &nodes {
                    self.observe(node);
                }
                self.frame_pending = true;
            }
            LayoutEvent::NodesRemoved(nodes) => {
                for node in nodes {
                    self.observed.remove(&node);
                }
                self.frame_pending = true;
            }
            LayoutEvent::ContainerResized
            | LayoutEvent::ContainerScrolled
            | LayoutEvent::WindowScrolled
            | LayoutEvent::WindowResized => {
                self.frame_pending = true;
            }
        }
    }

    /// Called once per animation frame. Recomputes only if something changed
    /// since the last frame; returns whether it did.
    pub fn on_animation_frame(&mut self) -> bool {
        if !self.subscribed || !self.frame_pending {
            return false;
        }
        self.recompute_now();
        true
    }

    /// Measure every observed node immediately.
    pub fn recompute_now(&mut self) {
        self.frame_pending = false;
        self.updates += 1;
        self.positions.clear();

        let Some(container) = self.source.container_rect() else {
            return;
        };
        for (node, key) in &self.observed {
            if let Some(rect) = self.source.node_rect(*node) {
                self.positions.insert(key.clone(), rect.relative_to(&container));
            }
        }
    }

    pub fn positions(&self) -> &PositionMap {
        &self.positions
    }

    pub fn position(&self, key: &str) -> Option<Rect> {
        self.positions.get(key).copied()
    }

    pub fn is_frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Number of measurements taken so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    fn observe(&mut self, node: &LayoutNode) {
        if let Some(argument_id) = (self.argument_matcher)(node) {
            self.observed.insert(node.id, argument_id);
        } else if let Some(speaker_id) = (self.speaker_matcher)(node) {
            let key = if speaker_id.starts_with(SPEAKER_ID_PREFIX) {
                speaker_id
            } else {
                speaker_key(&speaker_id)
            };
            self.observed.insert(node.id, key);
        }
    }
}
