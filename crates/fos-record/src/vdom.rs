//! Virtual DOM and recording data model
//!
//! A [`VTree`] is a flat id → node map describing one consistent document
//! structure. [`Patch`]es describe one mutation of it, [`Interaction`]s one
//! user-interaction fact, and a [`SourceEvent`] wraps either (or a full
//! [`Snapshot`]) with a timestamp.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Encoded width of a node id
pub const NODE_ID_LEN: usize = 5;

const BASE62: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Render `n` as exactly `width` base-62 digits (wrapping on overflow)
pub(crate) fn base62(mut n: u64, width: usize) -> String {
    let mut out = vec![b'0'; width];
    for slot in out.iter_mut().rev() {
        *slot = BASE62[(n % 62) as usize];
        n /= 62;
    }
    out.into_iter().map(char::from).collect()
}

/// Stable identifier of one observed node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VNodeId(String);

impl VNodeId {
    /// Wrap an id; its width is only checked when encoded
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VNodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Hands out fresh, fixed-width node ids
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> VNodeId {
        let id = VNodeId(base62(self.next, NODE_ID_LEN));
        self.next += 1;
        id
    }
}

/// Virtual node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum VNode {
    DocType {
        id: VNodeId,
        name: String,
        public_id: String,
        system_id: String,
    },
    Document {
        id: VNodeId,
        children: Vec<VNodeId>,
    },
    Element {
        id: VNodeId,
        tag_name: String,
        children: Vec<VNodeId>,
        attributes: BTreeMap<String, Option<String>>,
    },
    Text {
        id: VNodeId,
        value: String,
    },
}

impl VNode {
    pub fn id(&self) -> &VNodeId {
        match self {
            Self::DocType { id, .. }
            | Self::Document { id, .. }
            | Self::Element { id, .. }
            | Self::Text { id, .. } => id,
        }
    }

    /// Children of a document or element
    pub fn children(&self) -> &[VNodeId] {
        match self {
            Self::Document { children, .. } | Self::Element { children, .. } => children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<VNodeId>> {
        match self {
            Self::Document { children, .. } | Self::Element { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }
}

/// Tree integrity violation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeIntegrity {
    #[error("Root {0} is not a node of the tree")]
    MissingRoot(VNodeId),

    #[error("{parent} lists child {child} which is not in the tree")]
    MissingChild { parent: VNodeId, child: VNodeId },

    #[error("{0} is not reachable from the root")]
    Orphan(VNodeId),
}

/// Root id plus id → node map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VTree {
    pub root_id: VNodeId,
    pub nodes: BTreeMap<VNodeId, VNode>,
}

impl VTree {
    /// Tree consisting of a single root node
    pub fn new(root: VNode) -> Self {
        let root_id = root.id().clone();
        let mut nodes = BTreeMap::new();
        nodes.insert(root_id.clone(), root);
        Self { root_id, nodes }
    }

    pub fn get(&self, id: &VNodeId) -> Option<&VNode> {
        self.nodes.get(id)
    }

    pub fn root(&self) -> Option<&VNode> {
        self.nodes.get(&self.root_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `id` and every node below it present in this tree
    pub fn subtree_ids(&self, id: &VNodeId) -> Vec<VNodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children().iter().rev().cloned());
                out.push(current);
            }
        }
        out
    }

    /// Every child id exists and every node is reachable from the root
    pub fn check_integrity(&self) -> Result<(), TreeIntegrity> {
        if !self.nodes.contains_key(&self.root_id) {
            return Err(TreeIntegrity::MissingRoot(self.root_id.clone()));
        }
        for node in self.nodes.values() {
            for child in node.children() {
                if !self.nodes.contains_key(child) {
                    return Err(TreeIntegrity::MissingChild {
                        parent: node.id().clone(),
                        child: child.clone(),
                    });
                }
            }
        }
        let reachable: BTreeSet<VNodeId> = self.subtree_ids(&self.root_id).into_iter().collect();
        match self.nodes.keys().find(|id| !reachable.contains(*id)) {
            Some(orphan) => Err(TreeIntegrity::Orphan(orphan.clone())),
            None => Ok(()),
        }
    }
}

/// Structural or content mutation of a [`VTree`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Patch {
    Attribute {
        target_id: VNodeId,
        name: String,
        value: Option<String>,
        old_value: Option<String>,
    },
    Text {
        target_id: VNodeId,
        value: String,
        old_value: String,
    },
    AddNodes {
        parent_id: VNodeId,
        previous_sibling_id: Option<VNodeId>,
        next_sibling_id: Option<VNodeId>,
        nodes: Vec<VTree>,
    },
    RemoveNodes {
        parent_id: VNodeId,
        previous_sibling_id: Option<VNodeId>,
        next_sibling_id: Option<VNodeId>,
        nodes: Vec<VTree>,
    },
    TextProperty {
        target_id: VNodeId,
        name: String,
        value: String,
        old_value: String,
    },
    BooleanProperty {
        target_id: VNodeId,
        name: String,
        value: bool,
        old_value: bool,
    },
    NumberProperty {
        target_id: VNodeId,
        name: String,
        value: f64,
        old_value: f64,
    },
}

/// `[x, y]` in CSS pixels
pub type Point = [f64; 2];

/// Sampled value and how long the sample window lasted (ms)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample<T> {
    pub value: T,
    pub duration: f64,
}

/// User-interaction fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Interaction {
    ViewportResize { from: Point, to: Sample<Point> },
    Scroll { target: VNodeId, from: Point, to: Sample<Point> },
    PointerMove { from: Point, to: Sample<Point> },
    PointerDown { targets: Vec<VNodeId>, at: Point },
    PointerUp { targets: Vec<VNodeId>, at: Point },
    KeyDown { key: String },
    KeyUp { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerState {
    #[default]
    Up,
    Down,
}

/// Consolidated interaction state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionSnapshot {
    pub pointer: Point,
    pub pointer_state: PointerState,
    pub scroll: BTreeMap<VNodeId, Point>,
    pub viewport: Point,
}

/// Complete, self-sufficient state at one instant
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub tree: Option<VTree>,
    pub interaction: Option<InteractionSnapshot>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum EventData {
    Snapshot(Snapshot),
    DomPatch(Patch),
    Interaction(Interaction),
    CloseRecording,
}

impl EventData {
    pub fn event_type(&self) -> SourceEventType {
        match self {
            Self::Snapshot(_) => SourceEventType::Snapshot,
            Self::DomPatch(_) => SourceEventType::DomPatch,
            Self::Interaction(_) => SourceEventType::Interaction,
            Self::CloseRecording => SourceEventType::CloseRecording,
        }
    }
}

/// Timestamped event (ms)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEvent {
    pub time: f64,
    #[serde(flatten)]
    pub data: EventData,
}

impl SourceEvent {
    pub fn new(time: f64, data: EventData) -> Self {
        Self { time, data }
    }

    pub fn snapshot(time: f64, snapshot: Snapshot) -> Self {
        Self::new(time, EventData::Snapshot(snapshot))
    }

    pub fn patch(time: f64, patch: Patch) -> Self {
        Self::new(time, EventData::DomPatch(patch))
    }

    pub fn interaction(time: f64, interaction: Interaction) -> Self {
        Self::new(time, EventData::Interaction(interaction))
    }

    pub fn close(time: f64) -> Self {
        Self::new(time, EventData::CloseRecording)
    }

    pub fn event_type(&self) -> SourceEventType {
        self.data.event_type()
    }
}

/// Event type tag, readable from the encoded header alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SourceEventType {
    Snapshot = 0,
    DomPatch = 1,
    Interaction = 2,
    CloseRecording = 3,
}

impl SourceEventType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Snapshot),
            1 => Some(Self::DomPatch),
            2 => Some(Self::Interaction),
            3 => Some(Self::CloseRecording),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(id: &str, value: &str) -> VNode {
        VNode::Text { id: id.into(), value: value.into() }
    }

    #[test]
    fn test_allocator_ids_are_fixed_width() {
        let mut ids = IdAllocator::new();
        let first = ids.next_id();
        let second = ids.next_id();
        assert_eq!(first.as_str(), "00000");
        assert_eq!(second.as_str(), "00001");
        assert_eq!(base62(61, 5), "0000z");
        assert_eq!(base62(62, 5), "00010");
    }

    #[test]
    fn test_integrity() {
        let mut tree = VTree::new(VNode::Element {
            id: "root0".into(),
            tag_name: "div".into(),
            children: vec!["text0".into()],
            attributes: BTreeMap::new(),
        });
        assert!(matches!(tree.check_integrity(), Err(TreeIntegrity::MissingChild { .. })));

        tree.nodes.insert("text0".into(), text("text0", "hi"));
        assert_eq!(tree.check_integrity(), Ok(()));

        tree.nodes.insert("stray".into(), text("stray", ""));
        assert_eq!(tree.check_integrity(), Err(TreeIntegrity::Orphan("stray".into())));
    }

    #[test]
    fn test_event_json_shape() {
        let event = SourceEvent::patch(12.0, Patch::Text {
            target_id: "t0000".into(),
            value: "b".into(),
            old_value: "a".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "dom-patch");
        assert_eq!(json["data"]["type"], "text");
        assert_eq!(json["data"]["targetId"], "t0000");
        let back: SourceEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
