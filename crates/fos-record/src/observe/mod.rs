//! Observation adapters
//!
//! Adapters attach to a live [`Document`] and turn what they see into
//! [`Patch`](crate::Patch)es and [`Interaction`](crate::Interaction)s. They
//! never touch the event buffer; the stream drains them.
//!
//! Hooks installed on the document only queue raw facts. Turning them into
//! patches happens later, when the stream drains the adapter with the
//! current trailing tree at hand.

mod dom;
mod interaction;
mod periodic;
mod walker;

pub use dom::DomObserver;
pub use interaction::InteractionObserver;
pub use periodic::Periodic;
pub use walker::TreeWalker;

use std::collections::{HashMap, HashSet};

use fos_dom::{Document, NodeId, Selector};

use crate::options::RecordingOptions;
use crate::vdom::{IdAllocator, VNodeId};

/// Longest attribute or property value the codec carries
pub const MAX_VALUE_LEN: usize = u16::MAX as usize;

/// `value`, cut on a char boundary to at most [`MAX_VALUE_LEN`] bytes
pub fn clamp_value(value: &str) -> String {
    if value.len() <= MAX_VALUE_LEN {
        return value.to_string();
    }
    let mut end = MAX_VALUE_LEN;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    tracing::debug!("Truncated a {}-byte value to {} bytes", value.len(), end);
    value[..end].to_string()
}

/// Attach/detach contract shared by every adapter
pub trait Observer {
    /// Start observing; calling it while attached is a no-op
    fn observe(&mut self, doc: &mut Document);

    /// Stop observing and restore anything installed on the document
    fn disconnect(&mut self, doc: &mut Document);

    fn is_observing(&self) -> bool;
}

/// Live node handle → recorded node id
///
/// Handles are arena indices, so holding one never keeps a node alive.
#[derive(Debug, Default)]
pub struct IdRegistry {
    ids: HashMap<NodeId, VNodeId>,
    allocator: IdAllocator,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId) -> Option<VNodeId> {
        self.ids.get(&node).cloned()
    }

    /// Existing id of `node`, or a fresh one
    pub fn id_for(&mut self, node: NodeId) -> VNodeId {
        let allocator = &mut self.allocator;
        self.ids.entry(node).or_insert_with(|| allocator.next_id()).clone()
    }

    /// Id for a synthetic node with no live counterpart
    pub fn allocate(&mut self) -> VNodeId {
        self.allocator.next_id()
    }

    /// Forget handles no longer in the document; they get a fresh id if re-inserted
    pub fn retain_connected(&mut self, doc: &Document) {
        self.ids.retain(|&node, _| doc.tree().is_connected(node));
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Nodes excluded from recording, with their subtrees
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    nodes: HashSet<NodeId>,
    selectors: Vec<Selector>,
}

impl IgnoreRules {
    pub fn new(nodes: impl IntoIterator<Item = NodeId>, selectors: Vec<Selector>) -> Self {
        Self { nodes: nodes.into_iter().collect(), selectors }
    }

    /// Rules from options; unparsable selectors are skipped
    pub fn from_options(options: &RecordingOptions) -> Self {
        let selectors = options.ignored_selectors.iter()
            .filter_map(|source| {
                let selector = Selector::parse(source);
                if selector.is_none() {
                    tracing::warn!("Ignoring unsupported selector {:?}", source);
                }
                selector
            })
            .collect();
        Self::new(options.ignored_nodes.iter().copied(), selectors)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.selectors.is_empty()
    }

    /// Does a rule match `node` itself
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.nodes.contains(&node)
            || self.selectors.iter().any(|s| doc.matches(node, s))
    }

    /// Does a rule match `node` or any of its ancestors
    pub fn is_ignored(&self, doc: &Document, node: NodeId) -> bool {
        if self.is_empty() {
            return false;
        }
        self.matches(doc, node) || doc.tree().ancestors(node).any(|a| self.matches(doc, a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_assigns_once() {
        let mut registry = IdRegistry::new();
        let doc = Document::default();
        let body = registry.id_for(doc.body());
        assert_eq!(registry.id_for(doc.body()), body);
        assert_eq!(registry.get(doc.head()), None);
        assert_ne!(registry.allocate(), body);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_forgets_detached_nodes() {
        let mut doc = Document::default();
        let div = doc.create_element("div");
        doc.append_child(doc.body(), div).unwrap();
        let mut registry = IdRegistry::new();
        let body = registry.id_for(doc.body());
        let first = registry.id_for(div);

        doc.remove_child(doc.body(), div).unwrap();
        registry.retain_connected(&doc);
        assert_eq!(registry.get(div), None);
        assert_eq!(registry.get(doc.body()), Some(body));
        assert_ne!(registry.id_for(div), first);
    }

    #[test]
    fn test_clamp_value_keeps_char_boundary() {
        assert_eq!(clamp_value("short"), "short");
        let long = format!("{}é", "x".repeat(MAX_VALUE_LEN - 1));
        let clamped = clamp_value(&long);
        assert_eq!(clamped.len(), MAX_VALUE_LEN - 1);
        assert!(clamped.chars().all(|c| c == 'x'));
    }

    #[test]
    fn test_ignore_applies_to_descendants() {
        let mut doc = Document::default();
        let private = doc.create_element_with("div", &[("class", "private")]);
        let inner = doc.create_element("span");
        doc.append_child(doc.body(), private).unwrap();
        doc.append_child(private, inner).unwrap();

        let options = RecordingOptions::default().ignore_selector(".private").ignore_selector("div span");
        let rules = IgnoreRules::from_options(&options);
        assert!(rules.is_ignored(&doc, inner));
        assert!(!rules.is_ignored(&doc, doc.body()));

        let by_node = IgnoreRules::new([doc.body()], Vec::new());
        assert!(by_node.is_ignored(&doc, inner));
        assert!(!by_node.is_ignored(&doc, doc.head()));
    }
}
