//! DOM adapter
//!
//! Three channels behind one observe/disconnect pair:
//!
//! - mutation records become attribute, text and add/remove patches
//! - style sheet `insertRule`/`deleteRule` become synthetic text nodes
//!   added to or removed from the sheet's owner element
//! - form-control state (`value`, `checked`, `selectedIndex`) becomes
//!   property patches, from both user events and intercepted setters
//!
//! Hook facts are stamped with the document's mutation sequence when they
//! arrive, so a drain interleaves them with mutation records in the order
//! they happened.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use fos_dom::{
    ControlKind, Document, DomEvent, EventKind, InterceptPoint, Intercepted, InterceptionId,
    ListenerId, MutationObserverInit, MutationRecord, MutationType, NodeId, ObserverId,
};

use super::{clamp_value, IdRegistry, Observer, TreeWalker};
use crate::vdom::{Patch, VNode, VNodeId, VTree};

/// Raw fact queued by a document hook
#[derive(Debug, Clone)]
enum Pending {
    Intercepted(Intercepted),
    Event(DomEvent),
}

/// Last observed control state, keyed by live node handle
#[derive(Debug, Default)]
struct ControlTable {
    value: HashMap<NodeId, String>,
    checked: HashMap<NodeId, bool>,
    selected_index: HashMap<NodeId, i32>,
}

impl ControlTable {
    fn seed(&mut self, doc: &Document) {
        for node in doc.tree().descendants(doc.root()) {
            let Some(control) = doc.control(node) else {
                continue;
            };
            self.value.insert(node, doc.control_value(node).unwrap_or_default());
            self.checked.insert(node, control.checked);
            self.selected_index.insert(node, control.selected_index);
        }
    }

    fn retain_connected(&mut self, doc: &Document) {
        let connected = |node: &NodeId| doc.tree().is_connected(*node);
        self.value.retain(|node, _| connected(node));
        self.checked.retain(|node, _| connected(node));
        self.selected_index.retain(|node, _| connected(node));
    }

    fn clear(&mut self) {
        self.value.clear();
        self.checked.clear();
        self.selected_index.clear();
    }
}

#[derive(Debug, Default)]
pub struct DomObserver {
    walker: TreeWalker,
    mutation_observer: Option<ObserverId>,
    interceptions: Vec<InterceptionId>,
    listeners: Vec<ListenerId>,
    /// Hook facts, each with the last mutation sequence seen before it
    pending: Rc<RefCell<VecDeque<(u64, Pending)>>>,
    records: VecDeque<MutationRecord>,
    /// Node ids covered by the latest add or remove fragment of the current batch
    added: HashSet<VNodeId>,
    removed: HashSet<VNodeId>,
    controls: ControlTable,
}

impl DomObserver {
    pub fn new(walker: TreeWalker) -> Self {
        Self { walker, ..Default::default() }
    }

    /// Take the mutation records queued since the last call as one batch
    pub fn collect(&mut self, doc: &mut Document) {
        let Some(id) = self.mutation_observer else {
            return;
        };
        let batch = doc.take_records(id);
        if batch.is_empty() {
            return;
        }
        tracing::trace!("Collected {} mutation records", batch.len());
        self.added.clear();
        self.removed.clear();
        self.records.extend(batch);
    }

    /// Patches for the next queued fact, or `None` once drained
    ///
    /// `tree` is the trailing tree as of every patch returned so far, which
    /// is what positions style rules.
    pub fn next_patches(
        &mut self,
        doc: &Document,
        tree: Option<&VTree>,
        ids: &mut IdRegistry,
    ) -> Option<Vec<Patch>> {
        let record_first = match (self.records.front(), self.pending.borrow().front()) {
            (Some(record), Some((seen, _))) => record.sequence <= *seen,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if record_first {
            let record = self.records.pop_front()?;
            return Some(self.record_patches(doc, &record, ids));
        }

        let Some((_, pending)) = self.pending.borrow_mut().pop_front() else {
            self.controls.retain_connected(doc);
            return None;
        };
        let patches = match pending {
            Pending::Intercepted(Intercepted::Property { target, .. })
            | Pending::Event(DomEvent::Input { target })
            | Pending::Event(DomEvent::Change { target }) => self.control_patches(doc, target, ids),
            Pending::Intercepted(Intercepted::RuleInserted { owner, rule, index }) => {
                self.rule_inserted(doc, tree, ids, owner, &rule, index).into_iter().collect()
            }
            Pending::Intercepted(Intercepted::RuleDeleted { owner, index }) => {
                self.rule_deleted(doc, tree, ids, owner, index).into_iter().collect()
            }
            Pending::Event(_) => Vec::new(),
        };
        Some(patches)
    }

    fn record_patches(&mut self, doc: &Document, record: &MutationRecord, ids: &mut IdRegistry) -> Vec<Patch> {
        if self.walker.rules().is_ignored(doc, record.target) {
            return Vec::new();
        }
        let live = doc.tree().get(record.target);

        match record.mutation_type {
            MutationType::Attributes => {
                let (Some(target_id), Some(name)) = (ids.get(record.target), record.attribute_name.clone()) else {
                    return Vec::new();
                };
                let value = live
                    .and_then(|n| n.as_element())
                    .and_then(|el| el.get_attr(&name))
                    .map(clamp_value);
                let old_value = record.old_value.as_deref().map(clamp_value);
                vec![Patch::Attribute { target_id, name, value, old_value }]
            }
            MutationType::CharacterData => {
                let (Some(target_id), Some(value)) = (ids.get(record.target), live.and_then(|n| n.as_text())) else {
                    return Vec::new();
                };
                vec![Patch::Text {
                    target_id,
                    value: value.to_string(),
                    old_value: record.old_value.clone().unwrap_or_default(),
                }]
            }
            MutationType::ChildList => {
                let Some(parent_id) = ids.get(record.target) else {
                    return Vec::new();
                };
                let previous_sibling_id = record.previous_sibling.and_then(|s| ids.get(s));
                let next_sibling_id = record.next_sibling.and_then(|s| ids.get(s));

                let mut patches = Vec::new();
                let removed = fragments(&self.walker, doc, &record.removed_nodes, ids, &mut self.removed);
                if !removed.is_empty() {
                    // a node removed after being added may be added again in this batch
                    forget(&mut self.added, &removed);
                    patches.push(Patch::RemoveNodes {
                        parent_id: parent_id.clone(),
                        previous_sibling_id: previous_sibling_id.clone(),
                        next_sibling_id: next_sibling_id.clone(),
                        nodes: removed,
                    });
                }
                let added = fragments(&self.walker, doc, &record.added_nodes, ids, &mut self.added);
                if !added.is_empty() {
                    forget(&mut self.removed, &added);
                    patches.push(Patch::AddNodes { parent_id, previous_sibling_id, next_sibling_id, nodes: added });
                }
                patches
            }
        }
    }

    fn control_patches(&mut self, doc: &Document, target: NodeId, ids: &mut IdRegistry) -> Vec<Patch> {
        let rules = self.walker.rules();
        if rules.is_ignored(doc, target) {
            return Vec::new();
        }
        let (Some(control), Some(target_id)) = (doc.control(target), ids.get(target)) else {
            return Vec::new();
        };
        let mut patches = Vec::new();

        let value = clamp_value(&doc.control_value(target).unwrap_or_default());
        let old_value = self.controls.value.get(&target)
            .cloned()
            .unwrap_or_else(|| clamp_value(&control.default_value));
        if value != old_value {
            patches.push(Patch::TextProperty {
                target_id: target_id.clone(),
                name: "value".into(),
                value: value.clone(),
                old_value,
            });
        }
        self.controls.value.insert(target, value);

        if control.input_type().is_some_and(|t| t.is_checkable()) {
            let old_checked = self.controls.checked.insert(target, control.checked).unwrap_or(false);
            if control.checked != old_checked {
                patches.push(Patch::BooleanProperty {
                    target_id: target_id.clone(),
                    name: "checked".into(),
                    value: control.checked,
                    old_value: old_checked,
                });
            }

            // Only the checked radio hears about it; its group is unchecked silently
            if control.checked && control.is_radio() {
                for sibling in doc.radio_group(target) {
                    if sibling == target || self.controls.checked.get(&sibling) != Some(&true) {
                        continue;
                    }
                    self.controls.checked.insert(sibling, false);
                    if let Some(sibling_id) = ids.get(sibling).filter(|_| !rules.is_ignored(doc, sibling)) {
                        patches.push(Patch::BooleanProperty {
                            target_id: sibling_id,
                            name: "checked".into(),
                            value: false,
                            old_value: true,
                        });
                    }
                }
            }
        }

        if control.kind == ControlKind::Select {
            let old_index = self.controls.selected_index.insert(target, control.selected_index).unwrap_or(-1);
            if control.selected_index != old_index {
                patches.push(Patch::NumberProperty {
                    target_id,
                    name: "selectedIndex".into(),
                    value: control.selected_index as f64,
                    old_value: old_index as f64,
                });
            }
        }

        patches
    }

    fn rule_owner(&self, doc: &Document, tree: Option<&VTree>, ids: &IdRegistry, owner: NodeId) -> Option<(VNodeId, Vec<VNodeId>)> {
        if !doc.tree().is_connected(owner) || self.walker.rules().is_ignored(doc, owner) {
            return None;
        }
        let parent_id = ids.get(owner)?;
        let parent = tree?.get(&parent_id).filter(|n| n.is_element())?;
        Some((parent_id, parent.children().to_vec()))
    }

    fn rule_inserted(
        &self,
        doc: &Document,
        tree: Option<&VTree>,
        ids: &mut IdRegistry,
        owner: NodeId,
        rule: &str,
        index: usize,
    ) -> Option<Patch> {
        let (parent_id, children) = self.rule_owner(doc, tree, ids, owner)?;
        let id = ids.allocate();
        Some(Patch::AddNodes {
            parent_id,
            previous_sibling_id: index.checked_sub(1).and_then(|i| children.get(i)).cloned(),
            next_sibling_id: children.get(index).cloned(),
            nodes: vec![VTree::new(VNode::Text { id, value: rule.to_string() })],
        })
    }

    fn rule_deleted(
        &self,
        doc: &Document,
        tree: Option<&VTree>,
        ids: &IdRegistry,
        owner: NodeId,
        index: usize,
    ) -> Option<Patch> {
        let (parent_id, children) = self.rule_owner(doc, tree, ids, owner)?;
        let tree = tree?;
        let id = children.get(index)?.clone();
        let nodes = tree.subtree_ids(&id)
            .into_iter()
            .filter_map(|n| tree.get(&n).map(|node| (n, node.clone())))
            .collect();
        Some(Patch::RemoveNodes {
            parent_id,
            previous_sibling_id: index.checked_sub(1).and_then(|i| children.get(i)).cloned(),
            next_sibling_id: children.get(index + 1).cloned(),
            nodes: vec![VTree { root_id: id, nodes }],
        })
    }
}

fn forget(seen: &mut HashSet<VNodeId>, trees: &[VTree]) {
    for tree in trees {
        for id in tree.nodes.keys() {
            seen.remove(id);
        }
    }
}

/// Walk the not-yet-covered, non-ignored nodes into fragments
fn fragments(
    walker: &TreeWalker,
    doc: &Document,
    nodes: &[NodeId],
    ids: &mut IdRegistry,
    seen: &mut HashSet<VNodeId>,
) -> Vec<VTree> {
    let mut trees = Vec::new();
    for &node in nodes {
        if ids.get(node).is_some_and(|id| seen.contains(&id)) || walker.rules().matches(doc, node) {
            continue;
        }
        if let Some(tree) = walker.walk(doc, node, ids) {
            seen.extend(tree.nodes.keys().cloned());
            trees.push(tree);
        }
    }
    trees
}

impl Observer for DomObserver {
    fn observe(&mut self, doc: &mut Document) {
        if self.is_observing() {
            return;
        }
        self.mutation_observer = Some(doc.observe_mutations(doc.root(), MutationObserverInit::all()));

        let points = InterceptPoint::CONTROL_PROPERTIES
            .into_iter()
            .chain([InterceptPoint::InsertRule, InterceptPoint::DeleteRule]);
        for point in points {
            let queue = Rc::clone(&self.pending);
            let sequence = doc.mutation_sequence();
            self.interceptions.push(doc.intercept(point, Rc::new(move |i: &Intercepted| {
                queue.borrow_mut().push_back((sequence.current(), Pending::Intercepted(i.clone())));
            })));
        }
        for kind in [EventKind::Input, EventKind::Change] {
            let queue = Rc::clone(&self.pending);
            let sequence = doc.mutation_sequence();
            self.listeners.push(doc.add_event_listener(kind, Rc::new(move |e: &DomEvent| {
                queue.borrow_mut().push_back((sequence.current(), Pending::Event(e.clone())));
            })));
        }

        self.controls.seed(doc);
        tracing::debug!(
            "DOM observer attached: {} interceptions, {} controls tracked",
            self.interceptions.len(),
            self.controls.value.len()
        );
    }

    fn disconnect(&mut self, doc: &mut Document) {
        if let Some(id) = self.mutation_observer.take() {
            doc.disconnect_observer(id);
        }
        for id in self.interceptions.drain(..) {
            doc.restore_interception(id);
        }
        for id in self.listeners.drain(..) {
            doc.remove_event_listener(id);
        }
        self.pending.borrow_mut().clear();
        self.records.clear();
        self.added.clear();
        self.removed.clear();
        self.controls.clear();
    }

    fn is_observing(&self) -> bool {
        self.mutation_observer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply_patch;
    use crate::observe::IgnoreRules;
    use fos_dom::Selector;

    struct Harness {
        doc: Document,
        ids: IdRegistry,
        tree: VTree,
        observer: DomObserver,
    }

    impl Harness {
        fn new(doc: Document, rules: IgnoreRules) -> Self {
            let mut doc = doc;
            let walker = TreeWalker::new(rules);
            let mut ids = IdRegistry::new();
            let tree = walker.walk_document(&doc, &mut ids).unwrap();
            let mut observer = DomObserver::new(walker);
            observer.observe(&mut doc);
            Self { doc, ids, tree, observer }
        }

        fn drain(&mut self) -> Vec<Patch> {
            self.observer.collect(&mut self.doc);
            let mut out = Vec::new();
            while let Some(patches) = self.observer.next_patches(&self.doc, Some(&self.tree), &mut self.ids) {
                for patch in patches {
                    apply_patch(&mut self.tree, &patch);
                    out.push(patch);
                }
            }
            out
        }

        fn id(&self, node: NodeId) -> VNodeId {
            self.ids.get(node).unwrap()
        }

        fn texts_under(&self, node: NodeId) -> Vec<String> {
            self.tree.get(&self.id(node)).unwrap().children().iter()
                .filter_map(|id| match self.tree.get(id) {
                    Some(VNode::Text { value, .. }) => Some(value.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    #[test]
    fn test_attribute_and_text_patches() {
        let mut doc = Document::default();
        let p = doc.create_element_with("p", &[("class", "a")]);
        let text = doc.create_text("old");
        doc.append_child(doc.body(), p).unwrap();
        doc.append_child(p, text).unwrap();
        let mut h = Harness::new(doc, IgnoreRules::default());

        h.doc.set_attribute(p, "class", "b").unwrap();
        h.doc.set_text(text, "new").unwrap();
        let patches = h.drain();
        assert_eq!(patches, vec![
            Patch::Attribute {
                target_id: h.id(p),
                name: "class".into(),
                value: Some("b".into()),
                old_value: Some("a".into()),
            },
            Patch::Text { target_id: h.id(text), value: "new".into(), old_value: "old".into() },
        ]);
    }

    #[test]
    fn test_added_subtree_is_one_fragment() {
        let mut h = Harness::new(Document::default(), IgnoreRules::default());
        let body = h.doc.body();
        let list = h.doc.create_element("ul");
        let item = h.doc.create_element("li");
        h.doc.append_child(list, item).unwrap();
        h.doc.append_child(body, list).unwrap();

        let patches = h.drain();
        assert_eq!(patches.len(), 1);
        assert!(matches!(&patches[0], Patch::AddNodes { nodes, .. } if nodes.len() == 1 && nodes[0].len() == 2));
        assert_eq!(h.tree.check_integrity(), Ok(()));
    }

    #[test]
    fn test_nodes_added_twice_in_batch_are_deduplicated() {
        let mut h = Harness::new(Document::default(), IgnoreRules::default());
        let body = h.doc.body();
        let outer = h.doc.create_element("div");
        let inner = h.doc.create_element("span");
        h.doc.append_child(body, outer).unwrap();
        h.doc.append_child(outer, inner).unwrap();

        // the second record adds `inner`, already part of the first fragment
        let patches = h.drain();
        assert_eq!(patches.len(), 1);
        assert_eq!(h.tree.get(&h.id(outer)).unwrap().children(), &[h.id(inner)]);
    }

    #[test]
    fn test_node_moved_within_batch_follows_live_tree() {
        let mut doc = Document::default();
        let section = doc.create_element("section");
        doc.append_child(doc.body(), section).unwrap();
        let mut h = Harness::new(doc, IgnoreRules::default());

        let body = h.doc.body();
        let div = h.doc.create_element("div");
        h.doc.append_child(body, div).unwrap();
        h.doc.append_child(section, div).unwrap();
        let patches = h.drain();

        assert_eq!(patches.len(), 3);
        assert_eq!(h.tree.get(&h.id(section)).unwrap().children(), &[h.id(div)]);
        assert!(!h.tree.get(&h.id(body)).unwrap().children().contains(&h.id(div)));
        assert_eq!(h.tree.check_integrity(), Ok(()));
    }

    #[test]
    fn test_node_removed_and_restored_within_batch() {
        let mut doc = Document::default();
        let div = doc.create_element("div");
        doc.append_child(doc.body(), div).unwrap();
        let mut h = Harness::new(doc, IgnoreRules::default());

        let body = h.doc.body();
        h.doc.remove_child(body, div).unwrap();
        h.doc.append_child(body, div).unwrap();
        h.doc.remove_child(body, div).unwrap();
        h.doc.append_child(body, div).unwrap();
        assert_eq!(h.drain().len(), 4);
        assert_eq!(h.tree.get(&h.id(body)).unwrap().children(), &[h.id(div)]);
    }

    #[test]
    fn test_ignored_nodes_produce_nothing() {
        let mut doc = Document::default();
        let secret = doc.create_element_with("div", &[("class", "secret")]);
        doc.append_child(doc.body(), secret).unwrap();
        let rules = IgnoreRules::new([], vec![Selector::parse(".secret").unwrap()]);
        let mut h = Harness::new(doc, rules);

        let child = h.doc.create_element("b");
        h.doc.append_child(secret, child).unwrap();
        h.doc.set_attribute(secret, "title", "x").unwrap();
        let hidden = h.doc.create_element_with("i", &[("class", "secret")]);
        h.doc.append_child(h.doc.body(), hidden).unwrap();
        assert!(h.drain().is_empty());
    }

    #[test]
    fn test_rule_insert_and_delete_track_owner_children() {
        let mut doc = Document::default();
        let style = doc.create_element("style");
        doc.append_child(doc.head(), style).unwrap();
        let mut h = Harness::new(doc, IgnoreRules::default());

        h.doc.insert_rule(style, "a { color: red }", 0).unwrap();
        h.doc.insert_rule(style, "b { color: blue }", 1).unwrap();
        let patches = h.drain();
        assert_eq!(patches.len(), 2);
        let style_node = h.tree.get(&h.id(style)).unwrap().clone();
        let values: Vec<_> = style_node.children().iter()
            .filter_map(|id| match h.tree.get(id) {
                Some(VNode::Text { value, .. }) => Some(value.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(values, ["a { color: red }", "b { color: blue }"]);

        h.doc.delete_rule(style, 0).unwrap();
        let patches = h.drain();
        assert!(matches!(&patches[0], Patch::RemoveNodes { next_sibling_id: Some(_), .. }));
        assert_eq!(h.tree.get(&h.id(style)).unwrap().children().len(), 1);
    }

    #[test]
    fn test_rules_and_child_changes_apply_in_arrival_order() {
        let mut doc = Document::default();
        let style = doc.create_element("style");
        let t = doc.create_text("t");
        doc.append_child(doc.head(), style).unwrap();
        doc.append_child(style, t).unwrap();
        let mut h = Harness::new(doc, IgnoreRules::default());
        h.doc.insert_rule(style, "a { }", 0).unwrap();
        h.drain();
        assert_eq!(h.texts_under(style), ["a { }", "t"]);

        // the rule is positioned against the children it saw, before `u` arrived
        h.doc.insert_rule(style, "b { }", 1).unwrap();
        let u = h.doc.create_text("u");
        h.doc.insert_before(style, u, t).unwrap();
        h.drain();
        assert_eq!(h.texts_under(style), ["a { }", "b { }", "u", "t"]);
    }

    #[test]
    fn test_removed_controls_are_forgotten() {
        let mut doc = Document::default();
        let input = doc.create_element_with("input", &[("value", "start")]);
        doc.append_child(doc.body(), input).unwrap();
        let mut h = Harness::new(doc, IgnoreRules::default());
        assert!(h.observer.controls.value.contains_key(&input));

        let body = h.doc.body();
        h.doc.remove_child(body, input).unwrap();
        h.drain();
        assert!(h.observer.controls.value.is_empty());
        assert!(h.observer.controls.checked.is_empty());
    }

    #[test]
    fn test_value_patches_only_on_change() {
        let mut doc = Document::default();
        let input = doc.create_element_with("input", &[("value", "start")]);
        doc.append_child(doc.body(), input).unwrap();
        let mut h = Harness::new(doc, IgnoreRules::default());

        h.doc.user_input(input, "typed").unwrap();
        h.doc.set_value(input, "typed").unwrap();
        let patches = h.drain();
        assert_eq!(patches, vec![Patch::TextProperty {
            target_id: h.id(input),
            name: "value".into(),
            value: "typed".into(),
            old_value: "start".into(),
        }]);
    }

    #[test]
    fn test_select_patches() {
        let mut doc = Document::default();
        let select = doc.create_element("select");
        doc.append_child(doc.body(), select).unwrap();
        for value in ["a", "b"] {
            let option = doc.create_element_with("option", &[("value", value)]);
            doc.append_child(select, option).unwrap();
        }
        let mut h = Harness::new(doc, IgnoreRules::default());

        h.doc.set_selected_index(select, 1).unwrap();
        let patches = h.drain();
        assert_eq!(patches.len(), 2);
        assert!(matches!(&patches[1], Patch::NumberProperty { value, old_value, .. } if *value == 1.0 && *old_value == -1.0));
    }

    #[test]
    fn test_disconnect_restores_document() {
        let mut h = Harness::new(Document::default(), IgnoreRules::default());
        assert!(h.doc.is_intercepted(InterceptPoint::InputValue));
        assert_eq!(h.doc.listener_count(), 2);

        h.observer.disconnect(&mut h.doc);
        h.observer.disconnect(&mut h.doc);
        for point in InterceptPoint::CONTROL_PROPERTIES {
            assert!(!h.doc.is_intercepted(point));
        }
        assert!(!h.doc.is_intercepted(InterceptPoint::InsertRule));
        assert_eq!(h.doc.listener_count(), 0);

        let body = h.doc.body();
        h.doc.set_attribute(body, "class", "x").unwrap();
        assert!(h.drain().is_empty());
    }
}
