//! Document - High-level document API
//!
//! Every mutation goes through `Document` so observers see it: tree and
//! attribute edits queue mutation records, control setters and CSSOM
//! methods notify interceptions, and user input dispatches events.

use crate::events::EventListeners;
use crate::intercept::Interceptors;
use crate::observer::MutationObservers;
use crate::{
    ControlKind, DomError, DomEvent, DomTree, EventHook, EventKind, FormControl, InterceptHook,
    InterceptPoint, Intercepted, InterceptionId, ListenerId, MutationObserverInit, MutationRecord,
    MutationSequence, NodeData, NodeId, ObserverId, Result, Selector,
};

/// HTML Document
#[derive(Debug)]
pub struct Document {
    /// The DOM tree
    tree: DomTree,
    /// Document URL
    url: String,
    /// Cached reference to <html> element
    html_element: NodeId,
    /// Cached reference to <head> element
    head_element: NodeId,
    /// Cached reference to <body> element
    body_element: NodeId,
    /// Viewport size in CSS pixels
    viewport: [f64; 2],
    observers: MutationObservers,
    interceptors: Interceptors,
    listeners: EventListeners,
}

impl Document {
    /// Create a new document with doctype, html, head and body
    pub fn new(url: &str) -> Self {
        let mut doc = Self::empty(url);
        let tree = &mut doc.tree;
        let root = tree.root();

        let doctype = tree.create_doctype("html", "", "");
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Freshly created nodes under the root cannot fail to attach
        let _ = tree.append_child(root, doctype);
        let _ = tree.append_child(root, html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);

        doc.html_element = html;
        doc.head_element = head;
        doc.body_element = body;
        doc
    }

    /// Create an empty document (no structure)
    pub fn empty(url: &str) -> Self {
        Self {
            tree: DomTree::new(),
            url: url.to_string(),
            html_element: NodeId::NONE,
            head_element: NodeId::NONE,
            body_element: NodeId::NONE,
            viewport: [0.0, 0.0],
            observers: MutationObservers::default(),
            interceptors: Interceptors::default(),
            listeners: EventListeners::default(),
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Document node
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Viewport size
    pub fn viewport(&self) -> [f64; 2] {
        self.viewport
    }

    // ------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.tree.create_element(tag_name)
    }

    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.tree.create_text(content)
    }

    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.tree.create_comment(content)
    }

    /// Create an element with attributes (no records: it is still detached)
    pub fn create_element_with(&mut self, tag_name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.tree.create_element(tag_name);
        if let Some(el) = self.tree.get_mut(id).and_then(|n| n.as_element_mut()) {
            for (name, value) in attrs {
                el.set_attr(name, value);
                if let Some(control) = el.control.as_mut() {
                    control.attribute_changed(name, Some(value));
                }
            }
        }
        id
    }

    // ------------------------------------------------------------------
    // Tree mutation
    // ------------------------------------------------------------------

    /// Append a child, recording the removal from its old parent first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, NodeId::NONE)
    }

    /// Insert `child` before `reference` (NONE appends)
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> Result<()> {
        if self.tree.contains(child, parent) {
            return Err(DomError::HierarchyRequest("node cannot be inserted into its own subtree"));
        }
        if reference.is_valid() && (reference == child || self.tree.parent(reference) != Some(parent)) {
            return Err(DomError::HierarchyRequest("reference node is not a child of parent"));
        }
        if let Some(old_parent) = self.tree.parent(child) {
            self.remove_child(old_parent, child)?;
        }
        self.tree.insert_before(parent, child, reference)?;

        let node = self.tree.get(child).ok_or(DomError::NotFound(child))?;
        let record = MutationRecord::child_list(
            parent,
            vec![child],
            Vec::new(),
            Some(node.prev_sibling).filter(|s| s.is_valid()),
            Some(node.next_sibling).filter(|s| s.is_valid()),
        );
        self.queue(record);
        tracing::trace!("Inserted {:?} into {:?}", child, parent);
        Ok(())
    }

    /// Remove a child; the removed subtree stays intact
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let node = self.tree.get(child).ok_or(DomError::NotFound(child))?;
        let previous = Some(node.prev_sibling).filter(|s| s.is_valid());
        let next = Some(node.next_sibling).filter(|s| s.is_valid());
        self.tree.detach(parent, child)?;
        self.queue(MutationRecord::child_list(parent, Vec::new(), vec![child], previous, next));
        tracing::trace!("Removed {:?} from {:?}", child, parent);
        Ok(())
    }

    /// Set an attribute
    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Result<()> {
        let el = self.tree.get_mut(element)
            .and_then(|n| n.as_element_mut())
            .ok_or(DomError::NotFound(element))?;
        let old_value = el.set_attr(name, value);
        if let Some(control) = el.control.as_mut() {
            control.attribute_changed(name, Some(value));
        }
        self.queue(MutationRecord::attributes(element, name, old_value));
        Ok(())
    }

    /// Remove an attribute; no record when it was absent
    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> Result<()> {
        let el = self.tree.get_mut(element)
            .and_then(|n| n.as_element_mut())
            .ok_or(DomError::NotFound(element))?;
        let Some(old_value) = el.remove_attr(name) else {
            return Ok(());
        };
        if let Some(control) = el.control.as_mut() {
            control.attribute_changed(name, None);
        }
        self.queue(MutationRecord::attributes(element, name, Some(old_value)));
        Ok(())
    }

    /// Replace the data of a text node
    pub fn set_text(&mut self, node: NodeId, data: &str) -> Result<()> {
        let old_value = match self.tree.get_mut(node).map(|n| &mut n.data) {
            Some(NodeData::Text(text)) => std::mem::replace(&mut text.content, data.to_string()),
            Some(NodeData::Comment(content)) => std::mem::replace(content, data.to_string()),
            _ => return Err(DomError::NotFound(node)),
        };
        self.queue(MutationRecord::character_data(node, old_value));
        Ok(())
    }

    fn queue(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let target = record.target;
        let tree = &self.tree;
        self.observers.queue(record, |observed| tree.contains(observed, target));
    }

    // ------------------------------------------------------------------
    // Mutation observers
    // ------------------------------------------------------------------

    pub fn observe_mutations(&mut self, target: NodeId, options: MutationObserverInit) -> ObserverId {
        self.observers.observe(target, options)
    }

    /// Counter shared with every queued record's `sequence`
    pub fn mutation_sequence(&self) -> MutationSequence {
        self.observers.sequence()
    }

    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers.take_records(observer)
    }

    pub fn disconnect_observer(&mut self, observer: ObserverId) -> bool {
        self.observers.disconnect(observer)
    }

    // ------------------------------------------------------------------
    // Form controls
    // ------------------------------------------------------------------

    /// Control state of an element
    pub fn control(&self, node: NodeId) -> Option<&FormControl> {
        self.tree.get(node)?.as_element()?.control.as_ref()
    }

    fn control_mut(&mut self, node: NodeId) -> Result<&mut FormControl> {
        self.tree.get_mut(node)
            .and_then(|n| n.as_element_mut())
            .and_then(|el| el.control.as_mut())
            .ok_or(DomError::NotAControl(node))
    }

    /// Values of the `<option>` descendants of a select
    pub fn select_options(&self, select: NodeId) -> Vec<String> {
        self.tree.descendants(select)
            .into_iter()
            .filter_map(|id| {
                let el = self.tree.get(id)?.as_element()?;
                if el.tag_name != "option" {
                    return None;
                }
                Some(match el.get_attr("value") {
                    Some(v) => v.to_string(),
                    None => self.text_content(id),
                })
            })
            .collect()
    }

    /// Current `value` of a control (selects resolve through their options)
    pub fn control_value(&self, node: NodeId) -> Option<String> {
        let control = self.control(node)?;
        match control.kind {
            ControlKind::Select => {
                let index = usize::try_from(control.selected_index).ok()?;
                Some(self.select_options(node).get(index).cloned().unwrap_or_default())
            }
            _ => Some(control.value.clone()),
        }
    }

    /// Same-name radio buttons sharing a form owner (or the tree), including `radio`
    pub fn radio_group(&self, radio: NodeId) -> Vec<NodeId> {
        let Some(name) = self.tree.get(radio)
            .and_then(|n| n.as_element())
            .and_then(|el| el.get_attr("name"))
        else {
            return vec![radio];
        };
        let scope = self.tree.ancestors(radio)
            .find(|&a| self.tree.get(a).and_then(|n| n.as_element()).is_some_and(|el| el.tag_name == "form"))
            .or_else(|| self.tree.ancestors(radio).last())
            .unwrap_or(radio);

        self.tree.descendants(scope)
            .into_iter()
            .filter(|&id| {
                self.tree.get(id).and_then(|n| n.as_element()).is_some_and(|el| {
                    el.get_attr("name") == Some(name)
                        && el.control.as_ref().is_some_and(|c| c.is_radio())
                })
            })
            .collect()
    }

    fn check_native(&mut self, node: NodeId, checked: bool) -> Result<()> {
        let is_radio = self.control_mut(node)?.is_radio();
        if checked && is_radio {
            for other in self.radio_group(node) {
                if other != node {
                    self.control_mut(other)?.set_checked(false);
                }
            }
        }
        self.control_mut(node)?.set_checked(checked);
        Ok(())
    }

    fn notify(&self, point: InterceptPoint, intercepted: Intercepted) {
        for hook in self.interceptors.hooks_for(point) {
            hook(&intercepted);
        }
    }

    /// Script assignment to `value`
    pub fn set_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        let kind = self.control_mut(node)?.kind;
        let point = match kind {
            ControlKind::Input(_) => InterceptPoint::InputValue,
            ControlKind::TextArea => InterceptPoint::TextAreaValue,
            ControlKind::Select => InterceptPoint::SelectValue,
        };
        if kind == ControlKind::Select {
            let index = self.select_options(node)
                .iter()
                .position(|v| v == value)
                .map_or(-1, |i| i as i32);
            self.control_mut(node)?.selected_index = index;
        } else {
            self.control_mut(node)?.set_value(value);
        }
        self.notify(point, Intercepted::Property { target: node, point });
        Ok(())
    }

    /// Script assignment to `checked`
    pub fn set_checked(&mut self, node: NodeId, checked: bool) -> Result<()> {
        self.check_native(node, checked)?;
        let point = InterceptPoint::InputChecked;
        self.notify(point, Intercepted::Property { target: node, point });
        Ok(())
    }

    /// Script assignment to `selectedIndex`
    pub fn set_selected_index(&mut self, node: NodeId, index: i32) -> Result<()> {
        let len = self.select_options(node).len() as i32;
        let control = self.control_mut(node)?;
        if control.kind != ControlKind::Select {
            return Err(DomError::NotAControl(node));
        }
        control.selected_index = if (0..len).contains(&index) { index } else { -1 };
        let point = InterceptPoint::SelectSelectedIndex;
        self.notify(point, Intercepted::Property { target: node, point });
        Ok(())
    }

    /// User typing into a field: native update plus `input`
    pub fn user_input(&mut self, node: NodeId, value: &str) -> Result<()> {
        self.control_mut(node)?.set_value(value);
        self.dispatch(&DomEvent::Input { target: node });
        Ok(())
    }

    /// User clicking a checkbox/radio: native update plus `change` on the target only
    pub fn user_check(&mut self, node: NodeId, checked: bool) -> Result<()> {
        self.check_native(node, checked)?;
        self.dispatch(&DomEvent::Change { target: node });
        Ok(())
    }

    /// User picking an option: native update plus `change`
    pub fn user_select(&mut self, node: NodeId, index: i32) -> Result<()> {
        let len = self.select_options(node).len() as i32;
        self.control_mut(node)?.selected_index = if (0..len).contains(&index) { index } else { -1 };
        self.dispatch(&DomEvent::Change { target: node });
        Ok(())
    }

    // ------------------------------------------------------------------
    // CSSOM
    // ------------------------------------------------------------------

    /// Rules of the sheet owned by a `<style>` element
    pub fn sheet_rules(&self, owner: NodeId) -> Option<&[String]> {
        let el = self.tree.get(owner)?.as_element()?;
        el.sheet.as_ref().map(|s| s.rules.as_slice())
    }

    /// `sheet.insertRule(rule, index)`
    pub fn insert_rule(&mut self, owner: NodeId, rule: &str, index: usize) -> Result<usize> {
        let sheet = self.tree.get_mut(owner)
            .and_then(|n| n.as_element_mut())
            .and_then(|el| el.sheet.as_mut())
            .ok_or(DomError::NotAStyleSheet(owner))?;
        let index = sheet.insert_rule(rule, index)?;
        self.notify(
            InterceptPoint::InsertRule,
            Intercepted::RuleInserted { owner, rule: rule.to_string(), index },
        );
        Ok(index)
    }

    /// `sheet.deleteRule(index)`
    pub fn delete_rule(&mut self, owner: NodeId, index: usize) -> Result<()> {
        let sheet = self.tree.get_mut(owner)
            .and_then(|n| n.as_element_mut())
            .and_then(|el| el.sheet.as_mut())
            .ok_or(DomError::NotAStyleSheet(owner))?;
        sheet.delete_rule(index)?;
        self.notify(InterceptPoint::DeleteRule, Intercepted::RuleDeleted { owner, index });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Interception
    // ------------------------------------------------------------------

    /// Wrap a setter/method; the hook runs after the native behavior
    pub fn intercept(&mut self, point: InterceptPoint, hook: InterceptHook) -> InterceptionId {
        self.interceptors.install(point, hook)
    }

    /// Restore native behavior; false when already restored
    pub fn restore_interception(&mut self, id: InterceptionId) -> bool {
        self.interceptors.restore(id)
    }

    pub fn is_intercepted(&self, point: InterceptPoint) -> bool {
        self.interceptors.is_intercepted(point)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(&mut self, kind: EventKind, hook: EventHook) -> ListenerId {
        self.listeners.add(kind, hook)
    }

    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver an event to listeners of its kind
    pub fn dispatch(&self, event: &DomEvent) {
        for hook in self.listeners.hooks_for(event.kind()) {
            hook(event);
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport = [width, height];
        self.dispatch(&DomEvent::Resize { width, height });
    }

    /// Scroll an element (or the document node)
    pub fn scroll_to(&mut self, node: NodeId, x: f64, y: f64) -> Result<()> {
        self.tree.get_mut(node).ok_or(DomError::NotFound(node))?.scroll = [x, y];
        self.dispatch(&DomEvent::Scroll { target: node, x, y });
        Ok(())
    }

    pub fn pointer_move(&self, x: f64, y: f64) {
        self.dispatch(&DomEvent::PointerMove { x, y });
    }

    pub fn pointer_down(&self, target: NodeId, x: f64, y: f64) {
        self.dispatch(&DomEvent::PointerDown { target, x, y });
    }

    pub fn pointer_up(&self, target: NodeId, x: f64, y: f64) {
        self.dispatch(&DomEvent::PointerUp { target, x, y });
    }

    pub fn key_down(&self, key: &str) {
        self.dispatch(&DomEvent::KeyDown { key: key.to_string() });
    }

    pub fn key_up(&self, key: &str) {
        self.dispatch(&DomEvent::KeyUp { key: key.to_string() });
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Concatenated text of a subtree
    pub fn text_content(&self, node: NodeId) -> String {
        self.tree.descendants(node)
            .into_iter()
            .filter_map(|id| self.tree.get(id)?.as_text().map(str::to_string))
            .collect()
    }

    /// Does the element match the selector
    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        self.tree.get(node)
            .and_then(|n| n.as_element())
            .is_some_and(|el| selector.matches(el))
    }

    /// Nearest inclusive ancestor matching the selector
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.tree.ancestors(node))
            .find(|&id| self.matches(id, selector))
    }

    /// Elements carrying an `id` attribute equal to `id`
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree.descendants(self.root())
            .into_iter()
            .find(|&node| {
                self.tree.get(node)
                    .and_then(|n| n.as_element())
                    .is_some_and(|el| el.get_attr("id") == Some(id))
            })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}
