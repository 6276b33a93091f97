//! Edge case tests for fos-dom
//!
//! Boundary conditions of the live document: observer delivery, form
//! control state, interception lifetimes and style sheet indices.

use std::cell::RefCell;
use std::rc::Rc;

use fos_dom::{
    Document, DomError, DomEvent, EventKind, InterceptPoint, Intercepted, MutationObserverInit,
    MutationType, NodeData, NodeId, Selector,
};

fn collect_intercepted(doc: &mut Document, point: InterceptPoint) -> Rc<RefCell<Vec<Intercepted>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    doc.intercept(point, Rc::new(move |i: &Intercepted| sink.borrow_mut().push(i.clone())));
    seen
}

// ============================================================================
// TREE MUTATION EDGE CASES
// ============================================================================

#[test]
fn test_insert_into_own_subtree_fails() {
    let mut doc = Document::default();
    let outer = doc.create_element("div");
    let inner = doc.create_element("span");
    doc.append_child(doc.body(), outer).unwrap();
    doc.append_child(outer, inner).unwrap();

    assert!(matches!(doc.append_child(inner, outer), Err(DomError::HierarchyRequest(_))));
}

#[test]
fn test_remove_non_child_fails() {
    let mut doc = Document::default();
    let stray = doc.create_element("p");
    assert!(doc.remove_child(doc.body(), stray).is_err());
}

#[test]
fn test_removed_subtree_stays_intact() {
    let mut doc = Document::default();
    let list = doc.create_element("ul");
    let item = doc.create_element("li");
    doc.append_child(doc.body(), list).unwrap();
    doc.append_child(list, item).unwrap();
    doc.remove_child(doc.body(), list).unwrap();

    assert!(!doc.tree().is_connected(list));
    assert_eq!(doc.tree().child_ids(list), vec![item]);
}

#[test]
fn test_child_list_record_siblings() {
    let mut doc = Document::default();
    let a = doc.create_element("a");
    let c = doc.create_element("c");
    doc.append_child(doc.body(), a).unwrap();
    doc.append_child(doc.body(), c).unwrap();

    let observer = doc.observe_mutations(doc.body(), MutationObserverInit::all());
    let b = doc.create_element("b");
    doc.insert_before(doc.body(), b, c).unwrap();

    let records = doc.take_records(observer);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].previous_sibling, Some(a));
    assert_eq!(records[0].next_sibling, Some(c));
}

#[test]
fn test_set_text_records_old_value() {
    let mut doc = Document::default();
    let text = doc.create_text("before");
    doc.append_child(doc.body(), text).unwrap();
    let observer = doc.observe_mutations(doc.root(), MutationObserverInit::all());

    doc.set_text(text, "after").unwrap();
    let records = doc.take_records(observer);
    assert_eq!(records[0].mutation_type, MutationType::CharacterData);
    assert_eq!(records[0].old_value.as_deref(), Some("before"));
    assert!(matches!(&doc.tree().get(text).unwrap().data, NodeData::Text(t) if t.content == "after"));
}

#[test]
fn test_set_text_on_element_fails() {
    let mut doc = Document::default();
    assert_eq!(doc.set_text(doc.body(), "x"), Err(DomError::NotFound(doc.body())));
}

// ============================================================================
// OBSERVER EDGE CASES
// ============================================================================

#[test]
fn test_observer_without_subtree_ignores_descendants() {
    let mut doc = Document::default();
    let div = doc.create_element("div");
    doc.append_child(doc.body(), div).unwrap();
    let observer = doc.observe_mutations(doc.body(), MutationObserverInit {
        attributes: true,
        ..Default::default()
    });

    doc.set_attribute(div, "id", "x").unwrap();
    doc.set_attribute(doc.body(), "id", "y").unwrap();
    let records = doc.take_records(observer);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].target, doc.body());
}

#[test]
fn test_disconnected_observer_gets_nothing() {
    let mut doc = Document::default();
    let observer = doc.observe_mutations(doc.root(), MutationObserverInit::all());
    assert!(doc.disconnect_observer(observer));
    doc.set_attribute(doc.body(), "class", "x").unwrap();
    assert!(doc.take_records(observer).is_empty());
    assert!(!doc.disconnect_observer(observer));
}

// ============================================================================
// FORM CONTROL EDGE CASES
// ============================================================================

#[test]
fn test_radio_groups_scoped_by_form() {
    let mut doc = Document::default();
    let form_a = doc.create_element("form");
    let form_b = doc.create_element("form");
    doc.append_child(doc.body(), form_a).unwrap();
    doc.append_child(doc.body(), form_b).unwrap();

    let in_a = doc.create_element_with("input", &[("type", "radio"), ("name", "g")]);
    let in_b = doc.create_element_with("input", &[("type", "radio"), ("name", "g")]);
    doc.append_child(form_a, in_a).unwrap();
    doc.append_child(form_b, in_b).unwrap();

    assert_eq!(doc.radio_group(in_a), vec![in_a]);
    doc.user_check(in_a, true).unwrap();
    doc.user_check(in_b, true).unwrap();
    assert!(doc.control(in_a).unwrap().checked);
    assert!(doc.control(in_b).unwrap().checked);
}

#[test]
fn test_radio_without_form_uses_document() {
    let mut doc = Document::default();
    let first = doc.create_element_with("input", &[("type", "radio"), ("name", "n")]);
    let second = doc.create_element_with("input", &[("type", "radio"), ("name", "n")]);
    doc.append_child(doc.body(), first).unwrap();
    doc.append_child(doc.head(), second).unwrap();

    assert_eq!(doc.radio_group(first).len(), 2);
}

#[test]
fn test_user_input_dispatches_but_does_not_intercept() {
    let mut doc = Document::default();
    let input = doc.create_element("input");
    doc.append_child(doc.body(), input).unwrap();
    let intercepted = collect_intercepted(&mut doc, InterceptPoint::InputValue);

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    doc.add_event_listener(EventKind::Input, Rc::new(move |e: &DomEvent| sink.borrow_mut().push(e.clone())));

    doc.user_input(input, "typed").unwrap();
    assert_eq!(doc.control_value(input).as_deref(), Some("typed"));
    assert_eq!(events.borrow().as_slice(), &[DomEvent::Input { target: input }]);
    assert!(intercepted.borrow().is_empty());
}

#[test]
fn test_value_on_non_control_fails() {
    let mut doc = Document::default();
    assert_eq!(doc.set_value(doc.body(), "x"), Err(DomError::NotAControl(doc.body())));
}

#[test]
fn test_select_without_options() {
    let mut doc = Document::default();
    let select = doc.create_element("select");
    doc.append_child(doc.body(), select).unwrap();
    doc.set_value(select, "missing").unwrap();
    assert_eq!(doc.control(select).unwrap().selected_index, -1);
    assert_eq!(doc.control_value(select), None);
}

#[test]
fn test_option_value_falls_back_to_text() {
    let mut doc = Document::default();
    let select = doc.create_element("select");
    let option = doc.create_element("option");
    let label = doc.create_text("Label");
    doc.append_child(doc.body(), select).unwrap();
    doc.append_child(select, option).unwrap();
    doc.append_child(option, label).unwrap();
    assert_eq!(doc.select_options(select), vec!["Label".to_string()]);
}

// ============================================================================
// STYLE SHEET EDGE CASES
// ============================================================================

#[test]
fn test_rule_methods_notify_hooks() {
    let mut doc = Document::default();
    let style = doc.create_element("style");
    doc.append_child(doc.head(), style).unwrap();
    let inserted = collect_intercepted(&mut doc, InterceptPoint::InsertRule);
    let deleted = collect_intercepted(&mut doc, InterceptPoint::DeleteRule);

    doc.insert_rule(style, "p { margin: 0 }", 0).unwrap();
    doc.delete_rule(style, 0).unwrap();
    assert_eq!(inserted.borrow().len(), 1);
    assert_eq!(deleted.borrow()[0], Intercepted::RuleDeleted { owner: style, index: 0 });
    assert_eq!(doc.sheet_rules(style), Some(&[][..]));
}

#[test]
fn test_failed_rule_insert_does_not_notify() {
    let mut doc = Document::default();
    let style = doc.create_element("style");
    doc.append_child(doc.head(), style).unwrap();
    let inserted = collect_intercepted(&mut doc, InterceptPoint::InsertRule);

    assert!(doc.insert_rule(style, "p {}", 4).is_err());
    assert!(doc.insert_rule(doc.body(), "p {}", 0).is_err());
    assert!(inserted.borrow().is_empty());
}

// ============================================================================
// QUERIES
// ============================================================================

#[test]
fn test_closest_includes_self() {
    let mut doc = Document::default();
    let section = doc.create_element_with("section", &[("class", "private")]);
    let p = doc.create_element("p");
    doc.append_child(doc.body(), section).unwrap();
    doc.append_child(section, p).unwrap();

    let selector = Selector::parse(".private").unwrap();
    assert_eq!(doc.closest(p, &selector), Some(section));
    assert_eq!(doc.closest(section, &selector), Some(section));
    assert_eq!(doc.closest(doc.body(), &selector), None);
}

#[test]
fn test_scroll_unknown_node_fails() {
    let mut doc = Document::default();
    assert!(doc.scroll_to(NodeId::NONE, 1.0, 1.0).is_err());
}
