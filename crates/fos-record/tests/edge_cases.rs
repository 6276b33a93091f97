//! Edge case tests for fos-record
//!
//! Codec failures, buffer eviction at the budget boundary, the lifecycle of
//! a recording stream and what a slice looks like after eviction.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use fos_dom::{Document, NodeId};
use fos_record::codec::{decode_patch, encode_patch, encode_tree};
use fos_record::{
    apply, apply_interaction, decode_event, encode_event, CodecError, EventBuffer, EventData,
    Interaction, InteractionSnapshot, ManualClock, Patch, RecordError, RecordingOptions,
    RecordingStream, RecordingType, Sample, Snapshot, SourceEvent, SourceEventType, VNode, VNodeId,
    VTree,
};

fn dom_only() -> RecordingOptions {
    RecordingOptions::default().with_types([RecordingType::Dom])
}

fn stream(clock: &ManualClock, options: RecordingOptions) -> RecordingStream {
    RecordingStream::with_clock(options, Rc::new(clock.clone()))
}

/// Body with one `<p class="a">`
fn styled_doc() -> (Document, NodeId) {
    let mut doc = Document::new("https://example.com/page");
    let p = doc.create_element_with("p", &[("class", "a")]);
    let text = doc.create_text("hello");
    doc.append_child(doc.body(), p).unwrap();
    doc.append_child(p, text).unwrap();
    (doc, p)
}

fn class_of(state: &Snapshot, id: &VNodeId) -> Option<String> {
    match state.tree.as_ref()?.get(id)? {
        VNode::Element { attributes, .. } => attributes.get("class").cloned().flatten(),
        _ => None,
    }
}

// ============================================================================
// CODEC EDGE CASES
// ============================================================================

#[test]
fn test_short_identifier_rejected() {
    let patch = Patch::Text { target_id: "abc".into(), value: "x".into(), old_value: String::new() };
    assert_eq!(
        encode_patch(&patch),
        Err(CodecError::InvalidIdentifier { id: "abc".into(), len: 3 })
    );
}

#[test]
fn test_multibyte_identifier_counts_bytes() {
    // five characters, seven bytes
    let tree = VTree::new(VNode::Text { id: "ab\u{e9}\u{e9}c".into(), value: String::new() });
    assert!(matches!(encode_tree(&tree), Err(CodecError::InvalidIdentifier { len: 7, .. })));
}

#[test]
fn test_truncated_input() {
    let patch = Patch::Attribute {
        target_id: "00001".into(),
        name: "class".into(),
        value: Some("b".into()),
        old_value: Some("a".into()),
    };
    let bytes = encode_patch(&patch).unwrap();
    assert!(matches!(decode_patch(&bytes[..bytes.len() - 1]), Err(CodecError::UnexpectedEof { .. })));
    assert!(matches!(decode_event(&[]), Err(CodecError::UnexpectedEof { .. })));
}

#[test]
fn test_unknown_event_tag() {
    let mut bytes = encode_event(&SourceEvent::close(1.0)).unwrap();
    bytes[0] = 42;
    assert!(matches!(decode_event(&bytes), Err(CodecError::UnknownTag { tag: 42, .. })));
}

#[test]
fn test_oversized_tag_name() {
    let tree = VTree::new(VNode::Element {
        id: "00000".into(),
        tag_name: "x".repeat(300),
        children: Vec::new(),
        attributes: BTreeMap::new(),
    });
    assert!(matches!(encode_tree(&tree), Err(CodecError::LengthOverflow { len: 300, .. })));
}

// ============================================================================
// BUFFER EDGE CASES
// ============================================================================

#[test]
fn test_single_oversized_event_is_kept() {
    let mut buffer = EventBuffer::new(4);
    buffer.push(vec![0u8; 10]);
    assert_eq!(buffer.len(), 1);
    assert_eq!(buffer.byte_size(), 10);

    buffer.push(vec![1u8; 2]);
    assert_eq!(buffer.copy(), vec![vec![1u8; 2]]);
}

#[test]
fn test_exact_budget_does_not_evict() {
    let mut buffer = EventBuffer::new(6);
    let evictions = Rc::new(RefCell::new(0));
    let count = Rc::clone(&evictions);
    let _sub = buffer.on_evict(move |_: &[Vec<u8>]| *count.borrow_mut() += 1);

    buffer.push(vec![0u8; 3]);
    buffer.push(vec![0u8; 3]);
    assert_eq!(*evictions.borrow(), 0);
    buffer.push(vec![0u8; 1]);
    assert_eq!(*evictions.borrow(), 1);
    assert_eq!(buffer.byte_size(), 4);
}

#[test]
fn test_eviction_consolidates_leading_state() {
    let tree = VTree::new(VNode::Element {
        id: "00000".into(),
        tag_name: "div".into(),
        children: Vec::new(),
        attributes: BTreeMap::new(),
    });
    let snapshot = SourceEvent::snapshot(0.0, Snapshot { tree: Some(tree), interaction: None });
    let patch = SourceEvent::patch(1.0, Patch::Attribute {
        target_id: "00000".into(),
        name: "title".into(),
        value: Some("hi".into()),
        old_value: None,
    });
    let events = [snapshot, patch.clone(), patch];
    let encoded: Vec<Vec<u8>> = events.iter().map(|e| encode_event(e).unwrap()).collect();

    let leading = Rc::new(RefCell::new(Snapshot::empty()));
    let state = Rc::clone(&leading);
    let mut buffer = EventBuffer::new(encoded[1].len() * 2);
    let _sub = buffer.on_evict(move |evicted: &[Vec<u8>]| {
        for bytes in evicted {
            apply(&mut state.borrow_mut(), &decode_event(bytes).unwrap());
        }
    });
    for bytes in &encoded {
        buffer.push(bytes.clone());
    }

    let mut expected = Snapshot::empty();
    apply(&mut expected, &events[0]);
    assert_eq!(*leading.borrow(), expected);
    assert_eq!(buffer.len(), 2);
}

#[test]
fn test_evicted_patch_folds_into_leading_snapshot() {
    let class_patch = |id: VNodeId, old: &str, new: &str| Patch::Attribute {
        target_id: id,
        name: "class".into(),
        value: Some(new.into()),
        old_value: Some(old.into()),
    };
    let patch_size = encode_event(&SourceEvent::patch(0.0, class_patch("00000".into(), "a", "b")))
        .unwrap()
        .len();

    let clock = ManualClock::new(0.0);
    let (mut doc, p) = styled_doc();
    let options = RecordingOptions { max_buffer_size: patch_size * 2, ..dom_only() };
    let mut stream = stream(&clock, options);
    stream.start(&mut doc).unwrap();
    let id = stream.node_id(p).unwrap();

    // the snapshot goes first, on its own
    clock.set(10.0);
    doc.set_attribute(p, "class", "b").unwrap();
    stream.poll(&mut doc).unwrap();
    assert_eq!(stream.buffered_events(), 1);
    let previous = stream.leading_snapshot().clone();
    assert_eq!(class_of(&previous, &id), Some("a".into()));

    clock.set(20.0);
    doc.set_attribute(p, "class", "c").unwrap();
    stream.poll(&mut doc).unwrap();
    assert_eq!(stream.buffered_events(), 2);

    // now the class a -> b patch goes
    clock.set(30.0);
    doc.set_attribute(p, "class", "d").unwrap();
    stream.poll(&mut doc).unwrap();
    assert_eq!(stream.buffered_events(), 2);

    let mut expected = previous;
    apply(&mut expected, &SourceEvent::patch(10.0, class_patch(id.clone(), "a", "b")));
    assert_eq!(*stream.leading_snapshot(), expected);
    assert_eq!(class_of(&stream.leading_snapshot(), &id), Some("b".into()));
    assert_eq!(class_of(stream.trailing_snapshot(), &id), Some("d".into()));
}

// ============================================================================
// APPLIER EDGE CASES
// ============================================================================

#[test]
fn test_zero_scroll_on_unknown_target_is_noop() {
    let mut state = InteractionSnapshot::default();
    let scroll = |value| Interaction::Scroll {
        target: "00009".into(),
        from: [0.0, 0.0],
        to: Sample { value, duration: 0.0 },
    };
    apply_interaction(&mut state, &scroll([0.0, 0.0]));
    assert!(state.scroll.is_empty());

    apply_interaction(&mut state, &scroll([0.0, 40.0]));
    apply_interaction(&mut state, &scroll([0.0, 0.0]));
    assert_eq!(state.scroll.get(&VNodeId::from("00009")), Some(&[0.0, 0.0]));
}

// ============================================================================
// STREAM LIFECYCLE
// ============================================================================

#[test]
fn test_double_start_and_stop() {
    let clock = ManualClock::new(0.0);
    let (mut doc, _) = styled_doc();
    let mut once = stream(&clock, RecordingOptions::default());
    let mut twice = stream(&clock, RecordingOptions::default());

    once.start(&mut doc).unwrap();
    let listeners_once = doc.listener_count();
    once.stop(&mut doc).unwrap();

    twice.start(&mut doc).unwrap();
    twice.start(&mut doc).unwrap();
    assert_eq!(doc.listener_count(), listeners_once);
    assert_eq!(twice.buffered_events(), 1);
    twice.stop(&mut doc).unwrap();
    twice.stop(&mut doc).unwrap();
    assert_eq!(doc.listener_count(), 0);
    assert!(!twice.is_started());
}

#[test]
fn test_oversized_attribute_values_are_truncated() {
    let clock = ManualClock::new(0.0);
    let mut doc = Document::default();
    let data_uri = format!("data:image/png;base64,{}", "A".repeat(70_000));
    let img = doc.create_element_with("img", &[("src", data_uri.as_str())]);
    let p = doc.create_element("p");
    doc.append_child(doc.body(), img).unwrap();
    doc.append_child(doc.body(), p).unwrap();

    let mut stream = stream(&clock, dom_only());
    stream.start(&mut doc).unwrap();
    assert!(stream.is_started());
    assert_eq!(stream.buffered_events(), 1);

    doc.set_attribute(img, "src", &"B".repeat(70_000)).unwrap();
    doc.set_attribute(p, "class", "ok").unwrap();
    stream.poll(&mut doc).unwrap();
    assert_eq!(stream.buffered_events(), 3);

    let Some(VNode::Element { attributes, .. }) = stream.peek(&stream.node_id(img).unwrap()).unwrap() else {
        panic!("img should be an element");
    };
    let src = attributes.get("src").cloned().flatten().unwrap();
    assert_eq!(src.len(), u16::MAX as usize);
    assert!(src.starts_with("BBB"));
    assert_eq!(class_of(stream.trailing_snapshot(), &stream.node_id(p).unwrap()), Some("ok".into()));
    assert!(stream.slice().is_ok());
}

#[test]
fn test_unencodable_event_is_dropped_alone() {
    let clock = ManualClock::new(0.0);
    let (mut doc, p) = styled_doc();
    let mut stream = stream(&clock, RecordingOptions::default());
    stream.start(&mut doc).unwrap();

    // tag names are limited to 255 bytes
    let wide = doc.create_element(&"x".repeat(300));
    doc.append_child(doc.body(), wide).unwrap();
    doc.set_attribute(p, "class", "b").unwrap();
    doc.key_down("Enter");
    stream.poll(&mut doc).unwrap();

    let types: Vec<SourceEventType> = stream.slice().unwrap()
        .iter()
        .map(|event| event.unwrap().event_type())
        .collect();
    assert_eq!(types, [
        SourceEventType::Snapshot,
        SourceEventType::DomPatch,
        SourceEventType::Interaction,
        SourceEventType::Snapshot,
    ]);
    let id = stream.node_id(p).unwrap();
    assert_eq!(class_of(stream.trailing_snapshot(), &id), Some("b".into()));
    assert_eq!(stream.peek(&stream.node_id(wide).unwrap()).unwrap(), None);
}

#[test]
fn test_poll_and_peek_before_start() {
    let mut doc = Document::default();
    let mut stream = RecordingStream::new(dom_only());
    assert!(matches!(stream.poll(&mut doc), Err(RecordError::NotStarted)));
    assert!(matches!(stream.peek(&VNodeId::from("00000")), Err(RecordError::NotStarted)));
}

#[test]
fn test_restart_keeps_node_ids() {
    let clock = ManualClock::new(0.0);
    let (mut doc, p) = styled_doc();
    let mut stream = stream(&clock, dom_only());
    stream.start(&mut doc).unwrap();
    let first = stream.node_id(p).unwrap();
    stream.stop(&mut doc).unwrap();

    stream.start(&mut doc).unwrap();
    assert_eq!(stream.node_id(p), Some(first.clone()));
    assert!(stream.peek(&first).unwrap().is_some());
}

#[test]
fn test_unsubscribed_tail_is_released() {
    let clock = ManualClock::new(0.0);
    let (mut doc, p) = styled_doc();
    let mut stream = stream(&clock, dom_only());
    stream.start(&mut doc).unwrap();

    let seen = Rc::new(RefCell::new(0usize));
    let sink = Rc::clone(&seen);
    let mut subscription = stream.tail(move |_| *sink.borrow_mut() += 1);
    assert_eq!(*seen.borrow(), 1);
    assert_eq!(Rc::strong_count(&seen), 2);

    subscription.unsubscribe();
    assert!(!subscription.is_subscribed());
    assert_eq!(Rc::strong_count(&seen), 1);

    doc.set_attribute(p, "class", "b").unwrap();
    stream.poll(&mut doc).unwrap();
    assert_eq!(*seen.borrow(), 1);
}

#[test]
fn test_ignored_selector_hides_subtree() {
    let clock = ManualClock::new(0.0);
    let mut doc = Document::default();
    let secret = doc.create_element_with("div", &[("class", "secret")]);
    let field = doc.create_element("input");
    doc.append_child(doc.body(), secret).unwrap();
    doc.append_child(secret, field).unwrap();

    let mut stream = stream(&clock, dom_only().ignore_selector(".secret"));
    stream.start(&mut doc).unwrap();
    assert_eq!(stream.node_id(secret), None);

    doc.user_input(field, "password").unwrap();
    doc.set_attribute(secret, "title", "x").unwrap();
    stream.poll(&mut doc).unwrap();
    assert_eq!(stream.buffered_events(), 1);
}

// ============================================================================
// SLICE EDGE CASES
// ============================================================================

#[test]
fn test_eviction_then_slice() {
    // Measure the encoded snapshot and patch sizes on an identical document
    let clock = ManualClock::new(0.0);
    let (mut sizing_doc, sizing_p) = styled_doc();
    let mut sizing = stream(&clock, dom_only());
    sizing.start(&mut sizing_doc).unwrap();
    let snapshot_size = sizing.buffered_bytes();
    sizing_doc.set_attribute(sizing_p, "class", "b").unwrap();
    sizing.poll(&mut sizing_doc).unwrap();
    let patch_size = sizing.buffered_bytes() - snapshot_size;

    let clock = ManualClock::new(0.0);
    let (mut doc, p) = styled_doc();
    let options = RecordingOptions { max_buffer_size: snapshot_size + patch_size, ..dom_only() };
    let mut stream = stream(&clock, options);
    stream.start(&mut doc).unwrap();
    let id = stream.node_id(p).unwrap();

    clock.set(50.0);
    doc.set_attribute(p, "class", "b").unwrap();
    stream.poll(&mut doc).unwrap();
    assert_eq!(stream.buffered_events(), 2);
    assert_eq!(stream.buffered_bytes(), snapshot_size + patch_size);

    clock.set(80.0);
    doc.set_attribute(p, "class", "c").unwrap();
    stream.poll(&mut doc).unwrap();
    assert_eq!(stream.buffered_events(), 2);
    assert_eq!(class_of(&stream.leading_snapshot(), &id), Some("a".into()));

    clock.set(100.0);
    let recording = stream.slice().unwrap();
    let types: Vec<SourceEventType> = (0..recording.len())
        .map(|i| recording.event_type(i).unwrap().unwrap())
        .collect();
    assert_eq!(types, [
        SourceEventType::Snapshot,
        SourceEventType::DomPatch,
        SourceEventType::DomPatch,
        SourceEventType::Snapshot,
    ]);
    let times: Vec<f64> = (0..recording.len())
        .map(|i| recording.event_time(i).unwrap().unwrap())
        .collect();
    assert_eq!(times, [0.0, 0.0, 30.0, 50.0]);
    assert_eq!(recording.snapshot_index, vec![0, 3]);
    assert_eq!(recording.duration, 50.0);

    assert_eq!(class_of(&recording.state_at(0).unwrap(), &id), Some("a".into()));
    assert_eq!(class_of(&recording.state_at(1).unwrap(), &id), Some("b".into()));
    assert_eq!(class_of(&recording.state_at(3).unwrap(), &id), Some("c".into()));
}

#[test]
fn test_slice_does_not_alias_buffer() {
    let clock = ManualClock::new(0.0);
    let (mut doc, p) = styled_doc();
    let mut stream = stream(&clock, dom_only());
    stream.start(&mut doc).unwrap();

    let recording = stream.slice().unwrap();
    let before = recording.clone();
    doc.set_attribute(p, "class", "b").unwrap();
    stream.poll(&mut doc).unwrap();

    assert_eq!(recording, before);
    assert_eq!(stream.buffered_events(), 2);
}

#[test]
fn test_transposed_interactions_are_sorted() {
    let clock = ManualClock::new(0.0);
    let mut doc = Document::default();
    let mut stream = stream(&clock, RecordingOptions::default());
    stream.start(&mut doc).unwrap();

    clock.set(10.0);
    doc.pointer_move(4.0, 4.0);
    clock.set(20.0);
    doc.key_down("a");
    clock.set(100.0);
    stream.poll(&mut doc).unwrap();

    let recording = stream.slice().unwrap();
    let times: Vec<f64> = (0..recording.len())
        .map(|i| recording.event_time(i).unwrap().unwrap())
        .collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(times, [0.0, 10.0, 20.0, 100.0]);
    assert!(matches!(
        recording.event(1).unwrap().unwrap().data,
        EventData::Interaction(Interaction::PointerMove { .. })
    ));
}
