//! Recording stream
//!
//! Wires the adapters to the applier, the codec and the event buffer:
//!
//! ```text
//! Document ──hooks──▶ adapters ──poll──▶ apply(trailing) ──encode──▶ EventBuffer
//!                                                                      │ evict
//!                                                     leading ◀──apply─┘
//! ```
//!
//! The trailing snapshot is the state after every buffered event; the
//! leading snapshot is the state before the oldest buffered one. `slice`
//! brackets the buffer with both so every recording replays on its own.

use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use fos_dom::Document;

use crate::apply::apply;
use crate::buffer::{EventBuffer, Unsubscribe};
use crate::clock::{Clock, MonotonicClock};
use crate::codec::{decode_event, encode_event, read_event_time, read_event_type, write_event_time};
use crate::error::{RecordError, Result};
use crate::observe::{DomObserver, IdRegistry, IgnoreRules, InteractionObserver, Observer, Periodic, TreeWalker};
use crate::options::{RecordingOptions, RecordingType};
use crate::recording::Recording;
use crate::vdom::{base62, InteractionSnapshot, Snapshot, SourceEvent, SourceEventType, VNode, VNodeId};

const RECORDING_ID_LEN: usize = 11;

pub struct RecordingStream {
    options: RecordingOptions,
    clock: Rc<dyn Clock>,
    started: bool,
    buffer: EventBuffer<Vec<u8>>,
    leading: Rc<RefCell<Snapshot>>,
    trailing: Snapshot,
    ids: IdRegistry,
    walker: TreeWalker,
    dom: Option<DomObserver>,
    interaction: Option<InteractionObserver>,
    periodic: Periodic,
    eviction: Unsubscribe,
    slices: u64,
}

impl RecordingStream {
    pub fn new(options: RecordingOptions) -> Self {
        Self::with_clock(options, Rc::new(MonotonicClock::new()))
    }

    pub fn with_clock(options: RecordingOptions, clock: Rc<dyn Clock>) -> Self {
        let rules = IgnoreRules::from_options(&options);
        let walker = TreeWalker::new(rules.clone());
        let dom = options.has(RecordingType::Dom).then(|| DomObserver::new(walker.clone()));
        let interaction = options.has(RecordingType::Interaction)
            .then(|| InteractionObserver::new(options.event_sampling, rules, Rc::clone(&clock)));

        Self {
            buffer: EventBuffer::new(options.max_buffer_size),
            periodic: Periodic::new(options.snapshot_interval, Rc::clone(&clock)),
            options,
            clock,
            started: false,
            leading: Rc::new(RefCell::new(Snapshot::empty())),
            trailing: Snapshot::empty(),
            ids: IdRegistry::new(),
            walker,
            dom,
            interaction,
            eviction: Unsubscribe::noop(),
            slices: 0,
        }
    }

    pub fn options(&self) -> &RecordingOptions {
        &self.options
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Walk the document, emit the initial snapshot and attach the adapters
    pub fn start(&mut self, doc: &mut Document) -> Result<()> {
        if self.started {
            return Ok(());
        }

        self.trailing = Snapshot::empty();
        let snapshot = self.capture(doc);
        *self.leading.borrow_mut() = Snapshot::empty();

        let event = SourceEvent::snapshot(self.clock.now(), snapshot);
        record(&mut self.trailing, &mut self.buffer, event);

        let leading = Rc::clone(&self.leading);
        self.eviction.unsubscribe();
        self.eviction = self.buffer.on_evict(move |evicted: &[Vec<u8>]| {
            let mut state = leading.borrow_mut();
            for bytes in evicted {
                match decode_event(bytes) {
                    Ok(event) => {
                        apply(&mut state, &event);
                    }
                    Err(err) => tracing::warn!("Dropping undecodable evicted event: {}", err),
                }
            }
        });
        self.started = true;

        if let Some(dom) = self.dom.as_mut() {
            dom.observe(doc);
        }
        if let Some(interaction) = self.interaction.as_mut() {
            interaction.observe(doc);
        }
        self.periodic.observe(doc);

        tracing::debug!(
            "Recording started: {} nodes, {} bytes buffered",
            self.trailing.tree.as_ref().map_or(0, |t| t.len()),
            self.buffer.byte_size()
        );
        Ok(())
    }

    /// Detach the adapters, tell live tails the recording closed, drop the buffer
    pub fn stop(&mut self, doc: &mut Document) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        self.started = false;

        if let Some(dom) = self.dom.as_mut() {
            dom.disconnect(doc);
        }
        if let Some(interaction) = self.interaction.as_mut() {
            interaction.disconnect(doc);
        }
        self.periodic.disconnect(doc);
        self.eviction.unsubscribe();

        let close = encode_event(&SourceEvent::close(self.clock.now()));
        if let Ok(bytes) = &close {
            self.buffer.push(bytes.clone());
        }
        self.buffer.clear();

        tracing::debug!("Recording stopped");
        close.map(|_| ()).map_err(RecordError::from)
    }

    /// Deliver what the adapters saw since the last poll, then fire the snapshot timer if due
    pub fn poll(&mut self, doc: &mut Document) -> Result<()> {
        if !self.started {
            return Err(RecordError::NotStarted);
        }

        if let Some(dom) = self.dom.as_mut() {
            dom.collect(doc);
            while let Some(patches) = dom.next_patches(doc, self.trailing.tree.as_ref(), &mut self.ids) {
                for patch in patches {
                    let event = SourceEvent::patch(self.clock.now(), patch);
                    record(&mut self.trailing, &mut self.buffer, event);
                }
            }
        }

        if let Some(interaction) = self.interaction.as_mut() {
            let now = self.clock.now();
            for (fact, transposition) in interaction.drain(doc, &mut self.ids) {
                let event = SourceEvent::interaction(now - transposition, fact);
                record(&mut self.trailing, &mut self.buffer, event);
            }
            interaction.retain_connected(doc);
        }
        self.ids.retain_connected(doc);

        if self.periodic.due() {
            let snapshot = self.capture(doc);
            let event = SourceEvent::snapshot(self.clock.now(), snapshot);
            record(&mut self.trailing, &mut self.buffer, event);
            tracing::trace!("Periodic snapshot, {} bytes buffered", self.buffer.byte_size());
        }
        Ok(())
    }

    /// Self-sufficient recording of everything buffered, up to now
    pub fn slice(&mut self) -> Result<Recording> {
        if !self.started {
            return Err(RecordError::NotStarted);
        }
        let began = Instant::now();

        let mut copy = self.buffer.copy();
        copy.push(encode_event(&SourceEvent::snapshot(self.clock.now(), self.trailing.clone()))?);

        let mut timed = copy.into_iter()
            .map(|bytes| -> Result<(f64, Vec<u8>)> { Ok((read_event_time(&bytes)?, bytes)) })
            .collect::<Result<Vec<_>>>()?;
        // stable: ties keep arrival order
        timed.sort_by(|a, b| a.0.total_cmp(&b.0));

        let offset = timed.first().map_or(0.0, |(time, _)| *time);
        let mut events = Vec::with_capacity(timed.len() + 1);
        for (time, mut bytes) in timed {
            write_event_time(&mut bytes, time - offset)?;
            events.push(bytes);
        }

        let starts_with_snapshot = match events.first() {
            Some(first) => read_event_type(first)? == SourceEventType::Snapshot,
            None => false,
        };
        if !starts_with_snapshot {
            let leading = self.leading.borrow().clone();
            events.insert(0, encode_event(&SourceEvent::snapshot(0.0, leading))?);
        }

        let mut snapshot_index = Vec::new();
        for (i, bytes) in events.iter().enumerate() {
            if read_event_type(bytes)? == SourceEventType::Snapshot {
                snapshot_index.push(i);
            }
        }
        let duration = match events.last() {
            Some(last) => read_event_time(last)?,
            None => 0.0,
        };

        self.slices += 1;
        let recording = Recording {
            id: self.recording_id(),
            duration,
            events,
            snapshot_index,
            types: self.options.types.iter().copied().collect(),
        };
        tracing::debug!("Sliced {} in {:?}", recording, began.elapsed());
        Ok(recording)
    }

    /// Subscribe to the live stream: trailing snapshot first, then every pushed event
    pub fn tail(&self, mut subscriber: impl FnMut(&SourceEvent) + 'static) -> Unsubscribe {
        subscriber(&SourceEvent::snapshot(self.clock.now(), self.trailing.clone()));
        self.buffer.on_push(move |bytes: &Vec<u8>| match decode_event(bytes) {
            Ok(event) => subscriber(&event),
            Err(err) => tracing::warn!("Tail skipped undecodable event: {}", err),
        })
    }

    /// Current trailing-state node for `id`
    pub fn peek(&self, id: &VNodeId) -> Result<Option<VNode>> {
        if !self.started {
            return Err(RecordError::NotStarted);
        }
        let tree = self.trailing.tree.as_ref().ok_or(RecordError::UninitializedState("tree"))?;
        Ok(tree.get(id).cloned())
    }

    /// Live node ids are stable across restarts, so callers can look them up
    pub fn node_id(&self, node: fos_dom::NodeId) -> Option<VNodeId> {
        self.ids.get(node)
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffer.byte_size()
    }

    pub fn buffered_events(&self) -> usize {
        self.buffer.len()
    }

    /// State before the oldest buffered event
    pub fn leading_snapshot(&self) -> Ref<'_, Snapshot> {
        self.leading.borrow()
    }

    /// State after the newest buffered event
    pub fn trailing_snapshot(&self) -> &Snapshot {
        &self.trailing
    }

    fn capture(&mut self, doc: &Document) -> Snapshot {
        let tree = if self.options.has(RecordingType::Dom) {
            self.walker.walk_document(doc, &mut self.ids)
        } else {
            None
        };
        let mut interaction = self.trailing.interaction.clone().unwrap_or_else(|| InteractionSnapshot {
            viewport: doc.viewport(),
            ..Default::default()
        });
        interaction.scroll.extend(self.walker.scroll_offsets(doc, &mut self.ids));
        Snapshot { tree, interaction: Some(interaction) }
    }

    fn recording_id(&self) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos() as u64);
        base62(nanos ^ self.slices.wrapping_mul(0x9E37_79B9_7F4A_7C15), RECORDING_ID_LEN)
    }
}

/// Encode, apply to the trailing state and push
///
/// An event that does not encode is dropped on its own; the trailing state
/// stays in step with what was buffered.
fn record(trailing: &mut Snapshot, buffer: &mut EventBuffer<Vec<u8>>, event: SourceEvent) {
    match encode_event(&event) {
        Ok(bytes) => {
            apply(trailing, &event);
            buffer.push(bytes);
        }
        Err(err) => {
            tracing::warn!("Dropping {:?} event at {:.1}ms: {}", event.event_type(), event.time, err);
        }
    }
}
