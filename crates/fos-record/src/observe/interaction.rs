//! Interaction adapter
//!
//! Pointer moves, resizes and scrolls arrive far more often than anyone
//! needs them, so each kind is folded into a sampling window: the first
//! event opens it, later ones move its end point, and it is reported once
//! the configured interval has elapsed since it opened. Discrete events
//! (pointer buttons, keys) are reported as they come.
//!
//! Every reported interaction carries a transposition: how long ago the
//! underlying fact happened, relative to the moment it is drained.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use fos_dom::{Document, DomEvent, EventKind, ListenerId, NodeId};

use super::{IdRegistry, IgnoreRules, Observer};
use crate::clock::Clock;
use crate::options::EventSampling;
use crate::vdom::{Interaction, Point, Sample, VNodeId};

const LISTENED: [EventKind; 7] = [
    EventKind::PointerMove,
    EventKind::PointerDown,
    EventKind::PointerUp,
    EventKind::Scroll,
    EventKind::Resize,
    EventKind::KeyDown,
    EventKind::KeyUp,
];

/// Open sampling window
#[derive(Debug, Clone, Copy)]
struct Window {
    from: Point,
    to: Point,
    start: f64,
    last: f64,
}

impl Window {
    fn open(from: Point, to: Point, at: f64) -> Self {
        Self { from, to, start: at, last: at }
    }

    fn sample(&self) -> Sample<Point> {
        Sample { value: self.to, duration: self.last - self.start }
    }
}

pub struct InteractionObserver {
    sampling: EventSampling,
    clock: Rc<dyn Clock>,
    rules: IgnoreRules,
    listeners: Vec<ListenerId>,
    /// Events stamped with the clock at delivery
    pending: Rc<RefCell<VecDeque<(DomEvent, f64)>>>,
    pointer: Point,
    viewport: Point,
    scroll: BTreeMap<NodeId, Point>,
    move_window: Option<Window>,
    resize_window: Option<Window>,
    scroll_windows: BTreeMap<NodeId, Window>,
}

impl InteractionObserver {
    pub fn new(sampling: EventSampling, rules: IgnoreRules, clock: Rc<dyn Clock>) -> Self {
        Self {
            sampling,
            clock,
            rules,
            listeners: Vec::new(),
            pending: Rc::new(RefCell::new(VecDeque::new())),
            pointer: [0.0, 0.0],
            viewport: [0.0, 0.0],
            scroll: BTreeMap::new(),
            move_window: None,
            resize_window: None,
            scroll_windows: BTreeMap::new(),
        }
    }

    /// Interactions ready to record, each with its transposition (ms)
    pub fn drain(&mut self, doc: &Document, ids: &mut IdRegistry) -> Vec<(Interaction, f64)> {
        let now = self.clock.now();
        let mut out = Vec::new();

        loop {
            let Some((event, at)) = self.pending.borrow_mut().pop_front() else {
                break;
            };
            match event {
                DomEvent::PointerMove { x, y } => {
                    let interval = self.sampling.pointer_move;
                    let from = self.pointer;
                    self.pointer = [x, y];
                    if let Some(window) = sample_into(&mut self.move_window, from, [x, y], at, interval) {
                        out.push(move_interaction(window, now));
                    }
                }
                DomEvent::Resize { width, height } => {
                    let interval = self.sampling.resize;
                    let from = self.viewport;
                    self.viewport = [width, height];
                    if let Some(window) = sample_into(&mut self.resize_window, from, [width, height], at, interval) {
                        out.push(resize_interaction(window, now));
                    }
                }
                DomEvent::Scroll { target, x, y } => {
                    if self.rules.is_ignored(doc, target) {
                        continue;
                    }
                    let interval = self.sampling.scroll;
                    let from = self.scroll.insert(target, [x, y]).unwrap_or_default();
                    let mut slot = self.scroll_windows.remove(&target);
                    if let Some(window) = sample_into(&mut slot, from, [x, y], at, interval) {
                        out.push(scroll_interaction(ids.id_for(target), window, now));
                    }
                    if let Some(window) = slot {
                        self.scroll_windows.insert(target, window);
                    }
                }
                DomEvent::PointerDown { target, x, y } | DomEvent::PointerUp { target, x, y } => {
                    if let Some(window) = self.move_window.take() {
                        out.push(move_interaction(window, now));
                    }
                    self.pointer = [x, y];
                    let targets = self.targets(doc, target, ids);
                    let interaction = if matches!(event, DomEvent::PointerDown { .. }) {
                        Interaction::PointerDown { targets, at: [x, y] }
                    } else {
                        Interaction::PointerUp { targets, at: [x, y] }
                    };
                    out.push((interaction, now - at));
                }
                DomEvent::KeyDown { key } => out.push((Interaction::KeyDown { key }, now - at)),
                DomEvent::KeyUp { key } => out.push((Interaction::KeyUp { key }, now - at)),
                DomEvent::Input { .. } | DomEvent::Change { .. } => {}
            }
        }

        // Windows whose interval ran out while nothing else arrived
        if let Some(window) = take_elapsed(&mut self.move_window, now, self.sampling.pointer_move) {
            out.push(move_interaction(window, now));
        }
        if let Some(window) = take_elapsed(&mut self.resize_window, now, self.sampling.resize) {
            out.push(resize_interaction(window, now));
        }
        let elapsed: Vec<NodeId> = self.scroll_windows.iter()
            .filter(|(_, w)| now - w.start >= self.sampling.scroll)
            .map(|(node, _)| *node)
            .collect();
        for node in elapsed {
            if let Some(window) = self.scroll_windows.remove(&node) {
                out.push(scroll_interaction(ids.id_for(node), window, now));
            }
        }

        if !out.is_empty() {
            tracing::trace!("Drained {} interactions", out.len());
        }
        out
    }

    /// Drop scroll state of nodes no longer in the document
    pub fn retain_connected(&mut self, doc: &Document) {
        self.scroll.retain(|&node, _| doc.tree().is_connected(node));
        self.scroll_windows.retain(|&node, _| doc.tree().is_connected(node));
    }

    /// Recorded ids of the target and its ancestors, innermost first
    fn targets(&self, doc: &Document, target: NodeId, ids: &mut IdRegistry) -> Vec<VNodeId> {
        std::iter::once(target)
            .chain(doc.tree().ancestors(target))
            .filter(|&node| !self.rules.is_ignored(doc, node))
            .map(|node| ids.id_for(node))
            .collect()
    }
}

/// Feed one sampled value; returns a window that has run its interval
fn sample_into(slot: &mut Option<Window>, from: Point, to: Point, at: f64, interval: f64) -> Option<Window> {
    match slot {
        Some(window) if at - window.start >= interval => {
            let done = *window;
            *slot = Some(Window::open(from, to, at));
            Some(done)
        }
        Some(window) => {
            window.to = to;
            window.last = at;
            None
        }
        None => {
            *slot = Some(Window::open(from, to, at));
            None
        }
    }
}

fn take_elapsed(slot: &mut Option<Window>, now: f64, interval: f64) -> Option<Window> {
    if slot.is_some_and(|w| now - w.start >= interval) {
        slot.take()
    } else {
        None
    }
}

fn move_interaction(window: Window, now: f64) -> (Interaction, f64) {
    (Interaction::PointerMove { from: window.from, to: window.sample() }, now - window.start)
}

fn resize_interaction(window: Window, now: f64) -> (Interaction, f64) {
    (Interaction::ViewportResize { from: window.from, to: window.sample() }, now - window.start)
}

fn scroll_interaction(target: VNodeId, window: Window, now: f64) -> (Interaction, f64) {
    (Interaction::Scroll { target, from: window.from, to: window.sample() }, now - window.start)
}

impl Observer for InteractionObserver {
    fn observe(&mut self, doc: &mut Document) {
        if self.is_observing() {
            return;
        }
        self.viewport = doc.viewport();
        self.scroll = doc.tree().descendants(doc.root())
            .into_iter()
            .filter_map(|node| Some((node, doc.tree().get(node)?.scroll)))
            .filter(|(_, scroll)| *scroll != [0.0, 0.0])
            .collect();

        for kind in LISTENED {
            let queue = Rc::clone(&self.pending);
            let clock = Rc::clone(&self.clock);
            self.listeners.push(doc.add_event_listener(kind, Rc::new(move |e: &DomEvent| {
                queue.borrow_mut().push_back((e.clone(), clock.now()));
            })));
        }
        tracing::debug!("Interaction observer attached");
    }

    fn disconnect(&mut self, doc: &mut Document) {
        for id in self.listeners.drain(..) {
            doc.remove_event_listener(id);
        }
        self.pending.borrow_mut().clear();
        self.move_window = None;
        self.resize_window = None;
        self.scroll_windows.clear();
    }

    fn is_observing(&self) -> bool {
        !self.listeners.is_empty()
    }
}
