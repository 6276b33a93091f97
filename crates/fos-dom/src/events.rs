//! DOM Events
//!
//! Form and user-interaction events dispatched by the document.

use std::fmt;
use std::rc::Rc;

use crate::NodeId;

/// DOM event
#[derive(Debug, Clone, PartialEq)]
pub enum DomEvent {
    /// `input` on a form control
    Input { target: NodeId },
    /// `change` on a form control
    Change { target: NodeId },
    /// `pointermove` in viewport coordinates
    PointerMove { x: f64, y: f64 },
    /// `pointerdown` on `target`
    PointerDown { target: NodeId, x: f64, y: f64 },
    /// `pointerup` on `target`
    PointerUp { target: NodeId, x: f64, y: f64 },
    /// `scroll` of an element or the document
    Scroll { target: NodeId, x: f64, y: f64 },
    /// Viewport `resize`
    Resize { width: f64, height: f64 },
    /// `keydown`
    KeyDown { key: String },
    /// `keyup`
    KeyUp { key: String },
}

/// Event type used for listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Input,
    Change,
    PointerMove,
    PointerDown,
    PointerUp,
    Scroll,
    Resize,
    KeyDown,
    KeyUp,
}

impl DomEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Input { .. } => EventKind::Input,
            Self::Change { .. } => EventKind::Change,
            Self::PointerMove { .. } => EventKind::PointerMove,
            Self::PointerDown { .. } => EventKind::PointerDown,
            Self::PointerUp { .. } => EventKind::PointerUp,
            Self::Scroll { .. } => EventKind::Scroll,
            Self::Resize { .. } => EventKind::Resize,
            Self::KeyDown { .. } => EventKind::KeyDown,
            Self::KeyUp { .. } => EventKind::KeyUp,
        }
    }
}

/// Listener callback
pub type EventHook = Rc<dyn Fn(&DomEvent)>;

/// Listener handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Registered listeners of one document
#[derive(Default)]
pub(crate) struct EventListeners {
    listeners: Vec<(ListenerId, EventKind, EventHook)>,
    next_id: u64,
}

impl fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}

impl EventListeners {
    pub fn add(&mut self, kind: EventKind, hook: EventHook) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, kind, hook));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _, _)| *l != id);
        before != self.listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn hooks_for(&self, kind: EventKind) -> Vec<EventHook> {
        self.listeners.iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, hook)| Rc::clone(hook))
            .collect()
    }
}
