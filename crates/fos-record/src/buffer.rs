//! Bounded event buffer
//!
//! Append-only sequence of encoded events, budgeted by total byte size.
//! Oldest events are evicted whole once the budget is exceeded; a single
//! event larger than the budget is still accepted and kept on its own.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

type PushListener<T> = Rc<RefCell<dyn FnMut(&T)>>;
type EvictListener<T> = Rc<RefCell<dyn FnMut(&[T])>>;

struct Listeners<T> {
    next_id: u64,
    push: Vec<(u64, PushListener<T>)>,
    evict: Vec<(u64, EvictListener<T>)>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self { next_id: 0, push: Vec::new(), evict: Vec::new() }
    }
}

impl<T> Listeners<T> {
    fn remove(&mut self, id: u64) {
        self.push.retain(|(l, _)| *l != id);
        self.evict.retain(|(l, _)| *l != id);
    }
}

/// Handle returned by a subscription
///
/// Calling [`Unsubscribe::unsubscribe`] more than once is harmless. Dropping
/// the handle keeps the listener registered.
pub struct Unsubscribe {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Unsubscribe {
    fn new(detach: impl FnOnce() + 'static) -> Self {
        Self { detach: Some(Box::new(detach)) }
    }

    /// Handle that is already detached
    pub fn noop() -> Self {
        Self { detach: None }
    }

    pub fn unsubscribe(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.detach.is_some()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

/// Byte-budgeted FIFO of encoded events
pub struct EventBuffer<T> {
    events: VecDeque<T>,
    byte_size: usize,
    max_size: usize,
    listeners: Rc<RefCell<Listeners<T>>>,
}

impl<T> fmt::Debug for EventBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBuffer")
            .field("len", &self.events.len())
            .field("byte_size", &self.byte_size)
            .field("max_size", &self.max_size)
            .finish()
    }
}

impl<T: AsRef<[u8]> + Clone + 'static> EventBuffer<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            events: VecDeque::new(),
            byte_size: 0,
            max_size,
            listeners: Rc::new(RefCell::new(Listeners::default())),
        }
    }

    /// Append an event, notify push listeners, then evict down to budget
    pub fn push(&mut self, event: T) {
        self.byte_size += event.as_ref().len();
        self.events.push_back(event);

        let push: Vec<PushListener<T>> = self.listeners.borrow().push.iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        if let Some(last) = self.events.back() {
            for listener in push {
                (&mut *listener.borrow_mut())(last);
            }
        }

        let mut evicted = Vec::new();
        while self.byte_size > self.max_size && self.events.len() > 1 {
            if let Some(oldest) = self.events.pop_front() {
                self.byte_size -= oldest.as_ref().len();
                evicted.push(oldest);
            }
        }
        if evicted.is_empty() {
            return;
        }

        tracing::debug!(
            "Evicted {} events, {} bytes buffered of {}",
            evicted.len(),
            self.byte_size,
            self.max_size
        );
        let evict: Vec<EvictListener<T>> = self.listeners.borrow().evict.iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in evict {
            (&mut *listener.borrow_mut())(&evicted);
        }
    }

    /// Point-in-time copy of the buffered events
    pub fn copy(&self) -> Vec<T> {
        self.events.iter().cloned().collect()
    }

    /// Drop everything without notifying eviction listeners
    pub fn clear(&mut self) {
        self.events.clear();
        self.byte_size = 0;
    }

    pub fn on_push(&self, listener: impl FnMut(&T) + 'static) -> Unsubscribe {
        let mut listeners = self.listeners.borrow_mut();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.push.push((id, Rc::new(RefCell::new(listener))));
        self.detacher(id)
    }

    pub fn on_evict(&self, listener: impl FnMut(&[T]) + 'static) -> Unsubscribe {
        let mut listeners = self.listeners.borrow_mut();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.evict.push((id, Rc::new(RefCell::new(listener))));
        self.detacher(id)
    }

    fn detacher(&self, id: u64) -> Unsubscribe {
        let registry: Weak<RefCell<Listeners<T>>> = Rc::downgrade(&self.listeners);
        Unsubscribe::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().remove(id);
            }
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total bytes currently buffered
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn listener_count(&self) -> usize {
        let listeners = self.listeners.borrow();
        listeners.push.len() + listeners.evict.len()
    }
}
