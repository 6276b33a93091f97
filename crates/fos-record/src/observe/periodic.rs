//! Periodic snapshot timer

use std::rc::Rc;

use fos_dom::Document;

use super::Observer;
use crate::clock::Clock;

/// Fires once per elapsed interval; missed ticks collapse into one
pub struct Periodic {
    interval: f64,
    clock: Rc<dyn Clock>,
    next: Option<f64>,
}

impl Periodic {
    /// A non-positive interval never fires
    pub fn new(interval: f64, clock: Rc<dyn Clock>) -> Self {
        Self { interval, clock, next: None }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Has a tick elapsed since the last call; re-arms when it has
    pub fn due(&mut self) -> bool {
        let Some(next) = self.next else {
            return false;
        };
        let now = self.clock.now();
        if now < next {
            return false;
        }
        let missed = ((now - next) / self.interval).floor();
        self.next = Some(next + (missed + 1.0) * self.interval);
        true
    }
}

impl Observer for Periodic {
    fn observe(&mut self, _doc: &mut Document) {
        if self.interval > 0.0 && self.next.is_none() {
            self.next = Some(self.clock.now() + self.interval);
        }
    }

    fn disconnect(&mut self, _doc: &mut Document) {
        self.next = None;
    }

    fn is_observing(&self) -> bool {
        self.next.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_fires_once_per_interval() {
        let clock = ManualClock::new(0.0);
        let mut doc = Document::default();
        let mut timer = Periodic::new(100.0, Rc::new(clock.clone()));
        assert!(!timer.due());

        timer.observe(&mut doc);
        clock.set(99.0);
        assert!(!timer.due());
        clock.set(100.0);
        assert!(timer.due());
        assert!(!timer.due());

        // three intervals missed, one tick
        clock.set(450.0);
        assert!(timer.due());
        assert!(!timer.due());
        clock.set(500.0);
        assert!(timer.due());

        timer.disconnect(&mut doc);
        clock.set(10_000.0);
        assert!(!timer.due());
    }

    #[test]
    fn test_zero_interval_is_disabled() {
        let mut doc = Document::default();
        let mut timer = Periodic::new(0.0, Rc::new(ManualClock::new(0.0)));
        timer.observe(&mut doc);
        assert!(!timer.is_observing());
        assert!(!timer.due());
    }
}
