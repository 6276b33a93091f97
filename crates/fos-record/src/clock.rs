//! Time sources

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Millisecond clock
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall-clock time since creation
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Settable clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self { now: Rc::new(Cell::new(start)) }
    }

    pub fn set(&self, time: f64) {
        self.now.set(time);
    }

    pub fn advance(&self, delta: f64) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

/// Output precision of [`format_timestamp`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Seconds,
    Millis,
}

/// Render milliseconds as `mm:ss` or `mm:ss.mmm`
pub fn format_timestamp(ms: f64, precision: Precision) -> String {
    let total = ms.max(0.0) as u64;
    let minutes = total / 60_000;
    let seconds = (total % 60_000) / 1000;
    match precision {
        Precision::Seconds => format!("{:02}:{:02}", minutes, seconds),
        Precision::Millis => format!("{:02}:{:02}.{:03}", minutes, seconds, total % 1000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_shared() {
        let clock = ManualClock::new(10.0);
        let other = clock.clone();
        clock.advance(5.0);
        assert_eq!(other.now(), 15.0);
        other.set(1.0);
        assert_eq!(clock.now(), 1.0);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0, Precision::Seconds), "00:00");
        assert_eq!(format_timestamp(61_250.0, Precision::Seconds), "01:01");
        assert_eq!(format_timestamp(61_250.0, Precision::Millis), "01:01.250");
        assert_eq!(format_timestamp(-5.0, Precision::Millis), "00:00.000");
    }
}
