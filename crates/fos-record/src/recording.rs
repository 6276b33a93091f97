//! Finished recordings
//!
//! A [`Recording`] owns its encoded events outright and never shares them
//! with the live buffer. Event 0 is always a snapshot at time 0, so any
//! position can be rebuilt from the nearest snapshot at or before it.

use std::fmt;

use crate::apply::apply;
use crate::clock::{format_timestamp, Precision};
use crate::codec::{decode_event, encode_event, read_event_time, read_event_type};
use crate::error::{RecordError, Result};
use crate::options::RecordingType;
use crate::vdom::{Snapshot, SourceEvent, SourceEventType};

#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub id: String,
    /// Time of the last event (ms)
    pub duration: f64,
    pub events: Vec<Vec<u8>>,
    /// Positions of the snapshot events, ascending
    pub snapshot_index: Vec<usize>,
    pub types: Vec<RecordingType>,
}

impl Recording {
    /// Encode decoded events as they are; times are kept and the index rebuilt
    pub fn from_events(id: impl Into<String>, events: &[SourceEvent], types: Vec<RecordingType>) -> Result<Self> {
        let encoded = events.iter().map(encode_event).collect::<std::result::Result<Vec<_>, _>>()?;
        let snapshot_index = events.iter()
            .enumerate()
            .filter(|(_, e)| e.event_type() == SourceEventType::Snapshot)
            .map(|(i, _)| i)
            .collect();
        Ok(Self {
            id: id.into(),
            duration: events.last().map_or(0.0, |e| e.time),
            events: encoded,
            snapshot_index,
            types,
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn event(&self, index: usize) -> Option<Result<SourceEvent>> {
        self.events.get(index).map(|bytes| decode_event(bytes).map_err(RecordError::from))
    }

    pub fn event_time(&self, index: usize) -> Option<Result<f64>> {
        self.events.get(index).map(|bytes| read_event_time(bytes).map_err(RecordError::from))
    }

    pub fn event_type(&self, index: usize) -> Option<Result<SourceEventType>> {
        self.events.get(index).map(|bytes| read_event_type(bytes).map_err(RecordError::from))
    }

    /// Decoded events in order
    pub fn iter(&self) -> impl Iterator<Item = Result<SourceEvent>> + '_ {
        self.events.iter().map(|bytes| decode_event(bytes).map_err(RecordError::from))
    }

    pub fn has(&self, kind: RecordingType) -> bool {
        self.types.contains(&kind)
    }

    /// State after applying event `index`, starting from the nearest snapshot
    pub fn state_at(&self, index: usize) -> Result<Snapshot> {
        let index = index.min(self.events.len().saturating_sub(1));
        let start = self.snapshot_index.iter()
            .rev()
            .find(|&&i| i <= index)
            .copied()
            .unwrap_or(0);

        let mut state = Snapshot::empty();
        for bytes in self.events.iter().take(index + 1).skip(start) {
            apply(&mut state, &decode_event(bytes)?);
        }
        Ok(state)
    }
}

impl fmt::Display for Recording {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "recording {} ({} events, {} snapshots, {})",
            self.id,
            self.events.len(),
            self.snapshot_index.len(),
            format_timestamp(self.duration, Precision::Millis)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdom::{Patch, VNode, VTree};
    use std::collections::BTreeMap;

    fn events() -> Vec<SourceEvent> {
        let tree = VTree::new(VNode::Element {
            id: "00000".into(),
            tag_name: "div".into(),
            children: Vec::new(),
            attributes: BTreeMap::new(),
        });
        let class = |time, value: &str| SourceEvent::patch(time, Patch::Attribute {
            target_id: "00000".into(),
            name: "class".into(),
            value: Some(value.into()),
            old_value: None,
        });
        vec![
            SourceEvent::snapshot(0.0, Snapshot { tree: Some(tree), interaction: None }),
            class(10.0, "a"),
            class(20.0, "b"),
        ]
    }

    fn class_of(state: &Snapshot) -> Option<String> {
        match state.tree.as_ref()?.root()? {
            VNode::Element { attributes, .. } => attributes.get("class").cloned().flatten(),
            _ => None,
        }
    }

    #[test]
    fn test_from_events() {
        let recording = Recording::from_events("abc", &events(), vec![RecordingType::Dom]).unwrap();
        assert_eq!(recording.len(), 3);
        assert_eq!(recording.snapshot_index, vec![0]);
        assert_eq!(recording.duration, 20.0);
        assert_eq!(recording.event_type(1).unwrap().unwrap(), SourceEventType::DomPatch);
        assert!(recording.event(3).is_none());
        assert_eq!(recording.iter().filter(|e| e.is_ok()).count(), 3);
        assert!(recording.has(RecordingType::Dom));
    }

    #[test]
    fn test_state_at_replays_from_snapshot() {
        let recording = Recording::from_events("abc", &events(), vec![RecordingType::Dom]).unwrap();
        assert_eq!(class_of(&recording.state_at(0).unwrap()), None);
        assert_eq!(class_of(&recording.state_at(1).unwrap()), Some("a".into()));
        assert_eq!(class_of(&recording.state_at(99).unwrap()), Some("b".into()));
    }

    #[test]
    fn test_display() {
        let recording = Recording::from_events("abc", &events(), Vec::new()).unwrap();
        assert_eq!(recording.to_string(), "recording abc (3 events, 1 snapshots, 00:00.020)");
    }
}
