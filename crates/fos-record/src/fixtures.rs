//! JSON fixtures
//!
//! Hand-written or exported event lists in the serde form of
//! [`SourceEvent`], for replay tests and tooling.

use crate::error::Result;
use crate::options::RecordingType;
use crate::recording::Recording;
use crate::vdom::SourceEvent;

/// Parse a JSON array of events
pub fn events_from_json(json: &str) -> Result<Vec<SourceEvent>> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a JSON array of events into an encoded recording
pub fn recording_from_json(id: &str, json: &str, types: Vec<RecordingType>) -> Result<Recording> {
    let events = events_from_json(json)?;
    tracing::debug!("Loaded {} fixture events", events.len());
    Recording::from_events(id, &events, types)
}
