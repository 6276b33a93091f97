//! Event and snapshot encoding
//!
//! Every event starts with `[tag u8][time f64]`, so buffer maintenance can
//! read or rewrite the timestamp and read the type without decoding the
//! payload.

use std::collections::BTreeMap;

use super::interaction::{read_interaction, write_interaction};
use super::vdom::{read_patch, read_tree, write_patch, write_tree};
use super::{ByteReader, ByteWriter, CodecResult};
use crate::error::CodecError;
use crate::vdom::{
    EventData, InteractionSnapshot, PointerState, Snapshot, SourceEvent, SourceEventType,
};

/// Tag plus timestamp
pub const EVENT_HEADER_LEN: usize = 1 + 8;

pub fn encode_event(event: &SourceEvent) -> CodecResult<Vec<u8>> {
    let mut w = ByteWriter::new();
    w.u8(event.event_type() as u8);
    w.f64(event.time);
    match &event.data {
        EventData::Snapshot(snapshot) => write_snapshot(&mut w, snapshot)?,
        EventData::DomPatch(patch) => write_patch(&mut w, patch)?,
        EventData::Interaction(interaction) => write_interaction(&mut w, interaction)?,
        EventData::CloseRecording => {}
    }
    Ok(w.into_bytes())
}

pub fn decode_event(bytes: &[u8]) -> CodecResult<SourceEvent> {
    let mut r = ByteReader::new(bytes);
    let tag = r.u8()?;
    let time = r.f64()?;
    let data = match SourceEventType::from_tag(tag) {
        Some(SourceEventType::Snapshot) => EventData::Snapshot(read_snapshot(&mut r)?),
        Some(SourceEventType::DomPatch) => EventData::DomPatch(read_patch(&mut r)?),
        Some(SourceEventType::Interaction) => EventData::Interaction(read_interaction(&mut r)?),
        Some(SourceEventType::CloseRecording) => EventData::CloseRecording,
        None => return Err(CodecError::UnknownTag { kind: "event", tag }),
    };
    Ok(SourceEvent { time, data })
}

fn header(bytes: &[u8]) -> CodecResult<&[u8]> {
    bytes.get(..EVENT_HEADER_LEN).ok_or(CodecError::UnexpectedEof {
        needed: EVENT_HEADER_LEN,
        remaining: bytes.len(),
    })
}

/// Timestamp of an encoded event
pub fn read_event_time(bytes: &[u8]) -> CodecResult<f64> {
    let mut time = [0; 8];
    time.copy_from_slice(&header(bytes)?[1..]);
    Ok(f64::from_le_bytes(time))
}

/// Type of an encoded event
pub fn read_event_type(bytes: &[u8]) -> CodecResult<SourceEventType> {
    let tag = header(bytes)?[0];
    SourceEventType::from_tag(tag).ok_or(CodecError::UnknownTag { kind: "event", tag })
}

/// Rewrite the timestamp of an encoded event in place
pub fn write_event_time(bytes: &mut [u8], time: f64) -> CodecResult<()> {
    header(bytes)?;
    bytes[1..EVENT_HEADER_LEN].copy_from_slice(&time.to_le_bytes());
    Ok(())
}

/// Snapshot payload without an event header
pub fn encode_snapshot(snapshot: &Snapshot) -> CodecResult<Vec<u8>> {
    let mut w = ByteWriter::new();
    write_snapshot(&mut w, snapshot)?;
    Ok(w.into_bytes())
}

pub fn decode_snapshot(bytes: &[u8]) -> CodecResult<Snapshot> {
    read_snapshot(&mut ByteReader::new(bytes))
}

fn write_snapshot(w: &mut ByteWriter, snapshot: &Snapshot) -> CodecResult<()> {
    match &snapshot.tree {
        Some(tree) => {
            w.u8(1);
            write_tree(w, tree)?;
        }
        None => w.u8(0),
    }
    match &snapshot.interaction {
        Some(interaction) => {
            w.u8(1);
            write_interaction_snapshot(w, interaction)?;
        }
        None => w.u8(0),
    }
    Ok(())
}

fn read_snapshot(r: &mut ByteReader<'_>) -> CodecResult<Snapshot> {
    let tree = if r.bool()? { Some(read_tree(r)?) } else { None };
    let interaction = if r.bool()? { Some(read_interaction_snapshot(r)?) } else { None };
    Ok(Snapshot { tree, interaction })
}

fn write_interaction_snapshot(w: &mut ByteWriter, snapshot: &InteractionSnapshot) -> CodecResult<()> {
    w.point(&snapshot.pointer);
    w.u8(match snapshot.pointer_state {
        PointerState::Up => 0,
        PointerState::Down => 1,
    });
    w.len32("scroll map", snapshot.scroll.len())?;
    for (target, offset) in &snapshot.scroll {
        w.id(target)?;
        w.point(offset);
    }
    w.point(&snapshot.viewport);
    Ok(())
}

fn read_interaction_snapshot(r: &mut ByteReader<'_>) -> CodecResult<InteractionSnapshot> {
    let pointer = r.point()?;
    let pointer_state = match r.u8()? {
        0 => PointerState::Up,
        1 => PointerState::Down,
        tag => return Err(CodecError::UnknownTag { kind: "pointer state", tag }),
    };
    let len = r.u32()? as usize;
    let mut scroll = BTreeMap::new();
    for _ in 0..len {
        let target = r.id()?;
        scroll.insert(target, r.point()?);
    }
    let viewport = r.point()?;
    Ok(InteractionSnapshot { pointer, pointer_state, scroll, viewport })
}
