//! Interaction encoding

use super::{ByteReader, ByteWriter, CodecResult};
use crate::error::CodecError;
use crate::vdom::{Interaction, Point, Sample, VNodeId};

const VIEWPORT_RESIZE: u8 = 0;
const SCROLL: u8 = 1;
const POINTER_MOVE: u8 = 2;
const POINTER_DOWN: u8 = 3;
const POINTER_UP: u8 = 4;
const KEY_DOWN: u8 = 5;
const KEY_UP: u8 = 6;

pub fn encode_interaction(interaction: &Interaction) -> CodecResult<Vec<u8>> {
    let mut w = ByteWriter::new();
    write_interaction(&mut w, interaction)?;
    Ok(w.into_bytes())
}

pub fn decode_interaction(bytes: &[u8]) -> CodecResult<Interaction> {
    read_interaction(&mut ByteReader::new(bytes))
}

fn write_sample(w: &mut ByteWriter, sample: &Sample<Point>) {
    w.point(&sample.value);
    w.f64(sample.duration);
}

fn read_sample(r: &mut ByteReader<'_>) -> CodecResult<Sample<Point>> {
    Ok(Sample { value: r.point()?, duration: r.f64()? })
}

fn write_targets(w: &mut ByteWriter, targets: &[VNodeId]) -> CodecResult<()> {
    w.len16("target list", targets.len())?;
    for target in targets {
        w.id(target)?;
    }
    Ok(())
}

fn read_targets(r: &mut ByteReader<'_>) -> CodecResult<Vec<VNodeId>> {
    let len = r.u16()? as usize;
    (0..len).map(|_| r.id()).collect()
}

pub(crate) fn write_interaction(w: &mut ByteWriter, interaction: &Interaction) -> CodecResult<()> {
    match interaction {
        Interaction::ViewportResize { from, to } => {
            w.u8(VIEWPORT_RESIZE);
            w.point(from);
            write_sample(w, to);
        }
        Interaction::Scroll { target, from, to } => {
            w.u8(SCROLL);
            w.id(target)?;
            w.point(from);
            write_sample(w, to);
        }
        Interaction::PointerMove { from, to } => {
            w.u8(POINTER_MOVE);
            w.point(from);
            write_sample(w, to);
        }
        Interaction::PointerDown { targets, at } => {
            w.u8(POINTER_DOWN);
            write_targets(w, targets)?;
            w.point(at);
        }
        Interaction::PointerUp { targets, at } => {
            w.u8(POINTER_UP);
            write_targets(w, targets)?;
            w.point(at);
        }
        Interaction::KeyDown { key } => {
            w.u8(KEY_DOWN);
            w.str8("key", key)?;
        }
        Interaction::KeyUp { key } => {
            w.u8(KEY_UP);
            w.str8("key", key)?;
        }
    }
    Ok(())
}

pub(crate) fn read_interaction(r: &mut ByteReader<'_>) -> CodecResult<Interaction> {
    let interaction = match r.u8()? {
        VIEWPORT_RESIZE => Interaction::ViewportResize { from: r.point()?, to: read_sample(r)? },
        SCROLL => Interaction::Scroll { target: r.id()?, from: r.point()?, to: read_sample(r)? },
        POINTER_MOVE => Interaction::PointerMove { from: r.point()?, to: read_sample(r)? },
        POINTER_DOWN => Interaction::PointerDown { targets: read_targets(r)?, at: r.point()? },
        POINTER_UP => Interaction::PointerUp { targets: read_targets(r)?, at: r.point()? },
        KEY_DOWN => Interaction::KeyDown { key: r.str8()? },
        KEY_UP => Interaction::KeyUp { key: r.str8()? },
        tag => return Err(CodecError::UnknownTag { kind: "interaction", tag }),
    };
    Ok(interaction)
}
