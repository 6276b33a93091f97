//! Binary codec
//!
//! Fixed-layout little-endian encoding. Every variant starts with a 1-byte
//! tag; strings and lists carry a length header sized for what they hold
//! (8 bits for names, 16 for attribute and property values, 32 for text and
//! node counts). Node ids are always exactly [`NODE_ID_LEN`] bytes.

mod event;
mod interaction;
mod vdom;

pub use event::{
    decode_event, decode_snapshot, encode_event, encode_snapshot, read_event_time,
    read_event_type, write_event_time, EVENT_HEADER_LEN,
};
pub use interaction::{decode_interaction, encode_interaction};
pub use vdom::{decode_node, decode_patch, decode_tree, encode_node, encode_patch, encode_tree};

use crate::error::CodecError;
use crate::vdom::{Point, VNodeId, NODE_ID_LEN};

pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Append-only byte sink
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bool(&mut self, v: bool) {
        self.u8(v as u8);
    }

    pub fn point(&mut self, p: &Point) {
        self.f64(p[0]);
        self.f64(p[1]);
    }

    /// Exactly `NODE_ID_LEN` UTF-8 bytes
    pub fn id(&mut self, id: &VNodeId) -> CodecResult<()> {
        let bytes = id.as_str().as_bytes();
        if bytes.len() != NODE_ID_LEN {
            return Err(CodecError::InvalidIdentifier {
                id: id.as_str().to_string(),
                len: bytes.len(),
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Presence flag, then the id or zero fill
    pub fn opt_id(&mut self, id: Option<&VNodeId>) -> CodecResult<()> {
        match id {
            Some(id) => {
                self.u8(1);
                self.id(id)
            }
            None => {
                self.u8(0);
                self.buf.extend_from_slice(&[0; NODE_ID_LEN]);
                Ok(())
            }
        }
    }

    pub fn len8(&mut self, field: &'static str, len: usize) -> CodecResult<()> {
        let v = u8::try_from(len).map_err(|_| overflow(field, len, u8::MAX as usize))?;
        self.u8(v);
        Ok(())
    }

    pub fn len16(&mut self, field: &'static str, len: usize) -> CodecResult<()> {
        let v = u16::try_from(len).map_err(|_| overflow(field, len, u16::MAX as usize))?;
        self.u16(v);
        Ok(())
    }

    pub fn len32(&mut self, field: &'static str, len: usize) -> CodecResult<()> {
        let v = u32::try_from(len).map_err(|_| overflow(field, len, u32::MAX as usize))?;
        self.u32(v);
        Ok(())
    }

    pub fn str8(&mut self, field: &'static str, s: &str) -> CodecResult<()> {
        self.len8(field, s.len())?;
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    pub fn str16(&mut self, field: &'static str, s: &str) -> CodecResult<()> {
        self.len16(field, s.len())?;
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    pub fn str32(&mut self, field: &'static str, s: &str) -> CodecResult<()> {
        self.len32(field, s.len())?;
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Presence flag, then a 16-bit string when present
    pub fn opt_str16(&mut self, field: &'static str, s: Option<&str>) -> CodecResult<()> {
        match s {
            Some(s) => {
                self.u8(1);
                self.str16(field, s)
            }
            None => {
                self.u8(0);
                Ok(())
            }
        }
    }
}

fn overflow(field: &'static str, len: usize, max: usize) -> CodecError {
    CodecError::LengthOverflow { field, len, max }
}

/// Bounds-checked cursor over encoded bytes
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(CodecError::UnexpectedEof { needed: n, remaining: self.remaining() });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> CodecResult<u16> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn u32(&mut self) -> CodecResult<u32> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn f64(&mut self) -> CodecResult<f64> {
        self.array().map(f64::from_le_bytes)
    }

    pub fn bool(&mut self) -> CodecResult<bool> {
        Ok(self.u8()? != 0)
    }

    pub fn point(&mut self) -> CodecResult<Point> {
        Ok([self.f64()?, self.f64()?])
    }

    pub fn id(&mut self) -> CodecResult<VNodeId> {
        let bytes = self.take(NODE_ID_LEN)?;
        let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
        Ok(VNodeId::new(s))
    }

    pub fn opt_id(&mut self) -> CodecResult<Option<VNodeId>> {
        let present = self.bool()?;
        let bytes = self.take(NODE_ID_LEN)?;
        if !present {
            return Ok(None);
        }
        let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
        Ok(Some(VNodeId::new(s)))
    }

    fn string(&mut self, len: usize) -> CodecResult<String> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn str8(&mut self) -> CodecResult<String> {
        let len = self.u8()? as usize;
        self.string(len)
    }

    pub fn str16(&mut self) -> CodecResult<String> {
        let len = self.u16()? as usize;
        self.string(len)
    }

    pub fn str32(&mut self) -> CodecResult<String> {
        let len = self.u32()? as usize;
        self.string(len)
    }

    pub fn opt_str16(&mut self) -> CodecResult<Option<String>> {
        if self.bool()? {
            self.str16().map(Some)
        } else {
            Ok(None)
        }
    }
}
