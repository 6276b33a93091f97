//! Error types

use fos_dom::DomError;

/// Binary codec error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid node ID {id:?}: {len} bytes, expected 5")]
    InvalidIdentifier { id: String, len: usize },

    #[error("{field} is {len} bytes, header allows at most {max}")]
    LengthOverflow { field: &'static str, len: usize, max: usize },

    #[error("Unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("Unknown {kind} tag: {tag}")]
    UnknownTag { kind: &'static str, tag: u8 },

    #[error("Invalid UTF-8 in encoded string")]
    InvalidUtf8,
}

/// Recording error
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Recording stream has not been started")]
    NotStarted,

    #[error("Uninitialized state: {0}")]
    UninitializedState(&'static str),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid options: {0}")]
    Options(#[from] serde_json::Error),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),
}

pub type Result<T> = std::result::Result<T, RecordError>;
