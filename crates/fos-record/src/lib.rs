//! fOS Record - DOM session recording
//!
//! Captures a live [`fos_dom::Document`] and user interaction into a compact,
//! byte-budgeted, seekable recording:
//!
//! - [`vdom`] - virtual tree, patches, interactions and events
//! - [`codec`] - fixed-layout binary encoding of all of the above
//! - [`apply`] - the one place where patches and interactions change state
//! - [`buffer`] - byte-budgeted FIFO of encoded events
//! - [`observe`] - adapters turning live document facts into patches
//! - [`stream`] - the recording orchestrator (`start`/`stop`/`slice`/`tail`/`peek`)

pub mod apply;
pub mod buffer;
pub mod clock;
pub mod codec;
pub mod fixtures;
pub mod observe;
pub mod options;
pub mod recording;
pub mod stream;
pub mod vdom;

mod error;

pub use apply::{apply, apply_interaction, apply_patch};
pub use buffer::{EventBuffer, Unsubscribe};
pub use clock::{format_timestamp, Clock, ManualClock, MonotonicClock, Precision};
pub use codec::{
    decode_event, decode_snapshot, encode_event, encode_snapshot, read_event_time, read_event_type,
};
pub use error::{CodecError, RecordError, Result};
pub use options::{EventSampling, RecordingOptions, RecordingType};
pub use recording::Recording;
pub use stream::RecordingStream;
pub use vdom::{
    EventData, IdAllocator, Interaction, InteractionSnapshot, Patch, Point, PointerState, Sample,
    Snapshot, SourceEvent, SourceEventType, VNode, VNodeId, VTree,
};
