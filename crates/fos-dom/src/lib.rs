//! fOS DOM - Document Object Model
//!
//! Arena-based live document used by the session recorder: tree mutation,
//! mutation observers, form controls, style sheets, interceptable
//! properties and input events.

mod node;
mod tree;
mod document;
mod observer;
mod intercept;
mod events;
mod selector;
mod stylesheet;
pub mod forms;

pub use node::{Node, NodeData, ElementData, TextData, DoctypeData, Attribute};
pub use tree::DomTree;
pub use document::Document;
pub use observer::{MutationObserverInit, MutationRecord, MutationSequence, MutationType, ObserverId};
pub use intercept::{InterceptPoint, Intercepted, InterceptHook, InterceptionId};
pub use events::{DomEvent, EventKind, EventHook, ListenerId};
pub use selector::{SimpleSelector, Selector};
pub use stylesheet::StyleSheet;
pub use forms::{ControlKind, FormControl, InputType};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);
    /// Invalid/none sentinel
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this ID points at a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// DOM error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Node not found: {0:?}")]
    NotFound(NodeId),

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(&'static str),

    #[error("Index {index} out of range (length {len})")]
    IndexSize { index: usize, len: usize },

    #[error("Node {0:?} is not a form control")]
    NotAControl(NodeId),

    #[error("Node {0:?} does not own a style sheet")]
    NotAStyleSheet(NodeId),
}

pub type Result<T> = std::result::Result<T, DomError>;
