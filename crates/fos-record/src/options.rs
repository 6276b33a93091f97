//! Recording configuration

use std::collections::BTreeSet;

use fos_dom::NodeId;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Upper bound of the event buffer, in bytes
pub const MAX_BUFFER_SIZE: usize = 32_000_000;

/// Capture category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingType {
    Dom,
    Interaction,
    Network,
    Performance,
}

/// Sampling windows per interaction kind (ms)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventSampling {
    pub pointer_move: f64,
    pub resize: f64,
    pub scroll: f64,
}

impl Default for EventSampling {
    fn default() -> Self {
        Self { pointer_move: 50.0, resize: 200.0, scroll: 100.0 }
    }
}

/// Recording options
///
/// Deserializing a partial object fills the remaining fields from
/// [`RecordingOptions::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordingOptions {
    pub types: BTreeSet<RecordingType>,
    /// Live node handles; not serializable
    #[serde(skip)]
    pub ignored_nodes: Vec<NodeId>,
    pub ignored_selectors: Vec<String>,
    /// Periodic snapshot interval (ms)
    pub snapshot_interval: f64,
    pub event_sampling: EventSampling,
    pub max_buffer_size: usize,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            types: [RecordingType::Dom, RecordingType::Interaction].into_iter().collect(),
            ignored_nodes: Vec::new(),
            ignored_selectors: Vec::new(),
            snapshot_interval: 10_000.0,
            event_sampling: EventSampling::default(),
            max_buffer_size: MAX_BUFFER_SIZE,
        }
    }
}

impl RecordingOptions {
    /// Parse options from JSON, defaulting missing fields
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn has(&self, kind: RecordingType) -> bool {
        self.types.contains(&kind)
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = RecordingType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    pub fn ignore_node(mut self, node: NodeId) -> Self {
        self.ignored_nodes.push(node);
        self
    }

    pub fn ignore_selector(mut self, selector: impl Into<String>) -> Self {
        self.ignored_selectors.push(selector.into());
        self
    }
}
