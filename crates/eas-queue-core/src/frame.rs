//! Data frames.
//!
//! A frame is one unit of queue data as delivered to a reader. Every field is
//! optional: index-only watches carry no payload, and a frame holding nothing
//! but a `message` reports a failure in-band.

use crate::Tags;
use serde::{Deserialize, Serialize};

/// One unit of queue data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Position of the frame in the queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    /// Payload bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
    /// Tags attached when the frame was enqueued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    /// Diagnostic text for frames that report a failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Frame {
    /// Create a frame carrying a payload at `index`.
    pub fn new(index: u64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            index: Some(index),
            data: Some(data.into()),
            ..Self::default()
        }
    }

    /// Create an index-only frame.
    pub fn index_only(index: u64) -> Self {
        Self {
            index: Some(index),
            ..Self::default()
        }
    }

    /// Create a frame that only carries a diagnostic message.
    pub fn diagnostic(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Attach tags.
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = Some(tags);
        self
    }

    /// True if this frame reports a failure rather than queue data.
    pub fn is_diagnostic(&self) -> bool {
        self.message.is_some() && self.index.is_none() && self.data.is_none()
    }
}
