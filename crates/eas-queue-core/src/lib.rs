//! Core types for the EAS queue service protocol.
//!
//! This crate provides the protocol primitives shared by clients and test
//! servers: frames, tags, server attributes, users and the codecs that move
//! them over the wire. Networking lives in `eas-queue-client`.

mod attributes;
mod codec;
mod frame;
mod proto;
mod tags;
mod user;

pub use attributes::{AttributeKey, Attributes};
pub use codec::{
    AttributesCodec, CONTENT_TYPE_JSON, CodecError, FrameCodec, JsonCodec, WireFormat,
};
pub use frame::Frame;
pub use proto::{CONTENT_TYPE_PROTOBUF, ProtobufCodec};
pub use tags::{TagError, Tags};
pub use user::{DEFAULT_GROUP_NAME, QueueUser, UserParseError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Enqueue priority. Prioritized data is delivered to watchers before normal
/// data; zero means "normal".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Priority(pub u32);

impl Priority {
    pub const NORMAL: Priority = Priority(0);

    pub fn is_elevated(self) -> bool {
        self.0 > 0
    }
}

/// Result code reported with a negative acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeCode(pub u32);

impl fmt::Display for NegativeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
