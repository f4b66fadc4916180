//! Wire codecs.
//!
//! The client never inspects payload bytes itself; it goes through a
//! [`FrameCodec`] for data frames and an [`AttributesCodec`] for the
//! attribute mapping. [`JsonCodec`] and [`crate::ProtobufCodec`] implement
//! both; [`WireFormat`] names the one a client should use.

use crate::{Attributes, Frame, ProtobufCodec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Media type produced and accepted by [`JsonCodec`].
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Codec failure.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed protobuf payload: {0}")]
    Protobuf(#[from] prost::DecodeError),
    #[error("empty payload")]
    Empty,
}

/// Encodes and decodes data frames.
pub trait FrameCodec: Send + Sync {
    /// Value sent in the `Accept` header.
    fn media_type(&self) -> &'static str;

    fn decode(&self, bytes: &[u8]) -> Result<Frame, CodecError>;

    fn decode_list(&self, bytes: &[u8]) -> Result<Vec<Frame>, CodecError>;

    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, CodecError>;

    fn encode_list(&self, frames: &[Frame]) -> Result<Vec<u8>, CodecError>;
}

/// Encodes and decodes the attribute mapping.
pub trait AttributesCodec: Send + Sync {
    fn media_type(&self) -> &'static str;

    fn decode(&self, bytes: &[u8]) -> Result<Attributes, CodecError>;

    fn encode(&self, attrs: &Attributes) -> Result<Vec<u8>, CodecError>;
}

/// Encoding spoken with the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    #[default]
    Protobuf,
    Json,
}

impl WireFormat {
    pub fn frame_codec(self) -> Arc<dyn FrameCodec> {
        match self {
            Self::Protobuf => Arc::new(ProtobufCodec),
            Self::Json => Arc::new(JsonCodec),
        }
    }

    pub fn attributes_codec(self) -> Arc<dyn AttributesCodec> {
        match self {
            Self::Protobuf => Arc::new(ProtobufCodec),
            Self::Json => Arc::new(JsonCodec),
        }
    }
}

/// JSON codec for frames and attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl FrameCodec for JsonCodec {
    fn media_type(&self) -> &'static str {
        CONTENT_TYPE_JSON
    }

    fn decode(&self, bytes: &[u8]) -> Result<Frame, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    fn decode_list(&self, bytes: &[u8]) -> Result<Vec<Frame>, CodecError> {
        // An empty body is an empty result, not a failure.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(frame)?)
    }

    fn encode_list(&self, frames: &[Frame]) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(frames)?)
    }
}

impl AttributesCodec for JsonCodec {
    fn media_type(&self) -> &'static str {
        CONTENT_TYPE_JSON
    }

    fn decode(&self, bytes: &[u8]) -> Result<Attributes, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    fn encode(&self, attrs: &Attributes) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(attrs)?)
    }
}
