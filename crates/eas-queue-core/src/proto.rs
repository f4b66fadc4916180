//! Protocol buffers codec, the queue server's native encoding.
//!
//! proto3 cannot tell an absent field from a zero one, so decoding maps
//! empty payloads, tags and messages to `None`. A frame holding only a
//! message and index 0 decodes as a diagnostic frame.

use crate::codec::{AttributesCodec, CodecError, FrameCodec};
use crate::{Attributes, Frame};
use prost::Message;
use std::collections::HashMap;

/// Media type produced and accepted by [`ProtobufCodec`].
pub const CONTENT_TYPE_PROTOBUF: &str = "application/vnd.google.protobuf";

#[derive(Clone, PartialEq, Message)]
struct DataFrameProto {
    #[prost(uint64, tag = "1")]
    index: u64,
    #[prost(map = "string, string", tag = "2")]
    tags: HashMap<String, String>,
    #[prost(bytes = "vec", tag = "3")]
    data: Vec<u8>,
    #[prost(string, tag = "4")]
    message: String,
}

#[derive(Clone, PartialEq, Message)]
struct DataFrameListProto {
    #[prost(message, repeated, tag = "1")]
    index: Vec<DataFrameProto>,
}

#[derive(Clone, PartialEq, Message)]
struct AttributesProto {
    #[prost(map = "string, string", tag = "1")]
    attributes: HashMap<String, String>,
}

impl From<&Frame> for DataFrameProto {
    fn from(frame: &Frame) -> Self {
        Self {
            index: frame.index.unwrap_or_default(),
            tags: frame
                .tags
                .iter()
                .flat_map(|tags| tags.iter())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            data: frame.data.clone().unwrap_or_default(),
            message: frame.message.clone().unwrap_or_default(),
        }
    }
}

impl From<DataFrameProto> for Frame {
    fn from(proto: DataFrameProto) -> Self {
        let diagnostic = proto.index == 0 && proto.data.is_empty() && !proto.message.is_empty();
        Frame {
            index: (!diagnostic).then_some(proto.index),
            data: (!proto.data.is_empty()).then_some(proto.data),
            tags: (!proto.tags.is_empty()).then(|| proto.tags.into_iter().collect()),
            message: (!proto.message.is_empty()).then_some(proto.message),
        }
    }
}

/// Protocol buffers codec for frames and attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufCodec;

impl FrameCodec for ProtobufCodec {
    fn media_type(&self) -> &'static str {
        CONTENT_TYPE_PROTOBUF
    }

    fn decode(&self, bytes: &[u8]) -> Result<Frame, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        Ok(DataFrameProto::decode(bytes)?.into())
    }

    fn decode_list(&self, bytes: &[u8]) -> Result<Vec<Frame>, CodecError> {
        let list = DataFrameListProto::decode(bytes)?;
        Ok(list.index.into_iter().map(Frame::from).collect())
    }

    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, CodecError> {
        Ok(DataFrameProto::from(frame).encode_to_vec())
    }

    fn encode_list(&self, frames: &[Frame]) -> Result<Vec<u8>, CodecError> {
        let list = DataFrameListProto {
            index: frames.iter().map(DataFrameProto::from).collect(),
        };
        Ok(list.encode_to_vec())
    }
}

impl AttributesCodec for ProtobufCodec {
    fn media_type(&self) -> &'static str {
        CONTENT_TYPE_PROTOBUF
    }

    fn decode(&self, bytes: &[u8]) -> Result<Attributes, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        let proto = AttributesProto::decode(bytes)?;
        Ok(proto.attributes.into_iter().collect())
    }

    fn encode(&self, attrs: &Attributes) -> Result<Vec<u8>, CodecError> {
        let proto = AttributesProto {
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        Ok(proto.encode_to_vec())
    }
}
