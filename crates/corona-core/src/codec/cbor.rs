use bytes::Bytes;
use serde_json::Value;

use crate::codec::{Codec, Frame};
use crate::error::{CoronaError, Result};
use crate::protocol::{wire, Message};

/// CBOR codec. Output always goes out as a binary frame.
#[derive(Debug, Clone, Default)]
pub struct CborCodec;

impl CborCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for CborCodec {
    fn name(&self) -> &'static str {
        "cbor"
    }

    fn encode(&self, msg: &Message) -> Result<Frame> {
        wire::ensure_finite(msg)?;
        let mut buf = Vec::with_capacity(64);
        ciborium::into_writer(msg, &mut buf).map_err(|e| CoronaError::Encode(format!("cbor: {e}")))?;
        Ok(Frame::Binary(Bytes::from(buf)))
    }

    fn decode(&self, data: &[u8]) -> Result<Message> {
        let mut rest = data;
        let tree: Value = ciborium::from_reader(&mut rest)
            .map_err(|e| CoronaError::Decode(format!("invalid envelope cbor: {e}")))?;
        if !rest.is_empty() {
            return Err(CoronaError::Decode(format!(
                "{} trailing bytes after envelope",
                rest.len()
            )));
        }
        wire::from_tree(tree)
    }
}
