use serde_json::Value;

use crate::codec::{Codec, Frame};
use crate::error::{CoronaError, Result};
use crate::protocol::{wire, Message};

/// JSON codec. Output always goes out as a text frame.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Pretty-printed output, handy when eyeballing traffic.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, msg: &Message) -> Result<Frame> {
        wire::ensure_finite(msg)?;
        let s = if self.pretty {
            serde_json::to_string_pretty(msg)
        } else {
            serde_json::to_string(msg)
        }
        .map_err(|e| CoronaError::Encode(format!("json: {e}")))?;
        Ok(Frame::Text(s))
    }

    fn decode(&self, data: &[u8]) -> Result<Message> {
        let tree: Value = serde_json::from_slice(data)
            .map_err(|e| CoronaError::Decode(format!("invalid envelope json: {e}")))?;
        wire::from_tree(tree)
    }
}
