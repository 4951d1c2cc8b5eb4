//! Pluggable message codecs.
//!
//! - `JsonCodec`: human-readable, emitted as WebSocket text frames.
//! - `CborCodec`: compact, emitted as binary frames. Both peers must agree on
//!   the schema; keys are carried as in JSON.
//!
//! Both decode through [`crate::protocol::wire::from_tree`], so the same
//! malformed input yields the same error kind whichever codec is in use.

pub mod cbor;
pub mod json;

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::Deserialize;

use crate::error::Result;
use crate::protocol::Message;

pub use cbor::CborCodec;
pub use json::JsonCodec;

/// One encoded envelope, ready for the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(s) => s.as_bytes(),
            Frame::Binary(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Frame::Text(_))
    }
}

/// Encode/decode strategy for envelopes.
pub trait Codec: Send + Sync + fmt::Debug {
    /// Short name used in logs and config.
    fn name(&self) -> &'static str;

    fn encode(&self, msg: &Message) -> Result<Frame>;

    fn decode(&self, data: &[u8]) -> Result<Message>;
}

/// Codec selector, as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Json,
    Cbor,
}

impl CodecKind {
    pub fn build(self) -> Arc<dyn Codec> {
        match self {
            CodecKind::Json => Arc::new(JsonCodec::new()),
            CodecKind::Cbor => Arc::new(CborCodec::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CodecKind::Json => "json",
            CodecKind::Cbor => "cbor",
        }
    }
}
