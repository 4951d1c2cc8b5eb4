//! Shared error type across corona crates.

use thiserror::Error;

use crate::protocol::Tag;

/// Stable error codes, suitable for logs and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or schema-mismatched frame.
    Decode,
    /// Frame tag outside the catalog.
    UnknownTag,
    /// Message could not be serialized.
    Encode,
    /// No handler registered for a known tag.
    UnregisteredTag,
    /// Send attempted while the channel is not open.
    NotOpen,
    /// Outbound buffer is full.
    Backpressure,
    /// Underlying connection failed.
    Transport,
    /// A handler reported failure.
    Handler,
    /// Invalid configuration.
    Config,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Reconnect attempts used up.
    RetriesExhausted,
}

impl ErrorKind {
    /// String representation used in logs and test vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Decode => "DECODE",
            ErrorKind::UnknownTag => "UNKNOWN_TAG",
            ErrorKind::Encode => "ENCODE",
            ErrorKind::UnregisteredTag => "UNREGISTERED_TAG",
            ErrorKind::NotOpen => "NOT_OPEN",
            ErrorKind::Backpressure => "BACKPRESSURE",
            ErrorKind::Transport => "TRANSPORT",
            ErrorKind::Handler => "HANDLER",
            ErrorKind::Config => "CONFIG",
            ErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorKind::RetriesExhausted => "RETRIES_EXHAUSTED",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, CoronaError>;

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum CoronaError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("unknown message tag: {0}")]
    UnknownTag(u8),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("no handler registered for {0}")]
    NoHandler(Tag),
    #[error("channel not open (state: {state})")]
    NotOpen { state: &'static str },
    #[error("outbound buffer full")]
    Backpressure,
    #[error("transport: {0}")]
    Transport(String),
    #[error("handler failed: {0}")]
    Handler(String),
    #[error("config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("gave up after {attempts} reconnect attempts")]
    RetriesExhausted { attempts: u32 },
}

impl CoronaError {
    /// Map the error to its stable code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoronaError::Decode(_) => ErrorKind::Decode,
            CoronaError::UnknownTag(_) => ErrorKind::UnknownTag,
            CoronaError::Encode(_) => ErrorKind::Encode,
            CoronaError::NoHandler(_) => ErrorKind::UnregisteredTag,
            CoronaError::NotOpen { .. } => ErrorKind::NotOpen,
            CoronaError::Backpressure => ErrorKind::Backpressure,
            CoronaError::Transport(_) => ErrorKind::Transport,
            CoronaError::Handler(_) => ErrorKind::Handler,
            CoronaError::Config(_) => ErrorKind::Config,
            CoronaError::UnsupportedVersion => ErrorKind::UnsupportedVersion,
            CoronaError::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
        }
    }

    /// Errors that only concern a single inbound frame.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            CoronaError::Decode(_)
                | CoronaError::UnknownTag(_)
                | CoronaError::NoHandler(_)
                | CoronaError::Handler(_)
        )
    }
}
