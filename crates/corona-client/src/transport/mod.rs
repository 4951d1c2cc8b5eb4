//! Transport layer (WebSocket client).
//!
//! A [`Channel`] owns one connection, one codec, and one handler registry.
//! The connection itself comes from a [`Connector`], so tests can swap the
//! socket for an in-memory pipe.

pub mod channel;
pub mod connector;
pub mod state;
pub mod stats;

pub use channel::{Channel, ChannelBuilder, SendOutcome, SendPolicy};
pub use connector::{Connector, FrameSink, FrameStream, WsConnector};
pub use state::ConnectionState;
pub use stats::{ChannelStats, StatsSnapshot};
