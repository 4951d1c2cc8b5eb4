//! corona client library entry.
//!
//! This crate wires the connection lifecycle, the tag-keyed handler registry,
//! and the reconnect supervisor on top of `corona-core`. It is consumed by the
//! binary (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod dispatch;
pub mod supervisor;
pub mod transport;

pub use dispatch::{Dispatch, Handler, HandlerRegistry};
pub use supervisor::{RetryPolicy, Supervisor};
pub use transport::{Channel, ChannelBuilder, ConnectionState, SendOutcome, SendPolicy};
