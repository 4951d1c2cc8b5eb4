//! corona core: transport-agnostic wire protocol, codecs, and error types.
//!
//! This crate defines the message catalog exchanged with the cookies game
//! server, the two interchangeable codecs (JSON text, CBOR binary), and the
//! error surface shared with the client crate. It carries no runtime or
//! socket dependencies.
//!
//! # Guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every malformed
//! frame surfaces as a `CoronaError`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod codec;
pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{CoronaError, ErrorKind, Result};
