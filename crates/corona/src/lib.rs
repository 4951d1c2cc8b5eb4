//! Top-level facade crate for corona.
//!
//! Re-exports the protocol core and the client library so users can depend on a single crate.

pub mod core {
    pub use corona_core::*;
}

pub mod client {
    pub use corona_client::*;
}
