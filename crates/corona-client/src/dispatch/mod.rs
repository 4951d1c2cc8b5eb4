//! Inbound dispatch: handler trait and the tag-keyed registry.

pub mod registry;

pub use registry::{Dispatch, Handler, HandlerRegistry};
