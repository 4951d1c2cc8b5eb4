//! Message catalog for the cookies game protocol.
//!
//! Every frame carries one envelope whose `t` field is a [`Tag`]. Requests nest
//! their payload under `d`; some responses put their fields directly on the
//! envelope (see [`wire`]).
//!
//! Schema evolution is additive only: fields may be added to a payload but
//! never removed or renumbered. Decoders ignore keys they do not know.

pub mod message;
pub mod tag;
pub mod wire;

pub use message::{
    CookieInfo, Message, ProtocolVersion, Reserved, UserJoinRequest, UserJoinResponse,
    ViewPortRequest, ViewPortResponse,
};
pub use tag::Tag;
