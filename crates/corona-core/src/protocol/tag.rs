use std::fmt;

use crate::error::CoronaError;

/// Message tag. Values are part of the wire contract and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Tag {
    ViewPortRequest = 1,
    ViewPortResponse = 2,
    UserJoinRequest = 3,
    UserJoinResponse = 4,
    CreateCookieRequest = 5,
    CreateCookieResponse = 6,
}

impl Tag {
    /// All known tags, in wire order.
    pub const ALL: [Tag; 6] = [
        Tag::ViewPortRequest,
        Tag::ViewPortResponse,
        Tag::UserJoinRequest,
        Tag::UserJoinResponse,
        Tag::CreateCookieRequest,
        Tag::CreateCookieResponse,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Tag::ViewPortRequest => "ViewPortRequest",
            Tag::ViewPortResponse => "ViewPortResponse",
            Tag::UserJoinRequest => "UserJoinRequest",
            Tag::UserJoinResponse => "UserJoinResponse",
            Tag::CreateCookieRequest => "CreateCookieRequest",
            Tag::CreateCookieResponse => "CreateCookieResponse",
        }
    }
}

impl TryFrom<u8> for Tag {
    type Error = CoronaError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Tag::ViewPortRequest),
            2 => Ok(Tag::ViewPortResponse),
            3 => Ok(Tag::UserJoinRequest),
            4 => Ok(Tag::UserJoinResponse),
            5 => Ok(Tag::CreateCookieRequest),
            6 => Ok(Tag::CreateCookieResponse),
            other => Err(CoronaError::UnknownTag(other)),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.as_u8())
    }
}
