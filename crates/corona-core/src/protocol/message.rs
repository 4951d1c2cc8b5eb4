//! Payload types and catalog constructors.
//!
//! Constructors pin the tag and assemble the payload as given. No range or
//! type checks happen here; the server is the authority on values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoronaError, Result};
use crate::protocol::tag::Tag;

/// Protocol revision of a payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProtocolVersion {
    V1,
    /// Adds heading (`R`) and turbo (`T`) to the viewport request.
    V2,
}

/// Visible area of the world, plus the player's heading from v2 on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewPortRequest {
    #[serde(rename = "X")]
    pub x: f32,
    #[serde(rename = "Y")]
    pub y: f32,
    #[serde(rename = "XX")]
    pub xx: f32,
    #[serde(rename = "YY")]
    pub yy: f32,
    #[serde(rename = "R", default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
    #[serde(rename = "T", default, skip_serializing_if = "Option::is_none")]
    pub turbo: Option<bool>,
}

impl ViewPortRequest {
    pub fn version(&self) -> ProtocolVersion {
        if self.angle.is_some() || self.turbo.is_some() {
            ProtocolVersion::V2
        } else {
            ProtocolVersion::V1
        }
    }
}

/// One cookie as the server reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieInfo {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "SC")]
    pub score: u64,
    #[serde(rename = "X")]
    pub x: f32,
    #[serde(rename = "Y")]
    pub y: f32,
    #[serde(rename = "AV")]
    pub angular_velocity: f32,
}

/// Cookies inside the requested viewport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewPortResponse {
    pub cookies: Vec<CookieInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserJoinRequest {
    #[serde(rename = "UN")]
    pub username: String,
}

/// Join result. When the name is taken, `alt_names` carries suggestions.
#[derive(Debug, Clone, PartialEq)]
pub struct UserJoinResponse {
    pub ok: bool,
    pub alt_names: Vec<String>,
}

/// Payload of a message whose shape is not pinned down yet.
///
/// Carried verbatim so it survives a decode/encode cycle untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reserved {
    pub payload: Option<Value>,
}

impl Reserved {
    /// Reads the payload with the cookie shape the server currently sends.
    pub fn as_cookie_info(&self) -> Result<CookieInfo> {
        let payload = self
            .payload
            .clone()
            .ok_or_else(|| CoronaError::Decode("reserved payload is empty".into()))?;
        serde_json::from_value(payload)
            .map_err(|e| CoronaError::Decode(format!("reserved payload is not a cookie: {e}")))
    }
}

/// One envelope on the wire. The variant fixes both the tag and the payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    ViewPortRequest(ViewPortRequest),
    ViewPortResponse(ViewPortResponse),
    UserJoinRequest(UserJoinRequest),
    UserJoinResponse(UserJoinResponse),
    CreateCookieRequest,
    CreateCookieResponse(Reserved),
}

impl Message {
    pub fn view_port_request(x: f32, y: f32, xx: f32, yy: f32) -> Self {
        Message::ViewPortRequest(ViewPortRequest {
            x,
            y,
            xx,
            yy,
            angle: None,
            turbo: None,
        })
    }

    pub fn view_port_request_v2(x: f32, y: f32, xx: f32, yy: f32, angle: f32, turbo: bool) -> Self {
        Message::ViewPortRequest(ViewPortRequest {
            x,
            y,
            xx,
            yy,
            angle: Some(angle),
            turbo: Some(turbo),
        })
    }

    pub fn view_port_response(cookies: Vec<CookieInfo>) -> Self {
        Message::ViewPortResponse(ViewPortResponse { cookies })
    }

    pub fn user_join_request(username: impl Into<String>) -> Self {
        Message::UserJoinRequest(UserJoinRequest {
            username: username.into(),
        })
    }

    pub fn user_join_response<S: Into<String>>(ok: bool, alt_names: impl IntoIterator<Item = S>) -> Self {
        Message::UserJoinResponse(UserJoinResponse {
            ok,
            alt_names: alt_names.into_iter().map(Into::into).collect(),
        })
    }

    pub fn create_cookie_request() -> Self {
        Message::CreateCookieRequest
    }

    pub fn create_cookie_response(payload: Option<Value>) -> Self {
        Message::CreateCookieResponse(Reserved { payload })
    }

    pub fn tag(&self) -> Tag {
        match self {
            Message::ViewPortRequest(_) => Tag::ViewPortRequest,
            Message::ViewPortResponse(_) => Tag::ViewPortResponse,
            Message::UserJoinRequest(_) => Tag::UserJoinRequest,
            Message::UserJoinResponse(_) => Tag::UserJoinResponse,
            Message::CreateCookieRequest => Tag::CreateCookieRequest,
            Message::CreateCookieResponse(_) => Tag::CreateCookieResponse,
        }
    }

    /// Lowest protocol version able to carry this message.
    pub fn version(&self) -> ProtocolVersion {
        match self {
            Message::ViewPortRequest(req) => req.version(),
            _ => ProtocolVersion::V1,
        }
    }
}
