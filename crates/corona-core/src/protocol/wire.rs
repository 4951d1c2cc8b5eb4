//! Envelope layout on the wire.
//!
//! Requests: `{ "t": <tag>, "d": <payload or null> }`.
//!
//! Responses follow what the game server actually emits:
//! - UserJoinResponse: `{ "t": 4, "ok": .., "altNames": [..] }` (flattened).
//!   The nested `{ "t": 4, "d": { "OK": .., "AN": [..] } }` form is accepted
//!   on decode as well.
//! - ViewPortResponse: `{ "t": 2, "C": [..] }`.
//! - CreateCookieResponse: `{ "t": 6, "d": <opaque> }`.
//!
//! Decoding goes through a format-neutral value tree so that both codecs
//! share one set of rules and produce the same typed errors.

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{CoronaError, Result};
use crate::protocol::message::{Message, Reserved, UserJoinResponse, ViewPortResponse};
use crate::protocol::tag::Tag;

pub const KEY_TAG: &str = "t";
pub const KEY_DATA: &str = "d";
pub const KEY_COOKIES: &str = "C";
pub const KEY_OK: &str = "ok";
pub const KEY_ALT_NAMES: &str = "altNames";
pub const KEY_NESTED_OK: &str = "OK";
pub const KEY_NESTED_ALT_NAMES: &str = "AN";

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let len = match self {
            Message::UserJoinResponse(_) => 3,
            _ => 2,
        };
        let mut map = s.serialize_map(Some(len))?;
        map.serialize_entry(KEY_TAG, &self.tag().as_u8())?;
        match self {
            Message::ViewPortRequest(p) => map.serialize_entry(KEY_DATA, p)?,
            Message::ViewPortResponse(p) => map.serialize_entry(KEY_COOKIES, &p.cookies)?,
            Message::UserJoinRequest(p) => map.serialize_entry(KEY_DATA, p)?,
            Message::UserJoinResponse(p) => {
                map.serialize_entry(KEY_OK, &p.ok)?;
                map.serialize_entry(KEY_ALT_NAMES, &p.alt_names)?;
            }
            Message::CreateCookieRequest => map.serialize_entry(KEY_DATA, &())?,
            Message::CreateCookieResponse(r) => map.serialize_entry(KEY_DATA, &r.payload)?,
        }
        map.end()
    }
}

/// Reject numbers neither codec can carry: JSON has no NaN or infinity, and
/// both codecs decode through the same value tree.
pub fn ensure_finite(msg: &Message) -> Result<()> {
    let tag = msg.tag();
    let check = |field: &str, v: f32| {
        if v.is_finite() {
            Ok(())
        } else {
            Err(CoronaError::Encode(format!("{tag}.{field} is not a finite number: {v}")))
        }
    };

    match msg {
        Message::ViewPortRequest(p) => {
            check("X", p.x)?;
            check("Y", p.y)?;
            check("XX", p.xx)?;
            check("YY", p.yy)?;
            if let Some(r) = p.angle {
                check("R", r)?;
            }
        }
        Message::ViewPortResponse(p) => {
            for c in &p.cookies {
                check("C.X", c.x)?;
                check("C.Y", c.y)?;
                check("C.AV", c.angular_velocity)?;
            }
        }
        _ => {}
    }
    Ok(())
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let tree = Value::deserialize(d)?;
        from_tree(tree).map_err(serde::de::Error::custom)
    }
}

/// Build a message from a decoded value tree.
pub fn from_tree(tree: Value) -> Result<Message> {
    let Value::Object(mut env) = tree else {
        return Err(CoronaError::Decode("envelope must be a map".into()));
    };

    let tag = read_tag(&env)?;
    match tag {
        Tag::ViewPortRequest => Ok(Message::ViewPortRequest(nested(&mut env, tag)?)),
        Tag::ViewPortResponse => {
            let cookies = required_list(&mut env, KEY_COOKIES, tag)?;
            Ok(Message::ViewPortResponse(ViewPortResponse { cookies }))
        }
        Tag::UserJoinRequest => Ok(Message::UserJoinRequest(nested(&mut env, tag)?)),
        Tag::UserJoinResponse => user_join_response(&mut env),
        Tag::CreateCookieRequest => Ok(Message::CreateCookieRequest),
        Tag::CreateCookieResponse => {
            let payload = env.remove(KEY_DATA).filter(|v| !v.is_null());
            Ok(Message::CreateCookieResponse(Reserved { payload }))
        }
    }
}

fn read_tag(env: &Map<String, Value>) -> Result<Tag> {
    let raw = env
        .get(KEY_TAG)
        .ok_or_else(|| CoronaError::Decode("missing tag field `t`".into()))?;
    let n = raw
        .as_u64()
        .ok_or_else(|| CoronaError::Decode(format!("tag must be an unsigned integer, got {raw}")))?;
    let n = u8::try_from(n).map_err(|_| CoronaError::Decode(format!("tag out of range: {n}")))?;
    Tag::try_from(n)
}

fn nested<T: DeserializeOwned>(env: &mut Map<String, Value>, tag: Tag) -> Result<T> {
    match env.remove(KEY_DATA) {
        None | Some(Value::Null) => Err(CoronaError::Decode(format!("{tag}: missing payload `d`"))),
        Some(d) => serde_json::from_value(d).map_err(|e| CoronaError::Decode(format!("{tag}: {e}"))),
    }
}

/// A list field that must be present. `null` reads as empty, since the server
/// marshals an empty slice that way; an absent key is a decode error.
fn required_list<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str, tag: Tag) -> Result<Vec<T>> {
    match map.remove(key) {
        None => Err(CoronaError::Decode(format!("{tag}: missing field `{key}`"))),
        Some(Value::Null) => Ok(Vec::new()),
        Some(v) => serde_json::from_value(v).map_err(|e| CoronaError::Decode(format!("{tag}.{key}: {e}"))),
    }
}

fn required_bool(map: &mut Map<String, Value>, key: &str, tag: Tag) -> Result<bool> {
    let v = map
        .remove(key)
        .ok_or_else(|| CoronaError::Decode(format!("{tag}: missing field `{key}`")))?;
    v.as_bool()
        .ok_or_else(|| CoronaError::Decode(format!("{tag}.{key} must be a boolean, got {v}")))
}

fn user_join_response(env: &mut Map<String, Value>) -> Result<Message> {
    let tag = Tag::UserJoinResponse;

    if env.contains_key(KEY_OK) {
        let ok = required_bool(env, KEY_OK, tag)?;
        let alt_names = required_list(env, KEY_ALT_NAMES, tag)?;
        return Ok(Message::UserJoinResponse(UserJoinResponse { ok, alt_names }));
    }

    // server form: { "d": { "OK": .., "AN": [..] } }
    let mut data = match env.remove(KEY_DATA) {
        Some(Value::Object(d)) => d,
        None | Some(Value::Null) => return Err(CoronaError::Decode(format!("{tag}: missing payload `d`"))),
        Some(other) => return Err(CoronaError::Decode(format!("{tag}: payload must be a map, got {other}"))),
    };
    let ok = required_bool(&mut data, KEY_NESTED_OK, tag)?;
    let alt_names = required_list(&mut data, KEY_NESTED_ALT_NAMES, tag)?;
    Ok(Message::UserJoinResponse(UserJoinResponse { ok, alt_names }))
}
