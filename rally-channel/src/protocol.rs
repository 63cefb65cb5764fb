//! Wire framing for the room channel.
//!
//! Every message is a JSON text frame:
//! ```text
//! { "event": "roomUpdate", "payload": { "groupList": [ … ] } }
//! ```
//!
//! A frame without `payload` decodes with `null`. Event names are free-form;
//! the four below are the ones the channel itself understands.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

/// Transport came up.
pub const CONNECT: &str = "connect";
/// Transport went down.
pub const DISCONNECT: &str = "disconnect";
/// Server pushed new room state.
pub const ROOM_UPDATE: &str = "roomUpdate";
/// Transport or server error.
pub const ERROR: &str = "error";

/// Classification of an event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Connect,
    Disconnect,
    RoomUpdate,
    Error,
    /// Any other server-pushed name
    Other,
}

impl EventKind {
    pub fn of(name: &str) -> Self {
        match name {
            CONNECT => Self::Connect,
            DISCONNECT => Self::Disconnect,
            ROOM_UPDATE => Self::RoomUpdate,
            ERROR => Self::Error,
            _ => Self::Other,
        }
    }
}

/// Opaque, non-empty room identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Trim and validate. Empty ids are rejected.
    pub fn new(id: impl Into<String>) -> Result<Self, ChannelError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ChannelError::InvalidRoomId(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for RoomId {
    type Error = ChannelError;

    fn try_from(id: &str) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl TryFrom<String> for RoomId {
    type Error = ChannelError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl TryFrom<u64> for RoomId {
    type Error = ChannelError;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        Ok(Self(id.to_string()))
    }
}

/// A named event with an arbitrary JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    pub fn room_update(payload: Value) -> Self {
        Self::new(ROOM_UPDATE, payload)
    }

    /// Synthesized when a link comes up.
    pub fn connected(room_id: &RoomId) -> Self {
        Self::new(CONNECT, json!({ "roomId": room_id.as_str() }))
    }

    /// Synthesized when a link goes down.
    pub fn disconnected(room_id: &RoomId, reason: &str) -> Self {
        Self::new(
            DISCONNECT,
            json!({ "roomId": room_id.as_str(), "reason": reason }),
        )
    }

    /// Synthesized for transport failures.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ERROR, json!({ "message": message.into() }))
    }

    pub fn kind(&self) -> EventKind {
        EventKind::of(&self.event)
    }

    pub fn encode(&self) -> Result<String, ChannelError> {
        serde_json::to_string(self).map_err(|e| ChannelError::Encode(e.to_string()))
    }

    pub fn decode(text: &str) -> Result<Self, ChannelError> {
        serde_json::from_str(text).map_err(|e| ChannelError::Decode(e.to_string()))
    }
}

/// Channel errors.
///
/// Only `InvalidRoomId` is ever returned to callers of `RoomChannel`; the
/// rest surface through logs and the `error` event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Invalid room id: {0:?}")]
    InvalidRoomId(String),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Connection closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_wire_format() {
        let frame = Frame::room_update(json!({"groupList": []}));
        let text = frame.encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"event": "roomUpdate", "payload": {"groupList": []}}));
    }

    #[test]
    fn test_decode_missing_payload() {
        let frame = Frame::decode(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(frame.event, "ping");
        assert_eq!(frame.payload, Value::Null);
        assert_eq!(frame.kind(), EventKind::Other);
    }

    #[test]
    fn test_decode_invalid_text() {
        assert!(matches!(Frame::decode("not json"), Err(ChannelError::Decode(_))));
        assert!(matches!(
            Frame::decode(r#"{"payload": 1}"#),
            Err(ChannelError::Decode(_))
        ));
    }

    #[test]
    fn test_event_kinds() {
        assert_eq!(EventKind::of("connect"), EventKind::Connect);
        assert_eq!(EventKind::of("disconnect"), EventKind::Disconnect);
        assert_eq!(EventKind::of("roomUpdate"), EventKind::RoomUpdate);
        assert_eq!(EventKind::of("error"), EventKind::Error);
        assert_eq!(EventKind::of("RoomUpdate"), EventKind::Other);
    }

    #[test]
    fn test_synthesized_frames() {
        let room = RoomId::new("42").unwrap();
        assert_eq!(Frame::connected(&room).payload, json!({"roomId": "42"}));
        assert_eq!(
            Frame::disconnected(&room, "closed by server").payload,
            json!({"roomId": "42", "reason": "closed by server"})
        );
        assert_eq!(Frame::error("refused").payload["message"], "refused");
    }

    #[test]
    fn test_room_id_validation() {
        assert_eq!(RoomId::new(" 42 ").unwrap().as_str(), "42");
        assert!(matches!(RoomId::new(""), Err(ChannelError::InvalidRoomId(_))));
        assert!(RoomId::new("   ").is_err());
        assert_eq!(RoomId::try_from(7u64).unwrap().to_string(), "7");
    }
}
