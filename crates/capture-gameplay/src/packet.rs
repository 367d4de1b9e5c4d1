//! Packet envelope for transport bindings.
//!
//! Wire shape: `{"type": <int>, "data"?: <any>, "id"?: <string|int>, "nsp"?: <string>}`.
//! Decoding is strict: a missing or non-integer `type`, or an `id`/`nsp` of
//! the wrong kind, is an error and nothing is returned.

use capture_common::PacketError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Packet type codes.
pub mod packet_type {
    /// Namespace connect
    pub const CONNECT: i64 = 0;
    /// Namespace disconnect
    pub const DISCONNECT: i64 = 1;
    /// Named event with a payload
    pub const EVENT: i64 = 2;
    /// Acknowledgement of an event carrying an id
    pub const ACK: i64 = 3;
    /// Connect refused
    pub const CONNECT_ERROR: i64 = 4;
}

/// Packet id, either numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PacketId {
    /// Numeric id
    Int(i64),
    /// Textual id
    Str(String),
}

impl From<i64> for PacketId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for PacketId {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Tagged transport packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Packet type code, see [`packet_type`]
    #[serde(rename = "type")]
    pub kind: i64,
    /// Payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Acknowledgement id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PacketId>,
    /// Namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsp: Option<String>,
}

impl Packet {
    /// Creates a packet with no payload.
    #[must_use]
    pub const fn new(kind: i64) -> Self {
        Self {
            kind,
            data: None,
            id: None,
            nsp: None,
        }
    }

    /// Creates an EVENT packet whose data is `[name, payload]`.
    #[must_use]
    pub fn event(name: &str, payload: Value) -> Self {
        Self::new(packet_type::EVENT).with_data(Value::Array(vec![Value::from(name), payload]))
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets the acknowledgement id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<PacketId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the namespace.
    #[must_use]
    pub fn with_nsp(mut self, nsp: impl Into<String>) -> Self {
        self.nsp = Some(nsp.into());
        self
    }

    /// Event name, for EVENT packets.
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        if self.kind != packet_type::EVENT {
            return None;
        }
        self.data.as_ref()?.as_array()?.first()?.as_str()
    }

    /// Event payload, for EVENT packets.
    #[must_use]
    pub fn event_payload(&self) -> Option<&Value> {
        if self.kind != packet_type::EVENT {
            return None;
        }
        self.data.as_ref()?.as_array()?.get(1)
    }

    /// Serializes the packet to JSON text.
    pub fn encode(&self) -> Result<String, PacketError> {
        serde_json::to_string(self).map_err(|e| PacketError::Malformed(e.to_string()))
    }

    /// Parses and validates JSON text.
    pub fn decode(text: &str) -> Result<Self, PacketError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| PacketError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Validates an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, PacketError> {
        let Value::Object(mut fields) = value else {
            return Err(PacketError::NotAnObject);
        };

        let kind = match fields.get("type") {
            None | Some(Value::Null) => return Err(PacketError::MissingType),
            Some(kind) => kind.as_i64().ok_or(PacketError::InvalidType)?,
        };
        let id = decode_id(&fields)?;
        let nsp = match fields.remove("nsp") {
            None => None,
            Some(Value::String(nsp)) => Some(nsp),
            Some(_) => return Err(PacketError::InvalidNamespace),
        };
        let data = fields.remove("data").filter(|d| !d.is_null());

        Ok(Self { kind, data, id, nsp })
    }
}

fn decode_id(fields: &Map<String, Value>) -> Result<Option<PacketId>, PacketError> {
    match fields.get("id") {
        None => Ok(None),
        Some(Value::String(id)) => Ok(Some(PacketId::Str(id.clone()))),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(|n| Some(PacketId::Int(n)))
            .ok_or(PacketError::InvalidId),
        Some(_) => Err(PacketError::InvalidId),
    }
}
