//! Object identifiers
//!
//! Identifiers are generated as 12-byte object ids (4-byte big-endian unix
//! seconds followed by 8 random bytes) and travel as 24-char hex strings.
//! Incoming identifiers are accepted in either the native `{"$oid": "<hex>"}`
//! form or as a plain string.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// Key of the native identifier form
pub const OID_KEY: &str = "$oid";

/// 12-byte object identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        let mut bytes = [0u8; 12];
        let seconds = chrono::Utc::now().timestamp() as u32;
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..].copy_from_slice(&uuid::Uuid::new_v4().as_bytes()[..8]);
        Self(bytes)
    }

    /// Parse a 24-char hex string
    pub fn parse_str(s: &str) -> Option<Self> {
        if s.len() != 24 {
            return None;
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creation time in unix seconds
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// True if `value` is the native identifier form: an object holding only a valid `$oid`
pub fn is_native_id(value: &Value) -> bool {
    match value.as_object() {
        Some(map) if map.len() == 1 => map
            .get(OID_KEY)
            .and_then(Value::as_str)
            .and_then(ObjectId::parse_str)
            .is_some(),
        _ => false,
    }
}

/// Identifier check: accept the native form or any string
pub fn is_identifier(value: &Value) -> bool {
    is_native_id(value) || value.is_string()
}

/// Normalise an identifier value to its string form
pub fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) if is_native_id(value) => {
            map.get(OID_KEY).and_then(Value::as_str).map(str::to_string)
        }
        _ => None,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Native {
        #[serde(rename = "$oid")]
        oid: String,
    },
    Text(String),
}

impl From<IdRepr> for String {
    fn from(repr: IdRepr) -> Self {
        match repr {
            IdRepr::Native { oid } => oid,
            IdRepr::Text(text) => text,
        }
    }
}

/// serde helper for optional identifiers given in either representation
pub fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IdRepr>::deserialize(deserializer)?.map(String::from))
}
