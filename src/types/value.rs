//! Field value type definitions

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Supported field value types.
/// Maps to the tuple types of the watch dictionary format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Raw byte array (wire tag 0)
    Bytes,
    /// UTF-8 text, NUL-terminated on the wire (wire tag 1)
    Text,
    /// Unsigned integer (wire tag 2)
    #[serde(rename = "uint")]
    UInt,
    /// Signed integer (wire tag 3)
    Int,
}

impl ValueType {
    /// Wire tag written in the tuple header.
    pub const fn tag(self) -> u8 {
        match self {
            ValueType::Bytes => 0,
            ValueType::Text => 1,
            ValueType::UInt => 2,
            ValueType::Int => 3,
        }
    }

    /// Decode a wire tag.
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ValueType::Bytes),
            1 => Some(ValueType::Text),
            2 => Some(ValueType::UInt),
            3 => Some(ValueType::Int),
            _ => None,
        }
    }

    /// Largest payload a value of this type can occupy on the wire, given the
    /// declared maximum length for variable-sized types.
    ///
    /// Saturates, so an absurd declared length still compares as too large.
    pub const fn max_payload_len(self, max_len: usize) -> usize {
        match self {
            ValueType::Bytes => max_len,
            // trailing NUL
            ValueType::Text => max_len.saturating_add(1),
            ValueType::UInt | ValueType::Int => 4,
        }
    }
}

/// Runtime value of a field or command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bytes(Vec<u8>),
    Text(String),
    #[serde(rename = "uint")]
    UInt(u32),
    Int(i32),
}

impl Value {
    /// Convenience constructor for text values.
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    /// The declared type this value satisfies.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bytes(_) => ValueType::Bytes,
            Value::Text(_) => ValueType::Text,
            Value::UInt(_) => ValueType::UInt,
            Value::Int(_) => ValueType::Int,
        }
    }

    /// Length of the variable-sized content, compared against a slot's maximum.
    /// Integers report their fixed width.
    pub fn content_len(&self) -> usize {
        match self {
            Value::Bytes(bytes) => bytes.len(),
            Value::Text(text) => text.len(),
            Value::UInt(_) | Value::Int(_) => 4,
        }
    }

    /// Number of payload bytes this value occupies on the wire.
    pub fn payload_len(&self) -> usize {
        self.value_type().max_payload_len(self.content_len())
    }

    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Integer content, if this is a signed or unsigned integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::UInt(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Human-readable rendering handed to the display.
    pub fn display_text(&self) -> Cow<'_, str> {
        match self {
            Value::Text(text) => Cow::Borrowed(text),
            Value::UInt(v) => Cow::Owned(v.to_string()),
            Value::Int(v) => Cow::Owned(v.to_string()),
            Value::Bytes(bytes) => String::from_utf8_lossy(bytes),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v)
    }
}
