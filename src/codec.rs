//! Dictionary wire format shared with the phone.
//!
//! Layout (little-endian):
//!
//! ```text
//! ┌───────┬──────────────────────────────────────────────┐
//! │ COUNT │ TUPLE × COUNT                                │
//! │ 1B    │ KEY u32 │ TYPE u8 │ LENGTH u16 │ PAYLOAD     │
//! └───────┴──────────────────────────────────────────────┘
//! ```
//!
//! Text payloads are UTF-8 followed by a NUL byte. Integers are written with
//! 4 bytes; 1- and 2-byte integers from older peers are accepted on decode and
//! widened, so only the 4-byte form is canonical.

use tracing::trace;

use crate::types::{FieldKey, SyncMessage, Tuple, Value, ValueType};
use crate::{Result, VarioError};

/// Size of the tuple count header.
pub const DICT_HEADER_LEN: usize = 1;

/// Size of a tuple header (key + type + length).
pub const TUPLE_HEADER_LEN: usize = 4 + 1 + 2;

/// Most tuples a dictionary can carry.
pub const MAX_TUPLES: usize = u8::MAX as usize;

/// Encode `message` into the front of `buf`, returning the number of bytes written.
pub fn encode_into(message: &SyncMessage, buf: &mut [u8]) -> Result<usize> {
    if message.len() > MAX_TUPLES {
        return Err(VarioError::encode(format!(
            "{} pairs exceed the dictionary limit of {}",
            message.len(),
            MAX_TUPLES
        )));
    }

    let needed = message.encoded_len();
    if needed > buf.len() {
        return Err(VarioError::encode(format!(
            "message needs {} bytes, buffer holds {}",
            needed,
            buf.len()
        )));
    }

    buf[0] = message.len() as u8;
    let mut cursor = DICT_HEADER_LEN;

    for tuple in message {
        cursor += write_tuple(tuple, &mut buf[cursor..])?;
    }

    trace!(pairs = message.len(), bytes = cursor, "Encoded dictionary");
    Ok(cursor)
}

/// Encode `message` into a freshly allocated buffer.
pub fn encode(message: &SyncMessage) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; message.encoded_len()];
    let len = encode_into(message, &mut buf)?;
    buf.truncate(len);
    Ok(buf)
}

fn write_tuple(tuple: &Tuple, buf: &mut [u8]) -> Result<usize> {
    let payload_len = tuple.value.payload_len();
    let wire_len = u16::try_from(payload_len).map_err(|_| {
        VarioError::encode(format!("value for key {} is {} bytes", tuple.key, payload_len))
    })?;

    buf[0..4].copy_from_slice(&tuple.key.raw().to_le_bytes());
    buf[4] = tuple.value.value_type().tag();
    buf[5..7].copy_from_slice(&wire_len.to_le_bytes());

    let payload = &mut buf[TUPLE_HEADER_LEN..TUPLE_HEADER_LEN + payload_len];
    match &tuple.value {
        Value::Bytes(bytes) => payload.copy_from_slice(bytes),
        Value::Text(text) => {
            if text.as_bytes().contains(&0) {
                return Err(VarioError::encode(format!(
                    "text for key {} contains a NUL character",
                    tuple.key
                )));
            }
            payload[..text.len()].copy_from_slice(text.as_bytes());
            payload[text.len()] = 0;
        }
        Value::UInt(v) => payload.copy_from_slice(&v.to_le_bytes()),
        Value::Int(v) => payload.copy_from_slice(&v.to_le_bytes()),
    }

    Ok(TUPLE_HEADER_LEN + payload_len)
}

/// Decode a dictionary. Any structural problem rejects the whole payload.
pub fn decode(bytes: &[u8]) -> Result<SyncMessage> {
    let count = *bytes.first().ok_or_else(|| VarioError::malformed("empty payload"))?;
    let mut cursor = DICT_HEADER_LEN;
    let mut tuples = Vec::with_capacity(usize::from(count));

    for index in 0..count {
        let header = bytes.get(cursor..cursor + TUPLE_HEADER_LEN).ok_or_else(|| {
            VarioError::malformed(format!("pair {} header truncated at offset {}", index, cursor))
        })?;

        let key = FieldKey::new(u32::from_le_bytes([header[0], header[1], header[2], header[3]]));
        let kind = ValueType::from_tag(header[4]).ok_or_else(|| {
            VarioError::malformed(format!("pair {} ({}) has unknown type tag {}", index, key, header[4]))
        })?;
        let len = usize::from(u16::from_le_bytes([header[5], header[6]]));
        cursor += TUPLE_HEADER_LEN;

        let payload = bytes.get(cursor..cursor + len).ok_or_else(|| {
            VarioError::malformed(format!(
                "pair {} ({}) declares {} bytes, {} remain",
                index,
                key,
                len,
                bytes.len().saturating_sub(cursor)
            ))
        })?;
        cursor += len;

        tuples.push(Tuple { key, value: read_value(key, kind, payload)? });
    }

    if cursor != bytes.len() {
        return Err(VarioError::malformed(format!(
            "{} trailing bytes after {} pairs",
            bytes.len() - cursor,
            count
        )));
    }

    Ok(SyncMessage { tuples })
}

fn read_value(key: FieldKey, kind: ValueType, payload: &[u8]) -> Result<Value> {
    match kind {
        ValueType::Bytes => Ok(Value::Bytes(payload.to_vec())),
        ValueType::Text => {
            let (terminator, text) = payload
                .split_last()
                .ok_or_else(|| VarioError::malformed(format!("text for key {} is empty", key)))?;
            if *terminator != 0 || text.contains(&0) {
                return Err(VarioError::malformed(format!(
                    "text for key {} is not a single NUL-terminated string",
                    key
                )));
            }
            let text = std::str::from_utf8(text).map_err(|e| {
                VarioError::malformed(format!("text for key {} is not UTF-8: {}", key, e))
            })?;
            Ok(Value::Text(text.to_string()))
        }
        ValueType::UInt => match *payload {
            [a] => Ok(Value::UInt(u32::from(a))),
            [a, b] => Ok(Value::UInt(u32::from(u16::from_le_bytes([a, b])))),
            [a, b, c, d] => Ok(Value::UInt(u32::from_le_bytes([a, b, c, d]))),
            _ => Err(bad_int_width(key, payload.len())),
        },
        ValueType::Int => match *payload {
            [a] => Ok(Value::Int(i32::from(a as i8))),
            [a, b] => Ok(Value::Int(i32::from(i16::from_le_bytes([a, b])))),
            [a, b, c, d] => Ok(Value::Int(i32::from_le_bytes([a, b, c, d]))),
            _ => Err(bad_int_width(key, payload.len())),
        },
    }
}

fn bad_int_width(key: FieldKey, len: usize) -> VarioError {
    VarioError::malformed(format!("integer for key {} has width {}", key, len))
}
