//! Sync message types exchanged with the phone

use serde::{Deserialize, Serialize};

use super::{FieldKey, Value};
use crate::codec::{DICT_HEADER_LEN, TUPLE_HEADER_LEN};

/// One key/value pair of a sync message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuple {
    pub key: FieldKey,
    pub value: Value,
}

impl Tuple {
    /// Create a new pair.
    pub fn new(key: FieldKey, value: impl Into<Value>) -> Self {
        Self { key, value: value.into() }
    }

    /// Bytes this pair occupies in an encoded dictionary.
    pub fn encoded_len(&self) -> usize {
        TUPLE_HEADER_LEN + self.value.payload_len()
    }
}

/// A structured, size-bounded key/value payload exchanged between peers.
///
/// Pairs are independent of each other; their order is preserved on the wire
/// but carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMessage {
    pub tuples: Vec<Tuple>,
}

impl SyncMessage {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a message carrying a single pair.
    pub fn single(key: FieldKey, value: impl Into<Value>) -> Self {
        Self { tuples: vec![Tuple::new(key, value)] }
    }

    /// Append a pair.
    pub fn push(&mut self, key: FieldKey, value: impl Into<Value>) -> &mut Self {
        self.tuples.push(Tuple::new(key, value));
        self
    }

    /// Builder-style append.
    pub fn with(mut self, key: FieldKey, value: impl Into<Value>) -> Self {
        self.push(key, value);
        self
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// Whether the message carries no pairs.
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Pairs in wire order.
    pub fn iter(&self) -> std::slice::Iter<'_, Tuple> {
        self.tuples.iter()
    }

    /// First value carried for `key`.
    pub fn get(&self, key: FieldKey) -> Option<&Value> {
        self.tuples.iter().find(|tuple| tuple.key == key).map(|tuple| &tuple.value)
    }

    /// Exact size of the encoded dictionary.
    pub fn encoded_len(&self) -> usize {
        DICT_HEADER_LEN + self.tuples.iter().map(Tuple::encoded_len).sum::<usize>()
    }
}

impl FromIterator<Tuple> for SyncMessage {
    fn from_iter<I: IntoIterator<Item = Tuple>>(iter: I) -> Self {
        Self { tuples: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a SyncMessage {
    type Item = &'a Tuple;
    type IntoIter = std::slice::Iter<'a, Tuple>;

    fn into_iter(self) -> Self::IntoIter {
        self.tuples.iter()
    }
}
