//! Field catalog types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{FieldKey, KeyNamespace, Value, ValueType, keys};
use crate::codec::{DICT_HEADER_LEN, MAX_TUPLES, TUPLE_HEADER_LEN};
use crate::{Result, VarioError};

/// Declared text length used when a catalog entry does not state one.
pub const DEFAULT_MAX_TEXT_LEN: usize = 16;

/// Placeholder shown before the phone sends the first value.
pub const PLACEHOLDER_TEXT: &str = "---";

fn default_max_len() -> usize {
    DEFAULT_MAX_TEXT_LEN
}

/// Declaration of one synchronized field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Wire key
    pub key: FieldKey,
    /// Short name used in logs
    pub name: String,
    /// Declared value type
    pub kind: ValueType,
    /// Value shown before the first peer update
    pub default: Value,
    /// Maximum content length in bytes for text and byte values
    #[serde(default = "default_max_len")]
    pub max_len: usize,
}

impl FieldSpec {
    /// Declare a text field with the default length budget.
    pub fn text(key: FieldKey, name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            kind: ValueType::Text,
            default: Value::Text(default.into()),
            max_len: DEFAULT_MAX_TEXT_LEN,
        }
    }

    /// Declare a signed integer field.
    pub fn int(key: FieldKey, name: impl Into<String>, default: i32) -> Self {
        Self { key, name: name.into(), kind: ValueType::Int, default: Value::Int(default), max_len: 4 }
    }

    /// Override the maximum content length.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Largest number of bytes this field can occupy in a dictionary.
    pub fn worst_case_size(&self) -> usize {
        TUPLE_HEADER_LEN.saturating_add(self.kind.max_payload_len(self.max_len))
    }

    /// Whether `value` has the declared type and fits the declared length.
    pub fn accepts(&self, value: &Value) -> bool {
        value.value_type() == self.kind && self.fits(value)
    }

    fn fits(&self, value: &Value) -> bool {
        match self.kind {
            ValueType::Text | ValueType::Bytes => value.content_len() <= self.max_len,
            ValueType::UInt | ValueType::Int => true,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.default.value_type() != self.kind {
            return Err(VarioError::configuration(format!(
                "default of field '{}' ({}) is {:?}, declared {:?}",
                self.name,
                self.key,
                self.default.value_type(),
                self.kind
            )));
        }

        if !self.fits(&self.default) {
            return Err(VarioError::configuration(format!(
                "default of field '{}' ({}) is {} bytes, declared maximum is {}",
                self.name,
                self.key,
                self.default.content_len(),
                self.max_len
            )));
        }

        if self.kind.max_payload_len(self.max_len) > usize::from(u16::MAX) {
            return Err(VarioError::configuration(format!(
                "field '{}' ({}) declares {} bytes, wire limit is {}",
                self.name,
                self.key,
                self.max_len,
                u16::MAX
            )));
        }

        if let Value::Text(text) = &self.default {
            if text.contains('\0') {
                return Err(VarioError::configuration(format!(
                    "default of field '{}' ({}) contains a NUL character",
                    self.name, self.key
                )));
            }
        }

        Ok(())
    }
}

/// The fixed, ordered set of fields kept in sync with the phone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldSpec>", into = "Vec<FieldSpec>")]
pub struct FieldCatalog {
    fields: BTreeMap<FieldKey, FieldSpec>,
}

impl FieldCatalog {
    /// Build a catalog from field declarations, rejecting duplicates and invalid defaults.
    pub fn new(specs: impl IntoIterator<Item = FieldSpec>) -> Result<Self> {
        let mut fields = BTreeMap::new();

        for spec in specs {
            let key = spec.key;
            if let Some(previous) = fields.insert(key, spec) {
                return Err(VarioError::configuration(format!(
                    "key {} declared twice (first as '{}')",
                    key, previous.name
                )));
            }
        }

        let catalog = Self { fields };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog of the paragliding instrument: altitude, climb rate,
    /// ground speed and flight time, all text with a placeholder default.
    pub fn paragliding() -> Self {
        let fields = [
            FieldSpec::text(keys::DAMPED_ALTITUDE, "altitude", PLACEHOLDER_TEXT),
            FieldSpec::text(keys::CLIMB_RATE, "vario", PLACEHOLDER_TEXT),
            FieldSpec::text(keys::GROUND_SPEED, "speed", PLACEHOLDER_TEXT),
            FieldSpec::text(keys::FLIGHT_TIME, "time", PLACEHOLDER_TEXT),
        ];

        Self { fields: fields.into_iter().map(|spec| (spec.key, spec)).collect() }
    }

    /// Validate the catalog for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(VarioError::configuration("field catalog is empty"));
        }

        if self.fields.len() > MAX_TUPLES {
            return Err(VarioError::configuration(format!(
                "catalog has {} fields, a dictionary holds at most {}",
                self.fields.len(),
                MAX_TUPLES
            )));
        }

        for (key, spec) in &self.fields {
            if *key != spec.key {
                return Err(VarioError::configuration(format!(
                    "catalog slot {} holds field declared as {}",
                    key, spec.key
                )));
            }
            spec.validate()?;
        }

        Ok(())
    }

    /// Fail if the full field set could ever serialize to more than `capacity` bytes.
    pub fn check_budget(&self, capacity: usize) -> Result<()> {
        let worst_case = self.worst_case_size();
        if worst_case > capacity {
            return Err(VarioError::configuration(format!(
                "field catalog needs up to {} bytes, buffer capacity is {}",
                worst_case, capacity
            )));
        }
        Ok(())
    }

    /// Largest dictionary the full field set can produce.
    pub fn worst_case_size(&self) -> usize {
        DICT_HEADER_LEN + self.fields.values().map(FieldSpec::worst_case_size).sum::<usize>()
    }

    /// Get the declaration for a key.
    pub fn get(&self, key: FieldKey) -> Option<&FieldSpec> {
        self.fields.get(&key)
    }

    /// Check if a key is declared.
    pub fn contains(&self, key: FieldKey) -> bool {
        self.fields.contains_key(&key)
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the catalog declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Declarations in key order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    /// Keys that sit outside the telemetry block.
    pub fn non_telemetry_keys(&self) -> Vec<FieldKey> {
        self.fields
            .keys()
            .filter(|key| key.namespace() != KeyNamespace::Telemetry)
            .copied()
            .collect()
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::paragliding()
    }
}

impl TryFrom<Vec<FieldSpec>> for FieldCatalog {
    type Error = VarioError;

    fn try_from(specs: Vec<FieldSpec>) -> Result<Self> {
        Self::new(specs)
    }
}

impl From<FieldCatalog> for Vec<FieldSpec> {
    fn from(catalog: FieldCatalog) -> Self {
        catalog.fields.into_values().collect()
    }
}
