//! Field keys and the reserved key namespace

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag carried by every telemetry field key.
pub const TELEMETRY_TAG: u32 = 0x1000;

/// Mask selecting the tag block of a key.
pub const TAG_MASK: u32 = 0xF000;

/// Numeric identifier of a synchronized field or command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldKey(pub u32);

impl FieldKey {
    /// Wrap a raw wire key.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Key of the telemetry field with the given index inside the tagged block.
    pub const fn telemetry(index: u32) -> Self {
        Self(TELEMETRY_TAG | index)
    }

    /// Raw wire value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Which part of the key namespace this key belongs to.
    pub const fn namespace(self) -> KeyNamespace {
        if self.0 & TAG_MASK == TELEMETRY_TAG {
            KeyNamespace::Telemetry
        } else if self.0 < TELEMETRY_TAG {
            KeyNamespace::Command
        } else {
            KeyNamespace::Other
        }
    }

    /// Check if the key sits in the telemetry block.
    pub const fn is_telemetry(self) -> bool {
        matches!(self.namespace(), KeyNamespace::Telemetry)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u32> for FieldKey {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Coarse classification of wire keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyNamespace {
    /// Keys below the telemetry block, used for watch → phone commands
    Command,
    /// Keys inside the `0x1000` block, used for phone → watch fields
    Telemetry,
    /// Anything else; reserved for future use
    Other,
}

/// Keys used by the paragliding instrument.
pub mod keys {
    use super::FieldKey;

    /// Damped barometric altitude, formatted text (e.g. "1040m")
    pub const DAMPED_ALTITUDE: FieldKey = FieldKey::telemetry(0);
    /// Climb/sink rate, formatted text (e.g. "-2m/s")
    pub const CLIMB_RATE: FieldKey = FieldKey::telemetry(2);
    /// GPS ground speed, formatted text (e.g. "12m/s")
    pub const GROUND_SPEED: FieldKey = FieldKey::telemetry(10);
    /// Elapsed flight time, formatted text (e.g. "300s")
    pub const FLIGHT_TIME: FieldKey = FieldKey::telemetry(16);

    /// Flight status command sent to the phone
    pub const FLIGHT_STATUS: FieldKey = FieldKey::new(1);
}
