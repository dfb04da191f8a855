//! Test utilities shared by unit tests and benchmarks
//!
//! Recording doubles for the display and command seams plus sample messages
//! shaped like the ones the phone sends during a flight.

#![cfg(any(test, feature = "benchmark"))]

use crate::command::CommandSink;
use crate::store::FieldObserver;
use crate::types::{FieldKey, SyncMessage, Value, keys};
use crate::{Result, VarioError};

/// Observer that records every notification in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub events: Vec<(FieldKey, Value)>,
}

impl FieldObserver for RecordingObserver {
    fn on_field_changed(&mut self, key: FieldKey, value: &Value) {
        self.events.push((key, value.clone()));
    }
}

/// Command sink that records sends, or refuses them while `refuse` is set.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub sent: Vec<(FieldKey, i32)>,
    pub refuse: Option<String>,
}

impl RecordingSink {
    /// A sink that refuses every send with `reason`.
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self { sent: Vec::new(), refuse: Some(reason.into()) }
    }
}

impl CommandSink for RecordingSink {
    fn send_command(&mut self, key: FieldKey, code: i32) -> Result<()> {
        if let Some(reason) = &self.refuse {
            return Err(VarioError::send_failed(reason.clone()));
        }
        self.sent.push((key, code));
        Ok(())
    }
}

/// Message updating only the climb rate.
pub fn climb_message(climb: &str) -> SyncMessage {
    SyncMessage::single(keys::CLIMB_RATE, climb)
}

/// Message updating all four telemetry fields.
pub fn telemetry_message(altitude: &str, climb: &str, speed: &str, time: &str) -> SyncMessage {
    SyncMessage::new()
        .with(keys::DAMPED_ALTITUDE, altitude)
        .with(keys::CLIMB_RATE, climb)
        .with(keys::GROUND_SPEED, speed)
        .with(keys::FLIGHT_TIME, time)
}
