//! Flight logging commands sent to the phone

use serde::{Deserialize, Serialize};

/// Status code carried under the flight status key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum FlightCommand {
    /// Stop flight logging
    Stop = 0,
    /// Start flight logging
    Start = 1,
}

impl FlightCommand {
    /// Wire code of this command.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Decode a wire code.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(FlightCommand::Stop),
            1 => Some(FlightCommand::Start),
            _ => None,
        }
    }
}
