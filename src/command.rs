//! Flight logging commands sent back to the phone.

use tracing::{info, warn};

use crate::Result;
use crate::config::SyncConfig;
use crate::types::{FieldKey, FlightCommand};

/// Something that can carry an integer command to the phone.
///
/// [`crate::engine::SyncEngine`] is the production sink.
pub trait CommandSink {
    /// Send `code` under `key`, failing with [`crate::VarioError::Send`] when
    /// the transport refuses it.
    fn send_command(&mut self, key: FieldKey, code: i32) -> Result<()>;
}

impl<S: CommandSink + ?Sized> CommandSink for &mut S {
    fn send_command(&mut self, key: FieldKey, code: i32) -> Result<()> {
        (**self).send_command(key, code)
    }
}

/// Maps start/stop requests to protocol sends.
///
/// Holds no logging state: pressing start twice sends two start commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEmitter {
    command_key: FieldKey,
}

impl CommandEmitter {
    pub fn new(command_key: FieldKey) -> Self {
        Self { command_key }
    }

    /// Emitter for the configured command key.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.command_key)
    }

    /// Key commands are sent under.
    pub fn command_key(&self) -> FieldKey {
        self.command_key
    }

    /// Ask the phone to start flight logging.
    pub fn emit_start(&self, sink: &mut dyn CommandSink) -> Result<()> {
        self.emit(sink, FlightCommand::Start)
    }

    /// Ask the phone to stop flight logging.
    pub fn emit_stop(&self, sink: &mut dyn CommandSink) -> Result<()> {
        self.emit(sink, FlightCommand::Stop)
    }

    pub fn emit(&self, sink: &mut dyn CommandSink, command: FlightCommand) -> Result<()> {
        match sink.send_command(self.command_key, command.code()) {
            Ok(()) => {
                info!(?command, key = %self.command_key, "Flight command sent");
                Ok(())
            }
            Err(e) => {
                warn!(?command, error = %e, "Flight command not sent");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VarioError;
    use crate::test_utils::RecordingSink;
    use crate::types::keys;

    #[test]
    fn start_and_stop_send_distinct_codes() {
        let emitter = CommandEmitter::from_config(&SyncConfig::default());
        let mut sink = RecordingSink::default();

        emitter.emit_start(&mut sink).unwrap();
        emitter.emit_stop(&mut sink).unwrap();

        assert_eq!(sink.sent, vec![(keys::FLIGHT_STATUS, 1), (keys::FLIGHT_STATUS, 0)]);
    }

    #[test]
    fn repeated_start_is_not_debounced() {
        let emitter = CommandEmitter::new(keys::FLIGHT_STATUS);
        let mut sink = RecordingSink::default();

        emitter.emit_start(&mut sink).unwrap();
        emitter.emit_start(&mut sink).unwrap();

        assert_eq!(sink.sent.len(), 2);
    }

    #[test]
    fn refusal_is_returned_to_caller() {
        let emitter = CommandEmitter::new(keys::FLIGHT_STATUS);
        let mut sink = RecordingSink::refusing("outbox busy");

        let err = emitter.emit_stop(&mut sink).unwrap_err();
        assert!(matches!(err, VarioError::Send { .. }));
        assert!(sink.sent.is_empty());

        // no state to reset: the next attempt goes straight to the sink
        sink.refuse = None;
        emitter.emit_stop(&mut sink).unwrap();
        assert_eq!(sink.sent, vec![(keys::FLIGHT_STATUS, 0)]);
    }
}
