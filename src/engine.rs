//! Sync protocol engine.
//!
//! Owns the field store, the transport and the outbound staging buffer. The
//! receive path decodes an inbound dictionary, decides the whole message
//! before touching the store, then applies every known pair. The send path
//! encodes a single-pair dictionary into the staging buffer and hands it to
//! the transport.

use tracing::{debug, info, trace, warn};

use crate::command::CommandSink;
use crate::config::SyncConfig;
use crate::store::{FieldObserver, FieldStore};
use crate::transport::Transport;
use crate::types::{FieldKey, SyncMessage};
use crate::{Result, SyncFault, VarioError, codec};

/// Receive path state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineState {
    #[default]
    Idle,
    Applying,
}

/// Outcome of an accepted inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Keys written to the store, in message order
    pub applied: Vec<FieldKey>,
    /// Keys outside the catalog that were skipped
    pub unknown: Vec<FieldKey>,
}

impl ApplyReport {
    /// Unknown keys as the errors they were reported as.
    pub fn unknown_key_errors(&self) -> Vec<VarioError> {
        self.unknown.iter().copied().map(VarioError::unknown_key).collect()
    }
}

/// Running counters kept by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub messages_applied: u64,
    pub messages_rejected: u64,
    pub unknown_keys: u64,
    pub sends: u64,
    pub send_failures: u64,
}

/// Watch side of the field synchronization protocol.
#[derive(Debug)]
pub struct SyncEngine<T: Transport> {
    store: FieldStore,
    transport: T,
    staging: Vec<u8>,
    inbound_capacity: usize,
    state: EngineState,
    stats: SyncStats,
}

impl<T: Transport> SyncEngine<T> {
    /// Validate `config` and seed the store with every default.
    ///
    /// The transport must have been opened with at least the configured
    /// capacities.
    pub fn new(config: &SyncConfig, transport: T) -> Result<Self> {
        config.validate()?;

        if transport.inbound_capacity() < config.inbound_capacity
            || transport.outbound_capacity() < config.outbound_capacity
        {
            return Err(VarioError::configuration(format!(
                "transport opened with {}/{} bytes, configuration needs {}/{}",
                transport.inbound_capacity(),
                transport.outbound_capacity(),
                config.inbound_capacity,
                config.outbound_capacity
            )));
        }

        let store = FieldStore::initialize(&config.catalog, config.inbound_capacity)?;

        info!(
            fields = store.len(),
            inbound_capacity = config.inbound_capacity,
            outbound_capacity = config.outbound_capacity,
            "Sync engine ready"
        );

        Ok(Self {
            store,
            transport,
            staging: vec![0; config.outbound_capacity],
            inbound_capacity: config.inbound_capacity,
            state: EngineState::Idle,
            stats: SyncStats::default(),
        })
    }

    /// Apply one inbound payload.
    ///
    /// Oversized, undecodable or ill-typed messages are rejected whole with a
    /// [`VarioError::Sync`] and leave the store untouched. Unknown keys are
    /// skipped and listed in the report.
    pub fn receive(
        &mut self,
        payload: &[u8],
        observer: &mut dyn FieldObserver,
    ) -> Result<ApplyReport> {
        debug_assert_eq!(self.state, EngineState::Idle);
        self.state = EngineState::Applying;
        let outcome = self.apply(payload, observer);
        self.state = EngineState::Idle;

        match &outcome {
            Ok(report) => {
                self.stats.messages_applied += 1;
                self.stats.unknown_keys += report.unknown.len() as u64;
                debug!(
                    bytes = payload.len(),
                    applied = report.applied.len(),
                    unknown = report.unknown.len(),
                    "Inbound message applied"
                );
            }
            Err(e) => {
                self.stats.messages_rejected += 1;
                warn!(bytes = payload.len(), error = %e, "Inbound message rejected");
            }
        }

        outcome
    }

    fn apply(&mut self, payload: &[u8], observer: &mut dyn FieldObserver) -> Result<ApplyReport> {
        if payload.len() > self.inbound_capacity {
            return Err(SyncFault::Oversized { len: payload.len(), capacity: self.inbound_capacity }
                .into());
        }

        let message = codec::decode(payload)?;

        // Decide the whole message before the first write.
        for tuple in &message {
            self.store.check(tuple.key, &tuple.value)?;
        }

        let mut report = ApplyReport::default();
        for tuple in message.tuples {
            match self.store.apply_update(tuple.key, tuple.value, observer) {
                Ok(()) => report.applied.push(tuple.key),
                Err(VarioError::UnknownKey { key }) => report.unknown.push(key),
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }

    /// Send a single integer under `key`.
    ///
    /// Refusal by the transport is returned as [`VarioError::Send`]; nothing is
    /// retried.
    pub fn send(&mut self, key: FieldKey, value: i32) -> Result<()> {
        let message = SyncMessage::single(key, value);
        let outcome = codec::encode_into(&message, &mut self.staging)
            .and_then(|len| self.transport.send(&self.staging[..len]));

        match &outcome {
            Ok(()) => {
                self.stats.sends += 1;
                trace!(%key, value, "Message handed to transport");
            }
            Err(e) => {
                self.stats.send_failures += 1;
                warn!(%key, value, error = %e, "Send failed");
            }
        }

        outcome
    }

    /// Count a send the transport accepted but later reported as undelivered.
    pub fn record_send_failure(&mut self, reason: &str) {
        self.stats.send_failures += 1;
        warn!(reason, "Peer did not receive an earlier message");
    }

    /// Field store.
    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    /// Counters so far.
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Receive path state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, for awaiting its events.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> CommandSink for SyncEngine<T> {
    fn send_command(&mut self, key: FieldKey, code: i32) -> Result<()> {
        self.send(key, code)
    }
}

impl<T: Transport> Drop for SyncEngine<T> {
    fn drop(&mut self) {
        debug!(
            applied = self.stats.messages_applied,
            rejected = self.stats.messages_rejected,
            sends = self.stats.sends,
            "Releasing sync engine"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RecordingObserver, climb_message, telemetry_message};
    use crate::transport::{ChannelTransport, PhoneLink};
    use crate::types::{FlightCommand, PLACEHOLDER_TEXT, Value, keys};

    fn engine() -> (SyncEngine<ChannelTransport>, PhoneLink) {
        let (transport, phone) = ChannelTransport::open(1024, 1024);
        (SyncEngine::new(&SyncConfig::default(), transport).unwrap(), phone)
    }

    #[test]
    fn climb_only_update_changes_one_field() {
        let (mut engine, _phone) = engine();
        let mut observer = RecordingObserver::default();

        let payload = codec::encode(&climb_message("-2m/s")).unwrap();
        let report = engine.receive(&payload, &mut observer).unwrap();

        assert_eq!(report.applied, vec![keys::CLIMB_RATE]);
        assert!(report.unknown.is_empty());
        assert_eq!(observer.events, vec![(keys::CLIMB_RATE, Value::text("-2m/s"))]);
        assert_eq!(engine.store().current(keys::CLIMB_RATE), Some(&Value::text("-2m/s")));
        assert_eq!(
            engine.store().current(keys::DAMPED_ALTITUDE),
            Some(&Value::text(PLACEHOLDER_TEXT))
        );
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn unknown_keys_are_skipped_but_rest_applies() {
        let (mut engine, _phone) = engine();
        let mut observer = RecordingObserver::default();

        let message = climb_message("0.4m/s").with(FieldKey::new(0x2001), "x");
        let payload = codec::encode(&message).unwrap();
        let report = engine.receive(&payload, &mut observer).unwrap();

        assert_eq!(report.applied, vec![keys::CLIMB_RATE]);
        assert_eq!(report.unknown, vec![FieldKey::new(0x2001)]);
        assert!(matches!(report.unknown_key_errors()[0], VarioError::UnknownKey { .. }));
        assert_eq!(observer.events.len(), 1);
        assert_eq!(engine.stats().unknown_keys, 1);
    }

    #[test]
    fn oversized_message_changes_nothing() {
        let (mut engine, _phone) = engine();
        let mut observer = RecordingObserver::default();

        let err = engine.receive(&[0u8; 1025], &mut observer).unwrap_err();
        assert!(matches!(err.sync_fault(), Some(SyncFault::Oversized { len: 1025, .. })));
        assert!(observer.events.is_empty());
        assert_eq!(engine.stats().messages_rejected, 1);
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn inbound_capacity_is_inclusive() {
        let (mut engine, _phone) = engine();

        // climb pair plus an unknown byte-array pair padded to the boundary
        let padded = |filler: usize| {
            climb_message("-2m/s").with(FieldKey::new(0x2001), Value::Bytes(vec![0; filler]))
        };
        let exact = codec::encode(&padded(1003)).unwrap();
        let over = codec::encode(&padded(1004)).unwrap();
        assert_eq!(exact.len(), 1024);
        assert_eq!(over.len(), 1025);

        let report = engine.receive(&exact, &mut RecordingObserver::default()).unwrap();
        assert_eq!(report.applied, vec![keys::CLIMB_RATE]);
        assert_eq!(report.unknown, vec![FieldKey::new(0x2001)]);

        let err = engine.receive(&over, &mut RecordingObserver::default()).unwrap_err();
        assert!(matches!(err.sync_fault(), Some(SyncFault::Oversized { len: 1025, capacity: 1024 })));
        assert_eq!(engine.stats().messages_applied, 1);
        assert_eq!(engine.stats().messages_rejected, 1);
    }

    #[test]
    fn bad_pair_rejects_whole_message() {
        let (mut engine, _phone) = engine();
        let mut observer = RecordingObserver::default();

        let message = telemetry_message("812m", "1.1m/s", "9m/s", "00:12")
            .with(keys::GROUND_SPEED, 3i32);
        let payload = codec::encode(&message).unwrap();
        let err = engine.receive(&payload, &mut observer).unwrap_err();

        assert!(matches!(err.sync_fault(), Some(SyncFault::TypeMismatch { .. })));
        assert!(observer.events.is_empty());
        assert_eq!(
            engine.store().current(keys::DAMPED_ALTITUDE),
            Some(&Value::text(PLACEHOLDER_TEXT))
        );
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let (mut engine, _phone) = engine();
        let payload = codec::encode(&climb_message("-2m/s")).unwrap();

        let err = engine.receive(&payload[..payload.len() - 3], &mut RecordingObserver::default());
        assert!(matches!(err.unwrap_err().sync_fault(), Some(SyncFault::Malformed { .. })));
    }

    #[test]
    fn duplicate_keys_apply_in_order() {
        let (mut engine, _phone) = engine();
        let mut observer = RecordingObserver::default();

        let message = climb_message("-1m/s").with(keys::CLIMB_RATE, "2m/s");
        let payload = codec::encode(&message).unwrap();
        engine.receive(&payload, &mut observer).unwrap();

        assert_eq!(observer.events.len(), 2);
        assert_eq!(engine.store().current(keys::CLIMB_RATE), Some(&Value::text("2m/s")));
    }

    #[tokio::test]
    async fn send_encodes_single_pair() {
        let (mut engine, mut phone) = engine();

        engine.send(keys::FLIGHT_STATUS, FlightCommand::Start.code()).unwrap();
        let message = phone.next_message().await.unwrap().unwrap();

        assert_eq!(message, SyncMessage::single(keys::FLIGHT_STATUS, 1i32));
        assert_eq!(engine.stats().sends, 1);
    }

    #[test]
    fn send_to_closed_phone_fails() {
        let (mut engine, phone) = engine();
        drop(phone);

        let err = engine.send(keys::FLIGHT_STATUS, 0).unwrap_err();
        assert!(matches!(err, VarioError::Send { .. }));
        assert_eq!(engine.stats().send_failures, 1);
    }

    #[test]
    fn rejects_undersized_transport() {
        let (transport, _phone) = ChannelTransport::open(512, 1024);
        let err = SyncEngine::new(&SyncConfig::default(), transport).unwrap_err();
        assert!(matches!(err, VarioError::Configuration { .. }));
    }
}
