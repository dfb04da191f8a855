//! The watch face event loop.
//!
//! [`FaceApp`] ties the engine, the command emitter and the display together
//! and runs them from a single task. Inbound payloads, late send failures and
//! button intents are handled one at a time in arrival order, so store
//! mutation and display notification never overlap.

use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::command::CommandEmitter;
use crate::config::SyncConfig;
use crate::engine::{SyncEngine, SyncStats};
use crate::input::{self, InputHandle, UserIntent};
use crate::store::FieldObserver;
use crate::transport::{Transport, TransportEvent};
use crate::types::{FieldKey, Value};

/// What the loop leaves behind when it stops.
#[derive(Debug)]
pub struct RunReport<D> {
    /// The display, handed back to the caller
    pub display: D,
    /// Engine counters at shutdown
    pub stats: SyncStats,
    /// Last known value of every field
    pub fields: BTreeMap<FieldKey, Value>,
}

/// Handles to a loop running on its own task.
#[derive(Debug)]
pub struct AppHandle<D> {
    /// Forwards button presses to the loop
    pub input: InputHandle,
    /// Stops the loop
    pub cancel: CancellationToken,
    /// Resolves once the loop has stopped
    pub task: JoinHandle<RunReport<D>>,
}

enum LoopEvent {
    Cancelled,
    Transport(Option<TransportEvent>),
    Intent(Option<UserIntent>),
}

/// Watch face application: one engine, one display, one loop.
#[derive(Debug)]
pub struct FaceApp<T: Transport, D> {
    engine: SyncEngine<T>,
    emitter: CommandEmitter,
    display: D,
    link_open: bool,
}

impl<T: Transport, D: FieldObserver> FaceApp<T, D> {
    /// Build the engine and show every default on the display.
    ///
    /// Configuration problems are returned here and the loop never starts.
    pub fn start(config: &SyncConfig, transport: T, mut display: D) -> Result<Self> {
        let engine = SyncEngine::new(config, transport)?;
        engine.store().replay(&mut display);

        info!(command_key = %config.command_key, "Face started");

        Ok(Self { engine, emitter: CommandEmitter::from_config(config), display, link_open: true })
    }

    /// React to one transport event.
    ///
    /// Rejected messages are logged by the engine and leave the store as it was.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Received(payload) => {
                let _ = self.engine.receive(&payload, &mut self.display);
            }
            TransportEvent::SendFailed { reason } => {
                self.engine.record_send_failure(&reason);
            }
            TransportEvent::Error { reason } => {
                warn!(%reason, "Phone link reported an error");
            }
        }
    }

    /// React to one user intent.
    pub fn handle_intent(&mut self, intent: UserIntent) -> Result<()> {
        match intent {
            UserIntent::Start => self.emitter.emit_start(&mut self.engine),
            UserIntent::Stop => self.emitter.emit_stop(&mut self.engine),
        }
    }

    /// Run until `cancel` fires or every [`InputHandle`] is dropped.
    ///
    /// A closed phone link does not stop the loop: the face keeps its last
    /// values and later commands fail to send.
    pub async fn run(
        mut self,
        mut intents: mpsc::Receiver<UserIntent>,
        cancel: CancellationToken,
    ) -> RunReport<D> {
        info!("Event loop started");

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => LoopEvent::Cancelled,
                event = self.engine.transport_mut().next_event(), if self.link_open => {
                    LoopEvent::Transport(event)
                }
                intent = intents.recv() => LoopEvent::Intent(intent),
            };

            match event {
                LoopEvent::Cancelled => {
                    info!("Event loop cancelled");
                    break;
                }
                LoopEvent::Transport(Some(event)) => self.handle_transport_event(event),
                LoopEvent::Transport(None) => {
                    warn!("Phone link closed, keeping last known values");
                    self.link_open = false;
                }
                LoopEvent::Intent(Some(intent)) => {
                    // failures are logged by the emitter; nothing to undo
                    let _ = self.handle_intent(intent);
                }
                LoopEvent::Intent(None) => {
                    info!("Input closed, stopping event loop");
                    break;
                }
            }
        }

        let stats = self.engine.stats();
        debug!(?stats, "Event loop ended");
        self.finish()
    }

    fn finish(self) -> RunReport<D> {
        let FaceApp { engine, display, .. } = self;
        RunReport { stats: engine.stats(), fields: engine.store().snapshot(), display }
    }

    /// Whether the transport is still delivering events.
    pub fn link_open(&self) -> bool {
        self.link_open
    }

    pub fn engine(&self) -> &SyncEngine<T> {
        &self.engine
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}

impl<T: Transport, D: FieldObserver + Send + 'static> FaceApp<T, D> {
    /// Run the loop on a new task.
    ///
    /// `input_depth` bounds how many button presses may queue up.
    pub fn spawn(self, input_depth: usize) -> AppHandle<D> {
        let (input, intents) = input::channel(input_depth);
        let cancel = CancellationToken::new();
        let cancel_loop = cancel.clone();

        let task = tokio::spawn(self.run(intents, cancel_loop));

        AppHandle { input, cancel, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::display::{DisplayPolicy, FaceModel, Polarity};
    use crate::test_utils::{RecordingObserver, climb_message};
    use crate::store::NullObserver;
    use crate::transport::{ChannelTransport, PhoneLink};
    use crate::types::{PLACEHOLDER_TEXT, SyncMessage, keys};

    fn app<D: FieldObserver>(display: D) -> (FaceApp<ChannelTransport, D>, PhoneLink) {
        let (transport, phone) = ChannelTransport::open(1024, 1024);
        (FaceApp::start(&SyncConfig::default(), transport, display).unwrap(), phone)
    }

    #[test]
    fn start_shows_defaults() {
        let (app, _phone) = app(RecordingObserver::default());

        assert_eq!(app.display().events.len(), 4);
        assert!(
            app.display()
                .events
                .iter()
                .all(|(_, value)| *value == Value::text(PLACEHOLDER_TEXT))
        );
    }

    #[test]
    fn start_fails_on_bad_configuration() {
        let (transport, _phone) = ChannelTransport::open(1024, 1024);
        let config = SyncConfig { inbound_capacity: 16, ..SyncConfig::default() };

        let err = FaceApp::start(&config, transport, RecordingObserver::default()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn rejected_payload_keeps_display() {
        let (mut app, _phone) = app(FaceModel::new(DisplayPolicy::default()));
        let before = app.display().revision();

        app.handle_transport_event(TransportEvent::Received(vec![1, 2, 3]));

        assert_eq!(app.display().revision(), before);
        assert_eq!(app.engine().stats().messages_rejected, 1);
    }

    #[tokio::test]
    async fn loop_applies_inbound_and_sends_commands() {
        let (app, mut phone) = app(FaceModel::new(DisplayPolicy::default()));
        let (input, intents) = input::channel(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(app.run(intents, cancel.clone()));

        phone.deliver_message(&climb_message("-2m/s")).await.unwrap();
        input.user_requested_start().await.unwrap();

        let sent = phone.next_message().await.unwrap().unwrap();
        assert_eq!(sent, SyncMessage::single(keys::FLIGHT_STATUS, 1i32));

        cancel.cancel();
        let report = task.await.unwrap();

        assert_eq!(report.fields[&keys::CLIMB_RATE], Value::text("-2m/s"));
        assert_eq!(report.display.climb_polarity(), Polarity::Inverted);
        assert_eq!(report.stats.sends, 1);
    }

    #[tokio::test]
    async fn late_send_failures_are_counted() {
        let (app, phone) = app(NullObserver);
        let handle = app.spawn(1);

        phone.fail_send("nack").await.unwrap();
        let payload = codec::encode(&climb_message("0.0m/s")).unwrap();
        phone.deliver(payload).await.unwrap();
        drop(handle.input);

        let report = handle.task.await.unwrap();
        assert_eq!(report.stats.send_failures, 1);
        assert_eq!(report.stats.messages_applied, 1);
    }
}
