//! In-memory transport backed by tokio channels
//!
//! Used to simulate the phone in tests and on the desktop. The watch side is a
//! [`ChannelTransport`]; the phone side is a [`PhoneLink`] that injects inbound
//! dictionaries and drains the watch's outbox.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace};

use super::{Transport, TransportEvent};
use crate::types::SyncMessage;
use crate::{Result, VarioError, codec};

/// Messages each direction can hold before the sender sees back-pressure.
pub const DEFAULT_QUEUE_DEPTH: usize = 8;

/// Watch side of an in-memory link.
#[derive(Debug)]
pub struct ChannelTransport {
    events: mpsc::Receiver<TransportEvent>,
    outbox: mpsc::Sender<Vec<u8>>,
    inbound_capacity: usize,
    outbound_capacity: usize,
}

/// Phone side of an in-memory link.
#[derive(Debug)]
pub struct PhoneLink {
    events: mpsc::Sender<TransportEvent>,
    outbox: mpsc::Receiver<Vec<u8>>,
}

impl ChannelTransport {
    /// Open a link with the given per-message byte capacities.
    pub fn open(inbound_capacity: usize, outbound_capacity: usize) -> (Self, PhoneLink) {
        Self::open_with_depth(inbound_capacity, outbound_capacity, DEFAULT_QUEUE_DEPTH)
    }

    /// Open a link whose outbox holds at most `depth` unread messages.
    ///
    /// A depth of 1 models a watch that allows only one message in flight.
    pub fn open_with_depth(
        inbound_capacity: usize,
        outbound_capacity: usize,
        depth: usize,
    ) -> (Self, PhoneLink) {
        let depth = depth.max(1);
        let (event_tx, event_rx) = mpsc::channel(depth);
        let (outbox_tx, outbox_rx) = mpsc::channel(depth);

        debug!(inbound_capacity, outbound_capacity, depth, "Opened in-memory phone link");

        (
            Self { events: event_rx, outbox: outbox_tx, inbound_capacity, outbound_capacity },
            PhoneLink { events: event_tx, outbox: outbox_rx },
        )
    }
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    fn send(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > self.outbound_capacity {
            return Err(VarioError::send_failed(format!(
                "message is {} bytes, outbound capacity is {}",
                payload.len(),
                self.outbound_capacity
            )));
        }

        match self.outbox.try_send(payload.to_vec()) {
            Ok(()) => {
                trace!(bytes = payload.len(), "Queued message for phone");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(VarioError::send_failed("outbox busy")),
            Err(TrySendError::Closed(_)) => Err(VarioError::send_failed("phone link closed")),
        }
    }

    fn inbound_capacity(&self) -> usize {
        self.inbound_capacity
    }

    fn outbound_capacity(&self) -> usize {
        self.outbound_capacity
    }
}

impl PhoneLink {
    /// Deliver a raw payload to the watch.
    pub async fn deliver(&self, payload: Vec<u8>) -> Result<()> {
        self.push(TransportEvent::Received(payload)).await
    }

    /// Encode and deliver a dictionary to the watch.
    pub async fn deliver_message(&self, message: &SyncMessage) -> Result<()> {
        let payload = codec::encode(message)?;
        self.deliver(payload).await
    }

    /// Report that an earlier watch send was not delivered.
    pub async fn fail_send(&self, reason: impl Into<String>) -> Result<()> {
        self.push(TransportEvent::SendFailed { reason: reason.into() }).await
    }

    /// Report a link problem that does not close the link.
    pub async fn report_error(&self, reason: impl Into<String>) -> Result<()> {
        self.push(TransportEvent::Error { reason: reason.into() }).await
    }

    /// Wait for the next raw message sent by the watch.
    pub async fn next_outbound(&mut self) -> Option<Vec<u8>> {
        self.outbox.recv().await
    }

    /// Take the next raw message sent by the watch, if one is queued.
    pub fn try_next_outbound(&mut self) -> Option<Vec<u8>> {
        self.outbox.try_recv().ok()
    }

    /// Wait for the next message sent by the watch and decode it.
    pub async fn next_message(&mut self) -> Result<Option<SyncMessage>> {
        match self.outbox.recv().await {
            Some(payload) => codec::decode(&payload).map(Some),
            None => Ok(None),
        }
    }

    /// Stop accepting watch messages; later watch sends fail.
    pub fn close_outbox(&mut self) {
        self.outbox.close();
    }

    async fn push(&self, event: TransportEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| VarioError::send_failed("watch side of the link is closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::keys;

    #[tokio::test]
    async fn delivers_in_both_directions() {
        let (mut watch, mut phone) = ChannelTransport::open(1024, 1024);

        phone.deliver(vec![0]).await.unwrap();
        assert_eq!(watch.next_event().await, Some(TransportEvent::Received(vec![0])));

        let start = codec::encode(&SyncMessage::single(keys::FLIGHT_STATUS, 1i32)).unwrap();
        watch.send(&start).unwrap();
        let message = phone.next_message().await.unwrap().unwrap();
        assert_eq!(message, SyncMessage::single(keys::FLIGHT_STATUS, 1i32));
    }

    #[tokio::test]
    async fn send_refusals_are_send_errors() {
        let (mut watch, mut phone) = ChannelTransport::open_with_depth(1024, 16, 1);

        let oversized = watch.send(&[0u8; 17]).unwrap_err();
        assert!(matches!(oversized, VarioError::Send { .. }));

        watch.send(&[0]).unwrap();
        let busy = watch.send(&[0]).unwrap_err();
        assert!(busy.to_string().contains("busy"));

        assert_eq!(phone.try_next_outbound(), Some(vec![0]));
        phone.close_outbox();
        let closed = watch.send(&[0]).unwrap_err();
        assert!(closed.to_string().contains("closed"));
    }

    #[tokio::test]
    async fn dropping_phone_closes_event_stream() {
        let (mut watch, phone) = ChannelTransport::open(1024, 1024);
        phone.fail_send("nack").await.unwrap();
        drop(phone);

        assert_eq!(
            watch.next_event().await,
            Some(TransportEvent::SendFailed { reason: "nack".to_string() })
        );
        assert_eq!(watch.next_event().await, None);
    }
}
