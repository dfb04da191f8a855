//! Transport trait for the link to the phone

pub mod channel;

pub use channel::{ChannelTransport, DEFAULT_QUEUE_DEPTH, PhoneLink};

use crate::Result;

/// Event delivered by a transport to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// An inbound message payload from the phone
    Received(Vec<u8>),
    /// A previously accepted send was not delivered
    SendFailed { reason: String },
    /// The link reported a problem that did not close it
    Error { reason: String },
}

/// Trait for message-oriented links to the paired phone
///
/// Implementations wrap whatever carries bytes between the two devices. The
/// event loop drives them from a single task:
/// - `next_event` is awaited for inbound payloads and asynchronous failures
/// - `send` hands over one encoded message and returns immediately
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Wait for the next event from the link
    ///
    /// Returns:
    /// - `Some(event)` - Something arrived
    /// - `None` - The link is closed for good
    ///
    /// Must be cancel-safe: the event loop drops the future when another
    /// source becomes ready first.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Queue one encoded message for the phone
    ///
    /// Never blocks. Refusal (busy, closed, oversized) is reported as
    /// [`crate::VarioError::Send`]; there is no retry.
    fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Largest inbound message the link was opened for
    fn inbound_capacity(&self) -> usize;

    /// Largest outbound message the link was opened for
    fn outbound_capacity(&self) -> usize;
}
