//! Wrist-worn display client for a paragliding flight instrument.
//!
//! The phone streams telemetry (altitude, climb rate, ground speed, flight
//! time) as small key/value dictionaries; the watch keeps a fixed catalog of
//! fields in sync, shows them, and sends start/stop logging commands back.
//!
//! # Architecture
//!
//! - [`types`]: field keys, values, the field catalog and sync messages
//! - [`codec`]: the little-endian watch dictionary wire format
//! - [`store`]: current value of every field, with synchronous change notification
//! - [`engine`]: atomic application of inbound messages and outbound sends
//! - [`command`]: start/stop intents mapped to protocol sends
//! - [`display`]: headless face model and the climb color policy
//! - [`input`]: button presses forwarded to the loop
//! - [`transport`]: the link to the phone, with an in-memory implementation
//! - [`app`]: the single-task event loop tying it together
//!
//! # Quick Start
//!
//! ```rust
//! use varioface::display::{DisplayPolicy, FaceModel};
//! use varioface::transport::ChannelTransport;
//! use varioface::types::{SyncMessage, keys};
//! use varioface::{FaceApp, SyncConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SyncConfig::default();
//!     let (transport, mut phone) =
//!         ChannelTransport::open(config.inbound_capacity, config.outbound_capacity);
//!
//!     let app = FaceApp::start(&config, transport, FaceModel::new(DisplayPolicy::default()))?;
//!     let handle = app.spawn(4);
//!
//!     phone.deliver_message(&SyncMessage::single(keys::CLIMB_RATE, "1.2m/s")).await?;
//!     handle.input.user_requested_start().await?;
//!     assert!(phone.next_message().await?.is_some());
//!
//!     handle.cancel.cancel();
//!     let report = handle.task.await?;
//!     println!("{:?}", report.fields);
//!     Ok(())
//! }
//! ```

pub mod codec;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

pub mod command;
pub mod config;
pub mod display;
pub mod engine;
pub mod input;
pub mod store;
pub mod transport;

pub mod app;

// Core exports
pub use error::*;
pub use types::{FieldCatalog, FieldKey, FieldSpec, FlightCommand, SyncMessage, Value, ValueType};

// Runtime exports
pub use app::{AppHandle, FaceApp, RunReport};
pub use command::{CommandEmitter, CommandSink};
pub use config::SyncConfig;
pub use engine::{ApplyReport, SyncEngine, SyncStats};
pub use input::{Button, InputHandle, UserIntent};
pub use store::{FieldObserver, FieldStore};
pub use transport::{Transport, TransportEvent};
