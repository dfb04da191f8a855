//! Core types for field synchronization.
//!
//! This module provides the data model shared by the store, the wire codec and
//! the event loop.
//!
//! ## Architecture
//!
//! - [`FieldKey`] is the numeric id of a field or command, with the reserved
//!   namespace in [`keys`]
//! - [`Value`] holds a field value; [`ValueType`] is its declared type
//! - [`FieldSpec`] declares one field; [`FieldCatalog`] is the fixed set of them
//! - [`SyncMessage`] is a dictionary of [`Tuple`]s exchanged with the phone
//! - [`FlightCommand`] is the start/stop code sent back to the phone
//!
//! ## Usage Example
//!
//! ```rust
//! use varioface::types::{FieldCatalog, SyncMessage, Value, keys};
//!
//! let catalog = FieldCatalog::paragliding();
//! assert_eq!(catalog.len(), 4);
//! catalog.check_budget(1024).unwrap();
//!
//! let message = SyncMessage::single(keys::CLIMB_RATE, "-2m/s");
//! let spec = catalog.get(keys::CLIMB_RATE).unwrap();
//! assert!(spec.accepts(message.get(keys::CLIMB_RATE).unwrap()));
//! assert_eq!(spec.default, Value::text("---"));
//! ```

mod catalog;
mod command;
mod key;
mod message;
mod value;

// Re-export all public types
pub use catalog::{DEFAULT_MAX_TEXT_LEN, FieldCatalog, FieldSpec, PLACEHOLDER_TEXT};
pub use command::FlightCommand;
pub use key::{FieldKey, KeyNamespace, TAG_MASK, TELEMETRY_TAG, keys};
pub use message::{SyncMessage, Tuple};
pub use value::{Value, ValueType};
