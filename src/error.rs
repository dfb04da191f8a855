//! Error types for field synchronization.
//!
//! Every fallible operation in the crate returns [`VarioError`]. The variants
//! follow the runtime policy of the watch client:
//!
//! ## Error Categories
//!
//! - **Configuration Errors**: catalog/buffer mismatches found at startup (fatal)
//! - **Unknown Key Errors**: inbound pairs for keys outside the catalog (ignored, logged)
//! - **Sync Errors**: malformed or oversized inbound messages (rejected whole)
//! - **Send Errors**: outbound commands the transport refused (no retry)
//! - **Encode Errors**: outbound values the wire format cannot carry
//! - **File / Parse Errors**: configuration loading failures
//!
//! Only configuration problems are allowed to stop the client from starting;
//! everything else is contained by the event loop so the face keeps showing
//! the last known values.
//!
//! ```rust
//! use varioface::{FieldKey, VarioError};
//!
//! let error = VarioError::send_failed("outbox busy");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//!
//! let unknown = VarioError::unknown_key(FieldKey::new(0x2001));
//! assert!(!unknown.is_fatal());
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{FieldKey, ValueType};

/// Result type alias for sync operations.
pub type Result<T, E = VarioError> = std::result::Result<T, E>;

/// Main error type for the sync core.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VarioError {
    #[error("Invalid sync configuration: {reason}")]
    Configuration { reason: String },

    #[error("Key {key} is not part of the field catalog")]
    UnknownKey { key: FieldKey },

    #[error("Inbound sync message rejected: {fault}")]
    Sync { fault: SyncFault },

    #[error("Failed to send to peer: {reason}")]
    Send {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Cannot encode message: {details}")]
    Encode { details: String },

    #[error("Configuration file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },
}

/// Reason an inbound message was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SyncFault {
    #[error("message is {len} bytes, inbound capacity is {capacity}")]
    Oversized { len: usize, capacity: usize },

    #[error("malformed dictionary: {details}")]
    Malformed { details: String },

    #[error("key {key} expects {expected:?}, got {found:?}")]
    TypeMismatch { key: FieldKey, expected: ValueType, found: ValueType },

    #[error("value for key {key} is {len} bytes, slot holds at most {max}")]
    ValueTooLong { key: FieldKey, len: usize, max: usize },
}

impl VarioError {
    /// Returns whether this error may go away if the operation is attempted again.
    pub fn is_retryable(&self) -> bool {
        match self {
            VarioError::Send { .. } => true,
            VarioError::Sync { .. } => true,
            VarioError::Configuration { .. } => false,
            VarioError::UnknownKey { .. } => false,
            VarioError::Encode { .. } => false,
            VarioError::File { .. } => false,
            VarioError::Parse { .. } => false,
        }
    }

    /// Returns whether this error must prevent the event loop from starting.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VarioError::Configuration { .. } | VarioError::File { .. } | VarioError::Parse { .. }
        )
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            VarioError::Configuration { .. } => vec![
                "Shrink the declared text lengths in the field catalog",
                "Raise the inbound buffer capacity",
                "Check that every default matches its declared type",
            ],
            VarioError::UnknownKey { .. } => vec![
                "Update the field catalog if the phone added a new field",
                "Ignore the key if it is a newer optional field",
            ],
            VarioError::Sync { .. } => vec![
                "Wait for the next update from the phone",
                "Check that phone and watch agree on the field catalog",
                "Check the phone app version",
            ],
            VarioError::Send { .. } => vec![
                "Press the button again once the outbox is free",
                "Check that the phone is still connected",
            ],
            VarioError::Encode { .. } => vec![
                "Remove NUL characters from text values",
                "Keep messages under 255 pairs and 65535 bytes per value",
            ],
            VarioError::File { .. } => vec![
                "Check the configuration file exists and is readable",
                "Check file permissions",
            ],
            VarioError::Parse { .. } => vec![
                "Check the configuration YAML syntax",
                "Compare against the default configuration",
            ],
        }
    }

    /// Helper constructor for configuration errors.
    pub fn configuration(reason: impl Into<String>) -> Self {
        VarioError::Configuration { reason: reason.into() }
    }

    /// Helper constructor for unknown key errors.
    pub fn unknown_key(key: FieldKey) -> Self {
        VarioError::UnknownKey { key }
    }

    /// Helper constructor for malformed inbound messages.
    pub fn malformed(details: impl Into<String>) -> Self {
        VarioError::Sync { fault: SyncFault::Malformed { details: details.into() } }
    }

    /// Helper constructor for send failures.
    pub fn send_failed(reason: impl Into<String>) -> Self {
        VarioError::Send { reason: reason.into(), source: None }
    }

    /// Helper constructor for send failures with source.
    pub fn send_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        VarioError::Send { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for encode failures.
    pub fn encode(details: impl Into<String>) -> Self {
        VarioError::Encode { details: details.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        VarioError::File { path, source }
    }

    /// The sync fault behind this error, if it is a rejected inbound message.
    pub fn sync_fault(&self) -> Option<&SyncFault> {
        match self {
            VarioError::Sync { fault } => Some(fault),
            _ => None,
        }
    }
}

impl From<SyncFault> for VarioError {
    fn from(fault: SyncFault) -> Self {
        VarioError::Sync { fault }
    }
}

impl From<serde_yaml_ng::Error> for VarioError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        VarioError::Parse { context: "sync configuration".to_string(), details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_their_context(
            reason in ".*",
            raw_key in any::<u32>(),
            len in 0usize..4096,
            capacity in 0usize..4096,
        ) {
            let config = VarioError::configuration(reason.clone());
            prop_assert!(config.to_string().contains(&reason));

            let unknown = VarioError::unknown_key(FieldKey::new(raw_key));
            let has_hex_key = unknown.to_string().contains(&format!("{:#x}", raw_key));
            prop_assert!(has_hex_key);

            let oversized: VarioError = SyncFault::Oversized { len, capacity }.into();
            let msg = oversized.to_string();
            prop_assert!(msg.contains(&len.to_string()));
            prop_assert!(msg.contains(&capacity.to_string()));
        }

        #[test]
        fn send_error_source_chain_is_preserved(base in "[a-z ]{1,40}") {
            let source: Box<dyn std::error::Error + Send + Sync> =
                Box::new(std::io::Error::other(base.clone()));
            let err = VarioError::send_failed_with_source("link closed", source);

            let inner = std::error::Error::source(&err);
            prop_assert!(inner.is_some());
            prop_assert_eq!(inner.map(|e| e.to_string()), Some(base));
        }
    }

    #[test]
    fn only_startup_errors_are_fatal() {
        assert!(VarioError::configuration("too big").is_fatal());
        assert!(!VarioError::unknown_key(FieldKey::new(7)).is_fatal());
        assert!(!VarioError::malformed("truncated").is_fatal());
        assert!(!VarioError::send_failed("busy").is_fatal());
    }

    #[test]
    fn recovery_methods_work() {
        let send = VarioError::send_failed("busy");
        let config = VarioError::configuration("budget");

        assert!(send.is_retryable());
        assert!(!config.is_retryable());

        for suggestion in send.recovery_suggestions().iter().chain(&config.recovery_suggestions()) {
            assert!(suggestion.len() > 5);
        }
    }

    #[test]
    fn sync_fault_accessor() {
        let err = VarioError::malformed("short header");
        assert!(matches!(err.sync_fault(), Some(SyncFault::Malformed { .. })));
        assert!(VarioError::send_failed("x").sync_fault().is_none());
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<VarioError>();
    }
}
