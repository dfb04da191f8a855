//! Startup configuration for the sync core.
//!
//! [`SyncConfig::default`] describes the paragliding instrument: 1024-byte
//! buffers in both directions, the four telemetry fields and the flight status
//! command key. A YAML document can override any part of it:
//!
//! ```rust
//! use varioface::SyncConfig;
//!
//! let config = SyncConfig::from_yaml_str(
//!     r#"
//! inbound_capacity: 512
//! catalog:
//!   - key: 4098
//!     name: vario
//!     kind: text
//!     default: { type: text, value: "0.0" }
//!     max_len: 8
//! "#,
//! )
//! .unwrap();
//! assert_eq!(config.inbound_capacity, 512);
//! assert_eq!(config.outbound_capacity, 1024);
//! assert_eq!(config.catalog.len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::display::DisplayPolicy;
use crate::types::{FieldCatalog, FieldKey, FieldSpec, SyncMessage, keys};
use crate::{Result, VarioError};

/// Inbound buffer size used by the watch application.
pub const DEFAULT_INBOUND_CAPACITY: usize = 1024;

/// Outbound buffer size used by the watch application.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 1024;

/// Configuration resolved once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Largest inbound dictionary in bytes
    pub inbound_capacity: usize,
    /// Largest outbound dictionary in bytes (size of the staging buffer)
    pub outbound_capacity: usize,
    /// Key the flight status command is sent under
    pub command_key: FieldKey,
    /// Fields kept in sync with the phone
    pub catalog: FieldCatalog,
    /// Presentation policy handed to the display
    pub display: DisplayPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            command_key: keys::FLIGHT_STATUS,
            catalog: FieldCatalog::paragliding(),
            display: DisplayPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Parse and validate a YAML configuration.
    ///
    /// The catalog is built through [`FieldCatalog::new`] so an inconsistent
    /// catalog is a configuration error rather than a parse error.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut document: serde_yaml_ng::Value = serde_yaml_ng::from_str(yaml)?;
        let catalog = match document.as_mapping_mut().and_then(|map| map.remove("catalog")) {
            Some(raw) => {
                let specs: Vec<FieldSpec> = serde_yaml_ng::from_value(raw)?;
                Some(FieldCatalog::new(specs)?)
            }
            None => None,
        };

        let mut config: Self = serde_yaml_ng::from_value(document)?;
        if let Some(catalog) = catalog {
            config.catalog = catalog;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| VarioError::file_error(path.to_path_buf(), e))?;
        let config = Self::from_yaml_str(&yaml)?;
        info!(path = %path.display(), fields = config.catalog.len(), "Loaded sync configuration");
        Ok(config)
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Check that the catalog fits the buffers and the command can be sent.
    pub fn validate(&self) -> Result<()> {
        self.catalog.validate()?;
        self.catalog.check_budget(self.inbound_capacity)?;

        if self.catalog.contains(self.command_key) {
            return Err(VarioError::configuration(format!(
                "command key {} is also declared as a field",
                self.command_key
            )));
        }

        let command_len = SyncMessage::single(self.command_key, 0i32).encoded_len();
        if command_len > self.outbound_capacity {
            return Err(VarioError::configuration(format!(
                "outbound capacity {} cannot hold a {}-byte command",
                self.outbound_capacity, command_len
            )));
        }

        if !self.catalog.contains(self.display.climb_key) && self.display.invert_on_sink {
            return Err(VarioError::configuration(format!(
                "climb key {} used for color inversion is not in the catalog",
                self.display.climb_key
            )));
        }

        Ok(())
    }
}
