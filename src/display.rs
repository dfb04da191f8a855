//! Display-side consumers of field notifications.
//!
//! Rendering is outside this crate. What lives here is the part of the face
//! that is policy rather than pixels:
//! - [`DisplayPolicy`] decides whether a sinking climb rate flips the colors
//!   of the climb readout
//! - [`FaceModel`] is a headless face that keeps the latest text of every
//!   field and publishes [`FaceSnapshot`]s for a renderer to draw
//!
//! ```rust
//! use varioface::display::{FaceModel, DisplayPolicy, Polarity};
//! use varioface::store::FieldObserver;
//! use varioface::types::{Value, keys};
//!
//! let mut face = FaceModel::new(DisplayPolicy::default());
//! face.on_field_changed(keys::CLIMB_RATE, &Value::text("-2m/s"));
//! assert_eq!(face.text(keys::CLIMB_RATE), Some("-2m/s"));
//! assert_eq!(face.climb_polarity(), Polarity::Inverted);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::trace;

use crate::store::FieldObserver;
use crate::types::{FieldKey, Value, keys};

/// Presentation policy for the climb readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayPolicy {
    /// Flip foreground and background while the climb rate is negative
    pub invert_on_sink: bool,
    /// Field holding the climb rate
    pub climb_key: FieldKey,
}

impl Default for DisplayPolicy {
    fn default() -> Self {
        Self { invert_on_sink: true, climb_key: keys::CLIMB_RATE }
    }
}

/// Monochrome color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    Black,
    White,
}

/// Color arrangement of a readout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    /// Black text on white
    #[default]
    Normal,
    /// White text on black
    Inverted,
}

impl Polarity {
    /// Polarity for a climb reading: negative readings are inverted.
    ///
    /// Text readings count as negative when they start with `-`, which is how
    /// the phone formats sink.
    pub fn for_climb(value: &Value) -> Self {
        let sinking = match value {
            Value::Text(text) => text.starts_with('-'),
            Value::Int(v) => *v < 0,
            Value::UInt(_) | Value::Bytes(_) => false,
        };

        if sinking { Polarity::Inverted } else { Polarity::Normal }
    }

    /// Text color.
    pub fn foreground(self) -> Color {
        match self {
            Polarity::Normal => Color::Black,
            Polarity::Inverted => Color::White,
        }
    }

    /// Background color.
    pub fn background(self) -> Color {
        match self {
            Polarity::Normal => Color::White,
            Polarity::Inverted => Color::Black,
        }
    }
}

/// Everything a renderer needs to draw the face.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaceSnapshot {
    /// Display text per field
    pub texts: BTreeMap<FieldKey, String>,
    /// Colors of the climb readout
    pub climb_polarity: Polarity,
    /// Number of notifications folded into this snapshot
    pub revision: u64,
}

impl FaceSnapshot {
    /// Display text of a field.
    pub fn text(&self, key: FieldKey) -> Option<&str> {
        self.texts.get(&key).map(String::as_str)
    }
}

/// Headless face that tracks field texts and the climb polarity.
#[derive(Debug)]
pub struct FaceModel {
    policy: DisplayPolicy,
    current: FaceSnapshot,
    publisher: watch::Sender<Arc<FaceSnapshot>>,
}

impl FaceModel {
    /// Create an empty face.
    pub fn new(policy: DisplayPolicy) -> Self {
        let (publisher, _) = watch::channel(Arc::new(FaceSnapshot::default()));
        Self { policy, current: FaceSnapshot::default(), publisher }
    }

    /// Display text of a field.
    pub fn text(&self, key: FieldKey) -> Option<&str> {
        self.current.text(key)
    }

    /// Colors of the climb readout.
    pub fn climb_polarity(&self) -> Polarity {
        self.current.climb_polarity
    }

    /// Number of notifications received.
    pub fn revision(&self) -> u64 {
        self.current.revision
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<FaceSnapshot> {
        self.publisher.borrow().clone()
    }

    /// Watch receiver for snapshots, for renderers living in another task.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FaceSnapshot>> {
        self.publisher.subscribe()
    }

    /// Snapshots as a stream, starting with the current one.
    ///
    /// Uses latest-wins semantics: a slow renderer only sees the newest face.
    pub fn updates(&self) -> WatchStream<Arc<FaceSnapshot>> {
        WatchStream::new(self.publisher.subscribe())
    }
}

impl FieldObserver for FaceModel {
    fn on_field_changed(&mut self, key: FieldKey, value: &Value) {
        self.current.texts.insert(key, value.display_text().into_owned());

        if self.policy.invert_on_sink && key == self.policy.climb_key {
            self.current.climb_polarity = Polarity::for_climb(value);
        }

        self.current.revision += 1;
        trace!(%key, revision = self.current.revision, "Face updated");
        self.publisher.send_replace(Arc::new(self.current.clone()));
    }
}
