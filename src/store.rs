//! Field store holding the current value of every catalog field.
//!
//! The store is created once at startup with every field at its default and is
//! then only changed through [`FieldStore::apply_update`], which always notifies
//! the [`FieldObserver`] synchronously. Reading is side-effect free.

use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

use crate::types::{FieldCatalog, FieldKey, FieldSpec, Value};
use crate::{Result, SyncFault, VarioError};

/// Receiver of field change notifications (typically the display).
pub trait FieldObserver {
    /// Called synchronously after every successful update of `key`.
    fn on_field_changed(&mut self, key: FieldKey, value: &Value);
}

impl<O: FieldObserver + ?Sized> FieldObserver for &mut O {
    fn on_field_changed(&mut self, key: FieldKey, value: &Value) {
        (**self).on_field_changed(key, value);
    }
}

impl<O: FieldObserver + ?Sized> FieldObserver for Box<O> {
    fn on_field_changed(&mut self, key: FieldKey, value: &Value) {
        (**self).on_field_changed(key, value);
    }
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl FieldObserver for NullObserver {
    fn on_field_changed(&mut self, _key: FieldKey, _value: &Value) {}
}

#[derive(Debug, Clone)]
struct FieldSlot {
    spec: FieldSpec,
    current: Value,
    updates: u64,
}

/// Fixed-size store of synchronized fields.
#[derive(Debug, Clone)]
pub struct FieldStore {
    slots: BTreeMap<FieldKey, FieldSlot>,
    capacity: usize,
}

impl FieldStore {
    /// Populate every declared field with its default.
    ///
    /// Fails with a configuration error when the catalog is inconsistent or its
    /// worst-case encoding does not fit `capacity` bytes.
    pub fn initialize(catalog: &FieldCatalog, capacity: usize) -> Result<Self> {
        catalog.validate()?;
        catalog.check_budget(capacity)?;

        let slots = catalog
            .iter()
            .map(|spec| {
                let slot = FieldSlot { spec: spec.clone(), current: spec.default.clone(), updates: 0 };
                (spec.key, slot)
            })
            .collect();

        debug!(
            fields = catalog.len(),
            worst_case = catalog.worst_case_size(),
            capacity,
            "Field store initialized"
        );

        Ok(Self { slots, capacity })
    }

    /// Check whether `value` could be stored under `key` without applying it.
    ///
    /// Returns `Ok(false)` for keys outside the catalog, `Ok(true)` for an
    /// acceptable value, and a sync error for a wrong type or oversized value.
    pub fn check(&self, key: FieldKey, value: &Value) -> Result<bool> {
        let Some(slot) = self.slots.get(&key) else {
            return Ok(false);
        };

        let spec = &slot.spec;
        if value.value_type() != spec.kind {
            return Err(SyncFault::TypeMismatch {
                key,
                expected: spec.kind,
                found: value.value_type(),
            }
            .into());
        }

        if !spec.accepts(value) {
            return Err(SyncFault::ValueTooLong { key, len: value.content_len(), max: spec.max_len }
                .into());
        }

        Ok(true)
    }

    /// Overwrite the value of `key` and notify `observer`.
    ///
    /// Keys outside the catalog are ignored with an [`VarioError::UnknownKey`]
    /// error and no notification. The value must already satisfy [`Self::check`].
    pub fn apply_update(
        &mut self,
        key: FieldKey,
        value: Value,
        observer: &mut dyn FieldObserver,
    ) -> Result<()> {
        let Some(slot) = self.slots.get_mut(&key) else {
            warn!(%key, "Ignoring update for key outside the catalog");
            return Err(VarioError::unknown_key(key));
        };

        trace!(%key, field = %slot.spec.name, value = %value, "Field updated");
        slot.current = value;
        slot.updates += 1;
        observer.on_field_changed(key, &slot.current);
        Ok(())
    }

    /// Current value of `key`, or its default if never updated.
    pub fn current(&self, key: FieldKey) -> Option<&Value> {
        self.slots.get(&key).map(|slot| &slot.current)
    }

    /// Declaration of `key`.
    pub fn spec(&self, key: FieldKey) -> Option<&FieldSpec> {
        self.slots.get(&key).map(|slot| &slot.spec)
    }

    /// Number of peer updates applied to `key`.
    pub fn update_count(&self, key: FieldKey) -> u64 {
        self.slots.get(&key).map_or(0, |slot| slot.updates)
    }

    /// Check if `key` is part of the catalog.
    pub fn contains(&self, key: FieldKey) -> bool {
        self.slots.contains_key(&key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the store holds no fields.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Buffer capacity the catalog was checked against.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Notify `observer` of every current value, in key order.
    pub fn replay(&self, observer: &mut dyn FieldObserver) {
        for (key, slot) in &self.slots {
            observer.on_field_changed(*key, &slot.current);
        }
    }

    /// Copy of all current values in key order.
    pub fn snapshot(&self) -> BTreeMap<FieldKey, Value> {
        self.slots.iter().map(|(key, slot)| (*key, slot.current.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingObserver;
    use crate::types::{PLACEHOLDER_TEXT, keys};
    use proptest::prelude::*;

    fn paragliding_store() -> FieldStore {
        FieldStore::initialize(&FieldCatalog::paragliding(), 1024).unwrap()
    }

    proptest! {
        #[test]
        fn prop_known_update_sets_value_and_notifies_once(
            key in prop::sample::select(vec![
                keys::DAMPED_ALTITUDE, keys::CLIMB_RATE, keys::GROUND_SPEED, keys::FLIGHT_TIME,
            ]),
            text in "[-0-9a-z/]{0,16}",
        ) {
            let mut store = paragliding_store();
            let mut observer = RecordingObserver::default();
            let value = Value::Text(text);

            prop_assert!(store.check(key, &value).unwrap());
            store.apply_update(key, value.clone(), &mut observer).unwrap();

            prop_assert_eq!(store.current(key), Some(&value));
            prop_assert_eq!(observer.events, vec![(key, value)]);
        }

        #[test]
        fn prop_unknown_keys_never_notify(raw in 0u32..0x1000) {
            let mut store = paragliding_store();
            let mut observer = RecordingObserver::default();
            let key = FieldKey::new(raw);

            let err = store.apply_update(key, Value::text("x"), &mut observer).unwrap_err();
            let is_unknown_key = matches!(err, VarioError::UnknownKey { .. });
            prop_assert!(is_unknown_key);
            prop_assert!(observer.events.is_empty());
        }
    }

    #[test]
    fn defaults_before_any_update() {
        let store = paragliding_store();
        for key in [keys::DAMPED_ALTITUDE, keys::CLIMB_RATE, keys::GROUND_SPEED, keys::FLIGHT_TIME] {
            assert_eq!(store.current(key), Some(&Value::text(PLACEHOLDER_TEXT)));
            assert_eq!(store.update_count(key), 0);
        }
        assert_eq!(store.current(keys::FLIGHT_STATUS), None);
    }

    #[test]
    fn initialize_rejects_budget_overflow() {
        let err = FieldStore::initialize(&FieldCatalog::paragliding(), 32).unwrap_err();
        assert!(matches!(err, VarioError::Configuration { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn check_reports_type_mismatch_and_overflow() {
        let store = paragliding_store();

        let mismatch = store.check(keys::CLIMB_RATE, &Value::Int(-2)).unwrap_err();
        assert!(matches!(mismatch.sync_fault(), Some(SyncFault::TypeMismatch { .. })));

        let long = Value::text("x".repeat(64));
        let overflow = store.check(keys::CLIMB_RATE, &long).unwrap_err();
        assert!(matches!(overflow.sync_fault(), Some(SyncFault::ValueTooLong { .. })));

        assert!(!store.check(FieldKey::new(0x2001), &Value::Int(1)).unwrap());
    }

    #[test]
    fn replay_notifies_every_field_in_key_order() {
        let store = paragliding_store();
        let mut observer = RecordingObserver::default();
        store.replay(&mut observer);

        let order: Vec<FieldKey> = observer.events.iter().map(|(key, _)| *key).collect();
        assert_eq!(
            order,
            vec![keys::DAMPED_ALTITUDE, keys::CLIMB_RATE, keys::GROUND_SPEED, keys::FLIGHT_TIME]
        );
    }

    #[test]
    fn snapshot_reflects_updates() {
        let mut store = paragliding_store();
        store.apply_update(keys::GROUND_SPEED, Value::text("12m/s"), &mut NullObserver).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot[&keys::GROUND_SPEED], Value::text("12m/s"));
        assert_eq!(snapshot[&keys::FLIGHT_TIME], Value::text(PLACEHOLDER_TEXT));
        assert_eq!(store.update_count(keys::GROUND_SPEED), 1);
    }
}
