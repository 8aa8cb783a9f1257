//! Signal Store - the shared, lock-guarded vehicle signal tree
//!
//! The store is the single owner of vehicle state:
//! - Request handlers read and write it by address
//! - The simulator perturbs a few signals on a timer
//! - Every access goes through one `RwLock` over the whole tree
//!
//! The tree's shape never changes after construction; only leaf values do.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::{default_tree, Scalar, SignalAddress, SignalTree, StoreError};

/// Thread-safe store handle shared by every caller
pub type SharedStore = Arc<SignalStore>;

/// A committed write to one signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalChange {
    pub address: String,
    pub old: Scalar,
    pub new: Scalar,
    pub changed_at: DateTime<Utc>,
}

/// The signal store
#[derive(Debug)]
pub struct SignalStore {
    tree: RwLock<SignalTree>,
}

impl SignalStore {
    /// Create a store holding the default vehicle snapshot
    pub fn new() -> Self {
        Self::with_tree(default_tree())
    }

    /// Create a store over a caller-supplied tree
    pub fn with_tree(tree: SignalTree) -> Self {
        Self {
            tree: RwLock::new(tree),
        }
    }

    /// Wrap the store for sharing across tasks
    pub fn into_shared(self) -> SharedStore {
        Arc::new(self)
    }

    /// Deep copy of the whole tree
    pub fn get_all(&self) -> SignalTree {
        self.tree.read().clone()
    }

    /// Read one signal
    pub fn get(&self, address: &str) -> Result<Scalar, StoreError> {
        let addr = SignalAddress::parse(address)?;
        let tree = self.tree.read();
        addr.resolve(&tree)
            .cloned()
            .ok_or_else(|| StoreError::not_found(address))
    }

    /// Overwrite one signal and return the value now stored
    pub fn set(&self, address: &str, value: impl Into<Scalar>) -> Result<Scalar, StoreError> {
        self.replace(address, value.into()).map(|change| change.new)
    }

    /// Overwrite one signal and report both the old and new value
    pub fn replace(&self, address: &str, value: Scalar) -> Result<SignalChange, StoreError> {
        let new = value.clone();
        let old = self.with_leaf_mut(address, |leaf| std::mem::replace(leaf, value))?;

        info!("Signal {} changed from {} to {}", address, old, new);

        Ok(SignalChange {
            address: address.to_string(),
            old,
            new,
            changed_at: Utc::now(),
        })
    }

    /// Read-modify-write one signal inside a single critical section
    ///
    /// `f` sees the current value and returns the replacement, or `None` to
    /// leave the signal untouched (the call then returns `Ok(None)`).
    pub fn update<F>(&self, address: &str, f: F) -> Result<Option<SignalChange>, StoreError>
    where
        F: FnOnce(&Scalar) -> Option<Scalar>,
    {
        let swapped = self.with_leaf_mut(address, |leaf| {
            let new = f(&*leaf)?;
            let old = std::mem::replace(leaf, new.clone());
            Some((old, new))
        })?;

        Ok(swapped.map(|(old, new)| {
            info!("Signal {} changed from {} to {}", address, old, new);
            SignalChange {
                address: address.to_string(),
                old,
                new,
                changed_at: Utc::now(),
            }
        }))
    }

    /// Check whether an address names a signal
    pub fn contains(&self, address: &str) -> bool {
        self.get(address).is_ok()
    }

    /// Every resolvable address, sorted
    pub fn addresses(&self) -> Vec<String> {
        self.tree.read().leaf_addresses()
    }

    /// Number of addressable signals
    pub fn signal_count(&self) -> usize {
        self.addresses().len()
    }

    fn with_leaf_mut<T>(
        &self,
        address: &str,
        f: impl FnOnce(&mut Scalar) -> T,
    ) -> Result<T, StoreError> {
        let addr = SignalAddress::parse(address)?;
        let mut tree = self.tree.write();
        let leaf = addr
            .resolve_mut(&mut tree)
            .ok_or_else(|| StoreError::not_found(address))?;
        Ok(f(leaf))
    }
}

impl Default for SignalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SignalValue;

    #[test]
    fn test_example_scenario() {
        let store = SignalStore::new();

        assert_eq!(store.get("VehicleSpeed").unwrap(), Scalar::Int(0));
        assert_eq!(store.set("VehicleSpeed", 42).unwrap(), Scalar::Int(42));
        assert_eq!(store.get("VehicleSpeed").unwrap(), Scalar::Int(42));

        assert_eq!(store.get("Doors.DriverDoor").unwrap(), Scalar::from("CLOSED"));
        store.set("Doors.DriverDoor", "OPEN").unwrap();
        assert_eq!(store.get("Doors.DriverDoor").unwrap(), Scalar::from("OPEN"));

        assert_eq!(
            store.get("Doors.TrunkDoor"),
            Err(StoreError::not_found("Doors.TrunkDoor"))
        );
    }

    #[test]
    fn test_round_trip_every_address() {
        let store = SignalStore::new();

        for address in store.addresses() {
            let value = Scalar::Text(format!("{}-written", address));
            assert_eq!(store.set(&address, value.clone()).unwrap(), value);
            assert_eq!(store.get(&address).unwrap(), value);
        }
    }

    #[test]
    fn test_missing_signals() {
        let store = SignalStore::new();

        assert!(matches!(
            store.get("nonexistent"),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.get("Lights.NonexistentChild"),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.get("Lights.Headlights.Extra"),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(store.get(""), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_groups_are_not_leaves() {
        let store = SignalStore::new();
        let before = store.get_all();

        assert!(matches!(store.get("Lights"), Err(StoreError::NotFound { .. })));
        assert!(matches!(
            store.set("Lights", "ON"),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.set("VIN.Suffix", "X"),
            Err(StoreError::NotFound { .. })
        ));

        assert_eq!(store.get_all(), before);
    }

    #[test]
    fn test_untyped_overwrite() {
        let store = SignalStore::new();
        store.set("FuelLevel", "EMPTY").unwrap();
        assert_eq!(store.get("FuelLevel").unwrap(), Scalar::from("EMPTY"));
    }

    #[test]
    fn test_shape_is_fixed() {
        let store = SignalStore::new();
        let addresses = store.addresses();

        let _ = store.set("Doors.TrunkDoor", "OPEN");
        let _ = store.set("NewSignal", 1);
        store.set("Lights.Hazard", "ON").unwrap();

        assert_eq!(store.addresses(), addresses);
        assert!(!store.contains("Doors.TrunkDoor"));
        assert!(store.contains("Lights.Hazard"));
    }

    #[test]
    fn test_get_all_is_a_snapshot() {
        let store = SignalStore::new();
        let snapshot = store.get_all();

        store.set("ODO", 1300).unwrap();

        assert_eq!(
            snapshot.get("ODO"),
            Some(&SignalValue::Scalar(Scalar::Int(1250)))
        );
        assert_eq!(
            store.get_all().get("ODO"),
            Some(&SignalValue::Scalar(Scalar::Int(1300)))
        );
    }

    #[test]
    fn test_replace_reports_old_value() {
        let store = SignalStore::new();
        let change = store.replace("Lights.HighBeam", Scalar::from("ON")).unwrap();

        assert_eq!(change.address, "Lights.HighBeam");
        assert_eq!(change.old, Scalar::from("OFF"));
        assert_eq!(change.new, Scalar::from("ON"));
    }

    #[test]
    fn test_update_can_decline() {
        let store = SignalStore::new();

        let change = store
            .update("VIN", |v| v.as_f64().map(|n| Scalar::Float(n + 1.0)))
            .unwrap();
        assert!(change.is_none());
        assert_eq!(store.get("VIN").unwrap(), Scalar::from("DREAMKIT00000001"));

        let change = store
            .update("ODO", |v| v.as_f64().map(|n| Scalar::Int(n as i64 + 10)))
            .unwrap()
            .unwrap();
        assert_eq!(change.old, Scalar::Int(1250));
        assert_eq!(store.get("ODO").unwrap(), Scalar::Int(1260));

        assert!(store.update("Missing", |_| None).is_err());
    }

    #[test]
    fn test_concurrent_writes_are_not_lost() {
        let store = SignalStore::new().into_shared();
        let addresses = store.addresses();

        std::thread::scope(|scope| {
            for (i, address) in addresses.iter().enumerate() {
                let store = store.clone();
                scope.spawn(move || {
                    store.set(address, i as i64).unwrap();
                });
            }
        });

        let snapshot = SignalStore::with_tree(store.get_all());
        for (i, address) in addresses.iter().enumerate() {
            assert_eq!(snapshot.get(address).unwrap(), Scalar::Int(i as i64));
        }
    }

    #[test]
    fn test_concurrent_readers_see_committed_values() {
        let store = SignalStore::new().into_shared();
        let writers = 4;
        let writes_per_writer = 200;

        std::thread::scope(|scope| {
            for w in 0..writers {
                let store = store.clone();
                scope.spawn(move || {
                    for n in 0..writes_per_writer {
                        store
                            .set("Doors.DriverDoor", format!("writer-{}-{}", w, n))
                            .unwrap();
                    }
                });
            }

            for _ in 0..writers {
                let store = store.clone();
                scope.spawn(move || {
                    for _ in 0..writes_per_writer {
                        let value = store.get("Doors.DriverDoor").unwrap();
                        let text = value.as_str().unwrap();
                        assert!(
                            text == "CLOSED" || text.starts_with("writer-"),
                            "torn read: {}",
                            text
                        );
                    }
                });
            }
        });

        let last = store.get("Doors.DriverDoor").unwrap();
        assert!(last.as_str().unwrap().starts_with("writer-"));
    }

    #[test]
    fn test_concurrent_updates_serialize() {
        let store = SignalStore::new().into_shared();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let store = store.clone();
                scope.spawn(move || {
                    for _ in 0..100 {
                        store
                            .update("ODO", |v| v.as_f64().map(|n| Scalar::Int(n as i64 + 1)))
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(store.get("ODO").unwrap(), Scalar::Int(1250 + 800));
    }
}
