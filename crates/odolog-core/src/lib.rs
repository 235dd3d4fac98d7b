//! Entity services, fuel analytics, and legacy migration for odolog.
//!
//! This crate sits between the UI shell and [`odolog_store`]. The three
//! entity services ([`VehicleService`], [`FuelService`],
//! [`MaintenanceService`]) are the only sanctioned way into the store for
//! surrounding code; the [`analytics`] module derives aggregate statistics
//! as pure functions over entries the services fetched, and
//! [`MigrationImporter`] imports a legacy key-value snapshot.
//!
//! # Store handle
//!
//! The store is constructed once at application start and injected into
//! each service as a [`SharedStore`]; there is no global instance.
//!
//! ```no_run
//! use odolog_core::{FuelService, VehicleService, shared_store};
//! use odolog_store::Store;
//!
//! let mut store = Store::new(odolog_store::default_db_path());
//! store.init();
//! let store = shared_store(store);
//!
//! let vehicles = VehicleService::new(store.clone());
//! let fuel = FuelService::new(store.clone());
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use odolog_store::Store;

pub mod analytics;
pub mod error;
pub mod fuel;
pub mod maintenance;
pub mod migration;
pub mod vehicles;

pub use error::{Error, Result};
pub use fuel::{AMOUNT_TOLERANCE, FuelDraft, FuelService};
pub use maintenance::{MaintenanceService, ServiceDraft};
pub use migration::{
    LegacyStore, MIGRATION_VERSION, MigrationCounts, MigrationError, MigrationImporter,
    MigrationOutcome,
};
pub use vehicles::{MIN_VEHICLE_YEAR, VehicleDraft, VehicleService, VehicleUpdate};

/// Shared handle to the process-wide store.
///
/// All services and the migration importer hold a clone of this handle;
/// the mutex serializes access so there is never more than one writer.
pub type SharedStore = Arc<Mutex<Store>>;

/// Wrap an initialized store into a [`SharedStore`] handle.
pub fn shared_store(store: Store) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Lock the shared store, recovering from a poisoned mutex.
///
/// A panic while holding the lock cannot leave the store half-written in a
/// way we could repair here, so the guard is simply taken over.
pub(crate) fn lock(store: &SharedStore) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
