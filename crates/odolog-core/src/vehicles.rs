//! Vehicle CRUD service.

use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use odolog_store::Store;
use odolog_types::{Vehicle, VehicleStatus, VehicleType};

use crate::error::{Error, Result};
use crate::{SharedStore, lock};

/// Earliest accepted model year.
pub const MIN_VEHICLE_YEAR: i32 = 1886;

/// Form input for creating a vehicle.
#[derive(Debug, Clone)]
pub struct VehicleDraft {
    /// Display name.
    pub name: String,
    /// Model year, validated against a plausible range.
    pub year: i32,
    /// Manufacturer.
    pub make: String,
    /// Model name.
    pub model: String,
    /// Powertrain type.
    pub vehicle_type: VehicleType,
    /// Initial status; defaults to active when omitted.
    pub status: Option<VehicleStatus>,
}

/// Partial update for a vehicle; only provided fields are merged.
#[derive(Debug, Clone, Default)]
pub struct VehicleUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New model year.
    pub year: Option<i32>,
    /// New manufacturer.
    pub make: Option<String>,
    /// New model name.
    pub model: Option<String>,
    /// New powertrain type.
    pub vehicle_type: Option<VehicleType>,
    /// New status.
    pub status: Option<VehicleStatus>,
}

/// CRUD operations over vehicles.
#[derive(Clone)]
pub struct VehicleService {
    store: SharedStore,
}

impl VehicleService {
    /// Create a service over the injected store handle.
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// All vehicles, oldest first.
    pub fn get_all(&self) -> Result<Vec<Vehicle>> {
        Ok(lock(&self.store).list_vehicles()?)
    }

    /// Look up a vehicle by id.
    pub fn get_by_id(&self, id: &str) -> Result<Option<Vehicle>> {
        Ok(lock(&self.store).get_vehicle(id)?)
    }

    /// Validate the draft and create a vehicle.
    pub fn create(&self, draft: &VehicleDraft) -> Result<Vehicle> {
        let mut store = lock(&self.store);
        create_in(&mut store, draft)
    }

    /// Merge the provided fields into an existing vehicle.
    pub fn update(&self, id: &str, changes: &VehicleUpdate) -> Result<Vehicle> {
        let mut store = lock(&self.store);

        let mut vehicle =
            store
                .get_vehicle(id)?
                .ok_or_else(|| odolog_store::Error::NotFound {
                    table: "vehicles",
                    id: id.to_string(),
                })?;

        if let Some(ref name) = changes.name {
            vehicle.name = name.clone();
        }
        if let Some(year) = changes.year {
            vehicle.year = year;
        }
        if let Some(ref make) = changes.make {
            vehicle.make = make.clone();
        }
        if let Some(ref model) = changes.model {
            vehicle.model = model.clone();
        }
        if let Some(vehicle_type) = changes.vehicle_type {
            vehicle.vehicle_type = vehicle_type;
        }
        if let Some(status) = changes.status {
            vehicle.status = status;
        }

        validate_fields(&vehicle.name, vehicle.year, &vehicle.make, &vehicle.model)?;

        vehicle.updated_at = OffsetDateTime::now_utc();
        store.update_vehicle(&vehicle)?;
        Ok(vehicle)
    }

    /// Delete a vehicle; the store cascades to its fuel and service rows
    /// in the same logical operation.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut store = lock(&self.store);
        store.delete_vehicle(id)?;
        Ok(())
    }
}

/// Create path shared with batch operations and the migration importer;
/// runs against an already locked store so it composes inside
/// transactions.
pub(crate) fn create_in(store: &mut Store, draft: &VehicleDraft) -> Result<Vehicle> {
    validate_fields(&draft.name, draft.year, &draft.make, &draft.model)?;

    let now = OffsetDateTime::now_utc();
    let vehicle = Vehicle {
        id: Uuid::new_v4().to_string(),
        name: draft.name.clone(),
        year: draft.year,
        make: draft.make.clone(),
        model: draft.model.clone(),
        vehicle_type: draft.vehicle_type,
        status: draft.status.unwrap_or(VehicleStatus::Active),
        created_at: now,
        updated_at: now,
    };

    store.insert_vehicle(&vehicle)?;
    debug!("Created vehicle {} ({})", vehicle.id, vehicle.name);
    Ok(vehicle)
}

fn validate_fields(name: &str, year: i32, make: &str, model: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            field: "name",
            message: "must not be empty".to_string(),
        });
    }
    let max_year = OffsetDateTime::now_utc().year() + 1;
    if !(MIN_VEHICLE_YEAR..=max_year).contains(&year) {
        return Err(Error::Validation {
            field: "year",
            message: format!("must be between {MIN_VEHICLE_YEAR} and {max_year}"),
        });
    }
    if make.trim().is_empty() {
        return Err(Error::Validation {
            field: "make",
            message: "must not be empty".to_string(),
        });
    }
    if model.trim().is_empty() {
        return Err(Error::Validation {
            field: "model",
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}
