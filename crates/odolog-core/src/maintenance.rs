//! Service record CRUD.
//!
//! Symmetric to the fuel service minus the derived-field machinery:
//! service records carry no computed values.

use time::{Date, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use odolog_store::{ServiceQuery, Store};
use odolog_types::ServiceRecord;

use crate::error::{Error, Result};
use crate::{SharedStore, lock};

/// Form input for creating or replacing a service record.
#[derive(Debug, Clone)]
pub struct ServiceDraft {
    /// Owning vehicle id.
    pub vehicle_id: String,
    /// Calendar date of the service.
    pub date: Date,
    /// Free-text service type (e.g. "oil change").
    pub service_type: String,
    /// Description of the work performed.
    pub description: String,
    /// Cost in currency units.
    pub cost: f64,
    /// Odometer reading at service time.
    pub mileage: u32,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Whether the service has been completed.
    pub completed: bool,
}

/// CRUD and search operations over service records.
#[derive(Clone)]
pub struct MaintenanceService {
    store: SharedStore,
}

impl MaintenanceService {
    /// Create a service over the injected store handle.
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Look up a service record by id.
    pub fn get(&self, id: &str) -> Result<Option<ServiceRecord>> {
        Ok(lock(&self.store).get_service_record(id)?)
    }

    /// All service records for a vehicle, newest first.
    pub fn records_for_vehicle(&self, vehicle_id: &str) -> Result<Vec<ServiceRecord>> {
        Ok(lock(&self.store).service_records_for_vehicle(vehicle_id)?)
    }

    /// Search records with an arbitrary filter combination.
    pub fn search(&self, query: &ServiceQuery) -> Result<Vec<ServiceRecord>> {
        Ok(lock(&self.store).query_service_records(query)?)
    }

    /// Validate the draft and create a service record.
    pub fn create(&self, draft: &ServiceDraft) -> Result<ServiceRecord> {
        let mut store = lock(&self.store);
        create_in(&mut store, draft)
    }

    /// Replace an existing service record.
    pub fn update(&self, id: &str, draft: &ServiceDraft) -> Result<ServiceRecord> {
        validate_draft(draft)?;
        let mut store = lock(&self.store);

        let existing =
            store
                .get_service_record(id)?
                .ok_or_else(|| odolog_store::Error::NotFound {
                    table: "service_records",
                    id: id.to_string(),
                })?;

        let record = ServiceRecord {
            id: existing.id,
            vehicle_id: draft.vehicle_id.clone(),
            date: draft.date,
            service_type: draft.service_type.clone(),
            description: draft.description.clone(),
            cost: draft.cost,
            mileage: draft.mileage,
            notes: draft.notes.clone(),
            completed: draft.completed,
            created_at: existing.created_at,
            updated_at: OffsetDateTime::now_utc(),
        };

        store.update_service_record(&record)?;
        Ok(record)
    }

    /// Delete a service record.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut store = lock(&self.store);
        store.delete_service_record(id)?;
        Ok(())
    }

    /// Create a list of records inside one transaction; a failure on any
    /// item rolls back the whole batch.
    pub fn create_batch(&self, drafts: &[ServiceDraft]) -> Result<Vec<ServiceRecord>> {
        for draft in drafts {
            validate_draft(draft)?;
        }

        let mut store = lock(&self.store);
        store.transaction(|st| {
            let mut created = Vec::with_capacity(drafts.len());
            for draft in drafts {
                match create_in(st, draft) {
                    Ok(record) => created.push(record),
                    Err(source) => {
                        return Err(Error::Batch {
                            completed: created.len(),
                            source: Box::new(source),
                        });
                    }
                }
            }
            Ok(created)
        })
    }
}

/// Create path shared with batch operations and the migration importer.
pub(crate) fn create_in(store: &mut Store, draft: &ServiceDraft) -> Result<ServiceRecord> {
    validate_draft(draft)?;
    if store.get_vehicle(&draft.vehicle_id)?.is_none() {
        return Err(odolog_store::Error::NotFound {
            table: "vehicles",
            id: draft.vehicle_id.clone(),
        }
        .into());
    }

    let now = OffsetDateTime::now_utc();
    let record = ServiceRecord {
        id: Uuid::new_v4().to_string(),
        vehicle_id: draft.vehicle_id.clone(),
        date: draft.date,
        service_type: draft.service_type.clone(),
        description: draft.description.clone(),
        cost: draft.cost,
        mileage: draft.mileage,
        notes: draft.notes.clone(),
        completed: draft.completed,
        created_at: now,
        updated_at: now,
    };

    store.insert_service_record(&record)?;
    debug!("Created service record {} for vehicle {}", record.id, record.vehicle_id);
    Ok(record)
}

fn validate_draft(draft: &ServiceDraft) -> Result<()> {
    let today = OffsetDateTime::now_utc().date();
    if draft.date > today {
        return Err(Error::Validation {
            field: "date",
            message: "must not be in the future".to_string(),
        });
    }
    if draft.service_type.trim().is_empty() {
        return Err(Error::Validation {
            field: "service_type",
            message: "must not be empty".to_string(),
        });
    }
    if draft.cost < 0.0 {
        return Err(Error::Validation {
            field: "cost",
            message: "must not be negative".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    use odolog_types::{VehicleStatus, VehicleType};

    use crate::shared_store;
    use crate::vehicles::{VehicleDraft, VehicleService};

    fn services() -> (VehicleService, MaintenanceService) {
        let mut store = odolog_store::Store::in_memory();
        store.init();
        let store = shared_store(store);
        (
            VehicleService::new(store.clone()),
            MaintenanceService::new(store),
        )
    }

    fn vehicle(vehicles: &VehicleService) -> String {
        vehicles
            .create(&VehicleDraft {
                name: "Truck".to_string(),
                year: 2018,
                make: "Ford".to_string(),
                model: "F-150".to_string(),
                vehicle_type: VehicleType::Gas,
                status: Some(VehicleStatus::Active),
            })
            .unwrap()
            .id
    }

    fn draft(vehicle_id: &str) -> ServiceDraft {
        ServiceDraft {
            vehicle_id: vehicle_id.to_string(),
            date: date!(2024 - 03 - 10),
            service_type: "oil change".to_string(),
            description: "5W-30 synthetic".to_string(),
            cost: 65.0,
            mileage: 42_000,
            notes: None,
            completed: true,
        }
    }

    #[test]
    fn test_create_and_fetch() {
        let (vehicles, maintenance) = services();
        let v = vehicle(&vehicles);

        let record = maintenance.create(&draft(&v)).unwrap();
        assert_eq!(record.service_type, "oil change");
        assert_eq!(
            maintenance.records_for_vehicle(&v).unwrap()[0].id,
            record.id
        );
    }

    #[test]
    fn test_create_rejects_negative_cost() {
        let (vehicles, maintenance) = services();
        let v = vehicle(&vehicles);

        let mut bad = draft(&v);
        bad.cost = -1.0;
        assert!(matches!(
            maintenance.create(&bad),
            Err(Error::Validation { field: "cost", .. })
        ));
    }

    #[test]
    fn test_create_requires_vehicle() {
        let (_, maintenance) = services();
        let err = maintenance.create(&draft("ghost")).unwrap_err();
        assert!(matches!(
            err,
            Error::Store(odolog_store::Error::NotFound { table: "vehicles", .. })
        ));
    }

    #[test]
    fn test_update_preserves_created_at() {
        let (vehicles, maintenance) = services();
        let v = vehicle(&vehicles);
        let record = maintenance.create(&draft(&v)).unwrap();

        let mut changed = draft(&v);
        changed.completed = false;
        changed.cost = 80.0;
        let updated = maintenance.update(&record.id, &changed).unwrap();

        assert!(!updated.completed);
        assert_eq!(updated.cost, 80.0);
        assert_eq!(updated.created_at, record.created_at);
    }

    #[test]
    fn test_create_batch_rolls_back_on_failure() {
        let (vehicles, maintenance) = services();
        let v = vehicle(&vehicles);

        let err = maintenance
            .create_batch(&[draft(&v), draft("ghost")])
            .unwrap_err();
        assert!(matches!(err, Error::Batch { completed: 1, .. }));
        // The first record was rolled back with the batch.
        assert!(maintenance.records_for_vehicle(&v).unwrap().is_empty());
    }

    #[test]
    fn test_search_by_completion() {
        let (vehicles, maintenance) = services();
        let v = vehicle(&vehicles);

        maintenance.create(&draft(&v)).unwrap();
        let mut pending = draft(&v);
        pending.service_type = "brakes".to_string();
        pending.completed = false;
        maintenance.create(&pending).unwrap();

        let open = maintenance
            .search(&ServiceQuery::new().vehicle(&v).completed(false))
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].service_type, "brakes");
    }
}
