//! In-memory fallback tables.
//!
//! When the embedded engine cannot be opened the store runs against this
//! plain associative-array backend instead. It mirrors the embedded table
//! set row-for-row so data round-trips identically if a deployment later
//! moves to the embedded engine, and it is cheap to snapshot, which is how
//! fallback transactions get their all-or-nothing guarantee.

use std::collections::BTreeMap;

use time::OffsetDateTime;

use odolog_types::{AppSetting, FuelEntry, MigrationRun, ServiceRecord, Vehicle};

/// The fallback backend: one growable table per persisted entity.
#[derive(Debug, Default, Clone)]
pub(crate) struct MemoryTables {
    pub(crate) vehicles: Vec<Vehicle>,
    pub(crate) fuel_entries: Vec<FuelEntry>,
    pub(crate) service_records: Vec<ServiceRecord>,
    pub(crate) settings: BTreeMap<String, AppSetting>,
    pub(crate) migration_log: Vec<MigrationRun>,
    next_migration_id: i64,
}

impl MemoryTables {
    pub(crate) fn vehicle_exists(&self, id: &str) -> bool {
        self.vehicles.iter().any(|v| v.id == id)
    }

    pub(crate) fn get_vehicle(&self, id: &str) -> Option<Vehicle> {
        self.vehicles.iter().find(|v| v.id == id).cloned()
    }

    pub(crate) fn insert_vehicle(&mut self, vehicle: Vehicle) {
        self.vehicles.push(vehicle);
    }

    /// Replace a vehicle row in place. Returns false when the id is absent.
    pub(crate) fn update_vehicle(&mut self, vehicle: &Vehicle) -> bool {
        match self.vehicles.iter_mut().find(|v| v.id == vehicle.id) {
            Some(slot) => {
                *slot = vehicle.clone();
                true
            }
            None => false,
        }
    }

    /// Remove a vehicle and sweep its dependent fuel/service rows, the
    /// fallback equivalent of the embedded engine's ON DELETE CASCADE.
    /// Returns false when the id is absent.
    pub(crate) fn delete_vehicle(&mut self, id: &str) -> bool {
        let before = self.vehicles.len();
        self.vehicles.retain(|v| v.id != id);
        if self.vehicles.len() == before {
            return false;
        }
        self.fuel_entries.retain(|e| e.vehicle_id != id);
        self.service_records.retain(|r| r.vehicle_id != id);
        true
    }

    pub(crate) fn get_fuel_entry(&self, id: &str) -> Option<FuelEntry> {
        self.fuel_entries.iter().find(|e| e.id == id).cloned()
    }

    pub(crate) fn insert_fuel_entry(&mut self, entry: FuelEntry) {
        self.fuel_entries.push(entry);
    }

    pub(crate) fn update_fuel_entry(&mut self, entry: &FuelEntry) -> bool {
        match self.fuel_entries.iter_mut().find(|e| e.id == entry.id) {
            Some(slot) => {
                *slot = entry.clone();
                true
            }
            None => false,
        }
    }

    pub(crate) fn delete_fuel_entry(&mut self, id: &str) -> bool {
        let before = self.fuel_entries.len();
        self.fuel_entries.retain(|e| e.id != id);
        self.fuel_entries.len() != before
    }

    pub(crate) fn get_service_record(&self, id: &str) -> Option<ServiceRecord> {
        self.service_records.iter().find(|r| r.id == id).cloned()
    }

    pub(crate) fn insert_service_record(&mut self, record: ServiceRecord) {
        self.service_records.push(record);
    }

    pub(crate) fn update_service_record(&mut self, record: &ServiceRecord) -> bool {
        match self.service_records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => {
                *slot = record.clone();
                true
            }
            None => false,
        }
    }

    pub(crate) fn delete_service_record(&mut self, id: &str) -> bool {
        let before = self.service_records.len();
        self.service_records.retain(|r| r.id != id);
        self.service_records.len() != before
    }

    /// Upsert a setting, preserving `created_at` on update.
    pub(crate) fn put_setting(&mut self, key: &str, value: &str, now: OffsetDateTime) {
        match self.settings.get_mut(key) {
            Some(setting) => {
                setting.value = value.to_string();
                setting.updated_at = now;
            }
            None => {
                self.settings.insert(
                    key.to_string(),
                    AppSetting {
                        key: key.to_string(),
                        value: value.to_string(),
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
    }

    pub(crate) fn append_migration_run(
        &mut self,
        version: &str,
        success: bool,
        now: OffsetDateTime,
    ) -> MigrationRun {
        self.next_migration_id += 1;
        let run = MigrationRun {
            id: self.next_migration_id,
            version: version.to_string(),
            applied_at: now,
            success,
        };
        self.migration_log.push(run.clone());
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use odolog_types::{VehicleStatus, VehicleType};

    fn vehicle(id: &str) -> Vehicle {
        let now = datetime!(2024-01-01 00:00:00 UTC);
        Vehicle {
            id: id.to_string(),
            name: "Car".to_string(),
            year: 2020,
            make: "Make".to_string(),
            model: "Model".to_string(),
            vehicle_type: VehicleType::Gas,
            status: VehicleStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(id: &str, vehicle_id: &str) -> FuelEntry {
        let now = datetime!(2024-01-02 00:00:00 UTC);
        FuelEntry {
            id: id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            date: now.date(),
            amount: 45.0,
            quantity: 12.0,
            price_per_unit: 3.75,
            mileage: 1000,
            efficiency: None,
            station: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_delete_vehicle_sweeps_dependents() {
        let mut tables = MemoryTables::default();
        tables.insert_vehicle(vehicle("v1"));
        tables.insert_vehicle(vehicle("v2"));
        tables.insert_fuel_entry(entry("e1", "v1"));
        tables.insert_fuel_entry(entry("e2", "v2"));

        assert!(tables.delete_vehicle("v1"));
        assert!(!tables.vehicle_exists("v1"));
        assert_eq!(tables.fuel_entries.len(), 1);
        assert_eq!(tables.fuel_entries[0].vehicle_id, "v2");
    }

    #[test]
    fn test_delete_missing_vehicle_returns_false() {
        let mut tables = MemoryTables::default();
        assert!(!tables.delete_vehicle("nope"));
    }

    #[test]
    fn test_put_setting_preserves_created_at() {
        let mut tables = MemoryTables::default();
        let first = datetime!(2024-01-01 00:00:00 UTC);
        let second = datetime!(2024-02-01 00:00:00 UTC);

        tables.put_setting("region", "US", first);
        tables.put_setting("region", "EU", second);

        let setting = tables.settings.get("region").unwrap();
        assert_eq!(setting.value, "EU");
        assert_eq!(setting.created_at, first);
        assert_eq!(setting.updated_at, second);
    }

    #[test]
    fn test_migration_ids_increment() {
        let mut tables = MemoryTables::default();
        let now = datetime!(2024-01-01 00:00:00 UTC);
        let a = tables.append_migration_run("1", false, now);
        let b = tables.append_migration_run("1", true, now);
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }
}
