//! One-shot import from the legacy key-value store.
//!
//! Earlier releases kept everything in a mobile key-value cache: one JSON
//! document per collection under a well-known key. The importer reads that
//! snapshot, re-validates it, and replays it through the entity services'
//! create paths inside a single transaction, so the imported rows get the
//! same validation and efficiency computation as user-entered ones.
//!
//! The migration log makes the whole routine idempotent: a successful run
//! writes a success row, and any later invocation that finds one is a
//! no-op. A failed write phase leaves no success row, so a retry is safe.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::{info, warn};

use odolog_types::{VehicleStatus, VehicleType};

use crate::error::{Error, Result};
use crate::fuel::FuelDraft;
use crate::maintenance::ServiceDraft;
use crate::vehicles::VehicleDraft;
use crate::{SharedStore, lock};

/// Version identifier recorded in the migration log.
pub const MIGRATION_VERSION: &str = "kv-1";

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Errors specific to the migration importer.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// `restore_from_backup` was called before a backup existed.
    #[error("No backup found")]
    NoBackup,

    /// `rollback` was called before a backup existed.
    #[error("No backup available for rollback")]
    NoBackupForRollback,

    /// The legacy snapshot failed structural validation.
    #[error("Invalid legacy snapshot: {0}")]
    InvalidSnapshot(String),

    /// The legacy file is not valid JSON.
    #[error("Legacy snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error reading or writing the legacy file.
    #[error("Legacy store IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The legacy key-value snapshot store: a JSON document of string keys to
/// JSON values on disk.
#[derive(Debug, Clone)]
pub struct LegacyStore {
    path: PathBuf,
}

impl LegacyStore {
    /// A legacy store at the given file path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the raw key-value contents. A missing file reads as empty.
    pub fn load(&self) -> std::result::Result<BTreeMap<String, Value>, MigrationError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Overwrite the store with the given contents.
    pub fn save(
        &self,
        contents: &BTreeMap<String, Value>,
    ) -> std::result::Result<(), MigrationError> {
        let text = serde_json::to_string_pretty(contents)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

/// How many records a migration imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MigrationCounts {
    /// Vehicles imported.
    pub vehicles: usize,
    /// Fuel entries imported.
    pub fuel_entries: usize,
    /// Service records imported.
    pub service_records: usize,
    /// Settings imported.
    pub settings: usize,
}

/// Result of a migration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// A successful run of this version was already logged; nothing done.
    AlreadyApplied,
    /// The snapshot was imported.
    Applied(MigrationCounts),
}

/// One-shot importer from the legacy store into the record store.
pub struct MigrationImporter {
    store: SharedStore,
    backup: Option<BTreeMap<String, Value>>,
}

impl MigrationImporter {
    /// Create an importer over the injected store handle.
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            backup: None,
        }
    }

    /// Run the migration.
    ///
    /// Checks the migration log first (idempotent), backs up the raw
    /// legacy contents, validates the snapshot, then writes everything
    /// through the entity services' create paths inside one transaction
    /// and appends the success row in the same transaction. Write-phase
    /// failures propagate after a best-effort failure row is logged.
    pub fn migrate(&mut self, legacy: &LegacyStore) -> Result<MigrationOutcome> {
        let mut store = lock(&self.store);

        if store.last_successful_migration(MIGRATION_VERSION)?.is_some() {
            info!("Migration {MIGRATION_VERSION} already applied, skipping");
            return Ok(MigrationOutcome::AlreadyApplied);
        }

        let raw = legacy.load().map_err(Error::Migration)?;
        self.backup = Some(raw.clone());

        let snapshot = parse_snapshot(&raw)?;

        let result = store.transaction(|st| {
            let mut counts = MigrationCounts::default();
            let mut id_map: HashMap<String, String> = HashMap::new();

            for (legacy_id, draft) in &snapshot.vehicles {
                let vehicle = crate::vehicles::create_in(st, draft)?;
                id_map.insert(legacy_id.clone(), vehicle.id);
                counts.vehicles += 1;
            }

            for draft in &snapshot.fuel_entries {
                let mut draft = draft.clone();
                draft.vehicle_id = remap(&id_map, &draft.vehicle_id)?;
                crate::fuel::create_in(st, &draft)?;
                counts.fuel_entries += 1;
            }

            for draft in &snapshot.service_records {
                let mut draft = draft.clone();
                draft.vehicle_id = remap(&id_map, &draft.vehicle_id)?;
                crate::maintenance::create_in(st, &draft)?;
                counts.service_records += 1;
            }

            for (key, value) in &snapshot.settings {
                st.put_setting(key, value)?;
                counts.settings += 1;
            }

            st.append_migration_run(MIGRATION_VERSION, true)?;
            Ok::<_, Error>(counts)
        });

        match result {
            Ok(counts) => {
                info!(
                    "Migration {MIGRATION_VERSION} imported {} vehicles, {} fuel entries, {} service records",
                    counts.vehicles, counts.fuel_entries, counts.service_records
                );
                Ok(MigrationOutcome::Applied(counts))
            }
            Err(err) => {
                warn!("Migration write phase failed: {err}");
                if let Err(log_err) = store.append_migration_run(MIGRATION_VERSION, false) {
                    warn!("Could not record failed migration attempt: {log_err}");
                }
                Err(err)
            }
        }
    }

    /// Write the backed-up snapshot back to the legacy store.
    pub fn restore_from_backup(&self, legacy: &LegacyStore) -> Result<()> {
        let backup = self.backup.as_ref().ok_or(MigrationError::NoBackup)?;
        legacy.save(backup).map_err(Error::Migration)?;
        info!("Restored legacy store from backup");
        Ok(())
    }

    /// Close the record store and restore the legacy snapshot.
    pub fn rollback(&self, legacy: &LegacyStore) -> Result<()> {
        if self.backup.is_none() {
            return Err(MigrationError::NoBackupForRollback.into());
        }
        lock(&self.store).close();
        self.restore_from_backup(legacy)
    }
}

struct ParsedSnapshot {
    vehicles: Vec<(String, VehicleDraft)>,
    fuel_entries: Vec<FuelDraft>,
    service_records: Vec<ServiceDraft>,
    settings: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct LegacyVehicle {
    id: String,
    name: String,
    year: i32,
    make: String,
    model: String,
    #[serde(rename = "type")]
    vehicle_type: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct LegacyFuelEntry {
    vehicle_id: String,
    date: String,
    #[serde(default)]
    amount: Option<f64>,
    quantity: f64,
    price_per_unit: f64,
    mileage: u32,
    #[serde(default)]
    fuel_station: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Deserialize)]
struct LegacyServiceRecord {
    vehicle_id: String,
    date: String,
    #[serde(rename = "type")]
    service_type: String,
    description: String,
    cost: f64,
    mileage: u32,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    is_completed: bool,
}

/// Structural validation of the raw snapshot: required fields present,
/// numbers in range, dates parseable, every record resolvable to a
/// snapshot vehicle. Nothing is written while this runs.
fn parse_snapshot(raw: &BTreeMap<String, Value>) -> Result<ParsedSnapshot> {
    let vehicles: Vec<LegacyVehicle> = collection(raw, "vehicles")?;
    let fuel_entries: Vec<LegacyFuelEntry> = collection(raw, "fuel_entries")?;
    let service_records: Vec<LegacyServiceRecord> = collection(raw, "service_records")?;
    let settings: BTreeMap<String, String> = match raw.get("settings") {
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| MigrationError::InvalidSnapshot(format!("settings: {e}")))?,
        None => BTreeMap::new(),
    };

    let mut parsed_vehicles = Vec::with_capacity(vehicles.len());
    for vehicle in &vehicles {
        let vehicle_type = VehicleType::try_from(vehicle.vehicle_type.as_str())
            .map_err(|e| MigrationError::InvalidSnapshot(e.to_string()))?;
        let status = match vehicle.status.as_deref() {
            Some(text) => Some(
                VehicleStatus::try_from(text)
                    .map_err(|e| MigrationError::InvalidSnapshot(e.to_string()))?,
            ),
            None => None,
        };
        parsed_vehicles.push((
            vehicle.id.clone(),
            VehicleDraft {
                name: vehicle.name.clone(),
                year: vehicle.year,
                make: vehicle.make.clone(),
                model: vehicle.model.clone(),
                vehicle_type,
                status,
            },
        ));
    }

    let known_ids: Vec<&str> = vehicles.iter().map(|v| v.id.as_str()).collect();

    let mut parsed_fuel = Vec::with_capacity(fuel_entries.len());
    for entry in &fuel_entries {
        if !known_ids.contains(&entry.vehicle_id.as_str()) {
            return Err(MigrationError::InvalidSnapshot(format!(
                "fuel entry references unknown vehicle {}",
                entry.vehicle_id
            ))
            .into());
        }
        if entry.quantity <= 0.0 || entry.price_per_unit <= 0.0 {
            return Err(MigrationError::InvalidSnapshot(
                "fuel entry quantity and price must be positive".to_string(),
            )
            .into());
        }
        parsed_fuel.push(FuelDraft {
            vehicle_id: entry.vehicle_id.clone(),
            date: parse_date(&entry.date)?,
            amount: entry.amount,
            quantity: entry.quantity,
            price_per_unit: entry.price_per_unit,
            mileage: entry.mileage,
            station: entry.fuel_station.clone(),
            notes: entry.notes.clone(),
        });
    }
    // Replay oldest first so the create path computes efficiency the same
    // way it would have live.
    parsed_fuel.sort_by(|a, b| (&a.vehicle_id, a.date, a.mileage).cmp(&(&b.vehicle_id, b.date, b.mileage)));

    let mut parsed_service = Vec::with_capacity(service_records.len());
    for record in &service_records {
        if !known_ids.contains(&record.vehicle_id.as_str()) {
            return Err(MigrationError::InvalidSnapshot(format!(
                "service record references unknown vehicle {}",
                record.vehicle_id
            ))
            .into());
        }
        if record.cost < 0.0 {
            return Err(MigrationError::InvalidSnapshot(
                "service record cost must not be negative".to_string(),
            )
            .into());
        }
        parsed_service.push(ServiceDraft {
            vehicle_id: record.vehicle_id.clone(),
            date: parse_date(&record.date)?,
            service_type: record.service_type.clone(),
            description: record.description.clone(),
            cost: record.cost,
            mileage: record.mileage,
            notes: record.notes.clone(),
            completed: record.is_completed,
        });
    }

    Ok(ParsedSnapshot {
        vehicles: parsed_vehicles,
        fuel_entries: parsed_fuel,
        service_records: parsed_service,
        settings,
    })
}

fn collection<T: serde::de::DeserializeOwned>(
    raw: &BTreeMap<String, Value>,
    key: &str,
) -> Result<Vec<T>> {
    match raw.get(key) {
        Some(value) => Ok(serde_json::from_value(value.clone())
            .map_err(|e| MigrationError::InvalidSnapshot(format!("{key}: {e}")))?),
        None => Ok(Vec::new()),
    }
}

fn parse_date(text: &str) -> Result<Date> {
    Date::parse(text, DATE_FORMAT)
        .map_err(|_| MigrationError::InvalidSnapshot(format!("unparseable date: {text}")).into())
}

fn remap(id_map: &HashMap<String, String>, legacy_id: &str) -> Result<String> {
    id_map.get(legacy_id).cloned().ok_or_else(|| {
        MigrationError::InvalidSnapshot(format!("unknown legacy vehicle id {legacy_id}")).into()
    })
}
