//! Main store implementation.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use odolog_types::{
    AppSetting, FuelEntry, MigrationRun, ServiceRecord, Vehicle, VehicleStatus, VehicleType,
};

use crate::dates::{from_sql_date, to_sql_date};
use crate::error::{Error, Result};
use crate::memory::MemoryTables;
use crate::queries::{FuelQuery, ServiceQuery};
use crate::schema;

/// Settings seeded on first init in both backends.
const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("region", "US"),
    ("theme", "system"),
    ("volume_unit", "gallons"),
];

/// Which backend a [`Store`] is currently running against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// `init()` has not run yet (or the store was closed).
    Uninitialized,
    /// Embedded SQLite engine.
    Embedded,
    /// In-memory fallback tables.
    Fallback,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Uninitialized => write!(f, "uninitialized"),
            BackendKind::Embedded => write!(f, "embedded"),
            BackendKind::Fallback => write!(f, "fallback"),
        }
    }
}

enum Backend {
    Uninitialized,
    Embedded(Connection),
    Fallback(MemoryTables),
}

/// Dual-backend store for odolog records.
///
/// The store is an explicit three-state machine: constructed
/// `Uninitialized`, it enters `Embedded` or `Fallback` in [`Store::init`]
/// and only ever moves from `Embedded` to `Fallback` through the explicit
/// [`Store::downgrade_to_fallback`] decision point. Construct one store per
/// process and hand it to the services; there is no global instance.
pub struct Store {
    backend: Backend,
    path: Option<PathBuf>,
    prefer_fallback: bool,
}

impl Store {
    /// Create an uninitialized store backed by a database file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            backend: Backend::Uninitialized,
            path: Some(path.as_ref().to_path_buf()),
            prefer_fallback: false,
        }
    }

    /// Create an uninitialized store backed by an in-memory embedded
    /// database (for testing).
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Uninitialized,
            path: None,
            prefer_fallback: false,
        }
    }

    /// Create a store that skips the embedded engine entirely and runs
    /// against the fallback tables (for testing, or for runtime
    /// environments known to lack the engine).
    pub fn fallback() -> Self {
        Self {
            backend: Backend::Uninitialized,
            path: None,
            prefer_fallback: true,
        }
    }

    /// Initialize the store. Idempotent.
    ///
    /// Attempts to open the embedded engine and create the schema; on any
    /// failure the store switches to the in-memory fallback for the rest
    /// of its lifetime and seeds default settings there. Initialization
    /// itself never fails, so the application never hard-fails on a
    /// missing or broken engine.
    pub fn init(&mut self) {
        if !matches!(self.backend, Backend::Uninitialized) {
            return;
        }

        if self.prefer_fallback {
            info!("Initializing store in fallback mode");
            self.enter_fallback();
            return;
        }

        match self.open_embedded() {
            Ok(conn) => {
                if let Err(err) = seed_embedded_defaults(&conn) {
                    warn!("Embedded engine failed while seeding defaults: {err}");
                    self.prefer_fallback = true;
                    self.enter_fallback();
                    return;
                }
                info!("Store initialized with embedded engine");
                self.backend = Backend::Embedded(conn);
            }
            Err(err) => {
                warn!("Embedded engine unavailable, switching to fallback: {err}");
                self.prefer_fallback = true;
                self.enter_fallback();
            }
        }
    }

    fn open_embedded(&self) -> Result<Connection> {
        let conn = match &self.path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.exists() {
                        std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                            path: parent.to_path_buf(),
                            source: e,
                        })?;
                    }
                }
                info!("Opening database at {}", path.display());
                let conn = Connection::open(path)?;
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;",
                )?;
                conn
            }
            None => {
                let conn = Connection::open_in_memory()?;
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                conn
            }
        };

        schema::initialize(&conn)?;
        Ok(conn)
    }

    fn enter_fallback(&mut self) {
        let mut tables = MemoryTables::default();
        let now = OffsetDateTime::now_utc();
        for (key, value) in DEFAULT_SETTINGS {
            tables.put_setting(key, value, now);
        }
        self.backend = Backend::Fallback(tables);
    }

    /// The backend this store is currently running against.
    pub fn backend_kind(&self) -> BackendKind {
        match self.backend {
            Backend::Uninitialized => BackendKind::Uninitialized,
            Backend::Embedded(_) => BackendKind::Embedded,
            Backend::Fallback(_) => BackendKind::Fallback,
        }
    }

    /// Whether the embedded engine is active.
    pub fn is_embedded_active(&self) -> bool {
        matches!(self.backend, Backend::Embedded(_))
    }

    /// Explicitly switch from the embedded engine to the fallback tables.
    ///
    /// This is the only Embedded → Fallback transition: embedded errors
    /// surface to the caller, who decides whether to downgrade. The
    /// fallback starts empty apart from default settings; data already on
    /// disk stays there. The switch is permanent for this instance.
    pub fn downgrade_to_fallback(&mut self) {
        if matches!(self.backend, Backend::Fallback(_)) {
            return;
        }
        warn!("Downgrading store to in-memory fallback for the rest of this process");
        self.prefer_fallback = true;
        self.enter_fallback();
    }

    /// Release the embedded engine handle. No-op in fallback mode.
    ///
    /// After closing an embedded store, `init()` may be called again to
    /// reopen it.
    pub fn close(&mut self) {
        if matches!(self.backend, Backend::Embedded(_)) {
            info!("Closing embedded database");
            self.backend = Backend::Uninitialized;
        }
    }

    /// Run `body` with all-or-nothing semantics.
    ///
    /// In embedded mode the body runs inside BEGIN IMMEDIATE/COMMIT with
    /// ROLLBACK on error. In fallback mode the tables are snapshotted
    /// before the body runs and restored on error, so both backends give
    /// the same guarantee. Not reentrant; the application issues one
    /// transaction at a time (single logical writer).
    pub fn transaction<T, E, F>(&mut self, body: F) -> std::result::Result<T, E>
    where
        E: From<Error>,
        F: FnOnce(&mut Store) -> std::result::Result<T, E>,
    {
        let snapshot = match &self.backend {
            Backend::Uninitialized => return Err(E::from(Error::NotInitialized)),
            Backend::Embedded(conn) => {
                conn.execute_batch("BEGIN IMMEDIATE")
                    .map_err(|e| E::from(Error::from(e)))?;
                None
            }
            Backend::Fallback(tables) => Some(tables.clone()),
        };

        let result = body(self);

        match &mut self.backend {
            Backend::Embedded(conn) => match result {
                Ok(value) => {
                    conn.execute_batch("COMMIT")
                        .map_err(|e| E::from(Error::from(e)))?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                        warn!("Transaction rollback failed: {rollback_err}");
                    }
                    Err(err)
                }
            },
            Backend::Fallback(tables) => {
                if result.is_err() {
                    if let Some(snapshot) = snapshot {
                        *tables = snapshot;
                    }
                }
                result
            }
            // The body closed or downgraded the store; nothing left to finalize.
            Backend::Uninitialized => result,
        }
    }
}

// Vehicle operations
impl Store {
    /// Insert a vehicle row.
    pub fn insert_vehicle(&mut self, vehicle: &Vehicle) -> Result<()> {
        match &mut self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                conn.execute(
                    "INSERT INTO vehicles (id, name, year, make, model, type, status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        vehicle.id,
                        vehicle.name,
                        vehicle.year,
                        vehicle.make,
                        vehicle.model,
                        vehicle.vehicle_type.as_str(),
                        vehicle.status.as_str(),
                        vehicle.created_at.unix_timestamp(),
                        vehicle.updated_at.unix_timestamp(),
                    ],
                )?;
                Ok(())
            }
            Backend::Fallback(tables) => {
                tables.insert_vehicle(vehicle.clone());
                Ok(())
            }
        }
    }

    /// Get a vehicle by id.
    pub fn get_vehicle(&self, id: &str) -> Result<Option<Vehicle>> {
        match &self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let mut stmt = conn.prepare(
                    "SELECT id, name, year, make, model, type, status, created_at, updated_at
                     FROM vehicles WHERE id = ?",
                )?;
                let vehicle = stmt.query_row([id], vehicle_from_row).optional()?;
                Ok(vehicle)
            }
            Backend::Fallback(tables) => Ok(tables.get_vehicle(id)),
        }
    }

    /// List all vehicles, oldest first.
    pub fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        match &self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let mut stmt = conn.prepare(
                    "SELECT id, name, year, make, model, type, status, created_at, updated_at
                     FROM vehicles ORDER BY created_at, id",
                )?;
                let vehicles = stmt
                    .query_map([], vehicle_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(vehicles)
            }
            Backend::Fallback(tables) => {
                let mut vehicles = tables.vehicles.clone();
                vehicles.sort_by(|a, b| {
                    (a.created_at, &a.id).cmp(&(b.created_at, &b.id))
                });
                Ok(vehicles)
            }
        }
    }

    /// Replace a vehicle row. Fails with `NotFound` when the id is absent.
    pub fn update_vehicle(&mut self, vehicle: &Vehicle) -> Result<()> {
        match &mut self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let affected = conn.execute(
                    "UPDATE vehicles SET name = ?2, year = ?3, make = ?4, model = ?5,
                        type = ?6, status = ?7, updated_at = ?8
                     WHERE id = ?1",
                    params![
                        vehicle.id,
                        vehicle.name,
                        vehicle.year,
                        vehicle.make,
                        vehicle.model,
                        vehicle.vehicle_type.as_str(),
                        vehicle.status.as_str(),
                        vehicle.updated_at.unix_timestamp(),
                    ],
                )?;
                if affected == 0 {
                    return Err(Error::NotFound {
                        table: "vehicles",
                        id: vehicle.id.clone(),
                    });
                }
                Ok(())
            }
            Backend::Fallback(tables) => {
                if tables.update_vehicle(vehicle) {
                    Ok(())
                } else {
                    Err(Error::NotFound {
                        table: "vehicles",
                        id: vehicle.id.clone(),
                    })
                }
            }
        }
    }

    /// Delete a vehicle and all its fuel/service rows in one operation.
    ///
    /// Embedded mode relies on `ON DELETE CASCADE`; fallback mode sweeps
    /// the dependent tables in the same call. Either way the cascade is
    /// part of the single logical delete.
    pub fn delete_vehicle(&mut self, id: &str) -> Result<()> {
        match &mut self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let affected = conn.execute("DELETE FROM vehicles WHERE id = ?", [id])?;
                if affected == 0 {
                    return Err(Error::NotFound {
                        table: "vehicles",
                        id: id.to_string(),
                    });
                }
                debug!("Deleted vehicle {id} with cascade");
                Ok(())
            }
            Backend::Fallback(tables) => {
                if tables.delete_vehicle(id) {
                    debug!("Deleted vehicle {id} with cascade");
                    Ok(())
                } else {
                    Err(Error::NotFound {
                        table: "vehicles",
                        id: id.to_string(),
                    })
                }
            }
        }
    }

    fn vehicle_exists(&self, id: &str) -> Result<bool> {
        match &self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let exists: bool = conn.query_row(
                    "SELECT COUNT(*) > 0 FROM vehicles WHERE id = ?",
                    [id],
                    |row| row.get(0),
                )?;
                Ok(exists)
            }
            Backend::Fallback(tables) => Ok(tables.vehicle_exists(id)),
        }
    }
}

// Fuel entry operations
impl Store {
    /// Insert a fuel entry. The owning vehicle must exist.
    pub fn insert_fuel_entry(&mut self, entry: &FuelEntry) -> Result<()> {
        if !self.vehicle_exists(&entry.vehicle_id)? {
            return Err(Error::ForeignKey {
                table: "fuel_entries",
                vehicle_id: entry.vehicle_id.clone(),
            });
        }
        match &mut self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                conn.execute(
                    "INSERT INTO fuel_entries (id, vehicle_id, date, amount, quantity,
                        price_per_unit, mileage, mpg, fuel_station, notes, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![
                        entry.id,
                        entry.vehicle_id,
                        to_sql_date(entry.date),
                        entry.amount,
                        entry.quantity,
                        entry.price_per_unit,
                        entry.mileage,
                        entry.efficiency,
                        entry.station,
                        entry.notes,
                        entry.created_at.unix_timestamp(),
                        entry.updated_at.unix_timestamp(),
                    ],
                )?;
                Ok(())
            }
            Backend::Fallback(tables) => {
                tables.insert_fuel_entry(entry.clone());
                Ok(())
            }
        }
    }

    /// Get a fuel entry by id.
    pub fn get_fuel_entry(&self, id: &str) -> Result<Option<FuelEntry>> {
        match &self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let mut stmt = conn.prepare(
                    "SELECT id, vehicle_id, date, amount, quantity, price_per_unit, mileage,
                        mpg, fuel_station, notes, created_at, updated_at
                     FROM fuel_entries WHERE id = ?",
                )?;
                let entry = stmt.query_row([id], fuel_entry_from_row).optional()?;
                Ok(entry)
            }
            Backend::Fallback(tables) => Ok(tables.get_fuel_entry(id)),
        }
    }

    /// Replace a fuel entry row. Fails with `NotFound` when the id is absent.
    pub fn update_fuel_entry(&mut self, entry: &FuelEntry) -> Result<()> {
        if !self.vehicle_exists(&entry.vehicle_id)? {
            return Err(Error::ForeignKey {
                table: "fuel_entries",
                vehicle_id: entry.vehicle_id.clone(),
            });
        }
        match &mut self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let affected = conn.execute(
                    "UPDATE fuel_entries SET vehicle_id = ?2, date = ?3, amount = ?4,
                        quantity = ?5, price_per_unit = ?6, mileage = ?7, mpg = ?8,
                        fuel_station = ?9, notes = ?10, updated_at = ?11
                     WHERE id = ?1",
                    params![
                        entry.id,
                        entry.vehicle_id,
                        to_sql_date(entry.date),
                        entry.amount,
                        entry.quantity,
                        entry.price_per_unit,
                        entry.mileage,
                        entry.efficiency,
                        entry.station,
                        entry.notes,
                        entry.updated_at.unix_timestamp(),
                    ],
                )?;
                if affected == 0 {
                    return Err(Error::NotFound {
                        table: "fuel_entries",
                        id: entry.id.clone(),
                    });
                }
                Ok(())
            }
            Backend::Fallback(tables) => {
                if tables.update_fuel_entry(entry) {
                    Ok(())
                } else {
                    Err(Error::NotFound {
                        table: "fuel_entries",
                        id: entry.id.clone(),
                    })
                }
            }
        }
    }

    /// Delete a fuel entry. Fails with `NotFound` when the id is absent.
    pub fn delete_fuel_entry(&mut self, id: &str) -> Result<()> {
        match &mut self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let affected = conn.execute("DELETE FROM fuel_entries WHERE id = ?", [id])?;
                if affected == 0 {
                    return Err(Error::NotFound {
                        table: "fuel_entries",
                        id: id.to_string(),
                    });
                }
                Ok(())
            }
            Backend::Fallback(tables) => {
                if tables.delete_fuel_entry(id) {
                    Ok(())
                } else {
                    Err(Error::NotFound {
                        table: "fuel_entries",
                        id: id.to_string(),
                    })
                }
            }
        }
    }

    /// Query fuel entries with filters.
    pub fn query_fuel_entries(&self, query: &FuelQuery) -> Result<Vec<FuelEntry>> {
        match &self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let sql = query.build_sql();
                let (_, params) = query.build_where();

                debug!("Executing query: {}", sql);

                let params_ref: Vec<&dyn rusqlite::ToSql> =
                    params.iter().map(|p| p.as_ref()).collect();

                let mut stmt = conn.prepare(&sql)?;
                let entries = stmt
                    .query_map(params_ref.as_slice(), fuel_entry_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(entries)
            }
            Backend::Fallback(tables) => {
                let mut entries: Vec<FuelEntry> = tables
                    .fuel_entries
                    .iter()
                    .filter(|e| query.matches(e))
                    .cloned()
                    .collect();
                entries.sort_by(|a, b| {
                    let ordering = (a.date, a.created_at).cmp(&(b.date, b.created_at));
                    if query.newest_first {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                });
                Ok(paginate(entries, query.offset, query.limit))
            }
        }
    }

    /// All fuel entries for a vehicle, newest first.
    pub fn fuel_entries_for_vehicle(&self, vehicle_id: &str) -> Result<Vec<FuelEntry>> {
        self.query_fuel_entries(&FuelQuery::new().vehicle(vehicle_id))
    }
}

// Service record operations
impl Store {
    /// Insert a service record. The owning vehicle must exist.
    pub fn insert_service_record(&mut self, record: &ServiceRecord) -> Result<()> {
        if !self.vehicle_exists(&record.vehicle_id)? {
            return Err(Error::ForeignKey {
                table: "service_records",
                vehicle_id: record.vehicle_id.clone(),
            });
        }
        match &mut self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                conn.execute(
                    "INSERT INTO service_records (id, vehicle_id, date, type, description,
                        cost, mileage, notes, is_completed, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        record.id,
                        record.vehicle_id,
                        to_sql_date(record.date),
                        record.service_type,
                        record.description,
                        record.cost,
                        record.mileage,
                        record.notes,
                        record.completed,
                        record.created_at.unix_timestamp(),
                        record.updated_at.unix_timestamp(),
                    ],
                )?;
                Ok(())
            }
            Backend::Fallback(tables) => {
                tables.insert_service_record(record.clone());
                Ok(())
            }
        }
    }

    /// Get a service record by id.
    pub fn get_service_record(&self, id: &str) -> Result<Option<ServiceRecord>> {
        match &self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let mut stmt = conn.prepare(
                    "SELECT id, vehicle_id, date, type, description, cost, mileage, notes,
                        is_completed, created_at, updated_at
                     FROM service_records WHERE id = ?",
                )?;
                let record = stmt.query_row([id], service_record_from_row).optional()?;
                Ok(record)
            }
            Backend::Fallback(tables) => Ok(tables.get_service_record(id)),
        }
    }

    /// Replace a service record row. Fails with `NotFound` when absent.
    pub fn update_service_record(&mut self, record: &ServiceRecord) -> Result<()> {
        if !self.vehicle_exists(&record.vehicle_id)? {
            return Err(Error::ForeignKey {
                table: "service_records",
                vehicle_id: record.vehicle_id.clone(),
            });
        }
        match &mut self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let affected = conn.execute(
                    "UPDATE service_records SET vehicle_id = ?2, date = ?3, type = ?4,
                        description = ?5, cost = ?6, mileage = ?7, notes = ?8,
                        is_completed = ?9, updated_at = ?10
                     WHERE id = ?1",
                    params![
                        record.id,
                        record.vehicle_id,
                        to_sql_date(record.date),
                        record.service_type,
                        record.description,
                        record.cost,
                        record.mileage,
                        record.notes,
                        record.completed,
                        record.updated_at.unix_timestamp(),
                    ],
                )?;
                if affected == 0 {
                    return Err(Error::NotFound {
                        table: "service_records",
                        id: record.id.clone(),
                    });
                }
                Ok(())
            }
            Backend::Fallback(tables) => {
                if tables.update_service_record(record) {
                    Ok(())
                } else {
                    Err(Error::NotFound {
                        table: "service_records",
                        id: record.id.clone(),
                    })
                }
            }
        }
    }

    /// Delete a service record. Fails with `NotFound` when the id is absent.
    pub fn delete_service_record(&mut self, id: &str) -> Result<()> {
        match &mut self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let affected = conn.execute("DELETE FROM service_records WHERE id = ?", [id])?;
                if affected == 0 {
                    return Err(Error::NotFound {
                        table: "service_records",
                        id: id.to_string(),
                    });
                }
                Ok(())
            }
            Backend::Fallback(tables) => {
                if tables.delete_service_record(id) {
                    Ok(())
                } else {
                    Err(Error::NotFound {
                        table: "service_records",
                        id: id.to_string(),
                    })
                }
            }
        }
    }

    /// Query service records with filters.
    pub fn query_service_records(&self, query: &ServiceQuery) -> Result<Vec<ServiceRecord>> {
        match &self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let sql = query.build_sql();
                let (_, params) = query.build_where();

                debug!("Executing query: {}", sql);

                let params_ref: Vec<&dyn rusqlite::ToSql> =
                    params.iter().map(|p| p.as_ref()).collect();

                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map(params_ref.as_slice(), service_record_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(records)
            }
            Backend::Fallback(tables) => {
                let mut records: Vec<ServiceRecord> = tables
                    .service_records
                    .iter()
                    .filter(|r| query.matches(r))
                    .cloned()
                    .collect();
                records.sort_by(|a, b| {
                    let ordering = (a.date, a.created_at).cmp(&(b.date, b.created_at));
                    if query.newest_first {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                });
                Ok(paginate(records, query.offset, query.limit))
            }
        }
    }

    /// All service records for a vehicle, newest first.
    pub fn service_records_for_vehicle(&self, vehicle_id: &str) -> Result<Vec<ServiceRecord>> {
        self.query_service_records(&ServiceQuery::new().vehicle(vehicle_id))
    }
}

// Settings and migration log
impl Store {
    /// Get a setting by key.
    pub fn get_setting(&self, key: &str) -> Result<Option<AppSetting>> {
        match &self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let mut stmt = conn.prepare(
                    "SELECT key, value, created_at, updated_at FROM app_settings WHERE key = ?",
                )?;
                let setting = stmt.query_row([key], setting_from_row).optional()?;
                Ok(setting)
            }
            Backend::Fallback(tables) => Ok(tables.settings.get(key).cloned()),
        }
    }

    /// Upsert a setting, preserving `created_at` on update.
    pub fn put_setting(&mut self, key: &str, value: &str) -> Result<()> {
        let now = OffsetDateTime::now_utc();
        match &mut self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                conn.execute(
                    "INSERT INTO app_settings (key, value, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                    params![key, value, now.unix_timestamp()],
                )?;
                Ok(())
            }
            Backend::Fallback(tables) => {
                tables.put_setting(key, value, now);
                Ok(())
            }
        }
    }

    /// List all settings ordered by key.
    pub fn list_settings(&self) -> Result<Vec<AppSetting>> {
        match &self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let mut stmt = conn.prepare(
                    "SELECT key, value, created_at, updated_at FROM app_settings ORDER BY key",
                )?;
                let settings = stmt
                    .query_map([], setting_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(settings)
            }
            Backend::Fallback(tables) => Ok(tables.settings.values().cloned().collect()),
        }
    }

    /// Append a row to the migration log.
    pub fn append_migration_run(&mut self, version: &str, success: bool) -> Result<MigrationRun> {
        let now = OffsetDateTime::now_utc();
        match &mut self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                conn.execute(
                    "INSERT INTO migration_log (version, applied_at, success) VALUES (?1, ?2, ?3)",
                    params![version, now.unix_timestamp(), success],
                )?;
                Ok(MigrationRun {
                    id: conn.last_insert_rowid(),
                    version: version.to_string(),
                    // Re-read through the persisted precision
                    applied_at: OffsetDateTime::from_unix_timestamp(now.unix_timestamp()).unwrap(),
                    success,
                })
            }
            Backend::Fallback(tables) => Ok(tables.append_migration_run(version, success, now)),
        }
    }

    /// The most recent successful run of the given migration version.
    pub fn last_successful_migration(&self, version: &str) -> Result<Option<MigrationRun>> {
        match &self.backend {
            Backend::Uninitialized => Err(Error::NotInitialized),
            Backend::Embedded(conn) => {
                let mut stmt = conn.prepare(
                    "SELECT id, version, applied_at, success FROM migration_log
                     WHERE version = ?1 AND success = 1 ORDER BY id DESC LIMIT 1",
                )?;
                let run = stmt.query_row([version], migration_run_from_row).optional()?;
                Ok(run)
            }
            Backend::Fallback(tables) => Ok(tables
                .migration_log
                .iter()
                .rev()
                .find(|run| run.version == version && run.success)
                .cloned()),
        }
    }
}

fn paginate<T>(rows: Vec<T>, offset: Option<u32>, limit: Option<u32>) -> Vec<T> {
    rows.into_iter()
        .skip(offset.unwrap_or(0) as usize)
        .take(limit.map_or(usize::MAX, |l| l as usize))
        .collect()
}

fn parse_vehicle_type(s: &str) -> VehicleType {
    VehicleType::try_from(s).unwrap_or(VehicleType::Gas)
}

fn parse_vehicle_status(s: &str) -> VehicleStatus {
    VehicleStatus::try_from(s).unwrap_or(VehicleStatus::Active)
}

fn vehicle_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Vehicle> {
    Ok(Vehicle {
        id: row.get(0)?,
        name: row.get(1)?,
        year: row.get(2)?,
        make: row.get(3)?,
        model: row.get(4)?,
        vehicle_type: parse_vehicle_type(&row.get::<_, String>(5)?),
        status: parse_vehicle_status(&row.get::<_, String>(6)?),
        created_at: OffsetDateTime::from_unix_timestamp(row.get(7)?).unwrap(),
        updated_at: OffsetDateTime::from_unix_timestamp(row.get(8)?).unwrap(),
    })
}

fn fuel_entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FuelEntry> {
    Ok(FuelEntry {
        id: row.get(0)?,
        vehicle_id: row.get(1)?,
        date: from_sql_date(&row.get::<_, String>(2)?).unwrap(),
        amount: row.get(3)?,
        quantity: row.get(4)?,
        price_per_unit: row.get(5)?,
        mileage: row.get::<_, i64>(6)? as u32,
        efficiency: row.get(7)?,
        station: row.get(8)?,
        notes: row.get(9)?,
        created_at: OffsetDateTime::from_unix_timestamp(row.get(10)?).unwrap(),
        updated_at: OffsetDateTime::from_unix_timestamp(row.get(11)?).unwrap(),
    })
}

fn service_record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ServiceRecord> {
    Ok(ServiceRecord {
        id: row.get(0)?,
        vehicle_id: row.get(1)?,
        date: from_sql_date(&row.get::<_, String>(2)?).unwrap(),
        service_type: row.get(3)?,
        description: row.get(4)?,
        cost: row.get(5)?,
        mileage: row.get::<_, i64>(6)? as u32,
        notes: row.get(7)?,
        completed: row.get(8)?,
        created_at: OffsetDateTime::from_unix_timestamp(row.get(9)?).unwrap(),
        updated_at: OffsetDateTime::from_unix_timestamp(row.get(10)?).unwrap(),
    })
}

fn setting_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppSetting> {
    Ok(AppSetting {
        key: row.get(0)?,
        value: row.get(1)?,
        created_at: OffsetDateTime::from_unix_timestamp(row.get(2)?).unwrap(),
        updated_at: OffsetDateTime::from_unix_timestamp(row.get(3)?).unwrap(),
    })
}

fn migration_run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MigrationRun> {
    Ok(MigrationRun {
        id: row.get(0)?,
        version: row.get(1)?,
        applied_at: OffsetDateTime::from_unix_timestamp(row.get(2)?).unwrap(),
        success: row.get(3)?,
    })
}

fn seed_embedded_defaults(conn: &Connection) -> Result<()> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    for (key, value) in DEFAULT_SETTINGS {
        conn.execute(
            "INSERT OR IGNORE INTO app_settings (key, value, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![key, value, now],
        )?;
    }
    Ok(())
}
