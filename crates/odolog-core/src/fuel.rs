//! Fuel entry service and the incremental efficiency computation.
//!
//! Efficiency is the one derived field in the data model: distance driven
//! since the previous fill-up divided by the quantity taken on. It is
//! computed when an entry is written, against the chronologically latest
//! prior entry for the same vehicle, and only when the odometer strictly
//! increased and the quantity is positive. In every other case the value
//! stays absent: "no basis to compute" is distinct from "computed as
//! zero".
//!
//! Editing an old entry recomputes that entry's own efficiency but does
//! not cascade to later entries that used it as their prior reference;
//! [`FuelService::reconcile_efficiency`] is the bulk repair for that.

use time::{Date, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use odolog_store::{FuelQuery, Store};
use odolog_types::units::round_currency;
use odolog_types::{FuelEntry, Vehicle};

use crate::analytics::{self, FuelSummary, MonthlySummary, VehicleComparison};
use crate::error::{Error, Result};
use crate::{SharedStore, lock};

/// Maximum accepted deviation between `amount` and `quantity * price`.
pub const AMOUNT_TOLERANCE: f64 = 0.05;

/// Form input for creating or replacing a fuel entry.
///
/// `amount` may be omitted, in which case it is derived from quantity and
/// price; when present it must agree with the product within
/// [`AMOUNT_TOLERANCE`].
#[derive(Debug, Clone)]
pub struct FuelDraft {
    /// Owning vehicle id.
    pub vehicle_id: String,
    /// Calendar date of the fill-up.
    pub date: Date,
    /// Total amount paid, if the user entered it directly.
    pub amount: Option<f64>,
    /// Quantity of fuel or energy taken on.
    pub quantity: f64,
    /// Price per unit.
    pub price_per_unit: f64,
    /// Odometer reading at fill-up time.
    pub mileage: u32,
    /// Station or charging network name.
    pub station: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
}

/// CRUD, search, batch, and analytics operations over fuel entries.
#[derive(Clone)]
pub struct FuelService {
    store: SharedStore,
}

impl FuelService {
    /// Create a service over the injected store handle.
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Look up a fuel entry by id.
    pub fn get(&self, id: &str) -> Result<Option<FuelEntry>> {
        Ok(lock(&self.store).get_fuel_entry(id)?)
    }

    /// All fuel entries, newest first.
    pub fn get_all(&self) -> Result<Vec<FuelEntry>> {
        Ok(lock(&self.store).query_fuel_entries(&FuelQuery::new())?)
    }

    /// All fuel entries for a vehicle, newest first.
    pub fn entries_for_vehicle(&self, vehicle_id: &str) -> Result<Vec<FuelEntry>> {
        Ok(lock(&self.store).fuel_entries_for_vehicle(vehicle_id)?)
    }

    /// Search entries with an arbitrary filter combination.
    pub fn search(&self, query: &FuelQuery) -> Result<Vec<FuelEntry>> {
        Ok(lock(&self.store).query_fuel_entries(query)?)
    }

    /// Validate the draft, reconcile the amount, compute efficiency, and
    /// persist a new entry.
    pub fn create(&self, draft: &FuelDraft) -> Result<FuelEntry> {
        let mut store = lock(&self.store);
        create_in(&mut store, draft)
    }

    /// Replace an existing entry, recomputing its efficiency from scratch
    /// with the entry itself excluded from the prior search.
    ///
    /// Later entries that referenced this one as their prior are not
    /// recomputed here; run [`FuelService::reconcile_efficiency`] after
    /// edits that change odometer, date, or quantity history.
    pub fn update(&self, id: &str, draft: &FuelDraft) -> Result<FuelEntry> {
        let mut store = lock(&self.store);
        update_in(&mut store, id, draft)
    }

    /// Delete a fuel entry.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut store = lock(&self.store);
        store.delete_fuel_entry(id)?;
        Ok(())
    }

    /// Create a list of entries inside one transaction.
    ///
    /// A failure on any item aborts the rest and rolls back the whole
    /// batch in both backends; the error names how many items had
    /// succeeded before the failure.
    pub fn create_batch(&self, drafts: &[FuelDraft]) -> Result<Vec<FuelEntry>> {
        for draft in drafts {
            validate_draft(draft)?;
        }

        let mut store = lock(&self.store);
        store.transaction(|st| {
            let mut created = Vec::with_capacity(drafts.len());
            for draft in drafts {
                match create_in(st, draft) {
                    Ok(entry) => created.push(entry),
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

    /// Replace a list of entries inside one transaction.
    pub fn update_batch(&self, items: &[(String, FuelDraft)]) -> Result<Vec<FuelEntry>> {
        for (_, draft) in items {
            validate_draft(draft)?;
        }

        let mut store = lock(&self.store);
        store.transaction(|st| {
            let mut updated = Vec::with_capacity(items.len());
            for (id, draft) in items {
                match update_in(st, id, draft) {
                    Ok(entry) => updated.push(entry),
                    Err(source) => {
                        return Err(Error::Batch {
                            completed: updated.len(),
                            source: Box::new(source),
                        });
                    }
                }
            }
            Ok(updated)
        })
    }

    /// Delete a list of entries inside one transaction.
    pub fn delete_batch(&self, ids: &[String]) -> Result<()> {
        let mut store = lock(&self.store);
        store.transaction(|st| {
            for (index, id) in ids.iter().enumerate() {
                st.delete_fuel_entry(id).map_err(|source| Error::Batch {
                    completed: index,
                    source: Box::new(Error::Store(source)),
                })?;
            }
            Ok(())
        })
    }

    /// Total spent on fuel in the current calendar month.
    pub fn monthly_total(&self) -> Result<f64> {
        let today = OffsetDateTime::now_utc().date();
        // Day 1 exists in every month.
        let first_of_month = today.replace_day(1).unwrap();

        let entries = lock(&self.store)
            .query_fuel_entries(&FuelQuery::new().since(first_of_month).until(today))?;
        Ok(round_currency(entries.iter().map(|e| e.amount).sum()))
    }

    /// Aggregate summary over an optional date range.
    ///
    /// Rows are fetched through the store and aggregated in the pure
    /// analytics engine, so the result is identical in both backends.
    pub fn analytics_summary(&self, range: Option<(Date, Date)>) -> Result<FuelSummary> {
        let entries = self.fetch_range(range)?;
        Ok(analytics::summarize(&entries))
    }

    /// Per-month totals for the last `n` calendar months, oldest first.
    pub fn monthly_trends(&self, months: usize) -> Result<Vec<MonthlySummary>> {
        let entries = lock(&self.store).query_fuel_entries(&FuelQuery::new())?;
        let today = OffsetDateTime::now_utc().date();
        Ok(analytics::last_n_months(&entries, months, today))
    }

    /// Per-vehicle aggregates over an optional date range.
    pub fn vehicle_comparison(
        &self,
        range: Option<(Date, Date)>,
    ) -> Result<Vec<VehicleComparison>> {
        let vehicles = lock(&self.store).list_vehicles()?;
        let entries = self.fetch_range(range)?;
        Ok(analytics::compare_vehicles(&vehicles, &entries))
    }

    /// Recompute every entry's efficiency from the full history and write
    /// back the rows whose value changed, in one transaction.
    ///
    /// This is the authoritative repair for the per-entry update's known
    /// consistency gap. Returns the number of rows rewritten.
    pub fn reconcile_efficiency(&self) -> Result<usize> {
        let mut store = lock(&self.store);

        let entries = store.query_fuel_entries(&FuelQuery::new().oldest_first())?;
        let vehicles = store.list_vehicles()?;
        let stale = analytics::recompute_all_efficiency(&entries, &vehicles);
        if stale.is_empty() {
            return Ok(0);
        }

        let now = OffsetDateTime::now_utc();
        let count = stale.len();
        store.transaction(|st| {
            for mut entry in stale {
                entry.updated_at = now;
                st.update_fuel_entry(&entry).map_err(Error::Store)?;
            }
            Ok::<_, Error>(())
        })?;

        debug!("Reconciled efficiency on {count} entries");
        Ok(count)
    }

    fn fetch_range(&self, range: Option<(Date, Date)>) -> Result<Vec<FuelEntry>> {
        let mut query = FuelQuery::new();
        if let Some((since, until)) = range {
            query = query.since(since).until(until);
        }
        Ok(lock(&self.store).query_fuel_entries(&query)?)
    }
}

/// Create path shared with batch operations and the migration importer.
pub(crate) fn create_in(store: &mut Store, draft: &FuelDraft) -> Result<FuelEntry> {
    validate_draft(draft)?;
    let vehicle = resolve_vehicle(store, &draft.vehicle_id)?;
    validate_quantity_ceiling(draft, &vehicle)?;
    let amount = reconcile_amount(draft)?;

    let efficiency = if vehicle.vehicle_type.tracks_efficiency() {
        let prior = prior_entry(store, &draft.vehicle_id, draft.date, None)?;
        compute_efficiency(prior.as_ref(), draft.mileage, draft.quantity)
    } else {
        None
    };

    let now = OffsetDateTime::now_utc();
    let entry = FuelEntry {
        id: Uuid::new_v4().to_string(),
        vehicle_id: draft.vehicle_id.clone(),
        date: draft.date,
        amount,
        quantity: draft.quantity,
        price_per_unit: draft.price_per_unit,
        mileage: draft.mileage,
        efficiency,
        station: draft.station.clone(),
        notes: draft.notes.clone(),
        created_at: now,
        updated_at: now,
    };

    store.insert_fuel_entry(&entry)?;
    debug!("Created fuel entry {} for vehicle {}", entry.id, entry.vehicle_id);
    Ok(entry)
}

/// Update path shared with batch operations.
pub(crate) fn update_in(store: &mut Store, id: &str, draft: &FuelDraft) -> Result<FuelEntry> {
    validate_draft(draft)?;
    let existing = store
        .get_fuel_entry(id)?
        .ok_or_else(|| odolog_store::Error::NotFound {
            table: "fuel_entries",
            id: id.to_string(),
        })?;
    let vehicle = resolve_vehicle(store, &draft.vehicle_id)?;
    validate_quantity_ceiling(draft, &vehicle)?;
    let amount = reconcile_amount(draft)?;

    // Exclude the edited entry itself so its old position in the history
    // cannot feed its own recomputation.
    let efficiency = if vehicle.vehicle_type.tracks_efficiency() {
        let prior = prior_entry(store, &draft.vehicle_id, draft.date, Some(id))?;
        compute_efficiency(prior.as_ref(), draft.mileage, draft.quantity)
    } else {
        None
    };

    let entry = FuelEntry {
        id: existing.id,
        vehicle_id: draft.vehicle_id.clone(),
        date: draft.date,
        amount,
        quantity: draft.quantity,
        price_per_unit: draft.price_per_unit,
        mileage: draft.mileage,
        efficiency,
        station: draft.station.clone(),
        notes: draft.notes.clone(),
        created_at: existing.created_at,
        updated_at: OffsetDateTime::now_utc(),
    };

    store.update_fuel_entry(&entry)?;
    Ok(entry)
}

fn resolve_vehicle(store: &Store, vehicle_id: &str) -> Result<Vehicle> {
    Ok(store
        .get_vehicle(vehicle_id)?
        .ok_or_else(|| odolog_store::Error::NotFound {
            table: "vehicles",
            id: vehicle_id.to_string(),
        })?)
}

/// The chronologically latest entry dated strictly before `date`,
/// optionally excluding one entry id (the entry being edited).
fn prior_entry(
    store: &Store,
    vehicle_id: &str,
    date: Date,
    exclude: Option<&str>,
) -> Result<Option<FuelEntry>> {
    let Some(cutoff) = date.previous_day() else {
        return Ok(None);
    };
    let earlier =
        store.query_fuel_entries(&FuelQuery::new().vehicle(vehicle_id).until(cutoff))?;
    Ok(earlier
        .into_iter()
        .find(|entry| exclude != Some(entry.id.as_str())))
}

/// The efficiency rule: distance over quantity, only when the odometer
/// strictly increased and the quantity is positive.
fn compute_efficiency(prior: Option<&FuelEntry>, mileage: u32, quantity: f64) -> Option<f64> {
    match prior {
        Some(p) if mileage > p.mileage && quantity > 0.0 => {
            Some(f64::from(mileage - p.mileage) / quantity)
        }
        _ => None,
    }
}

/// Derive a missing amount, or check a supplied one against the product
/// within [`AMOUNT_TOLERANCE`].
fn reconcile_amount(draft: &FuelDraft) -> Result<f64> {
    let expected = round_currency(draft.quantity * draft.price_per_unit);
    match draft.amount {
        None => Ok(expected),
        Some(amount) if (amount - draft.quantity * draft.price_per_unit).abs() <= AMOUNT_TOLERANCE => {
            Ok(amount)
        }
        Some(amount) => Err(Error::Consistency { amount, expected }),
    }
}

fn validate_draft(draft: &FuelDraft) -> Result<()> {
    let today = OffsetDateTime::now_utc().date();
    if draft.date > today {
        return Err(Error::Validation {
            field: "date",
            message: "must not be in the future".to_string(),
        });
    }
    if draft.quantity <= 0.0 {
        return Err(Error::Validation {
            field: "quantity",
            message: "must be greater than zero".to_string(),
        });
    }
    if draft.price_per_unit <= 0.0 {
        return Err(Error::Validation {
            field: "price_per_unit",
            message: "must be greater than zero".to_string(),
        });
    }
    if let Some(amount) = draft.amount {
        if amount <= 0.0 {
            return Err(Error::Validation {
                field: "amount",
                message: "must be greater than zero".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_quantity_ceiling(draft: &FuelDraft, vehicle: &Vehicle) -> Result<()> {
    let ceiling = vehicle.vehicle_type.quantity_ceiling();
    if draft.quantity > ceiling {
        return Err(Error::Validation {
            field: "quantity",
            message: format!(
                "exceeds the plausible maximum of {ceiling} for a {} vehicle",
                vehicle.vehicle_type
            ),
        });
    }
    Ok(())
}
