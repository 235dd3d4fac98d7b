//! Query builders for fuel entries and service records.
//!
//! Both [`FuelQuery`] and [`ServiceQuery`] follow the builder pattern and
//! evaluate identically against either backend: in embedded mode a builder
//! composes a parameterized WHERE clause, in fallback mode the same builder
//! acts as an in-memory row predicate. All filters AND together.
//!
//! # Example
//!
//! ```
//! use odolog_store::{FuelQuery, Store};
//! use time::macros::date;
//!
//! let mut store = Store::in_memory();
//! store.init();
//!
//! let query = FuelQuery::new()
//!     .vehicle("v1")
//!     .since(date!(2024 - 01 - 01))
//!     .station_contains("shell")
//!     .limit(50);
//! let entries = store.query_fuel_entries(&query)?;
//! # Ok::<(), odolog_store::Error>(())
//! ```

use time::Date;

use odolog_types::{FuelEntry, ServiceRecord};

use crate::dates::to_sql_date;

/// Fluent query builder for fuel entries.
///
/// By default results are ordered by date descending (newest first), with
/// creation time as a tiebreaker.
#[derive(Debug, Default, Clone)]
pub struct FuelQuery {
    /// Filter by owning vehicle id.
    pub vehicle_id: Option<String>,
    /// Include only entries dated on or after this day.
    pub since: Option<Date>,
    /// Include only entries dated on or before this day.
    pub until: Option<Date>,
    /// Case-insensitive substring match on the station name.
    pub station_contains: Option<String>,
    /// Minimum price per unit.
    pub min_price: Option<f64>,
    /// Maximum price per unit.
    pub max_price: Option<f64>,
    /// Minimum total amount paid.
    pub min_amount: Option<f64>,
    /// Maximum total amount paid.
    pub max_amount: Option<f64>,
    /// Case-insensitive free-text search over notes and station.
    pub text: Option<String>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by date descending (newest first).
    pub newest_first: bool,
}

impl FuelQuery {
    /// Create a new query with default settings (no filters, newest first).
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Filter by owning vehicle id.
    pub fn vehicle(mut self, vehicle_id: &str) -> Self {
        self.vehicle_id = Some(vehicle_id.to_string());
        self
    }

    /// Filter to entries dated on or after this day.
    pub fn since(mut self, date: Date) -> Self {
        self.since = Some(date);
        self
    }

    /// Filter to entries dated on or before this day.
    pub fn until(mut self, date: Date) -> Self {
        self.until = Some(date);
        self
    }

    /// Case-insensitive substring match on the station name.
    pub fn station_contains(mut self, fragment: &str) -> Self {
        self.station_contains = Some(fragment.to_string());
        self
    }

    /// Filter by price-per-unit range. Either bound may be open.
    pub fn price_between(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Filter by total-amount range. Either bound may be open.
    pub fn amount_between(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    /// Case-insensitive free-text search over notes and station.
    pub fn text(mut self, needle: &str) -> Self {
        self.text = Some(needle.to_string());
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results (pagination).
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results by oldest first (chronological).
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters for the embedded backend.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref vehicle_id) = self.vehicle_id {
            conditions.push("vehicle_id = ?");
            params.push(Box::new(vehicle_id.clone()));
        }

        if let Some(since) = self.since {
            conditions.push("date >= ?");
            params.push(Box::new(to_sql_date(since)));
        }

        if let Some(until) = self.until {
            conditions.push("date <= ?");
            params.push(Box::new(to_sql_date(until)));
        }

        if let Some(ref fragment) = self.station_contains {
            conditions.push("fuel_station LIKE ?");
            params.push(Box::new(format!("%{}%", fragment)));
        }

        if let Some(min) = self.min_price {
            conditions.push("price_per_unit >= ?");
            params.push(Box::new(min));
        }

        if let Some(max) = self.max_price {
            conditions.push("price_per_unit <= ?");
            params.push(Box::new(max));
        }

        if let Some(min) = self.min_amount {
            conditions.push("amount >= ?");
            params.push(Box::new(min));
        }

        if let Some(max) = self.max_amount {
            conditions.push("amount <= ?");
            params.push(Box::new(max));
        }

        if let Some(ref needle) = self.text {
            conditions.push("(notes LIKE ? OR fuel_station LIKE ?)");
            let pattern = format!("%{}%", needle);
            params.push(Box::new(pattern.clone()));
            params.push(Box::new(pattern));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query for the embedded backend.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT id, vehicle_id, date, amount, quantity, price_per_unit, mileage, \
             mpg, fuel_station, notes, created_at, updated_at \
             FROM fuel_entries {} ORDER BY date {order}, created_at {order}",
            where_clause
        );

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }

    /// Evaluate the same filters as an in-memory predicate (fallback backend).
    pub(crate) fn matches(&self, entry: &FuelEntry) -> bool {
        if let Some(ref vehicle_id) = self.vehicle_id {
            if entry.vehicle_id != *vehicle_id {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.date < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.date > until {
                return false;
            }
        }
        if let Some(ref fragment) = self.station_contains {
            let needle = fragment.to_lowercase();
            match entry.station {
                Some(ref station) if station.to_lowercase().contains(&needle) => {}
                _ => return false,
            }
        }
        if let Some(min) = self.min_price {
            if entry.price_per_unit < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if entry.price_per_unit > max {
                return false;
            }
        }
        if let Some(min) = self.min_amount {
            if entry.amount < min {
                return false;
            }
        }
        if let Some(max) = self.max_amount {
            if entry.amount > max {
                return false;
            }
        }
        if let Some(ref needle) = self.text {
            let needle = needle.to_lowercase();
            let in_notes = entry
                .notes
                .as_ref()
                .is_some_and(|n| n.to_lowercase().contains(&needle));
            let in_station = entry
                .station
                .as_ref()
                .is_some_and(|s| s.to_lowercase().contains(&needle));
            if !in_notes && !in_station {
                return false;
            }
        }
        true
    }
}

/// Fluent query builder for service records.
///
/// By default results are ordered by date descending (newest first), with
/// creation time as a tiebreaker.
#[derive(Debug, Default, Clone)]
pub struct ServiceQuery {
    /// Filter by owning vehicle id.
    pub vehicle_id: Option<String>,
    /// Include only records dated on or after this day.
    pub since: Option<Date>,
    /// Include only records dated on or before this day.
    pub until: Option<Date>,
    /// Exact match on the service type.
    pub service_type: Option<String>,
    /// Filter by completion flag.
    pub completed: Option<bool>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by date descending (newest first).
    pub newest_first: bool,
}

impl ServiceQuery {
    /// Create a new query with default settings (no filters, newest first).
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Filter by owning vehicle id.
    pub fn vehicle(mut self, vehicle_id: &str) -> Self {
        self.vehicle_id = Some(vehicle_id.to_string());
        self
    }

    /// Filter to records dated on or after this day.
    pub fn since(mut self, date: Date) -> Self {
        self.since = Some(date);
        self
    }

    /// Filter to records dated on or before this day.
    pub fn until(mut self, date: Date) -> Self {
        self.until = Some(date);
        self
    }

    /// Exact match on the service type.
    pub fn service_type(mut self, service_type: &str) -> Self {
        self.service_type = Some(service_type.to_string());
        self
    }

    /// Filter by completion flag.
    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results (pagination).
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results by oldest first (chronological).
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters for the embedded backend.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref vehicle_id) = self.vehicle_id {
            conditions.push("vehicle_id = ?");
            params.push(Box::new(vehicle_id.clone()));
        }

        if let Some(since) = self.since {
            conditions.push("date >= ?");
            params.push(Box::new(to_sql_date(since)));
        }

        if let Some(until) = self.until {
            conditions.push("date <= ?");
            params.push(Box::new(to_sql_date(until)));
        }

        if let Some(ref service_type) = self.service_type {
            conditions.push("type = ?");
            params.push(Box::new(service_type.clone()));
        }

        if let Some(completed) = self.completed {
            conditions.push("is_completed = ?");
            params.push(Box::new(i64::from(completed)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query for the embedded backend.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT id, vehicle_id, date, type, description, cost, mileage, notes, \
             is_completed, created_at, updated_at \
             FROM service_records {} ORDER BY date {order}, created_at {order}",
            where_clause
        );

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }

    /// Evaluate the same filters as an in-memory predicate (fallback backend).
    pub(crate) fn matches(&self, record: &ServiceRecord) -> bool {
        if let Some(ref vehicle_id) = self.vehicle_id {
            if record.vehicle_id != *vehicle_id {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.date < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.date > until {
                return false;
            }
        }
        if let Some(ref service_type) = self.service_type {
            if record.service_type != *service_type {
                return false;
            }
        }
        if let Some(completed) = self.completed {
            if record.completed != completed {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn entry() -> FuelEntry {
        let now = datetime!(2024-06-15 12:00:00 UTC);
        FuelEntry {
            id: "e1".to_string(),
            vehicle_id: "v1".to_string(),
            date: date!(2024 - 06 - 15),
            amount: 45.0,
            quantity: 12.0,
            price_per_unit: 3.75,
            mileage: 42_000,
            efficiency: Some(30.0),
            station: Some("Shell Downtown".to_string()),
            notes: Some("road trip".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_fuel_query_new_defaults() {
        let query = FuelQuery::new();
        assert!(query.vehicle_id.is_none());
        assert!(query.since.is_none());
        assert!(query.until.is_none());
        assert!(query.limit.is_none());
        assert!(query.newest_first);
    }

    #[test]
    fn test_fuel_query_build_where_empty() {
        let (where_clause, params) = FuelQuery::new().build_where();
        assert_eq!(where_clause, "");
        assert!(params.is_empty());
    }

    #[test]
    fn test_fuel_query_build_where_all_filters() {
        let query = FuelQuery::new()
            .vehicle("v1")
            .since(date!(2024 - 01 - 01))
            .until(date!(2024 - 12 - 31))
            .station_contains("shell")
            .price_between(Some(3.0), Some(4.0))
            .amount_between(Some(10.0), Some(100.0))
            .text("trip");
        let (where_clause, params) = query.build_where();

        assert!(where_clause.contains("vehicle_id = ?"));
        assert!(where_clause.contains("date >= ?"));
        assert!(where_clause.contains("date <= ?"));
        assert!(where_clause.contains("fuel_station LIKE ?"));
        assert!(where_clause.contains("price_per_unit >= ?"));
        assert!(where_clause.contains("price_per_unit <= ?"));
        assert!(where_clause.contains("amount >= ?"));
        assert!(where_clause.contains("amount <= ?"));
        assert!(where_clause.contains("(notes LIKE ? OR fuel_station LIKE ?)"));
        // text contributes two parameters
        assert_eq!(params.len(), 10);
    }

    #[test]
    fn test_fuel_query_build_sql_ordering_and_pagination() {
        let sql = FuelQuery::new().build_sql();
        assert!(sql.contains("ORDER BY date DESC, created_at DESC"));

        let sql = FuelQuery::new().oldest_first().limit(10).offset(20).build_sql();
        assert!(sql.contains("ORDER BY date ASC, created_at ASC"));
        assert!(sql.contains("LIMIT 10"));
        assert!(sql.contains("OFFSET 20"));
    }

    #[test]
    fn test_fuel_query_matches_vehicle_and_range() {
        let e = entry();
        assert!(FuelQuery::new().vehicle("v1").matches(&e));
        assert!(!FuelQuery::new().vehicle("v2").matches(&e));
        assert!(FuelQuery::new().since(date!(2024 - 06 - 01)).matches(&e));
        assert!(!FuelQuery::new().since(date!(2024 - 07 - 01)).matches(&e));
        assert!(!FuelQuery::new().until(date!(2024 - 05 - 31)).matches(&e));
    }

    #[test]
    fn test_fuel_query_matches_station_case_insensitive() {
        let e = entry();
        assert!(FuelQuery::new().station_contains("shell").matches(&e));
        assert!(FuelQuery::new().station_contains("DOWNTOWN").matches(&e));
        assert!(!FuelQuery::new().station_contains("chevron").matches(&e));
    }

    #[test]
    fn test_fuel_query_matches_text_over_notes_and_station() {
        let e = entry();
        assert!(FuelQuery::new().text("road").matches(&e));
        assert!(FuelQuery::new().text("shell").matches(&e));
        assert!(!FuelQuery::new().text("oil change").matches(&e));

        let mut bare = entry();
        bare.notes = None;
        bare.station = None;
        assert!(!FuelQuery::new().text("road").matches(&bare));
    }

    #[test]
    fn test_fuel_query_matches_price_and_amount_ranges() {
        let e = entry();
        assert!(FuelQuery::new().price_between(Some(3.5), Some(4.0)).matches(&e));
        assert!(!FuelQuery::new().price_between(Some(3.8), None).matches(&e));
        assert!(FuelQuery::new().amount_between(None, Some(45.0)).matches(&e));
        assert!(!FuelQuery::new().amount_between(None, Some(44.0)).matches(&e));
    }

    #[test]
    fn test_service_query_build_where() {
        let query = ServiceQuery::new()
            .vehicle("v1")
            .service_type("oil change")
            .completed(true);
        let (where_clause, params) = query.build_where();

        assert!(where_clause.contains("vehicle_id = ?"));
        assert!(where_clause.contains("type = ?"));
        assert!(where_clause.contains("is_completed = ?"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_service_query_matches() {
        let now = datetime!(2024-06-15 12:00:00 UTC);
        let record = ServiceRecord {
            id: "s1".to_string(),
            vehicle_id: "v1".to_string(),
            date: date!(2024 - 06 - 15),
            service_type: "oil change".to_string(),
            description: "5W-30".to_string(),
            cost: 60.0,
            mileage: 42_000,
            notes: None,
            completed: true,
            created_at: now,
            updated_at: now,
        };

        assert!(ServiceQuery::new().service_type("oil change").matches(&record));
        assert!(!ServiceQuery::new().service_type("tires").matches(&record));
        assert!(ServiceQuery::new().completed(true).matches(&record));
        assert!(!ServiceQuery::new().completed(false).matches(&record));
    }
}
