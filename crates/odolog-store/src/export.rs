//! CSV export of stored records.

use std::io::Write;

use tracing::info;

use crate::dates::to_sql_date;
use crate::error::Result;
use crate::queries::{FuelQuery, ServiceQuery};
use crate::store::Store;

impl Store {
    /// Export fuel entries matching `query` as CSV. Returns the row count.
    ///
    /// Columns use the persisted names so an export can be inspected next
    /// to the database schema.
    pub fn export_fuel_entries_csv<W: Write>(&self, query: &FuelQuery, writer: W) -> Result<usize> {
        let entries = self.query_fuel_entries(query)?;

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "id",
            "vehicle_id",
            "date",
            "amount",
            "quantity",
            "price_per_unit",
            "mileage",
            "mpg",
            "fuel_station",
            "notes",
        ])?;

        for entry in &entries {
            csv_writer.write_record([
                entry.id.as_str(),
                entry.vehicle_id.as_str(),
                &to_sql_date(entry.date),
                &entry.amount.to_string(),
                &entry.quantity.to_string(),
                &entry.price_per_unit.to_string(),
                &entry.mileage.to_string(),
                &entry.efficiency.map(|e| e.to_string()).unwrap_or_default(),
                entry.station.as_deref().unwrap_or(""),
                entry.notes.as_deref().unwrap_or(""),
            ])?;
        }
        csv_writer.flush()?;

        info!("Exported {} fuel entries", entries.len());
        Ok(entries.len())
    }

    /// Export service records matching `query` as CSV. Returns the row count.
    pub fn export_service_records_csv<W: Write>(
        &self,
        query: &ServiceQuery,
        writer: W,
    ) -> Result<usize> {
        let records = self.query_service_records(query)?;

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "id",
            "vehicle_id",
            "date",
            "type",
            "description",
            "cost",
            "mileage",
            "notes",
            "is_completed",
        ])?;

        for record in &records {
            csv_writer.write_record([
                record.id.as_str(),
                record.vehicle_id.as_str(),
                &to_sql_date(record.date),
                record.service_type.as_str(),
                record.description.as_str(),
                &record.cost.to_string(),
                &record.mileage.to_string(),
                record.notes.as_deref().unwrap_or(""),
                if record.completed { "1" } else { "0" },
            ])?;
        }
        csv_writer.flush()?;

        info!("Exported {} service records", records.len());
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    use odolog_types::{FuelEntry, Vehicle, VehicleStatus, VehicleType};

    fn seeded_store() -> Store {
        let mut store = Store::in_memory();
        store.init();

        let now = datetime!(2024-01-01 00:00:00 UTC);
        store
            .insert_vehicle(&Vehicle {
                id: "v1".to_string(),
                name: "Car".to_string(),
                year: 2020,
                make: "Toyota".to_string(),
                model: "Corolla".to_string(),
                vehicle_type: VehicleType::Gas,
                status: VehicleStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        store
            .insert_fuel_entry(&FuelEntry {
                id: "e1".to_string(),
                vehicle_id: "v1".to_string(),
                date: date!(2024 - 01 - 05),
                amount: 45.0,
                quantity: 12.0,
                price_per_unit: 3.75,
                mileage: 1000,
                efficiency: Some(30.0),
                station: Some("Shell".to_string()),
                notes: None,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        store
    }

    #[test]
    fn test_export_fuel_entries_csv() {
        let store = seeded_store();
        let mut buffer = Vec::new();

        let count = store
            .export_fuel_entries_csv(&FuelQuery::new(), &mut buffer)
            .unwrap();
        assert_eq!(count, 1);

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,vehicle_id,date,amount,quantity,price_per_unit,mileage,mpg,fuel_station,notes"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("e1,v1,2024-01-05,45,12,3.75,1000,30,Shell,"));
    }

    #[test]
    fn test_export_service_records_csv_empty() {
        let store = seeded_store();
        let mut buffer = Vec::new();

        let count = store
            .export_service_records_csv(&ServiceQuery::new(), &mut buffer)
            .unwrap();
        assert_eq!(count, 0);

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("id,vehicle_id,date,type,"));
    }
}
