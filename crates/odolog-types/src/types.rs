//! Core record types for vehicle tracking.

use core::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::error::ParseError;

/// Powertrain type of a tracked vehicle.
///
/// The string forms (`gas`, `electric`, `hybrid`) are the persisted CHECK
/// values and the serde representation, so rows and legacy snapshots decode
/// with the same spelling.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new powertrain
/// types in future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum VehicleType {
    /// Combustion vehicle; fill-ups are measured in gallons.
    Gas,
    /// Battery-electric vehicle; charge sessions are measured in kWh.
    Electric,
    /// Hybrid vehicle; fill-ups are measured in gallons.
    Hybrid,
}

impl VehicleType {
    /// The persisted string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Gas => "gas",
            VehicleType::Electric => "electric",
            VehicleType::Hybrid => "hybrid",
        }
    }

    /// Whether mileage-based efficiency applies to this vehicle type.
    ///
    /// Electric vehicles never carry an efficiency value; distance per
    /// gallon has no meaning for a charge session.
    #[must_use]
    pub const fn tracks_efficiency(&self) -> bool {
        !matches!(self, VehicleType::Electric)
    }

    /// Plausibility ceiling for a single fill-up quantity.
    ///
    /// Gallons for combustion vehicles, kWh for electric ones. Entries
    /// above the ceiling are rejected at validation time.
    #[must_use]
    pub const fn quantity_ceiling(&self) -> f64 {
        match self {
            VehicleType::Gas | VehicleType::Hybrid => 100.0,
            VehicleType::Electric => 300.0,
        }
    }
}

impl TryFrom<&str> for VehicleType {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "gas" => Ok(VehicleType::Gas),
            "electric" => Ok(VehicleType::Electric),
            "hybrid" => Ok(VehicleType::Hybrid),
            other => Err(ParseError::UnknownVehicleType(other.to_string())),
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a vehicle is still in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    /// Vehicle is in active use (the default for new vehicles).
    Active,
    /// Vehicle is retired or sold; kept for history.
    Inactive,
}

impl VehicleStatus {
    /// The persisted string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Active => "active",
            VehicleStatus::Inactive => "inactive",
        }
    }
}

impl TryFrom<&str> for VehicleStatus {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(VehicleStatus::Active),
            "inactive" => Ok(VehicleStatus::Inactive),
            other => Err(ParseError::UnknownVehicleStatus(other.to_string())),
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked vehicle.
///
/// Fuel and service records reference a vehicle by `id`; deleting a vehicle
/// cascades to its dependent records in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Opaque identifier (UUID v4 assigned at creation).
    pub id: String,
    /// Display name chosen by the user.
    pub name: String,
    /// Model year.
    pub year: i32,
    /// Manufacturer.
    pub make: String,
    /// Model name.
    pub model: String,
    /// Powertrain type.
    pub vehicle_type: VehicleType,
    /// Active/inactive status.
    pub status: VehicleStatus,
    /// When the vehicle was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the vehicle was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A fuel fill-up (or charge session) for a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelEntry {
    /// Opaque identifier (UUID v4 assigned at creation).
    pub id: String,
    /// Owning vehicle id.
    pub vehicle_id: String,
    /// Calendar date of the fill-up; never in the future.
    pub date: Date,
    /// Total amount paid, in currency units. Reconciled against
    /// `quantity * price_per_unit` within a small rounding tolerance.
    pub amount: f64,
    /// Quantity of fuel or energy (gallons or kWh), > 0.
    pub quantity: f64,
    /// Price per unit of fuel or energy, > 0.
    pub price_per_unit: f64,
    /// Odometer reading at fill-up time, in miles.
    pub mileage: u32,
    /// Derived distance-per-quantity efficiency (MPG for gas vehicles).
    ///
    /// Absent when there is no basis to compute it: electric vehicles,
    /// the first entry for a vehicle, or an odometer that did not
    /// increase over the prior entry. Absent and zero are distinct.
    pub efficiency: Option<f64>,
    /// Station or charging network name, if recorded.
    pub station: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// When the entry was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the entry was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A maintenance/service record for a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Opaque identifier (UUID v4 assigned at creation).
    pub id: String,
    /// Owning vehicle id.
    pub vehicle_id: String,
    /// Calendar date of the service.
    pub date: Date,
    /// Free-text service type (e.g. "oil change").
    pub service_type: String,
    /// Description of the work performed.
    pub description: String,
    /// Cost in currency units, >= 0.
    pub cost: f64,
    /// Odometer reading at service time, in miles.
    pub mileage: u32,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Whether the service has been completed.
    pub completed: bool,
    /// When the record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the record was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A key-value application setting; one row per key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSetting {
    /// Setting key (e.g. `region`, `theme`).
    pub key: String,
    /// Setting value.
    pub value: String,
    /// When the setting was first written.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the setting was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One row of the migration log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRun {
    /// Autoincrement row id.
    pub id: i64,
    /// Migration version identifier.
    pub version: String,
    /// When the migration ran.
    #[serde(with = "time::serde::rfc3339")]
    pub applied_at: OffsetDateTime,
    /// Whether the run completed successfully.
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_vehicle_type_string_forms() {
        assert_eq!(VehicleType::Gas.as_str(), "gas");
        assert_eq!(VehicleType::Electric.as_str(), "electric");
        assert_eq!(VehicleType::Hybrid.as_str(), "hybrid");

        assert_eq!(VehicleType::try_from("gas"), Ok(VehicleType::Gas));
        assert_eq!(VehicleType::try_from("electric"), Ok(VehicleType::Electric));
        assert_eq!(VehicleType::try_from("hybrid"), Ok(VehicleType::Hybrid));
        assert!(VehicleType::try_from("diesel").is_err());
    }

    #[test]
    fn test_vehicle_type_tracks_efficiency() {
        assert!(VehicleType::Gas.tracks_efficiency());
        assert!(VehicleType::Hybrid.tracks_efficiency());
        assert!(!VehicleType::Electric.tracks_efficiency());
    }

    #[test]
    fn test_vehicle_type_quantity_ceiling() {
        assert_eq!(VehicleType::Gas.quantity_ceiling(), 100.0);
        assert_eq!(VehicleType::Hybrid.quantity_ceiling(), 100.0);
        assert_eq!(VehicleType::Electric.quantity_ceiling(), 300.0);
    }

    #[test]
    fn test_vehicle_status_string_forms() {
        assert_eq!(VehicleStatus::Active.as_str(), "active");
        assert_eq!(VehicleStatus::Inactive.as_str(), "inactive");

        assert_eq!(
            VehicleStatus::try_from("active"),
            Ok(VehicleStatus::Active)
        );
        assert_eq!(
            VehicleStatus::try_from("inactive"),
            Ok(VehicleStatus::Inactive)
        );
        assert!(VehicleStatus::try_from("scrapped").is_err());
    }

    #[test]
    fn test_enum_serde_uses_persisted_forms() {
        assert_eq!(serde_json::to_string(&VehicleType::Gas).unwrap(), "\"gas\"");
        assert_eq!(
            serde_json::to_string(&VehicleStatus::Inactive).unwrap(),
            "\"inactive\""
        );

        let parsed: VehicleType = serde_json::from_str("\"hybrid\"").unwrap();
        assert_eq!(parsed, VehicleType::Hybrid);
    }

    #[test]
    fn test_fuel_entry_serialization_roundtrip() {
        let now = datetime!(2024-03-01 12:00:00 UTC);
        let entry = FuelEntry {
            id: "e1".to_string(),
            vehicle_id: "v1".to_string(),
            date: now.date(),
            amount: 45.0,
            quantity: 12.0,
            price_per_unit: 3.75,
            mileage: 42_000,
            efficiency: Some(30.0),
            station: Some("Shell".to_string()),
            notes: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&entry).unwrap();
        let back: FuelEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::UnknownVehicleType("diesel".to_string());
        assert_eq!(err.to_string(), "Unknown vehicle type: diesel");
    }
}
