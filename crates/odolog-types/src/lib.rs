//! Shared types for odolog vehicle tracking.
//!
//! This crate provides the record types persisted by `odolog-store` and
//! consumed by the services in `odolog-core`, plus pure unit conversion
//! for volume, distance, and fuel efficiency.
//!
//! # Features
//!
//! - Entity types for vehicles, fuel fill-ups, and service records
//! - Vehicle type/status enumerations matching the persisted string forms
//! - Unit conversion between US and metric fuel-economy units
//!
//! # Example
//!
//! ```
//! use odolog_types::{VehicleType, units};
//!
//! assert_eq!(VehicleType::Gas.as_str(), "gas");
//! let liters = units::gallons_to_liters(12.0);
//! assert!((liters - 45.42492).abs() < 1e-6);
//! ```

pub mod error;
pub mod types;
pub mod units;

pub use error::{ParseError, ParseResult};
pub use types::{
    AppSetting, FuelEntry, MigrationRun, ServiceRecord, Vehicle, VehicleStatus, VehicleType,
};
pub use units::EfficiencyUnit;
