//! Pure unit conversion for volume, distance, and fuel efficiency.
//!
//! Gallons and miles are the storage-canonical units; metric values are a
//! display conversion applied at the UI boundary. Efficiency is stored as
//! MPG and converted on demand.
//!
//! # Example
//!
//! ```
//! use odolog_types::units::{self, EfficiencyUnit};
//!
//! let km_per_l = units::convert_efficiency(30.0, EfficiencyUnit::KilometersPerLiter);
//! assert!((km_per_l - 12.75432).abs() < 1e-6);
//!
//! // Conversion is invertible within floating-point tolerance.
//! let back = units::to_miles_per_gallon(km_per_l, EfficiencyUnit::KilometersPerLiter);
//! assert!((back - 30.0).abs() < 1e-9);
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

/// Liters in one US gallon.
pub const LITERS_PER_GALLON: f64 = 3.78541;

/// Kilometers in one mile.
pub const KM_PER_MILE: f64 = 1.60934;

/// km/L equivalent of 1 MPG.
pub const KM_PER_L_PER_MPG: f64 = 0.425144;

/// Conversion factor between MPG and L/100km: `l_per_100km = FACTOR / mpg`.
pub const L_PER_100KM_FACTOR: f64 = 235.215;

/// Convert US gallons to liters.
#[must_use]
pub fn gallons_to_liters(gallons: f64) -> f64 {
    gallons * LITERS_PER_GALLON
}

/// Convert liters to US gallons.
#[must_use]
pub fn liters_to_gallons(liters: f64) -> f64 {
    liters / LITERS_PER_GALLON
}

/// Convert miles to kilometers.
#[must_use]
pub fn miles_to_km(miles: f64) -> f64 {
    miles * KM_PER_MILE
}

/// Convert kilometers to miles.
#[must_use]
pub fn km_to_miles(km: f64) -> f64 {
    km / KM_PER_MILE
}

/// Round a currency value to two decimals.
#[must_use]
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Display unit for a fuel-efficiency value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EfficiencyUnit {
    /// Miles per US gallon (storage-canonical).
    MilesPerGallon,
    /// Kilometers per liter.
    KilometersPerLiter,
    /// Liters per 100 kilometers (inverse scale: lower is better).
    LitersPer100Km,
}

impl EfficiencyUnit {
    /// Short unit label for display.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            EfficiencyUnit::MilesPerGallon => "MPG",
            EfficiencyUnit::KilometersPerLiter => "km/L",
            EfficiencyUnit::LitersPer100Km => "L/100km",
        }
    }
}

impl fmt::Display for EfficiencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Convert a stored MPG value to the requested display unit.
///
/// `LitersPer100Km` is an inverse scale; a non-positive MPG input yields
/// `f64::INFINITY` there, which callers should treat as "not displayable".
#[must_use]
pub fn convert_efficiency(mpg: f64, unit: EfficiencyUnit) -> f64 {
    match unit {
        EfficiencyUnit::MilesPerGallon => mpg,
        EfficiencyUnit::KilometersPerLiter => mpg * KM_PER_L_PER_MPG,
        EfficiencyUnit::LitersPer100Km => L_PER_100KM_FACTOR / mpg,
    }
}

/// Convert a value in the given display unit back to MPG.
///
/// Inverse of [`convert_efficiency`].
#[must_use]
pub fn to_miles_per_gallon(value: f64, unit: EfficiencyUnit) -> f64 {
    match unit {
        EfficiencyUnit::MilesPerGallon => value,
        EfficiencyUnit::KilometersPerLiter => value / KM_PER_L_PER_MPG,
        EfficiencyUnit::LitersPer100Km => L_PER_100KM_FACTOR / value,
    }
}

/// Fuel cost per mile driven, from pump price and efficiency.
///
/// Returns `None` when efficiency is non-positive.
#[must_use]
pub fn cost_per_mile(price_per_gallon: f64, mpg: f64) -> Option<f64> {
    if mpg > 0.0 {
        Some(price_per_gallon / mpg)
    } else {
        None
    }
}

/// Format an efficiency value with its unit label, one decimal place.
#[must_use]
pub fn format_efficiency(value: f64, unit: EfficiencyUnit) -> String {
    format!("{:.1} {}", value, unit.label())
}
