//! Aggregate statistics over fetched fuel entries.
//!
//! Everything in this module is a pure function over slices the entity
//! services already fetched; nothing here touches the store. That keeps
//! every aggregate identical across store backends and makes the
//! computations trivially testable.

use std::collections::{BTreeMap, HashMap};

use time::{Date, Month, Weekday};

use odolog_types::units::round_currency;
use odolog_types::{FuelEntry, Vehicle, VehicleType};

/// Slope magnitude below which a series counts as stable.
pub const TREND_SLOPE_THRESHOLD: f64 = 0.1;

/// Aggregate totals over a set of fuel entries.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelSummary {
    /// Number of entries.
    pub entries: usize,
    /// Total amount spent.
    pub total_spent: f64,
    /// Total quantity of fuel/energy.
    pub total_quantity: f64,
    /// Quantity-weighted average price per unit.
    pub average_price: f64,
    /// Mean efficiency over entries that carry a value.
    pub average_efficiency: Option<f64>,
    /// Highest efficiency seen.
    pub best_efficiency: Option<f64>,
    /// Lowest efficiency seen.
    pub worst_efficiency: Option<f64>,
}

/// Summarize a set of fuel entries.
#[must_use]
pub fn summarize(entries: &[FuelEntry]) -> FuelSummary {
    let total_spent: f64 = entries.iter().map(|e| e.amount).sum();
    let total_quantity: f64 = entries.iter().map(|e| e.quantity).sum();
    let efficiencies: Vec<f64> = entries.iter().filter_map(|e| e.efficiency).collect();

    FuelSummary {
        entries: entries.len(),
        total_spent: round_currency(total_spent),
        total_quantity,
        average_price: if total_quantity > 0.0 {
            total_spent / total_quantity
        } else {
            0.0
        },
        average_efficiency: mean(&efficiencies),
        best_efficiency: efficiencies.iter().copied().reduce(f64::max),
        worst_efficiency: efficiencies.iter().copied().reduce(f64::min),
    }
}

/// Recompute every entry's efficiency from the full history.
///
/// Entries are walked per vehicle in (date, creation) order carrying the
/// latest strictly-earlier entry, applying the same rule as the per-entry
/// write path. Returns clones of the entries whose stored efficiency
/// disagrees with the recomputed value, with the value fixed; this is the
/// authoritative repair for edits that changed odometer/date/quantity
/// history.
#[must_use]
pub fn recompute_all_efficiency(entries: &[FuelEntry], vehicles: &[Vehicle]) -> Vec<FuelEntry> {
    let types: HashMap<&str, VehicleType> = vehicles
        .iter()
        .map(|v| (v.id.as_str(), v.vehicle_type))
        .collect();

    let mut sorted: Vec<&FuelEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| {
        (a.vehicle_id.as_str(), a.date, a.created_at)
            .cmp(&(b.vehicle_id.as_str(), b.date, b.created_at))
    });

    let mut changed = Vec::new();
    let mut current_vehicle: Option<&str> = None;
    // Latest entry dated strictly before the current one.
    let mut prior: Option<&FuelEntry> = None;
    let mut prev: Option<&FuelEntry> = None;

    for entry in sorted {
        if current_vehicle != Some(entry.vehicle_id.as_str()) {
            current_vehicle = Some(entry.vehicle_id.as_str());
            prior = None;
            prev = None;
        }
        if let Some(p) = prev {
            if p.date < entry.date {
                prior = Some(p);
            }
        }

        let tracks = types
            .get(entry.vehicle_id.as_str())
            .is_some_and(VehicleType::tracks_efficiency);
        let expected = match prior {
            Some(p) if tracks && entry.mileage > p.mileage && entry.quantity > 0.0 => {
                Some(f64::from(entry.mileage - p.mileage) / entry.quantity)
            }
            _ => None,
        };

        if expected != entry.efficiency {
            let mut fixed = entry.clone();
            fixed.efficiency = expected;
            changed.push(fixed);
        }
        prev = Some(entry);
    }

    changed
}

/// Order statistics over a numeric series.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    /// Number of values.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median.
    pub median: f64,
    /// Most frequent value; absent when every value is unique.
    pub mode: Option<f64>,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Population variance.
    pub variance: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// First quartile (median of the lower half).
    pub q1: f64,
    /// Third quartile (median of the upper half).
    pub q3: f64,
    /// Interquartile range.
    pub iqr: f64,
}

/// Descriptive statistics over a series. Returns `None` for empty input.
#[must_use]
pub fn describe(values: &[f64]) -> Option<DescriptiveStats> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let count = sorted.len();

    let mean_value = sorted.iter().sum::<f64>() / count as f64;
    let variance = sorted.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / count as f64;
    let (q1, q3) = quartiles(&sorted);

    Some(DescriptiveStats {
        count,
        mean: mean_value,
        median: median_of(&sorted),
        mode: mode_of(&sorted),
        min: sorted[0],
        max: sorted[count - 1],
        variance,
        std_dev: variance.sqrt(),
        q1,
        q3,
        iqr: q3 - q1,
    })
}

/// Values outside the 1.5 x IQR fences.
#[must_use]
pub fn iqr_outliers(values: &[f64]) -> Vec<f64> {
    let Some(stats) = describe(values) else {
        return Vec::new();
    };
    let low = stats.q1 - 1.5 * stats.iqr;
    let high = stats.q3 + 1.5 * stats.iqr;
    values
        .iter()
        .copied()
        .filter(|v| *v < low || *v > high)
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Median of an already sorted, non-empty slice.
fn median_of(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Most frequent value in an already sorted slice; ties go to the smaller
/// value, all-unique series have no mode.
fn mode_of(sorted: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        let run = j - i;
        if run > 1 && best.is_none_or(|(_, count)| run > count) {
            best = Some((sorted[i], run));
        }
        i = j;
    }
    best.map(|(value, _)| value)
}

/// Tukey quartiles: medians of the lower and upper halves, excluding the
/// median itself for odd lengths.
fn quartiles(sorted: &[f64]) -> (f64, f64) {
    let n = sorted.len();
    if n == 1 {
        return (sorted[0], sorted[0]);
    }
    let lower = &sorted[..n / 2];
    let upper = if n % 2 == 0 {
        &sorted[n / 2..]
    } else {
        &sorted[n / 2 + 1..]
    };
    (median_of(lower), median_of(upper))
}

/// Direction of a fitted trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    /// Slope above the stability threshold.
    Increasing,
    /// Slope below the negative stability threshold.
    Decreasing,
    /// Slope within the stability threshold.
    Stable,
}

/// Result of a least-squares trend fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Trend {
    /// Ordinary least-squares slope over index-vs-value.
    pub slope: f64,
    /// Classification at the [`TREND_SLOPE_THRESHOLD`].
    pub direction: TrendDirection,
    /// Fit confidence: |Pearson correlation| scaled to percent.
    pub confidence: f64,
}

/// Fit a least-squares line over an index-vs-value series.
///
/// Returns `None` for fewer than two points. A constant series is
/// reported as stable with full confidence.
#[must_use]
pub fn linear_trend(values: &[f64]) -> Option<Trend> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let count = n as f64;
    let mean_x = (count - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / count;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;
    for (i, value) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = value - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }

    let slope = covariance / variance_x;
    let direction = if slope > TREND_SLOPE_THRESHOLD {
        TrendDirection::Increasing
    } else if slope < -TREND_SLOPE_THRESHOLD {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };
    let confidence = if variance_y == 0.0 {
        100.0
    } else {
        (covariance / (variance_x.sqrt() * variance_y.sqrt())).abs() * 100.0
    };

    Some(Trend {
        slope,
        direction,
        confidence,
    })
}

/// Totals for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u8,
    /// Number of entries in the month.
    pub entries: usize,
    /// Total amount spent in the month.
    pub total_spent: f64,
    /// Total quantity in the month.
    pub total_quantity: f64,
    /// Mean efficiency over entries that carry a value.
    pub average_efficiency: Option<f64>,
}

/// Per-month totals over all entries, oldest month first.
#[must_use]
pub fn monthly_breakdown(entries: &[FuelEntry]) -> Vec<MonthlySummary> {
    let mut groups: BTreeMap<(i32, u8), Vec<&FuelEntry>> = BTreeMap::new();
    for entry in entries {
        groups
            .entry((entry.date.year(), u8::from(entry.date.month())))
            .or_default()
            .push(entry);
    }

    groups
        .into_iter()
        .map(|((year, month), rows)| month_summary(year, month, &rows))
        .collect()
}

/// Totals for the last `n` calendar months ending at `through`'s month,
/// oldest first. Months without entries appear with zero totals.
#[must_use]
pub fn last_n_months(entries: &[FuelEntry], n: usize, through: Date) -> Vec<MonthlySummary> {
    let by_month: BTreeMap<(i32, u8), MonthlySummary> = monthly_breakdown(entries)
        .into_iter()
        .map(|summary| ((summary.year, summary.month), summary))
        .collect();

    let mut keys = Vec::with_capacity(n);
    let mut year = through.year();
    let mut month = u8::from(through.month());
    for _ in 0..n {
        keys.push((year, month));
        if month == 1 {
            year -= 1;
            month = 12;
        } else {
            month -= 1;
        }
    }
    keys.reverse();

    keys.into_iter()
        .map(|(year, month)| {
            by_month
                .get(&(year, month))
                .cloned()
                .unwrap_or(MonthlySummary {
                    year,
                    month,
                    entries: 0,
                    total_spent: 0.0,
                    total_quantity: 0.0,
                    average_efficiency: None,
                })
        })
        .collect()
}

fn month_summary(year: i32, month: u8, rows: &[&FuelEntry]) -> MonthlySummary {
    let efficiencies: Vec<f64> = rows.iter().filter_map(|e| e.efficiency).collect();
    MonthlySummary {
        year,
        month,
        entries: rows.len(),
        total_spent: round_currency(rows.iter().map(|e| e.amount).sum()),
        total_quantity: rows.iter().map(|e| e.quantity).sum(),
        average_efficiency: mean(&efficiencies),
    }
}

/// Per-vehicle aggregates for side-by-side comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleComparison {
    /// Vehicle id.
    pub vehicle_id: String,
    /// Vehicle display name.
    pub name: String,
    /// Number of entries for the vehicle.
    pub entries: usize,
    /// Total amount spent.
    pub total_spent: f64,
    /// Total quantity.
    pub total_quantity: f64,
    /// Mean efficiency over entries that carry a value.
    pub average_efficiency: Option<f64>,
    /// Spend divided by odometer distance covered by the entries.
    pub cost_per_mile: Option<f64>,
}

/// Compare vehicles over the given entries. Every vehicle appears, with
/// zero totals when it has no entries in the set.
#[must_use]
pub fn compare_vehicles(vehicles: &[Vehicle], entries: &[FuelEntry]) -> Vec<VehicleComparison> {
    vehicles
        .iter()
        .map(|vehicle| {
            let rows: Vec<&FuelEntry> = entries
                .iter()
                .filter(|e| e.vehicle_id == vehicle.id)
                .collect();
            let total_spent: f64 = rows.iter().map(|e| e.amount).sum();
            let efficiencies: Vec<f64> = rows.iter().filter_map(|e| e.efficiency).collect();

            let distance = match (
                rows.iter().map(|e| e.mileage).min(),
                rows.iter().map(|e| e.mileage).max(),
            ) {
                (Some(min), Some(max)) if max > min => Some(max - min),
                _ => None,
            };

            VehicleComparison {
                vehicle_id: vehicle.id.clone(),
                name: vehicle.name.clone(),
                entries: rows.len(),
                total_spent: round_currency(total_spent),
                total_quantity: rows.iter().map(|e| e.quantity).sum(),
                average_efficiency: mean(&efficiencies),
                cost_per_mile: distance.map(|d| total_spent / f64::from(d)),
            }
        })
        .collect()
}

/// Meteorological season of a calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    /// December through February.
    Winter,
    /// March through May.
    Spring,
    /// June through August.
    Summer,
    /// September through November.
    Autumn,
}

impl Season {
    /// All seasons in display order.
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Autumn];

    /// The season a month falls in.
    #[must_use]
    pub fn of(month: Month) -> Season {
        match month {
            Month::December | Month::January | Month::February => Season::Winter,
            Month::March | Month::April | Month::May => Season::Spring,
            Month::June | Month::July | Month::August => Season::Summer,
            Month::September | Month::October | Month::November => Season::Autumn,
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Season::Winter => write!(f, "Winter"),
            Season::Spring => write!(f, "Spring"),
            Season::Summer => write!(f, "Summer"),
            Season::Autumn => write!(f, "Autumn"),
        }
    }
}

/// Aggregates for one season.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonStats {
    /// The season.
    pub season: Season,
    /// Number of entries.
    pub entries: usize,
    /// Total amount spent.
    pub total_spent: f64,
    /// Mean amount per entry.
    pub average_spent: f64,
    /// Mean efficiency over entries that carry a value.
    pub average_efficiency: Option<f64>,
}

/// Group entries by season. All four seasons appear, in calendar order.
#[must_use]
pub fn seasonal_pattern(entries: &[FuelEntry]) -> Vec<SeasonStats> {
    Season::ALL
        .into_iter()
        .map(|season| {
            let rows: Vec<&FuelEntry> = entries
                .iter()
                .filter(|e| Season::of(e.date.month()) == season)
                .collect();
            let total_spent: f64 = rows.iter().map(|e| e.amount).sum();
            let efficiencies: Vec<f64> = rows.iter().filter_map(|e| e.efficiency).collect();
            SeasonStats {
                season,
                entries: rows.len(),
                total_spent: round_currency(total_spent),
                average_spent: if rows.is_empty() {
                    0.0
                } else {
                    total_spent / rows.len() as f64
                },
                average_efficiency: mean(&efficiencies),
            }
        })
        .collect()
}

/// Aggregates for one weekday.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekdayStats {
    /// The weekday.
    pub weekday: Weekday,
    /// Number of entries.
    pub entries: usize,
    /// Total amount spent.
    pub total_spent: f64,
    /// Mean amount per entry.
    pub average_spent: f64,
}

/// Group entries by weekday. All seven days appear, Monday first.
#[must_use]
pub fn weekday_pattern(entries: &[FuelEntry]) -> Vec<WeekdayStats> {
    const DAYS: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    DAYS.into_iter()
        .map(|weekday| {
            let rows: Vec<&FuelEntry> = entries
                .iter()
                .filter(|e| e.date.weekday() == weekday)
                .collect();
            let total_spent: f64 = rows.iter().map(|e| e.amount).sum();
            WeekdayStats {
                weekday,
                entries: rows.len(),
                total_spent: round_currency(total_spent),
                average_spent: if rows.is_empty() {
                    0.0
                } else {
                    total_spent / rows.len() as f64
                },
            }
        })
        .collect()
}

/// Project next month's spend from the monthly series: the fitted trend
/// extended one step, floored at zero. `None` for fewer than two months.
#[must_use]
pub fn project_next_month(monthly: &[MonthlySummary]) -> Option<f64> {
    if monthly.len() < 2 {
        return None;
    }
    let spend: Vec<f64> = monthly.iter().map(|m| m.total_spent).collect();
    let trend = linear_trend(&spend)?;
    let last = *spend.last()?;
    Some(round_currency((last + trend.slope).max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    use odolog_types::VehicleStatus;

    fn vehicle(id: &str, vehicle_type: VehicleType) -> Vehicle {
        let now = datetime!(2024-01-01 00:00:00 UTC);
        Vehicle {
            id: id.to_string(),
            name: format!("Vehicle {id}"),
            year: 2020,
            make: "Make".to_string(),
            model: "Model".to_string(),
            vehicle_type,
            status: VehicleStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(id: &str, vehicle_id: &str, day: Date, mileage: u32, quantity: f64) -> FuelEntry {
        let now = datetime!(2024-01-01 00:00:00 UTC);
        FuelEntry {
            id: id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            date: day,
            amount: round_currency(quantity * 3.75),
            quantity,
            price_per_unit: 3.75,
            mileage,
            efficiency: None,
            station: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    // --- describe ---

    #[test]
    fn test_describe_basic_scenario() {
        let stats = describe(&[10.0, 20.0, 20.0, 30.0, 40.0]).unwrap();
        assert_eq!(stats.mean, 24.0);
        assert_eq!(stats.median, 20.0);
        assert_eq!(stats.mode, Some(20.0));
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 40.0);
        assert_eq!(stats.variance, 104.0);
        assert_eq!(stats.q1, 15.0);
        assert_eq!(stats.q3, 35.0);
        assert_eq!(stats.iqr, 20.0);
    }

    #[test]
    fn test_describe_empty_is_none() {
        assert!(describe(&[]).is_none());
    }

    #[test]
    fn test_describe_all_unique_has_no_mode() {
        let stats = describe(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(stats.mode, None);
    }

    #[test]
    fn test_describe_even_length_median() {
        let stats = describe(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.q1, 1.5);
        assert_eq!(stats.q3, 3.5);
    }

    #[test]
    fn test_iqr_outliers() {
        let values = [1.0, 10.0, 11.0, 12.0, 13.0, 14.0, 100.0];
        assert_eq!(iqr_outliers(&values), vec![1.0, 100.0]);
        assert!(iqr_outliers(&[10.0, 11.0, 12.0]).is_empty());
    }

    // --- trend ---

    #[test]
    fn test_linear_trend_increasing() {
        let trend = linear_trend(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!((trend.slope - 1.0).abs() < 1e-12);
        assert!((trend.confidence - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_trend_decreasing() {
        let trend = linear_trend(&[5.0, 4.0, 3.0, 2.0, 1.0]).unwrap();
        assert_eq!(trend.direction, TrendDirection::Decreasing);
    }

    #[test]
    fn test_linear_trend_stable_within_threshold() {
        let trend = linear_trend(&[10.0, 10.05, 10.0, 10.08]).unwrap();
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_linear_trend_constant_series() {
        let trend = linear_trend(&[7.0, 7.0, 7.0]).unwrap();
        assert_eq!(trend.slope, 0.0);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.confidence, 100.0);
    }

    #[test]
    fn test_linear_trend_needs_two_points() {
        assert!(linear_trend(&[1.0]).is_none());
    }

    // --- summarize ---

    #[test]
    fn test_summarize() {
        let mut a = entry("a", "v1", date!(2024 - 01 - 01), 1000, 10.0);
        let mut b = entry("b", "v1", date!(2024 - 02 - 01), 1300, 10.0);
        a.efficiency = None;
        b.efficiency = Some(30.0);

        let summary = summarize(&[a, b]);
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.total_spent, 75.0);
        assert_eq!(summary.total_quantity, 20.0);
        assert_eq!(summary.average_price, 3.75);
        assert_eq!(summary.average_efficiency, Some(30.0));
        assert_eq!(summary.best_efficiency, Some(30.0));
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.entries, 0);
        assert_eq!(summary.total_spent, 0.0);
        assert_eq!(summary.average_efficiency, None);
    }

    // --- recompute_all_efficiency ---

    #[test]
    fn test_recompute_fixes_stale_values() {
        let vehicles = [vehicle("v1", VehicleType::Gas)];
        let a = entry("a", "v1", date!(2024 - 01 - 01), 1000, 10.0);
        let mut b = entry("b", "v1", date!(2024 - 02 - 01), 1300, 10.0);
        // Stale: stored as if the prior odometer had been 1100.
        b.efficiency = Some(20.0);

        let changed = recompute_all_efficiency(&[a, b], &vehicles);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].id, "b");
        assert_eq!(changed[0].efficiency, Some(30.0));
    }

    #[test]
    fn test_recompute_is_stable_when_consistent() {
        let vehicles = [vehicle("v1", VehicleType::Gas)];
        let a = entry("a", "v1", date!(2024 - 01 - 01), 1000, 10.0);
        let mut b = entry("b", "v1", date!(2024 - 02 - 01), 1300, 10.0);
        b.efficiency = Some(30.0);

        assert!(recompute_all_efficiency(&[a, b], &vehicles).is_empty());
    }

    #[test]
    fn test_recompute_clears_electric_efficiency() {
        let vehicles = [vehicle("v1", VehicleType::Electric)];
        let a = entry("a", "v1", date!(2024 - 01 - 01), 1000, 50.0);
        let mut b = entry("b", "v1", date!(2024 - 02 - 01), 1300, 50.0);
        // A value that should never have been stored for an electric vehicle.
        b.efficiency = Some(6.0);

        let changed = recompute_all_efficiency(&[a, b], &vehicles);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].efficiency, None);
    }

    #[test]
    fn test_recompute_same_date_entries_have_no_basis() {
        let vehicles = [vehicle("v1", VehicleType::Gas)];
        let mut a = entry("a", "v1", date!(2024 - 01 - 01), 1000, 10.0);
        let mut b = entry("b", "v1", date!(2024 - 01 - 01), 1300, 10.0);
        a.created_at = datetime!(2024-01-01 08:00:00 UTC);
        b.created_at = datetime!(2024-01-01 18:00:00 UTC);
        b.efficiency = Some(30.0);

        // Same-day entries are not "strictly earlier", so B loses its value.
        let changed = recompute_all_efficiency(&[a, b], &vehicles);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].id, "b");
        assert_eq!(changed[0].efficiency, None);
    }

    #[test]
    fn test_recompute_walks_vehicles_independently() {
        let vehicles = [
            vehicle("v1", VehicleType::Gas),
            vehicle("v2", VehicleType::Gas),
        ];
        let entries = [
            entry("a1", "v1", date!(2024 - 01 - 01), 1000, 10.0),
            entry("b1", "v2", date!(2024 - 01 - 15), 500, 10.0),
            entry("a2", "v1", date!(2024 - 02 - 01), 1300, 10.0),
            entry("b2", "v2", date!(2024 - 02 - 15), 800, 10.0),
        ];

        let changed = recompute_all_efficiency(&entries, &vehicles);
        // a2 and b2 each get an efficiency against their own vehicle's prior.
        assert_eq!(changed.len(), 2);
        assert!(changed.iter().all(|e| e.efficiency == Some(30.0)));
    }

    // --- monthly ---

    #[test]
    fn test_monthly_breakdown_groups_chronologically() {
        let entries = [
            entry("a", "v1", date!(2024 - 02 - 10), 1300, 10.0),
            entry("b", "v1", date!(2024 - 01 - 05), 1000, 10.0),
            entry("c", "v1", date!(2024 - 01 - 20), 1150, 4.0),
        ];

        let months = monthly_breakdown(&entries);
        assert_eq!(months.len(), 2);
        assert_eq!((months[0].year, months[0].month), (2024, 1));
        assert_eq!(months[0].entries, 2);
        assert_eq!(months[0].total_spent, round_currency(14.0 * 3.75));
        assert_eq!((months[1].year, months[1].month), (2024, 2));
    }

    #[test]
    fn test_last_n_months_fills_gaps_and_crosses_years() {
        let entries = [entry("a", "v1", date!(2023 - 12 - 10), 1000, 10.0)];

        let months = last_n_months(&entries, 3, date!(2024 - 01 - 15));
        assert_eq!(months.len(), 3);
        assert_eq!((months[0].year, months[0].month), (2023, 11));
        assert_eq!(months[0].entries, 0);
        assert_eq!((months[1].year, months[1].month), (2023, 12));
        assert_eq!(months[1].entries, 1);
        assert_eq!((months[2].year, months[2].month), (2024, 1));
        assert_eq!(months[2].total_spent, 0.0);
    }

    // --- comparison / patterns / projection ---

    #[test]
    fn test_compare_vehicles() {
        let vehicles = [
            vehicle("v1", VehicleType::Gas),
            vehicle("v2", VehicleType::Gas),
        ];
        let mut a = entry("a", "v1", date!(2024 - 01 - 01), 1000, 10.0);
        let mut b = entry("b", "v1", date!(2024 - 02 - 01), 1300, 10.0);
        a.efficiency = None;
        b.efficiency = Some(30.0);

        let comparisons = compare_vehicles(&vehicles, &[a, b]);
        assert_eq!(comparisons.len(), 2);

        let v1 = &comparisons[0];
        assert_eq!(v1.entries, 2);
        assert_eq!(v1.total_spent, 75.0);
        assert_eq!(v1.average_efficiency, Some(30.0));
        // 75.0 spent over 300 miles.
        assert_eq!(v1.cost_per_mile, Some(0.25));

        let v2 = &comparisons[1];
        assert_eq!(v2.entries, 0);
        assert_eq!(v2.cost_per_mile, None);
    }

    #[test]
    fn test_seasonal_pattern_covers_all_seasons() {
        let entries = [
            entry("a", "v1", date!(2024 - 01 - 10), 1000, 10.0),
            entry("b", "v1", date!(2024 - 07 - 10), 1300, 10.0),
            entry("c", "v1", date!(2024 - 12 - 10), 1600, 10.0),
        ];

        let seasons = seasonal_pattern(&entries);
        assert_eq!(seasons.len(), 4);
        assert_eq!(seasons[0].season, Season::Winter);
        // January and December both land in winter.
        assert_eq!(seasons[0].entries, 2);
        assert_eq!(seasons[2].season, Season::Summer);
        assert_eq!(seasons[2].entries, 1);
        assert_eq!(seasons[1].entries, 0);
        assert_eq!(seasons[1].average_spent, 0.0);
    }

    #[test]
    fn test_weekday_pattern() {
        // 2024-06-03 is a Monday.
        let entries = [
            entry("a", "v1", date!(2024 - 06 - 03), 1000, 10.0),
            entry("b", "v1", date!(2024 - 06 - 10), 1300, 10.0),
            entry("c", "v1", date!(2024 - 06 - 08), 1200, 4.0),
        ];

        let days = weekday_pattern(&entries);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].weekday, Weekday::Monday);
        assert_eq!(days[0].entries, 2);
        assert_eq!(days[5].weekday, Weekday::Saturday);
        assert_eq!(days[5].entries, 1);
        assert_eq!(days[6].entries, 0);
    }

    #[test]
    fn test_project_next_month_extends_trend() {
        let months: Vec<MonthlySummary> = [100.0, 110.0, 120.0]
            .iter()
            .enumerate()
            .map(|(i, spend)| MonthlySummary {
                year: 2024,
                month: i as u8 + 1,
                entries: 1,
                total_spent: *spend,
                total_quantity: 10.0,
                average_efficiency: None,
            })
            .collect();

        assert_eq!(project_next_month(&months), Some(130.0));
        assert_eq!(project_next_month(&months[..1]), None);
    }
}
