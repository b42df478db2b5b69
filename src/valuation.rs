//! Deterministic resale price estimation
//!
//! Prices come from the static catalog tables; the only inputs are make,
//! model, year and mileage. Ages are measured against [`REFERENCE_YEAR`], the
//! year the market data describes, never against the wall clock.


use crate::catalog::Catalog;
use serde::Serialize;

/// Year the price tables are valid for
pub const REFERENCE_YEAR: u16 = 2025;

/// Oldest model year accepted
pub const MIN_YEAR: u16 = 2000;

/// Newest model year accepted
pub const MAX_YEAR: u16 = REFERENCE_YEAR;

/// Mileage a car is expected to gain per year of age
pub const EXPECTED_KM_PER_YEAR: i64 = 15_000;

/// Cars from this year or earlier are depreciated; newer ones are priced as-is
const DEPRECIATION_CUTOFF_YEAR: u16 = 2018;

const YOUNG_CAR_MAX_AGE: i32 = 3;
const BASE_DEPRECIATION: f64 = 0.8;
const YEARLY_DEPRECIATION: f64 = 0.90;

/// Breakdown of a single estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Valuation {
    pub make: String,
    pub model: String,
    pub year: u16,
    pub mileage: u64,
    pub base_price: u32,
    pub depreciation_factor: f64,
    pub expected_mileage: i64,
    pub excess_km: u64,
    pub rate_per_km: f64,
    pub deduction: f64,
    pub floor_price: u32,
    /// Final price in USD, never below `floor_price`
    pub price: u32,
}

/// Estimate the resale price in USD
pub fn estimate(catalog: &Catalog, make: &str, model: &str, year: u16, mileage: u64) -> u32 {
    appraise(catalog, make, model, year, mileage).price
}

/// Estimate the resale price and keep every intermediate value
pub fn appraise(catalog: &Catalog, make: &str, model: &str, year: u16, mileage: u64) -> Valuation {
    let base_price = catalog.base_price(make, model);
    let floor_price = catalog.floor_price(make, model);

    let depreciation_factor = depreciation_factor(year);
    let base = f64::from(base_price) * depreciation_factor;

    let expected_mileage = (i64::from(REFERENCE_YEAR) - i64::from(year)) * EXPECTED_KM_PER_YEAR;
    let excess_km = excess_mileage(mileage, expected_mileage);

    let rate_per_km = mileage_rate(make, model);
    // Precision loss only past 2^53 km, where the floor applies anyway
    #[allow(clippy::cast_precision_loss)]
    let deduction = excess_km as f64 * rate_per_km;

    // Truncates toward zero and saturates, matching integer conversion of the
    // market formula.
    #[allow(clippy::cast_possible_truncation)]
    let truncated = (base - deduction) as i64;
    let price = u32::try_from(truncated.max(i64::from(floor_price))).unwrap_or(u32::MAX);

    Valuation {
        make: make.to_string(),
        model: model.to_string(),
        year,
        mileage,
        base_price,
        depreciation_factor,
        expected_mileage,
        excess_km,
        rate_per_km,
        deduction,
        floor_price,
        price,
    }
}

/// Kilometres driven beyond the expected mileage, zero when under it
fn excess_mileage(mileage: u64, expected_mileage: i64) -> u64 {
    match u64::try_from(expected_mileage) {
        Ok(expected) => mileage.saturating_sub(expected),
        // A model year past the reference year expects negative mileage
        Err(_) => mileage.saturating_add(expected_mileage.unsigned_abs()),
    }
}

/// Multiplier applied to the base price for a model year
pub fn depreciation_factor(year: u16) -> f64 {
    if year > DEPRECIATION_CUTOFF_YEAR {
        return 1.0;
    }

    let age = i32::from(REFERENCE_YEAR) - i32::from(year);
    if age <= YOUNG_CAR_MAX_AGE {
        BASE_DEPRECIATION
    } else {
        BASE_DEPRECIATION * YEARLY_DEPRECIATION.powf(f64::from(age - YOUNG_CAR_MAX_AGE))
    }
}

/// Deduction in USD per kilometre above the expected mileage
pub fn mileage_rate(make: &str, model: &str) -> f64 {
    match (make, model) {
        ("Chevrolet", "Cobalt") => 0.015,
        ("Toyota" | "Honda", _) => 0.02,
        _ => 0.018,
    }
}
