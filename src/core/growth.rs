//! Compound annual growth rate over a time series.
use crate::core::market::PriceField;
use crate::core::series::TimeSeries;
use rust_decimal::{Decimal, prelude::*};
use rust_finprim::rate::cagr;
use std::fmt::Display;
use thiserror::Error;
use tracing::debug;

/// Average calendar days per year, accounting for leap years.
pub const DAYS_PER_YEAR: f64 = 365.25;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Largest natural log of a ratio or annualized ratio that fits in a `Decimal`
/// (`ln(Decimal::MAX)` is about 66.5).
const MAX_DECIMAL_LN: f64 = 60.0;

/// Reason a growth rate could not be produced for a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Undefined {
    #[error("No data available for the requested range")]
    NoData,
    #[error("Price data has no {0} field")]
    MissingField(PriceField),
    #[error("No dividends paid in the requested range")]
    NoDividends,
    #[error("Not enough data: need at least 2 observations, got {got}")]
    InsufficientObservations { got: usize },
    #[error("First and last observations share the same date")]
    DegenerateInterval,
    #[error("Starting value is zero or negative")]
    NonPositiveBase,
    #[error("Growth rate is not a finite number")]
    NonFinite,
}

impl Undefined {
    /// Whether this outcome indicates a problem with the data rather than
    /// a normal absence (an instrument that pays no dividend, an empty range).
    pub fn is_fault(&self) -> bool {
        !matches!(self, Undefined::NoDividends | Undefined::NoData)
    }
}

/// Annualized growth between the first and last observation of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrowthRate {
    /// Fraction per year, `0.15` is 15%/year.
    Rate(f64),
    Undefined(Undefined),
}

impl GrowthRate {
    pub fn rate(&self) -> Option<f64> {
        match self {
            GrowthRate::Rate(r) => Some(*r),
            GrowthRate::Undefined(_) => None,
        }
    }

    pub fn percentage(&self) -> Option<f64> {
        self.rate().map(|r| r * 100.0)
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, GrowthRate::Rate(_))
    }
}

impl From<Undefined> for GrowthRate {
    fn from(reason: Undefined) -> Self {
        GrowthRate::Undefined(reason)
    }
}

impl Display for GrowthRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrowthRate::Rate(r) => write!(f, "{:.2}%", r * 100.0),
            GrowthRate::Undefined(reason) => write!(f, "N/A ({reason})"),
        }
    }
}

/// Computes `(last / first) ^ (1 / years) - 1` where `years` is the elapsed
/// time between the first and last observation divided by [`DAYS_PER_YEAR`].
///
/// Only the first and last observations are read. The power is taken in
/// `Decimal` through `rust_finprim`. Every input that would produce NaN,
/// infinity or a `Decimal` overflow yields [`GrowthRate::Undefined`] instead.
pub fn compound_annual_growth_rate(series: &TimeSeries) -> GrowthRate {
    let (first, last) = match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() >= 2 => (first, last),
        _ => {
            return Undefined::InsufficientObservations { got: series.len() }.into();
        }
    };

    let elapsed = last.timestamp - first.timestamp;
    let days = elapsed.num_seconds() as f64 / SECONDS_PER_DAY;
    let years = days / DAYS_PER_YEAR;
    if years <= 0.0 {
        return Undefined::DegenerateInterval.into();
    }

    if first.value <= 0.0 || first.value.is_nan() {
        return Undefined::NonPositiveBase.into();
    }

    // A negative (or NaN) end value has no real root
    if last.value < 0.0 || last.value.is_nan() {
        return Undefined::NonFinite.into();
    }

    // Ratios whose power would overflow Decimal
    if last.value > 0.0 {
        let ln_ratio = (last.value / first.value).ln();
        if !ln_ratio.is_finite()
            || ln_ratio.abs() > MAX_DECIMAL_LN
            || (ln_ratio / years).abs() > MAX_DECIMAL_LN
        {
            return Undefined::NonFinite.into();
        }
    }

    let (Some(begin_bal), Some(end_bal), Some(n_years)) = (
        Decimal::from_f64(first.value),
        Decimal::from_f64(last.value),
        Decimal::from_f64(years),
    ) else {
        return Undefined::NonFinite.into();
    };

    if n_years.is_zero() {
        return Undefined::DegenerateInterval.into();
    }
    if begin_bal.is_zero() {
        return Undefined::NonFinite.into();
    }

    let rate = cagr(begin_bal, end_bal, n_years);
    debug!("cagr: {begin_bal}, {end_bal}, {n_years} = {rate}");

    match rate.to_f64() {
        Some(rate) if rate.is_finite() => GrowthRate::Rate(rate),
        _ => Undefined::NonFinite.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::Observation;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap()
    }

    /// Two-point series whose observations are `days` apart.
    fn span(first: f64, last: f64, days: f64) -> TimeSeries {
        let seconds = (days * SECONDS_PER_DAY) as i64;
        TimeSeries::new(vec![
            Observation::new(start(), first),
            Observation::new(start() + Duration::seconds(seconds), last),
        ])
    }

    #[test]
    fn ten_percent_over_one_year() {
        let rate = compound_annual_growth_rate(&span(100.0, 110.0, DAYS_PER_YEAR));
        assert!((rate.rate().unwrap() - 0.10).abs() < 1e-9);
    }

    #[test]
    fn doubling_per_year_over_two_years() {
        let rate = compound_annual_growth_rate(&span(100.0, 400.0, 2.0 * DAYS_PER_YEAR));
        assert!((rate.rate().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn flat_series_has_zero_growth() {
        for days in [1.0, 30.0, 400.0, 3650.0] {
            let rate = compound_annual_growth_rate(&span(100.0, 100.0, days));
            assert!(rate.rate().unwrap().abs() < 1e-12, "days = {days}");
        }
    }

    #[test]
    fn uses_only_first_and_last_observation() {
        let series = TimeSeries::new(vec![
            Observation::new(start(), 100.0),
            Observation::new(start() + Duration::days(100), 5.0),
            Observation::new(start() + Duration::days(200), 900.0),
            Observation::new(start() + Duration::seconds(31_557_600), 110.0),
        ]);
        let rate = compound_annual_growth_rate(&series);
        assert!((rate.rate().unwrap() - 0.10).abs() < 1e-9);
    }

    #[test]
    fn fewer_than_two_observations_is_undefined() {
        assert_eq!(
            compound_annual_growth_rate(&TimeSeries::default()),
            GrowthRate::Undefined(Undefined::InsufficientObservations { got: 0 })
        );

        let single = TimeSeries::new(vec![Observation::new(start(), 42.0)]);
        assert_eq!(
            compound_annual_growth_rate(&single),
            GrowthRate::Undefined(Undefined::InsufficientObservations { got: 1 })
        );
    }

    #[test]
    fn same_timestamp_is_undefined() {
        let series = TimeSeries::new(vec![
            Observation::new(start(), 100.0),
            Observation::new(start(), 120.0),
        ]);
        assert_eq!(
            compound_annual_growth_rate(&series),
            GrowthRate::Undefined(Undefined::DegenerateInterval)
        );
    }

    #[test]
    fn non_positive_base_is_undefined() {
        for base in [0.0, -5.0] {
            assert_eq!(
                compound_annual_growth_rate(&span(base, 110.0, DAYS_PER_YEAR)),
                GrowthRate::Undefined(Undefined::NonPositiveBase)
            );
        }
    }

    #[test]
    fn negative_end_value_is_not_finite() {
        assert_eq!(
            compound_annual_growth_rate(&span(100.0, -10.0, 100.0)),
            GrowthRate::Undefined(Undefined::NonFinite)
        );
    }

    #[test]
    fn explosive_growth_over_short_span_is_not_finite() {
        // 2x in one day annualizes to 2^365.25, well beyond Decimal range
        assert_eq!(
            compound_annual_growth_rate(&span(100.0, 200.0, 1.0)),
            GrowthRate::Undefined(Undefined::NonFinite)
        );
        assert_eq!(
            compound_annual_growth_rate(&span(1e-20, 1e20, DAYS_PER_YEAR)),
            GrowthRate::Undefined(Undefined::NonFinite)
        );
    }

    #[test]
    fn non_finite_end_value_is_not_finite() {
        for last in [f64::NAN, f64::INFINITY] {
            assert_eq!(
                compound_annual_growth_rate(&span(100.0, last, DAYS_PER_YEAR)),
                GrowthRate::Undefined(Undefined::NonFinite)
            );
        }
    }

    #[test]
    fn matches_closed_form_within_tolerance() {
        // (first, last, days)
        let cases: [(f64, f64, f64); 4] = [
            (100.0, 110.0, DAYS_PER_YEAR),
            (100.0, 50.0, 5.0 * DAYS_PER_YEAR),
            (37.21, 91.07, 1234.5),
            (0.42, 0.61, 730.0),
        ];
        for (first, last, days) in cases {
            let expected = (last / first).powf(DAYS_PER_YEAR / days) - 1.0;
            let rate = compound_annual_growth_rate(&span(first, last, days));
            assert!(
                (rate.rate().unwrap() - expected).abs() < 1e-9,
                "{first} -> {last} over {days} days: {rate:?} vs {expected}"
            );
        }
    }

    #[test]
    fn total_loss_is_minus_one() {
        let rate = compound_annual_growth_rate(&span(100.0, 0.0, DAYS_PER_YEAR));
        assert_eq!(rate, GrowthRate::Rate(-1.0));
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let series = span(37.21, 91.07, 1234.5);
        let a = compound_annual_growth_rate(&series).rate().unwrap();
        let b = compound_annual_growth_rate(&series).rate().unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn display_formats_percentage_or_reason() {
        assert_eq!(GrowthRate::Rate(0.1234).to_string(), "12.34%");
        assert_eq!(
            GrowthRate::Undefined(Undefined::NoDividends).to_string(),
            "N/A (No dividends paid in the requested range)"
        );
        assert!(!Undefined::NoDividends.is_fault());
        assert!(Undefined::NonPositiveBase.is_fault());
    }
}
