//! Time-indexed value series and date ranges

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A single (timestamp, value) pair: a close price, a volume or a dividend amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Observations ordered by timestamp.
///
/// Construction sorts the input (stable), so `first()` and `last()` are always
/// the earliest and latest observations. Entries sharing a timestamp are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    observations: Vec<Observation>,
}

impl TimeSeries {
    pub fn new(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first(&self) -> Option<&Observation> {
        self.observations.first()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Observation> + ExactSizeIterator {
        self.observations.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.observations.iter().map(|o| o.value)
    }

    pub fn sum(&self) -> f64 {
        self.values().sum()
    }
}

impl FromIterator<Observation> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Calendar date range requested from a market data source.
///
/// `end >= start` is expected but not enforced. Providers treat `end` as
/// exclusive, so `yesterday..today` covers yesterday's session only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Range covering the `days` calendar days before `end`.
    ///
    /// A lookback reaching past the earliest representable date starts at
    /// [`NaiveDate::MIN`].
    pub fn trailing(end: NaiveDate, days: i64) -> Self {
        let start = TimeDelta::try_days(days)
            .and_then(|lookback| end.checked_sub_signed(lookback))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// Whether the range reaches `today`, i.e. may still change during the session.
    pub fn includes(&self, today: NaiveDate) -> bool {
        self.end >= today
    }

    pub fn start_timestamp(&self) -> i64 {
        midnight_utc(self.start)
    }

    pub fn end_timestamp(&self) -> i64 {
        midnight_utc(self.end)
    }
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}
