//! Market data abstractions and core types

use crate::core::series::{DateRange, Observation, TimeSeries};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl PriceField {
    pub const OHLCV: [PriceField; 5] = [
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
        PriceField::Volume,
    ];
}

impl Display for PriceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                PriceField::Open => "Open",
                PriceField::High => "High",
                PriceField::Low => "Low",
                PriceField::Close => "Close",
                PriceField::AdjClose => "Adj Close",
                PriceField::Volume => "Volume",
            }
        )
    }
}

/// Daily price fields indexed by trading session.
///
/// A column may be missing altogether, and single cells may be `None`
/// when the source has no value for that session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    timestamps: Vec<DateTime<Utc>>,
    columns: BTreeMap<PriceField, Vec<Option<f64>>>,
}

impl PriceTable {
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Self {
        Self {
            timestamps,
            columns: BTreeMap::new(),
        }
    }

    /// Adds a column, padding or truncating it to the number of sessions.
    pub fn with_column(mut self, field: PriceField, mut values: Vec<Option<f64>>) -> Self {
        values.resize(self.timestamps.len(), None);
        self.columns.insert(field, values);
        self
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn has_field(&self, field: PriceField) -> bool {
        self.columns.contains_key(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = PriceField> + '_ {
        self.columns.keys().copied()
    }

    pub fn cell(&self, row: usize, field: PriceField) -> Option<f64> {
        self.columns.get(&field).and_then(|c| c.get(row).copied().flatten())
    }

    /// The non-null values of a column as a series, `None` if the column is absent.
    pub fn column(&self, field: PriceField) -> Option<TimeSeries> {
        let values = self.columns.get(&field)?;
        Some(
            self.timestamps
                .iter()
                .zip(values)
                .filter_map(|(ts, v)| v.map(|v| Observation::new(*ts, v)))
                .collect(),
        )
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.timestamps.last().map(|ts| ts.date_naive())
    }
}

/// Everything fetched for one ticker over one date range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub ticker: String,
    pub currency: Option<String>,
    pub prices: PriceTable,
    /// Dividend amounts indexed by ex-dividend date.
    pub dividends: TimeSeries,
}

impl MarketData {
    pub fn empty(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty() && self.dividends.is_empty()
    }
}

/// Whether the most recent session in `prices` is `today`.
pub fn is_current(prices: &PriceTable, today: NaiveDate) -> bool {
    prices.last_date() == Some(today)
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily prices and dividends for `ticker` within `range`.
    ///
    /// A range without sessions yields empty data rather than an error.
    async fn fetch_history(&self, ticker: &str, range: &DateRange) -> Result<MarketData>;
}

/// Normalizes a user supplied ticker symbol.
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}
