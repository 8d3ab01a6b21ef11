//! Growth rates for fetched instruments.
use crate::core::growth::{GrowthRate, Undefined, compound_annual_growth_rate};
use crate::core::market::{MarketData, MarketDataProvider, PriceField, normalize_ticker};
use crate::core::series::DateRange;
use anyhow::Result;
use futures::future::join_all;
use tracing::debug;

/// Outcome of processing a single ticker.
#[derive(Debug)]
pub struct InstrumentReport {
    pub ticker: String,
    pub data: Result<MarketData>,
    pub price_growth: GrowthRate,
    pub dividend_growth: GrowthRate,
}

impl InstrumentReport {
    /// Builds the report for `ticker` from the result of fetching its history.
    ///
    /// A failed fetch is reported as missing data for both series; it never
    /// propagates beyond this instrument.
    pub fn from_fetch(ticker: &str, data: Result<MarketData>) -> Self {
        let (price_growth, dividend_growth) = match &data {
            Ok(data) => (price_growth(data), dividend_growth(data)),
            Err(e) => {
                debug!("Fetch failed for {ticker}: {e}");
                (Undefined::NoData.into(), Undefined::NoData.into())
            }
        };

        InstrumentReport {
            ticker: ticker.to_string(),
            data,
            price_growth,
            dividend_growth,
        }
    }

    pub fn error(&self) -> Option<String> {
        self.data.as_ref().err().map(|e| e.to_string())
    }
}

/// Fetches every ticker concurrently and builds one report per distinct ticker,
/// in the order given. Progress updates are reported via `update_callback`.
pub async fn analyze_tickers(
    provider: &dyn MarketDataProvider,
    tickers: &[String],
    range: &DateRange,
    update_callback: &(dyn Fn() + Sync),
) -> Vec<InstrumentReport> {
    // Step 1: Normalize and de-duplicate, keeping first-seen order
    let mut unique: Vec<String> = Vec::new();
    for ticker in tickers.iter().map(|t| normalize_ticker(t)) {
        if !ticker.is_empty() && !unique.contains(&ticker) {
            unique.push(ticker);
        }
    }

    // Step 2: Fetch all histories concurrently; a failed fetch stays in its own report
    let futures = unique.into_iter().map(|ticker| async move {
        let data = provider.fetch_history(&ticker, range).await;
        update_callback();
        InstrumentReport::from_fetch(&ticker, data)
    });

    join_all(futures).await
}

/// CAGR of the closing price.
pub fn price_growth(data: &MarketData) -> GrowthRate {
    if data.prices.is_empty() {
        return Undefined::NoData.into();
    }

    match data.prices.column(PriceField::Close) {
        Some(closes) => {
            let growth = compound_annual_growth_rate(&closes);
            debug!(ticker = %data.ticker, observations = closes.len(), ?growth, "price growth");
            growth
        }
        None => Undefined::MissingField(PriceField::Close).into(),
    }
}

/// CAGR of the dividend payments.
pub fn dividend_growth(data: &MarketData) -> GrowthRate {
    if data.dividends.is_empty() {
        return Undefined::NoDividends.into();
    }

    let growth = compound_annual_growth_rate(&data.dividends);
    debug!(ticker = %data.ticker, payments = data.dividends.len(), ?growth, "dividend growth");
    growth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::growth::DAYS_PER_YEAR;
    use crate::core::market::PriceTable;
    use crate::core::series::{Observation, TimeSeries};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap()
    }

    fn one_year_later() -> DateTime<Utc> {
        t0() + Duration::seconds((DAYS_PER_YEAR * 86_400.0) as i64)
    }

    fn prices(close: Option<Vec<Option<f64>>>) -> PriceTable {
        let table = PriceTable::new(vec![t0(), one_year_later()])
            .with_column(PriceField::Open, vec![Some(99.0), Some(109.0)]);
        match close {
            Some(values) => table.with_column(PriceField::Close, values),
            None => table,
        }
    }

    fn dividends(values: &[f64]) -> TimeSeries {
        let stamps = [t0(), one_year_later()];
        stamps
            .iter()
            .zip(values)
            .map(|(ts, v)| Observation::new(*ts, *v))
            .collect()
    }

    fn data(prices: PriceTable, dividends: TimeSeries) -> MarketData {
        MarketData {
            ticker: "TEST".to_string(),
            currency: Some("USD".to_string()),
            prices,
            dividends,
        }
    }

    #[test]
    fn prices_without_dividends() {
        let report = InstrumentReport::from_fetch(
            "TEST",
            Ok(data(
                prices(Some(vec![Some(100.0), Some(110.0)])),
                TimeSeries::default(),
            )),
        );

        assert!((report.price_growth.rate().unwrap() - 0.10).abs() < 1e-9);
        assert_eq!(
            report.dividend_growth,
            GrowthRate::Undefined(Undefined::NoDividends)
        );
        assert!(report.error().is_none());
    }

    #[test]
    fn missing_close_does_not_block_dividends() {
        let report = InstrumentReport::from_fetch(
            "TEST",
            Ok(data(prices(None), dividends(&[0.5, 0.55]))),
        );

        assert_eq!(
            report.price_growth,
            GrowthRate::Undefined(Undefined::MissingField(PriceField::Close))
        );
        assert!((report.dividend_growth.rate().unwrap() - 0.10).abs() < 1e-9);
    }

    #[test]
    fn bad_dividends_do_not_block_prices() {
        let report = InstrumentReport::from_fetch(
            "TEST",
            Ok(data(
                prices(Some(vec![Some(100.0), Some(110.0)])),
                dividends(&[0.0, 0.55]),
            )),
        );

        assert!(report.price_growth.is_defined());
        assert_eq!(
            report.dividend_growth,
            GrowthRate::Undefined(Undefined::NonPositiveBase)
        );
    }

    #[test]
    fn single_close_is_insufficient() {
        let growth = price_growth(&data(
            prices(Some(vec![None, Some(110.0)])),
            TimeSeries::default(),
        ));
        assert_eq!(
            growth,
            GrowthRate::Undefined(Undefined::InsufficientObservations { got: 1 })
        );
    }

    #[test]
    fn empty_fetch_is_no_data() {
        let report = InstrumentReport::from_fetch("TEST", Ok(MarketData::empty("TEST")));
        assert_eq!(report.price_growth, GrowthRate::Undefined(Undefined::NoData));
        assert_eq!(
            report.dividend_growth,
            GrowthRate::Undefined(Undefined::NoDividends)
        );
    }

    #[test]
    fn failed_fetch_is_no_data_for_both() {
        let report = InstrumentReport::from_fetch("TEST", Err(anyhow!("API unavailable")));
        assert_eq!(report.price_growth, GrowthRate::Undefined(Undefined::NoData));
        assert_eq!(report.dividend_growth, GrowthRate::Undefined(Undefined::NoData));
        assert_eq!(report.error().as_deref(), Some("API unavailable"));
    }

    struct MockProvider;

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        async fn fetch_history(&self, ticker: &str, _range: &DateRange) -> Result<MarketData> {
            match ticker {
                "GOOD" => Ok(data(
                    prices(Some(vec![Some(100.0), Some(110.0)])),
                    dividends(&[1.0, 1.1]),
                )),
                "EMPTY" => Ok(MarketData::empty(ticker)),
                _ => Err(anyhow!("Request error for symbol: {ticker}")),
            }
        }
    }

    #[tokio::test]
    async fn test_analyze_tickers_isolates_failures() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(),
        );
        let tickers: Vec<String> = ["bad", "good", "GOOD", "empty", " "]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let updates = AtomicUsize::new(0);

        let reports = analyze_tickers(&MockProvider, &tickers, &range, &|| {
            updates.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(updates.load(Ordering::SeqCst), 3);
        let names: Vec<&str> = reports.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(names, vec!["BAD", "GOOD", "EMPTY"]);

        assert!(reports[0].error().is_some());
        assert_eq!(reports[0].price_growth, GrowthRate::Undefined(Undefined::NoData));

        assert!((reports[1].price_growth.rate().unwrap() - 0.10).abs() < 1e-9);
        assert!((reports[1].dividend_growth.rate().unwrap() - 0.10).abs() < 1e-9);

        assert!(reports[2].error().is_none());
        assert_eq!(reports[2].price_growth, GrowthRate::Undefined(Undefined::NoData));
    }
}
