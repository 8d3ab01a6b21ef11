use crate::core::market::{MarketData, MarketDataProvider, PriceField, PriceTable, normalize_ticker};
use crate::core::series::{DateRange, Observation, TimeSeries};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Error code reported by the chart API for unknown symbols and empty ranges.
const NOT_FOUND_CODE: &str = "Not Found";

pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("stockdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    events: Option<ChartEvents>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    currency: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChartEvents {
    dividends: Option<HashMap<String, DividendEvent>>,
}

#[derive(Deserialize, Debug)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct AdjClose {
    adjclose: Option<Vec<Option<f64>>>,
}

fn to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}

/// Builds the price table from the sessions whose timestamp converts. Columns
/// are picked by the same row indices so every cell stays on its session.
fn extract_prices(item: &ChartItem) -> PriceTable {
    let rows: Vec<(usize, DateTime<Utc>)> = item
        .timestamp
        .as_deref()
        .unwrap_or_default()
        .iter()
        .enumerate()
        .filter_map(|(row, ts)| to_datetime(*ts).map(|dt| (row, dt)))
        .collect();
    let skipped = item.timestamp.as_ref().map_or(0, Vec::len) - rows.len();
    if skipped > 0 {
        warn!(skipped, "Dropping sessions with out-of-range timestamps");
    }

    let aligned = |values: &[Option<f64>]| -> Vec<Option<f64>> {
        rows.iter()
            .map(|(row, _)| values.get(*row).copied().flatten())
            .collect()
    };

    let mut table = PriceTable::new(rows.iter().map(|(_, dt)| *dt).collect());

    let Some(indicators) = item.indicators.as_ref() else {
        return table;
    };

    if let Some(quote) = indicators.quote.first() {
        for (field, values) in [
            (PriceField::Open, &quote.open),
            (PriceField::High, &quote.high),
            (PriceField::Low, &quote.low),
            (PriceField::Close, &quote.close),
            (PriceField::Volume, &quote.volume),
        ] {
            if let Some(values) = values {
                table = table.with_column(field, aligned(values));
            }
        }
    }

    if let Some(adjclose) = indicators
        .adjclose
        .as_ref()
        .and_then(|a| a.first())
        .and_then(|a| a.adjclose.as_deref())
    {
        table = table.with_column(PriceField::AdjClose, aligned(adjclose));
    }

    table
}

fn extract_dividends(item: &ChartItem) -> TimeSeries {
    item.events
        .as_ref()
        .and_then(|e| e.dividends.as_ref())
        .map(|dividends| {
            dividends
                .values()
                .filter_map(|d| to_datetime(d.date).map(|ts| Observation::new(ts, d.amount)))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooHistoryFetch",
        skip(self),
        fields(ticker = %ticker)
    )]
    async fn fetch_history(&self, ticker: &str, range: &DateRange) -> Result<MarketData> {
        let symbol = normalize_ticker(ticker);
        // Step 1: Request daily sessions and dividend events for the range
        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=div",
            self.base_url,
            symbol,
            range.start_timestamp(),
            range.end_timestamp()
        );
        debug!("Requesting history from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;

        let status = response.status();
        debug!(%status, "Received Yahoo response");
        let text = response.text().await?;

        // Step 2: A chart error in the body wins over the HTTP status
        let parsed = serde_json::from_str::<YahooChartResponse>(&text);
        if let Ok(YahooChartResponse {
            chart:
                ChartResult {
                    error: Some(error), ..
                },
        }) = &parsed
        {
            if error.code == NOT_FOUND_CODE {
                debug!("No data for {symbol}: {}", error.description);
                return Ok(MarketData::empty(&symbol));
            }
            return Err(anyhow!(
                "API error [{}]: {} for symbol: {}",
                error.code,
                error.description,
                symbol
            ));
        }

        if !status.is_success() {
            return Err(anyhow!("HTTP error: {} for symbol: {}", status, symbol));
        }

        // Step 3: Parse the first chart result into prices and dividends
        let data = parsed
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;
        let Some(item) = data.chart.result.as_ref().and_then(|r| r.first()) else {
            debug!("Empty chart result for {symbol}");
            return Ok(MarketData::empty(&symbol));
        };

        let result = MarketData {
            ticker: symbol,
            currency: item.meta.as_ref().and_then(|m| m.currency.clone()),
            prices: extract_prices(item),
            dividends: extract_dividends(item),
        };
        debug!(
            sessions = result.prices.len(),
            dividends = result.dividends.len(),
            "Parsed history"
        );
        Ok(result)
    }
}
