pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::history::HistoryOptions;
use crate::core::config::AppConfig;
use crate::core::market::MarketData;
use crate::core::series::DateRange;
use crate::providers::{CachingMarketDataProvider, FetchKey, MemoryCache};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Arguments of the `history` command; unset values come from the config.
#[derive(Debug, Clone, Default)]
pub struct HistoryArgs {
    pub tickers: Vec<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub rows: usize,
    pub hide_table: bool,
    pub hide_dividends: bool,
}

pub enum AppCommand {
    History(HistoryArgs),
    Quote { ticker: Option<String> },
}

impl HistoryArgs {
    fn into_options(self, config: &AppConfig, today: NaiveDate) -> HistoryOptions {
        let end = self.end.unwrap_or(today);
        let start = self
            .start
            .unwrap_or_else(|| DateRange::trailing(end, config.defaults.lookback_days).start);
        let tickers = if self.tickers.is_empty() {
            config.defaults.tickers.clone()
        } else {
            self.tickers
        };

        HistoryOptions {
            tickers,
            range: DateRange::new(start, end),
            rows: self.rows,
            show_table: !self.hide_table,
            show_dividends: !self.hide_dividends,
        }
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Stockdash starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let yahoo = providers::yahoo_finance::YahooFinanceProvider::new(
        &config.providers.yahoo.base_url,
    )?;
    let cache = Arc::new(MemoryCache::<FetchKey, MarketData>::new());
    let provider = CachingMarketDataProvider::new(yahoo, cache, config.cache.intraday_ttl());

    let today = Utc::now().date_naive();
    match command {
        AppCommand::History(args) => {
            let options = args.into_options(&config, today);
            cli::history::run(&provider, &options).await
        }
        AppCommand::Quote { ticker } => {
            let ticker = ticker.unwrap_or_else(|| config.defaults.quote_ticker.clone());
            cli::quote::run(&provider, &ticker, today).await
        }
    }
}
