use super::{history, ui};
use crate::core::market::{MarketDataProvider, is_current, normalize_ticker};
use crate::core::series::DateRange;
use anyhow::Result;
use chrono::{Duration, NaiveDate};
use tracing::info;

/// Range covering yesterday's and today's sessions. The end is exclusive,
/// so it is pushed one day past `today`.
pub fn quote_range(today: NaiveDate) -> DateRange {
    DateRange::new(today - Duration::days(1), today + Duration::days(1))
}

pub async fn run(provider: &dyn MarketDataProvider, ticker: &str, today: NaiveDate) -> Result<()> {
    let ticker = normalize_ticker(ticker);
    let range = quote_range(today);
    info!("Fetching latest quote for {ticker}");

    println!(
        "\nLatest quote for {}",
        ui::style_text(&ticker, ui::StyleType::Title)
    );
    // Failures are reported, not propagated
    let data = match provider.fetch_history(&ticker, &range).await {
        Ok(data) => data,
        Err(e) => {
            println!(
                "{}",
                ui::style_text(&format!("Failed to fetch data: {e}"), ui::StyleType::Error)
            );
            return Ok(());
        }
    };

    if data.prices.is_empty() {
        println!(
            "{}",
            ui::style_text(
                &format!("No sessions found for {} or {today}", range.start),
                ui::StyleType::Subtle
            )
        );
        return Ok(());
    }

    println!("{}", history::price_table(&data, 0));

    // Today's session only shows up once the exchange has reported it
    if is_current(&data.prices, today) {
        println!("Today's data ({today}) is available.");
    } else {
        let latest = data
            .prices
            .last_date()
            .map_or_else(|| "N/A".to_string(), |d| d.to_string());
        println!(
            "{}",
            ui::style_text(
                &format!("Today's data ({today}) is not available yet; latest session is {latest}."),
                ui::StyleType::Warning
            )
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_range_spans_yesterday_and_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let range = quote_range(today);
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert!(range.includes(today));
    }
}
