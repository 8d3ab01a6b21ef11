use super::ui;
use crate::core::analytics::{InstrumentReport, analyze_tickers};
use crate::core::market::{MarketData, MarketDataProvider, PriceField};
use crate::core::series::{DateRange, TimeSeries};
use anyhow::Result;
use comfy_table::{Attribute, Cell, CellAlignment, Table};
use tracing::info;

/// What to fetch and which sections to print.
#[derive(Debug, Clone)]
pub struct HistoryOptions {
    pub tickers: Vec<String>,
    pub range: DateRange,
    /// Most recent sessions to list; 0 lists all.
    pub rows: usize,
    pub show_table: bool,
    pub show_dividends: bool,
}

pub async fn run(provider: &dyn MarketDataProvider, options: &HistoryOptions) -> Result<()> {
    info!(
        "Fetching history for {:?} from {} to {}",
        options.tickers, options.range.start, options.range.end
    );

    if options.tickers.is_empty() {
        println!("No tickers given. Pass one or more symbols, e.g. `stockdash history AAPL`.");
        return Ok(());
    }

    // Step 1: Fetch and analyze every ticker concurrently
    let pb = ui::new_progress_bar(options.tickers.len() as u64);
    let reports = analyze_tickers(provider, &options.tickers, &options.range, &|| pb.inc(1)).await;
    pb.finish_and_clear();

    // Step 2: Print one report per ticker, in request order
    let num_reports = reports.len();
    for (i, report) in reports.iter().enumerate() {
        display_report(report, options);
        if i < num_reports - 1 {
            ui::print_separator();
        }
    }

    Ok(())
}

fn display_report(report: &InstrumentReport, options: &HistoryOptions) {
    println!(
        "\nStock Data for {}",
        ui::style_text(&report.ticker, ui::StyleType::Title)
    );

    match &report.data {
        Err(e) => {
            println!(
                "{}",
                ui::style_text(&format!("Failed to fetch data: {e}"), ui::StyleType::Error)
            );
        }
        Ok(data) if data.prices.is_empty() => {
            println!(
                "{}",
                ui::style_text(
                    &format!(
                        "No data available between {} and {}",
                        options.range.start, options.range.end
                    ),
                    ui::StyleType::Subtle
                )
            );
        }
        Ok(data) => {
            if options.show_table {
                println!("{}", price_table(data, options.rows));
            }
            println!("{}", summary_table(data));
            if options.show_dividends && !data.dividends.is_empty() {
                println!("{}", dividend_table(&data.dividends));
            }
        }
    }

    println!("{}", growth_table(report));
}

/// Latest `rows` sessions (all when 0) of the OHLCV fields. Price headers
/// carry the quote currency when it is known.
pub fn price_table(data: &MarketData, rows: usize) -> Table {
    let mut table = ui::new_styled_table();

    let mut header = vec![ui::header_cell("Date")];
    for field in PriceField::OHLCV {
        header.push(ui::header_cell(&column_label(field, data.currency.as_deref())));
    }
    table.set_header(header);

    let total = data.prices.len();
    let skip = if rows == 0 { 0 } else { total.saturating_sub(rows) };
    for (row, ts) in data.prices.timestamps().iter().enumerate().skip(skip) {
        let mut cells = vec![Cell::new(ts.date_naive())];
        for field in PriceField::OHLCV {
            let value = data.prices.cell(row, field);
            let cell = if field == PriceField::Volume {
                ui::format_optional_cell(value, |v| format!("{v:.0}"))
            } else {
                ui::format_optional_cell(value, |v| format!("{v:.2}"))
            };
            cells.push(cell);
        }
        table.add_row(cells);
    }

    table
}

fn column_label(field: PriceField, currency: Option<&str>) -> String {
    match (field, currency) {
        (PriceField::Volume, _) | (_, None) => field.to_string(),
        (_, Some(currency)) => format!("{field} ({currency})"),
    }
}

fn summary_table(data: &MarketData) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Sessions"),
        ui::header_cell("First Close"),
        ui::header_cell("Last Close"),
        ui::header_cell("Low"),
        ui::header_cell("High"),
        ui::header_cell("Avg Volume"),
    ]);

    // Nulls are skipped, so low/high/average only cover reported sessions
    let closes = data.prices.column(PriceField::Close).unwrap_or_default();
    let low = closes.values().reduce(f64::min);
    let high = closes.values().reduce(f64::max);
    let avg_volume = data
        .prices
        .column(PriceField::Volume)
        .filter(|v| !v.is_empty())
        .map(|v| v.sum() / v.len() as f64);

    table.add_row(vec![
        Cell::new(data.prices.len()).set_alignment(CellAlignment::Right),
        ui::format_optional_cell(closes.first().map(|o| o.value), |v| format!("{v:.2}")),
        ui::format_optional_cell(closes.last().map(|o| o.value), |v| format!("{v:.2}")),
        ui::format_optional_cell(low, |v| format!("{v:.2}")),
        ui::format_optional_cell(high, |v| format!("{v:.2}")),
        ui::format_optional_cell(avg_volume, |v| format!("{v:.0}")),
    ]);

    table
}

fn dividend_table(dividends: &TimeSeries) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Ex-Dividend Date"), ui::header_cell("Amount")]);

    for dividend in dividends.iter() {
        table.add_row(vec![
            Cell::new(dividend.date()),
            Cell::new(format!("{:.4}", dividend.value)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(format!("{:.4}", dividends.sum()))
            .add_attribute(Attribute::Bold)
            .set_alignment(CellAlignment::Right),
    ]);

    table
}

fn growth_table(report: &InstrumentReport) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Series"),
        ui::header_cell("CAGR"),
        ui::header_cell("Note"),
    ]);

    for (label, growth) in [
        ("Close Price", &report.price_growth),
        ("Dividends", &report.dividend_growth),
    ] {
        table.add_row(vec![
            Cell::new(label),
            ui::growth_cell(growth),
            Cell::new(ui::growth_note(growth)),
        ]);
    }

    table
}
