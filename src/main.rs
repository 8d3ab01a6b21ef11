use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use stockdash::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display price history, dividends and growth rates
    History {
        /// Ticker symbols, defaults to the configured tickers
        tickers: Vec<String>,

        /// First date of the range (YYYY-MM-DD)
        #[arg(short, long)]
        start: Option<NaiveDate>,

        /// End of the range, exclusive (YYYY-MM-DD). Defaults to today
        #[arg(short, long)]
        end: Option<NaiveDate>,

        /// Number of most recent sessions to list, 0 for all
        #[arg(short, long, default_value_t = 10)]
        rows: usize,

        /// Skip the daily price table
        #[arg(long)]
        no_table: bool,

        /// Skip the dividend table
        #[arg(long)]
        no_dividends: bool,
    },
    /// Display the latest daily quote
    Quote {
        /// Ticker symbol, defaults to the configured quote ticker
        ticker: Option<String>,
    },
}

impl From<Commands> for stockdash::AppCommand {
    fn from(cmd: Commands) -> stockdash::AppCommand {
        match cmd {
            Commands::History {
                tickers,
                start,
                end,
                rows,
                no_table,
                no_dividends,
            } => stockdash::AppCommand::History(stockdash::HistoryArgs {
                tickers,
                start,
                end,
                rows,
                hide_table: no_table,
                hide_dividends: no_dividends,
            }),
            Commands::Quote { ticker } => stockdash::AppCommand::Quote { ticker },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => stockdash::cli::setup::setup_at_path(path),
            None => stockdash::cli::setup::setup(),
        },
        Some(cmd) => stockdash::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
