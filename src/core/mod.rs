//! Core business logic abstractions

pub mod analytics;
pub mod cache;
pub mod config;
pub mod growth;
pub mod log;
pub mod market;
pub mod series;

// Re-export main types for cleaner imports
pub use growth::{GrowthRate, Undefined, compound_annual_growth_rate};
pub use market::{MarketData, MarketDataProvider, PriceField, PriceTable};
pub use series::{DateRange, Observation, TimeSeries};
