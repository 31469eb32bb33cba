//! Marketdata - a columnar transformation pipeline for equity market data.
//!
//! # Overview
//!
//! Marketdata ingests per-symbol OHLCV time series from a CSV file store,
//! normalizes them into a canonical columnar form, and writes them back out
//! at daily, weekly and monthly timeframes:
//!
//! - **Columnar bar model**: one vector per column, optional presence per
//!   column, deterministic output for identical input
//! - **Sort normalization**: descending feeds are rebuilt ascending with
//!   contiguous zero-based row ids
//! - **Split adjustment**: retroactive price/volume rescaling for stock
//!   splits, bit-compatible with the historical tooling this crate replaces
//! - **Timeframe labeling**: weekly/monthly bucket ids over daily bars
//! - **Aggregation**: OHLCV rollup of a labeled series into the next
//!   timeframe, with calendar-aware handling of the partial last bucket
//! - **CSV collaborators**: a file-store reader (standard and Yahoo
//!   corporate-action formats) and an append-capable writer
//!
//! # Quick Start
//!
//! ```no_run
//! use marketdata::data::{CsvReader, DataReader};
//! use marketdata::pipeline;
//! use marketdata::types::{DateRange, ReadConfig, Timeframe};
//!
//! let reader = CsvReader {
//!     ticker_data_path: "data".into(),
//!     ticker_file_pattern: "{ticker}-{timeframe}.csv".to_string(),
//!     date_format: "%-m/%-d/%Y".to_string(),
//!     ..Default::default()
//! };
//!
//! // Read raw daily bars...
//! let raw = reader
//!     .read_ticker_data(
//!         "spy",
//!         &ReadConfig {
//!             timeframe: Timeframe::Daily,
//!             filter: vec![],
//!             range: DateRange::unrestricted(),
//!         },
//!     )
//!     .unwrap();
//!
//! // ...and turn them into the canonical labeled form.
//! let processed = pipeline::process_raw_ticker_data(
//!     raw,
//!     None,
//!     Timeframe::Daily,
//!     &["id", "weekly_id", "monthly_id"],
//!     &[Timeframe::Weekly, Timeframe::Monthly],
//! );
//! assert_eq!(processed.id.as_ref().map(|ids| ids.len()), Some(processed.len()));
//! ```
//!
//! # Modules
//!
//! - [`types`]: columnar containers (BarSeries, split/dividend events)
//! - [`transform`]: sort normalization and split adjustment
//! - [`timeframe`]: higher-timeframe labeling and aggregation
//! - [`data`]: the CSV reader collaborator
//! - [`export`]: the CSV writer collaborator
//! - [`pipeline`]: read/process/write façade
//! - [`config`]: TOML store configuration
//! - [`error`]: error taxonomy

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod timeframe;
pub mod transform;
pub mod types;

// Re-exports for convenience
pub use config::StoreFileConfig;
pub use data::{CsvReader, DataReader};
pub use error::{MarketDataError, Result};
pub use export::{CsvWriter, DataWriter};
pub use pipeline::{
    process_raw_ticker_data, read_dividend_data, read_event_data, read_split_data,
    read_ticker_data, write_ticker_data,
};
pub use timeframe::{add_higher_timeframe_ids, aggregate_to_higher, last_completed_index};
pub use transform::{adjust_for_splits, in_descending_order, normalize_sort};
pub use types::{
    BarSeries, DataSource, DateRange, DividendEvents, Event, EventDates, FieldSet, ReadConfig,
    RecordSink, SplitEvents, TickerForRead, TickerForWrite, Timeframe, WriteConfig,
};
