//! Read, process and write pipelines over the reader/writer collaborators.
//!
//! These are thin entry points: each one wires the pure transforms of
//! [`crate::transform`] and [`crate::timeframe`] to a [`DataReader`] /
//! [`DataWriter`] pair and stops at the first error.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::data::DataReader;
use crate::error::{MarketDataError, Result};
use crate::export::DataWriter;
use crate::timeframe::{add_higher_timeframe_ids, aggregate_to_higher};
use crate::transform::{adjust_for_splits, in_descending_order, normalize_sort};
use crate::types::{
    BarSeries, DataSource, DividendEvents, Event, EventDates, SplitEvents, TickerForRead,
    TickerForWrite, Timeframe,
};

/// Read a symbol at every configured timeframe. Stops at the first failing
/// config and returns whatever was already read together with the error.
pub fn read_ticker_data<R: DataReader>(
    reader: &R,
    ticker: &TickerForRead,
) -> (HashMap<Timeframe, BarSeries>, Option<MarketDataError>) {
    let mut data = HashMap::new();
    for config in &ticker.config {
        match reader.read_ticker_data(&ticker.symbol, config) {
            Ok(series) => {
                data.insert(config.timeframe, series);
            }
            Err(err) => return (data, Some(err)),
        }
    }
    (data, None)
}

pub fn read_event_data<R: DataReader>(reader: &R, event: &Event) -> Result<EventDates> {
    reader.read_event_data(event)
}

/// Read split events and normalize them to ascending date order.
pub fn read_split_data<R: DataReader>(
    reader: &R,
    symbol: &str,
    source: DataSource,
) -> Result<SplitEvents> {
    let splits = reader.read_split_data(symbol, source)?;
    Ok(if in_descending_order(&splits.dates) {
        splits.reversed()
    } else {
        splits
    })
}

/// Read dividend events and normalize them to ascending date order.
pub fn read_dividend_data<R: DataReader>(
    reader: &R,
    symbol: &str,
    source: DataSource,
) -> Result<DividendEvents> {
    let dividends = reader.read_dividend_data(symbol, source)?;
    Ok(if in_descending_order(&dividends.dates) {
        dividends.reversed()
    } else {
        dividends
    })
}

/// Turn a raw series into its canonical processed form: ascending order
/// with contiguous ids and the requested extra columns, split-adjusted
/// when events are supplied, and labeled with each higher timeframe in
/// order.
pub fn process_raw_ticker_data(
    series: BarSeries,
    splits: Option<&SplitEvents>,
    base_timeframe: Timeframe,
    additional_fields: &[&str],
    higher_timeframes: &[Timeframe],
) -> BarSeries {
    let mut series = normalize_sort(series, additional_fields);
    info!(bars = series.len(), %base_timeframe, "processing raw ticker data");
    if let Some(splits) = splits {
        debug!(events = splits.len(), "adjusting for splits");
        adjust_for_splits(&mut series, splits);
    }
    for higher in higher_timeframes {
        add_higher_timeframe_ids(&mut series, base_timeframe, *higher);
    }
    series
}

/// Write a processed series at every configured timeframe, aggregating up
/// from the base timeframe where needed. Stops at the first error.
pub fn write_ticker_data<W: DataWriter>(
    writer: &W,
    series: &BarSeries,
    ticker: &TickerForWrite,
) -> Result<()> {
    for config in &ticker.config {
        if config.timeframe == ticker.base_timeframe {
            writer.write_ticker_data(&ticker.symbol, series, config)?;
        } else {
            let higher = aggregate_to_higher(series, config.timeframe)?;
            writer.write_ticker_data(&ticker.symbol, &higher, config)?;
        }
    }
    Ok(())
}
