//! Higher-timeframe labeling and aggregation.
//!
//! This module decorates a daily [`BarSeries`] with weekly/monthly bucket
//! ids and rolls a labeled series up into the next timeframe. Bucket ids
//! start at `-1` for the bars preceding the first complete bucket, then
//! count up by one at every boundary, so a bucket's id doubles as the row
//! id of the aggregated bar it produces.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use tracing::debug;

use crate::error::{MarketDataError, Result};
use crate::types::{BarSeries, FieldSet, Timeframe};

/// Label `series` (at timeframe `base`) with bucket ids for `higher`.
///
/// Only daily bases are labelable, into weekly or monthly buckets; any
/// other combination is a no-op. The target id column must already be
/// allocated (requested in the field set), otherwise nothing happens.
pub fn add_higher_timeframe_ids(series: &mut BarSeries, base: Timeframe, higher: Timeframe) {
    if base != Timeframe::Daily {
        return;
    }
    match higher {
        Timeframe::Weekly => label(series, Timeframe::Weekly.id_column(), week_boundary),
        Timeframe::Monthly => label(series, Timeframe::Monthly.id_column(), month_boundary),
        Timeframe::Daily => {}
    }
}

/// A new week starts when the weekday number wraps backwards (Sunday=0
/// through Saturday=6), so any drop covers weekends and holidays alike.
fn week_boundary(prev: NaiveDate, cur: NaiveDate) -> bool {
    prev.weekday().num_days_from_sunday() > cur.weekday().num_days_from_sunday()
}

fn month_boundary(prev: NaiveDate, cur: NaiveDate) -> bool {
    cur.month() != prev.month()
}

fn label(series: &mut BarSeries, column: &str, boundary: fn(NaiveDate, NaiveDate) -> bool) {
    let BarSeries {
        date,
        higher_tf_ids,
        ..
    } = series;
    let Some(ids) = higher_tf_ids.get_mut(column) else {
        return;
    };
    // First boundary crossing; without one the data holds at most one
    // partial bucket and the column is left unpopulated.
    let Some(z) = (1..date.len()).find(|&i| boundary(date[i - 1], date[i])) else {
        debug!(column, "no bucket boundary found, leaving ids unpopulated");
        return;
    };
    for slot in ids[..z].iter_mut() {
        *slot = -1;
    }
    let mut id = 0;
    ids[z] = id;
    for i in z + 1..date.len() {
        if boundary(date[i - 1], date[i]) {
            id += 1;
        }
        ids[i] = id;
    }
}

/// Index of the last bar belonging to a completed `target` bucket.
///
/// The terminal bar itself completes its bucket by the calendar rule:
/// weekly when it falls on a Friday, monthly when the month changes
/// tomorrow or the bar is a Friday whose following Monday is in the next
/// month. Otherwise the last id transition wins. With no transition and no
/// calendar completion there is no completed bucket to aggregate.
pub fn last_completed_index(series: &BarSeries, target: Timeframe) -> Result<usize> {
    let ids = series
        .higher_tf_ids
        .get(target.id_column())
        .ok_or_else(|| missing(target))?;
    let n = series.len();
    if n == 0 {
        return Err(missing(target));
    }
    let last_date = series.date[n - 1];
    match target {
        Timeframe::Weekly => {
            if last_date.weekday() == Weekday::Fri {
                return Ok(n - 1);
            }
        }
        Timeframe::Monthly => {
            let tomorrow = last_date + Days::new(1);
            let after_weekend = last_date + Days::new(3);
            if tomorrow.month() != last_date.month()
                || (last_date.weekday() == Weekday::Fri
                    && after_weekend.month() != last_date.month())
            {
                return Ok(n - 1);
            }
        }
        Timeframe::Daily => {}
    }
    (0..n - 1)
        .rev()
        .find(|&i| ids[i] != ids[i + 1])
        .ok_or_else(|| missing(target))
}

fn missing(target: Timeframe) -> MarketDataError {
    MarketDataError::MissingHigherTf {
        timeframe: target.to_string(),
    }
}

/// Roll a labeled lower-timeframe series up into one bar per completed
/// `target` bucket.
///
/// Per bucket: `open` from its first bar, `close` from its last, `high`
/// and `low` bucket-wide extrema, `volume` the bucket sum, `date` the
/// first bar's date. The output row id is the bucket id plus one (ids
/// start at -1), and id columns for timeframes above `target` are carried
/// through from the bucket's boundary bar.
pub fn aggregate_to_higher(series: &BarSeries, target: Timeframe) -> Result<BarSeries> {
    let target_ids = series
        .higher_tf_ids
        .get(target.id_column())
        .ok_or_else(|| missing(target))?;
    let last_completed = last_completed_index(series, target)?;
    let fields = FieldSet::from_series(series, &[], Some(target));
    let out_len = (target_ids[last_completed] + 2).max(0) as usize;
    let mut out = BarSeries::with_fields(&fields, out_len);

    let n = series.len();
    let open = series.open.as_deref();
    let high = series.high.as_deref();
    let low = series.low.as_deref();
    let close = series.close.as_deref();
    let volume = series.volume.as_deref();
    let price = |col: Option<&[f64]>, i: usize| col.map_or(0.0, |c| c[i]);
    let vol = |col: Option<&[i64]>, i: usize| col.map_or(0, |c| c[i]);

    let mut out_index = 0usize;
    let mut prev_boundary = 0usize;
    let mut bucket_date = series.date[0];
    let mut bucket_open = price(open, 0);
    let mut bucket_high = price(high, 0);
    let mut bucket_low = price(low, 0);
    let mut bucket_volume = vol(volume, 0);

    for i in 1..n {
        if i == last_completed {
            bucket_high = bucket_high.max(price(high, i));
            bucket_low = bucket_low.min(price(low, i));
            bucket_volume += vol(volume, i);
            emit_bucket(
                &mut out,
                series,
                target,
                i,
                out_index,
                bucket_date,
                bucket_open,
                bucket_high,
                bucket_low,
                price(close, i),
                bucket_volume,
            );
            break;
        }
        if target_ids[i] > target_ids[prev_boundary] {
            emit_bucket(
                &mut out,
                series,
                target,
                prev_boundary,
                out_index,
                bucket_date,
                bucket_open,
                bucket_high,
                bucket_low,
                price(close, i - 1),
                bucket_volume,
            );
            prev_boundary = i;
            bucket_date = series.date[i];
            bucket_open = price(open, i);
            bucket_high = price(high, i);
            bucket_low = price(low, i);
            bucket_volume = vol(volume, i);
            out_index += 1;
            if out_index == out_len {
                break;
            }
        } else {
            bucket_high = bucket_high.max(price(high, i));
            bucket_low = bucket_low.min(price(low, i));
            bucket_volume += vol(volume, i);
        }
    }
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn emit_bucket(
    out: &mut BarSeries,
    src: &BarSeries,
    target: Timeframe,
    src_index: usize,
    out_index: usize,
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
) {
    if let Some(ids) = out.id.as_mut() {
        ids[out_index] = src.higher_tf_ids[target.id_column()][src_index] + 1;
    }
    out.date[out_index] = date;
    if let Some(col) = out.open.as_mut() {
        col[out_index] = open;
    }
    if let Some(col) = out.high.as_mut() {
        col[out_index] = high;
    }
    if let Some(col) = out.low.as_mut() {
        col[out_index] = low;
    }
    if let Some(col) = out.close.as_mut() {
        col[out_index] = close;
    }
    if let Some(col) = out.volume.as_mut() {
        col[out_index] = volume;
    }
    for (key, column) in out.higher_tf_ids.iter_mut() {
        column[out_index] = src.higher_tf_ids[key][src_index];
    }
}
