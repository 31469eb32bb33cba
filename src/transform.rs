//! Sort normalization and split adjustment.
//!
//! Both transforms operate on a [`BarSeries`]. Normalization produces a
//! fresh ascending store; split adjustment mutates in place, which keeps
//! the retroactive rescale a single pass over the price columns.

use chrono::NaiveDate;
use tracing::debug;

use crate::types::{BarSeries, FieldSet, SplitEvents};

/// A date column is considered descending when its first entry is newer
/// than its second. Zero- and one-row series take the descending path,
/// which is the identity for those sizes.
pub fn in_descending_order(dates: &[NaiveDate]) -> bool {
    if dates.len() <= 1 {
        return true;
    }
    dates[0] > dates[1]
}

/// Normalize a series to ascending date order with contiguous zero-based
/// ids.
///
/// Descending input is rebuilt reversed. Ascending input is returned
/// unchanged unless `additional_fields` asks for columns the series does
/// not yet have, in which case it is rebuilt in order with the extended
/// field set. Equal consecutive dates keep their pairwise order. Requested
/// `_id` columns are allocated zeroed for the labeler to fill.
pub fn normalize_sort(series: BarSeries, additional_fields: &[&str]) -> BarSeries {
    let fields = FieldSet::from_series(&series, additional_fields, None);
    if in_descending_order(&series.date) {
        rebuild_reversed(&series, &fields)
    } else if additional_fields.is_empty() {
        series
    } else {
        rebuild_ascending(&series, &fields)
    }
}

fn rebuild_reversed(src: &BarSeries, fields: &FieldSet) -> BarSeries {
    let n = src.len();
    let mut series = BarSeries::with_fields(fields, n);
    for (id, src_index) in (0..n).rev().enumerate() {
        series.copy_row(src, id as i32, src_index, id);
    }
    series
}

fn rebuild_ascending(src: &BarSeries, fields: &FieldSet) -> BarSeries {
    let n = src.len();
    let mut series = BarSeries::with_fields(fields, n);
    for i in 0..n {
        series.copy_row(src, i as i32, i, i);
    }
    series
}

/// Apply split events retroactively. For each event whose date appears in
/// the series, every bar strictly before that date is rescaled: prices by
/// `before/after`, volume by `after/before`. Events whose date is absent
/// are skipped. Events apply in container order, each over the already
/// adjusted bars.
pub fn adjust_for_splits(series: &mut BarSeries, splits: &SplitEvents) {
    for x in 0..splits.len() {
        match series.index_of_date(splits.dates[x]) {
            Some(i) if i > 0 => {
                adjust_split_event(series, i - 1, splits.before_qty[x], splits.after_qty[x]);
            }
            Some(_) => {} // split on the first bar: nothing precedes it
            None => {
                debug!(date = %splits.dates[x], "split date not present in series, skipping event");
            }
        }
    }
}

/// Rescale bars `0..=last`. The volume ratio is carried in f32 and the
/// result truncated toward zero; high/low/close are rounded half-up at two
/// decimals while open is left unrounded. These choices reproduce the
/// historical output bit for bit.
fn adjust_split_event(series: &mut BarSeries, last: usize, before_qty: u32, after_qty: u32) {
    let price_ratio = f64::from(before_qty) / f64::from(after_qty);
    let volume_ratio = after_qty as f32 / before_qty as f32;
    for x in (0..=last).rev() {
        if let Some(open) = series.open.as_mut() {
            open[x] *= price_ratio;
        }
        if let Some(high) = series.high.as_mut() {
            high[x] = round2(high[x] * price_ratio);
        }
        if let Some(low) = series.low.as_mut() {
            low[x] = round2(low[x] * price_ratio);
        }
        if let Some(close) = series.close.as_mut() {
            close[x] = round2(close[x] * price_ratio);
        }
        if let Some(volume) = series.volume.as_mut() {
            volume[x] = (volume[x] as f32 * volume_ratio) as i64;
        }
    }
}

/// Round half-up at the second decimal.
fn round2(v: f64) -> f64 {
    (v * 100.0 + 0.5).floor() / 100.0
}
