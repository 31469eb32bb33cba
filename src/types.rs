//! Core data types for the market-data pipeline.
//!
//! The central container is [`BarSeries`], a column-oriented store for a
//! single symbol at a single timeframe. Columns are parallel vectors of
//! equal length; every column except `date` is optional. Higher-timeframe
//! id columns (`weekly_id`, `monthly_id`, ...) live in a sorted map so
//! their on-disk order is deterministic.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::debug;

use crate::error::{MarketDataError, Result};

/// Suffix that routes a column into the higher-timeframe id map.
pub const ID_COLUMN_SUFFIX: &str = "_id";

/// Where split and dividend files come from.
///
/// Yahoo files are line-oriented scrapes interleaving dividends and splits;
/// standard files are header-bearing CSVs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    #[default]
    Standard,
    Yahoo,
}

/// Bar period length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
        }
    }

    /// Name of the id column that links a lower-timeframe series to this
    /// timeframe (e.g. `weekly_id`).
    pub fn id_column(&self) -> &'static str {
        match self {
            Timeframe::Daily => "daily_id",
            Timeframe::Weekly => "weekly_id",
            Timeframe::Monthly => "monthly_id",
        }
    }

    /// Timeframes coarser than this one whose id columns a series at this
    /// timeframe may carry.
    pub fn linked_higher(&self) -> &'static [Timeframe] {
        match self {
            Timeframe::Daily => &[Timeframe::Weekly, Timeframe::Monthly],
            Timeframe::Weekly => &[Timeframe::Monthly],
            Timeframe::Monthly => &[],
        }
    }

    pub fn from_name(name: &str) -> Option<Timeframe> {
        match name {
            "daily" => Some(Timeframe::Daily),
            "weekly" => Some(Timeframe::Weekly),
            "monthly" => Some(Timeframe::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named event series (e.g. "opec-oil-cut").
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
}

/// Set of dates an event occurred on. Order is irrelevant and duplicates
/// collapse.
pub type EventDates = HashSet<NaiveDate>;

/// Maps a column name to its cell position within a record.
pub type ColumnMap = HashMap<String, usize>;

/// Inclusive start / exclusive end date window for reads. A start equal to
/// the zero date means unrestricted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.start == NaiveDate::default()
    }
}

/// Per-timeframe read request.
#[derive(Debug, Clone)]
pub struct ReadConfig {
    pub timeframe: Timeframe,
    /// Column names to keep; empty keeps everything in the source header.
    pub filter: Vec<String>,
    pub range: DateRange,
}

/// A symbol together with the timeframes to read it at.
#[derive(Debug, Clone)]
pub struct TickerForRead {
    pub symbol: String,
    pub config: Vec<ReadConfig>,
}

/// Per-timeframe write request.
#[derive(Debug, Clone)]
pub struct WriteConfig {
    pub timeframe: Timeframe,
    pub append: bool,
}

/// A symbol together with the timeframes to write it at. Timeframes other
/// than `base_timeframe` are aggregated up from the base series.
#[derive(Debug, Clone)]
pub struct TickerForWrite {
    pub symbol: String,
    pub base_timeframe: Timeframe,
    pub config: Vec<WriteConfig>,
}

/// The set of columns a [`BarSeries`] allocates. Ordered for deterministic
/// iteration; membership drives allocation in `BarSeries::with_fields`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet(BTreeSet<String>);

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.0.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Collect the columns present in `series`, any requested additional
    /// columns, and the series' higher-timeframe id columns. When `target`
    /// is given, only id columns linked downstream of that timeframe are
    /// kept (a weekly series may carry `monthly_id`, never `weekly_id`).
    pub fn from_series(
        series: &BarSeries,
        additional: &[&str],
        target: Option<Timeframe>,
    ) -> Self {
        let mut fields = FieldSet::new();
        if series.id.is_some() {
            fields.insert("id");
        }
        fields.insert("date");
        if series.open.is_some() {
            fields.insert("open");
        }
        if series.high.is_some() {
            fields.insert("high");
        }
        if series.low.is_some() {
            fields.insert("low");
        }
        if series.close.is_some() {
            fields.insert("close");
        }
        if series.volume.is_some() {
            fields.insert("volume");
        }
        for key in series.higher_tf_ids.keys() {
            let keep = match target {
                None => true,
                Some(tf) => {
                    let key = key.to_lowercase();
                    tf.linked_higher().iter().any(|h| key.contains(h.as_str()))
                }
            };
            if keep {
                fields.insert(key.clone());
            }
        }
        for name in additional {
            fields.insert(*name);
        }
        fields
    }
}

/// Column-oriented store for a single symbol at a single timeframe.
///
/// All present columns have the same length as `date`. `id`, when present,
/// is contiguous and zero-based after sort normalization. Entries of a
/// higher-timeframe id column are `-1` for bars preceding the first
/// complete period of that timeframe, then non-decreasing with unit steps
/// at period boundaries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSeries {
    pub id: Option<Vec<i32>>,
    pub date: Vec<NaiveDate>,
    pub open: Option<Vec<f64>>,
    pub high: Option<Vec<f64>>,
    pub low: Option<Vec<f64>>,
    pub close: Option<Vec<f64>>,
    pub volume: Option<Vec<i64>>,
    pub higher_tf_ids: BTreeMap<String, Vec<i32>>,
}

impl BarSeries {
    /// Allocate exactly the requested columns at length `size`. `date` is
    /// always allocated; any field name containing `_id` (other than `id`
    /// itself) allocates a higher-timeframe id column.
    pub fn with_fields(fields: &FieldSet, size: usize) -> Self {
        let mut series = BarSeries {
            date: vec![NaiveDate::default(); size],
            ..Default::default()
        };
        for name in fields.iter() {
            match name {
                "id" => series.id = Some(vec![0; size]),
                "date" => {}
                "open" => series.open = Some(vec![0.0; size]),
                "high" => series.high = Some(vec![0.0; size]),
                "low" => series.low = Some(vec![0.0; size]),
                "close" => series.close = Some(vec![0.0; size]),
                "volume" => series.volume = Some(vec![0; size]),
                other if other.contains(ID_COLUMN_SUFFIX) => {
                    series
                        .higher_tf_ids
                        .insert(other.to_string(), vec![0; size]);
                }
                _ => {}
            }
        }
        series
    }

    /// Number of bars.
    pub fn len(&self) -> usize {
        self.date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_empty()
    }

    /// Lowest index holding `date`, if any.
    pub fn index_of_date(&self, date: NaiveDate) -> Option<usize> {
        self.date.iter().position(|d| *d == date)
    }

    /// Parse one record into row `index`. Cells are mapped to columns by
    /// `columns`; numeric failures are hard errors, date failures coerce to
    /// the zero date (matching the historical loader behavior).
    pub fn push_record(
        &mut self,
        cells: &[String],
        columns: &ColumnMap,
        index: usize,
        date_format: &str,
    ) -> Result<()> {
        for (key, &pos) in columns {
            let raw = cells[pos].as_str();
            match key.as_str() {
                "id" => {
                    if let Some(col) = self.id.as_mut() {
                        col[index] = parse_cell(key, raw)?;
                    }
                }
                "date" => {
                    self.date[index] = parse_date_or_zero(raw, date_format);
                }
                "open" => {
                    if let Some(col) = self.open.as_mut() {
                        col[index] = parse_cell(key, raw)?;
                    }
                }
                "high" => {
                    if let Some(col) = self.high.as_mut() {
                        col[index] = parse_cell(key, raw)?;
                    }
                }
                "low" => {
                    if let Some(col) = self.low.as_mut() {
                        col[index] = parse_cell(key, raw)?;
                    }
                }
                "close" => {
                    if let Some(col) = self.close.as_mut() {
                        col[index] = parse_cell(key, raw)?;
                    }
                }
                "volume" => {
                    if let Some(col) = self.volume.as_mut() {
                        col[index] = parse_cell(key, raw)?;
                    }
                }
                other if other.contains(ID_COLUMN_SUFFIX) => {
                    if let Some(col) = self.higher_tf_ids.get_mut(other) {
                        col[index] = parse_cell(key, raw)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Copy the canonical columns of row `src_index` of `src` into row
    /// `index`, assigning `id`. Higher-timeframe id columns are left for
    /// the labeler to fill.
    pub(crate) fn copy_row(&mut self, src: &BarSeries, id: i32, src_index: usize, index: usize) {
        if let Some(col) = self.id.as_mut() {
            col[index] = id;
        }
        self.date[index] = src.date[src_index];
        if let (Some(dst), Some(src)) = (self.open.as_mut(), src.open.as_ref()) {
            dst[index] = src[src_index];
        }
        if let (Some(dst), Some(src)) = (self.high.as_mut(), src.high.as_ref()) {
            dst[index] = src[src_index];
        }
        if let (Some(dst), Some(src)) = (self.low.as_mut(), src.low.as_ref()) {
            dst[index] = src[src_index];
        }
        if let (Some(dst), Some(src)) = (self.close.as_mut(), src.close.as_ref()) {
            dst[index] = src[src_index];
        }
        if let (Some(dst), Some(src)) = (self.volume.as_mut(), src.volume.as_ref()) {
            dst[index] = src[src_index];
        }
    }
}

fn parse_date_or_zero(raw: &str, date_format: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, date_format).unwrap_or_else(|err| {
        debug!(raw, %err, "date cell failed to parse, coercing to zero date");
        NaiveDate::default()
    })
}

fn parse_cell<T>(column: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: ToString,
{
    raw.parse()
        .map_err(|err: T::Err| MarketDataError::field_parse(column, raw, err.to_string()))
}

/// Capability shared by the split and dividend containers so the standard
/// and Yahoo ingestion paths can fill either one.
pub trait RecordSink {
    fn allocate(&mut self, size: usize);

    fn push_record(
        &mut self,
        cells: &[String],
        columns: &ColumnMap,
        index: usize,
        date_format: &str,
    ) -> Result<()>;
}

/// Stock split events. Parallel columns, ascending by date in canonical
/// form. A `before_qty -> after_qty` split multiplies prior prices by
/// `before/after` and prior volumes by `after/before`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitEvents {
    pub dates: Vec<NaiveDate>,
    pub before_qty: Vec<u32>,
    pub after_qty: Vec<u32>,
}

impl SplitEvents {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn push(&mut self, date: NaiveDate, before_qty: u32, after_qty: u32) {
        self.dates.push(date);
        self.before_qty.push(before_qty);
        self.after_qty.push(after_qty);
    }

    /// New container with the rows in reverse order.
    pub fn reversed(&self) -> Self {
        Self {
            dates: self.dates.iter().rev().copied().collect(),
            before_qty: self.before_qty.iter().rev().copied().collect(),
            after_qty: self.after_qty.iter().rev().copied().collect(),
        }
    }
}

impl RecordSink for SplitEvents {
    fn allocate(&mut self, size: usize) {
        self.dates = vec![NaiveDate::default(); size];
        self.before_qty = vec![0; size];
        self.after_qty = vec![0; size];
    }

    fn push_record(
        &mut self,
        cells: &[String],
        columns: &ColumnMap,
        index: usize,
        date_format: &str,
    ) -> Result<()> {
        for (key, &pos) in columns {
            let raw = cells[pos].as_str();
            match key.as_str() {
                "date" => {
                    self.dates[index] = parse_date_or_zero(raw.trim(), date_format);
                }
                "split" => {
                    // An X:Y ratio means X shares after for Y shares before.
                    let (after, before) = raw.split_once(':').ok_or_else(|| {
                        MarketDataError::field_parse(key, raw, "expected an X:Y ratio")
                    })?;
                    self.before_qty[index] = parse_cell(key, before)?;
                    self.after_qty[index] = parse_cell(key, after)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Cash dividend events. Parallel columns, ascending by date in canonical
/// form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DividendEvents {
    pub dates: Vec<NaiveDate>,
    pub amounts: Vec<f64>,
}

impl DividendEvents {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn push(&mut self, date: NaiveDate, amount: f64) {
        self.dates.push(date);
        self.amounts.push(amount);
    }

    /// New container with the rows in reverse order.
    pub fn reversed(&self) -> Self {
        Self {
            dates: self.dates.iter().rev().copied().collect(),
            amounts: self.amounts.iter().rev().copied().collect(),
        }
    }
}

impl RecordSink for DividendEvents {
    fn allocate(&mut self, size: usize) {
        self.dates = vec![NaiveDate::default(); size];
        self.amounts = vec![0.0; size];
    }

    fn push_record(
        &mut self,
        cells: &[String],
        columns: &ColumnMap,
        index: usize,
        date_format: &str,
    ) -> Result<()> {
        for (key, &pos) in columns {
            let raw = cells[pos].as_str();
            match key.as_str() {
                "date" => {
                    self.dates[index] = parse_date_or_zero(raw.trim(), date_format);
                }
                "dividend" => {
                    self.amounts[index] = parse_cell(key, raw.trim())?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}
