//! CSV-backed reading of ticker, event, split and dividend data.
//!
//! File locations come from filename patterns with `{ticker}`,
//! `{timeframe}` and `{eventname}` placeholders substituted literally.
//! Ticker and event files are header-bearing CSVs; split/dividend files
//! come either as standard CSVs or as Yahoo's line-oriented scrape format.

use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{MarketDataError, Result};
use crate::types::{
    BarSeries, ColumnMap, DataSource, DateRange, DividendEvents, Event, EventDates, FieldSet,
    ReadConfig, RecordSink, SplitEvents,
};

/// Read-side contract the pipeline consumes.
pub trait DataReader {
    fn read_ticker_data(&self, symbol: &str, config: &ReadConfig) -> Result<BarSeries>;

    fn read_event_data(&self, event: &Event) -> Result<EventDates>;

    fn read_dividend_data(&self, symbol: &str, source: DataSource) -> Result<DividendEvents>;

    fn read_split_data(&self, symbol: &str, source: DataSource) -> Result<SplitEvents>;

    /// Format string used to decode date columns.
    fn date_format(&self) -> &str;
}

/// CSV file store reader.
#[derive(Debug, Clone, Default)]
pub struct CsvReader {
    pub ticker_data_path: PathBuf,
    pub event_data_path: PathBuf,
    pub ticker_file_pattern: String,
    pub event_file_pattern: String,
    pub dividend_file_pattern: String,
    pub split_file_pattern: String,
    pub date_format: String,
}

impl DataReader for CsvReader {
    fn read_ticker_data(&self, symbol: &str, config: &ReadConfig) -> Result<BarSeries> {
        let file_name = ticker_file_name(
            &self.ticker_file_pattern,
            symbol,
            config.timeframe.as_str(),
        );
        let path = self.ticker_data_path.join(&file_name);
        info!(symbol, timeframe = %config.timeframe, path = %path.display(), "reading ticker data");
        let records = read_all_records(&path)?;
        if records.is_empty() {
            return Ok(BarSeries::default());
        }

        let columns = column_positions(&records[0], &config.filter)?;
        let (begin, end) = index_range(&records, &columns, &config.range, &self.date_format)?;
        let mut series =
            BarSeries::with_fields(&FieldSet::from_names(columns.keys().cloned()), end - begin);
        for (index, record) in records[begin..end].iter().enumerate() {
            series.push_record(record, &columns, index, &self.date_format)?;
        }
        debug!(rows = series.len(), "ticker data loaded");
        Ok(series)
    }

    fn read_event_data(&self, event: &Event) -> Result<EventDates> {
        let file_name = event_file_name(&self.event_file_pattern, &event.name);
        let path = self.event_data_path.join(&file_name);
        info!(event = %event.name, path = %path.display(), "reading event data");
        let records = read_all_records(&path)?;
        if records.is_empty() {
            return Ok(EventDates::new());
        }

        let columns = column_positions(&records[0], &["date".to_string()])?;
        let date_index = columns["date"];
        let mut dates = EventDates::new();
        for record in &records[1..] {
            if let Ok(date) = NaiveDate::parse_from_str(&record[date_index], &self.date_format) {
                dates.insert(date);
            }
        }
        Ok(dates)
    }

    fn read_dividend_data(&self, symbol: &str, source: DataSource) -> Result<DividendEvents> {
        let mut dividends = DividendEvents::default();
        self.read_corporate_actions(
            symbol,
            source,
            &self.dividend_file_pattern,
            "dividend",
            &mut dividends,
        )?;
        Ok(dividends)
    }

    fn read_split_data(&self, symbol: &str, source: DataSource) -> Result<SplitEvents> {
        let mut splits = SplitEvents::default();
        self.read_corporate_actions(
            symbol,
            source,
            &self.split_file_pattern,
            "split",
            &mut splits,
        )?;
        Ok(splits)
    }

    fn date_format(&self) -> &str {
        &self.date_format
    }
}

impl CsvReader {
    fn read_corporate_actions(
        &self,
        symbol: &str,
        source: DataSource,
        pattern: &str,
        kind: &str,
        sink: &mut dyn RecordSink,
    ) -> Result<()> {
        let file_name = file_name_for(pattern, "{ticker}", symbol);
        let path = self.ticker_data_path.join(&file_name);
        info!(symbol, kind, path = %path.display(), "reading corporate actions");
        let file = File::open(&path).map_err(MarketDataError::file_open)?;
        match source {
            DataSource::Yahoo => {
                add_from_yahoo_data(sink, kind, BufReader::new(file), &self.date_format)
            }
            DataSource::Standard => {
                let columns: ColumnMap =
                    [("date".to_string(), 0), (kind.to_string(), 1)].into_iter().collect();
                add_from_standard_data(sink, &columns, file, &self.date_format)
            }
        }
    }
}

/// Yahoo's scrape format interleaves dividends and splits, one per line,
/// keyed by the literal kind word; the date sits in the second comma field
/// and the value in the third. The first line is a header and is skipped.
fn add_from_yahoo_data(
    sink: &mut dyn RecordSink,
    kind: &str,
    reader: impl BufRead,
    date_format: &str,
) -> Result<()> {
    let mut records = Vec::new();
    for line in reader.lines().skip(1) {
        let line = line.map_err(MarketDataError::file_open)?;
        if !line.to_lowercase().contains(kind) {
            continue;
        }
        let cells: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(',').collect();
        if cells.len() < 3 {
            warn!(%line, "short line in corporate-action data, skipping");
            continue;
        }
        records.push(vec![cells[1].to_string(), cells[2].to_string()]);
    }
    let columns: ColumnMap = [("date".to_string(), 0), (kind.to_string(), 1)]
        .into_iter()
        .collect();
    sink.allocate(records.len());
    for (index, record) in records.iter().enumerate() {
        sink.push_record(record, &columns, index, date_format)?;
    }
    Ok(())
}

/// Standard corporate-action CSVs carry a fixed `date,<kind>` layout; the
/// header row is skipped without validation.
fn add_from_standard_data(
    sink: &mut dyn RecordSink,
    columns: &ColumnMap,
    file: File,
    date_format: &str,
) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    sink.allocate(records.len().saturating_sub(1));
    for (index, record) in records.iter().skip(1).enumerate() {
        sink.push_record(record, columns, index, date_format)?;
    }
    Ok(())
}

fn read_all_records(path: &Path) -> Result<Vec<Vec<String>>> {
    let file = File::open(path).map_err(MarketDataError::file_open)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    Ok(records)
}

/// Map lowercased header names to their cell positions, keeping only the
/// filtered names when a filter is given. Every filtered name must be
/// present.
fn column_positions(header: &[String], filter: &[String]) -> Result<ColumnMap> {
    let mut columns = ColumnMap::new();
    for (position, name) in header.iter().enumerate() {
        if filter.is_empty() || in_filter(name, filter) {
            columns.insert(name.to_lowercase(), position);
        }
    }
    let missing: Vec<String> = filter
        .iter()
        .filter(|name| !columns.contains_key(&name.to_lowercase()))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(columns)
    } else {
        Err(MarketDataError::MalformedHeader { missing })
    }
}

fn in_filter(name: &str, filter: &[String]) -> bool {
    filter.iter().any(|f| f.eq_ignore_ascii_case(name))
}

/// Half-open row range `[begin, end)` over `records` (row 0 is the
/// header) selected by the date range: from the first row dated on or
/// after `start` up to the first row dated on or after `end`. A zero
/// start date selects everything.
fn index_range(
    records: &[Vec<String>],
    columns: &ColumnMap,
    range: &DateRange,
    date_format: &str,
) -> Result<(usize, usize)> {
    if range.is_unrestricted() {
        return Ok((1, records.len()));
    }
    let date_index = match columns.get("date") {
        Some(&index) => index,
        None => column_positions(&records[0], &["date".to_string()])?["date"],
    };
    let mut begin = 0;
    let mut end = 0;
    for (i, record) in records.iter().enumerate().skip(1) {
        let date = NaiveDate::parse_from_str(&record[date_index], date_format).unwrap_or_default();
        if begin == 0 {
            if date >= range.start {
                begin = i;
            }
        } else if date >= range.end {
            end = i;
            break;
        }
    }
    if begin == 0 {
        return Ok((records.len(), records.len()));
    }
    if end == 0 {
        end = records.len();
    }
    Ok((begin, end))
}

pub(crate) fn ticker_file_name(pattern: &str, symbol: &str, timeframe: &str) -> String {
    pattern
        .replace("{ticker}", symbol)
        .replace("{timeframe}", timeframe)
}

pub(crate) fn event_file_name(pattern: &str, event_name: &str) -> String {
    pattern.replace("{eventname}", event_name)
}

fn file_name_for(pattern: &str, placeholder: &str, value: &str) -> String {
    pattern.replace(placeholder, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timeframe;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) {
        let mut file = File::create(dir.path().join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    fn reader(dir: &TempDir) -> CsvReader {
        CsvReader {
            ticker_data_path: dir.path().to_path_buf(),
            event_data_path: dir.path().to_path_buf(),
            ticker_file_pattern: "{ticker}-{timeframe}.csv".to_string(),
            event_file_pattern: "{eventname}.csv".to_string(),
            dividend_file_pattern: "{ticker}-dividend.csv".to_string(),
            split_file_pattern: "{ticker}-split.csv".to_string(),
            date_format: "%Y%m%d".to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn file_name_substitution_is_literal() {
        assert_eq!(
            ticker_file_name("{ticker}-{timeframe}.csv", "spy", "daily"),
            "spy-daily.csv"
        );
        assert_eq!(event_file_name("{eventname}.csv", "opec-oil-cut"), "opec-oil-cut.csv");
    }

    #[test]
    fn column_positions_lowercases_header_names() {
        let header: Vec<String> = ["Date", "Open", "High", "Low", "Close", "Volume"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let columns = column_positions(&header, &[]).unwrap();
        assert_eq!(columns["date"], 0);
        assert_eq!(columns["volume"], 5);
    }

    #[test]
    fn column_positions_reports_missing_filtered_names() {
        let header: Vec<String> = ["date", "open"].iter().map(|s| s.to_string()).collect();
        let filter: Vec<String> = ["date", "close", "volume"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let err = column_positions(&header, &filter).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid CSV Header. Missing header item(s): close,volume"
        );
    }

    #[test]
    fn reads_ticker_data_with_all_columns() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "someticker-daily.csv",
            "id,date,open,high,low,close,volume\n\
             0,20161207,134.58,136.17,134.17,135.89,30859300\n\
             1,20161208,136.25,138.21,135.80,138.03,47794400\n\
             2,20161209,138.39,138.82,137.75,138.30,34276600\n",
        );
        let config = ReadConfig {
            timeframe: Timeframe::Daily,
            filter: vec![],
            range: DateRange::unrestricted(),
        };
        let series = reader(&dir).read_ticker_data("someticker", &config).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.id.as_deref(), Some(&[0, 1, 2][..]));
        assert_eq!(series.date[0], date(2016, 12, 7));
        assert_eq!(series.open.as_deref(), Some(&[134.58, 136.25, 138.39][..]));
        assert_eq!(
            series.volume.as_deref(),
            Some(&[30859300, 47794400, 34276600][..])
        );
    }

    #[test]
    fn field_filter_restricts_columns() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "someticker-daily.csv",
            "id,date,open,high,low,close,volume\n\
             0,20161207,134.58,136.17,134.17,135.89,30859300\n",
        );
        let config = ReadConfig {
            timeframe: Timeframe::Daily,
            filter: vec!["date".to_string(), "close".to_string()],
            range: DateRange::unrestricted(),
        };
        let series = reader(&dir).read_ticker_data("someticker", &config).unwrap();

        assert!(series.id.is_none());
        assert!(series.open.is_none());
        assert_eq!(series.close.as_deref(), Some(&[135.89][..]));
    }

    #[test]
    fn date_range_restricts_rows() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "someticker-daily.csv",
            "date,close\n\
             20161207,135.89\n\
             20161208,138.03\n\
             20161209,138.30\n\
             20161212,137.80\n",
        );
        let config = ReadConfig {
            timeframe: Timeframe::Daily,
            filter: vec![],
            range: DateRange {
                start: date(2016, 12, 8),
                end: date(2016, 12, 12),
            },
        };
        let series = reader(&dir).read_ticker_data("someticker", &config).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.date[0], date(2016, 12, 8));
        assert_eq!(series.date[1], date(2016, 12, 9));
    }

    #[test]
    fn missing_file_reports_open_error() {
        let dir = TempDir::new().unwrap();
        let config = ReadConfig {
            timeframe: Timeframe::Daily,
            filter: vec![],
            range: DateRange::unrestricted(),
        };
        let err = reader(&dir)
            .read_ticker_data("doesnotexist", &config)
            .unwrap_err();
        assert!(err.to_string().starts_with("File Open Error"));
    }

    #[test]
    fn reads_event_dates_into_a_set() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "testevent.csv",
            "date\n20000526\n20000711\n20110906\n20110906\n",
        );
        let dates = reader(&dir)
            .read_event_data(&Event {
                name: "testevent".to_string(),
            })
            .unwrap();

        assert_eq!(dates.len(), 3);
        assert!(dates.contains(&date(2011, 9, 6)));
    }

    #[test]
    fn event_file_without_date_header_fails() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "noheader.csv", "5/26/2000\n7/11/2000\n");
        let err = reader(&dir)
            .read_event_data(&Event {
                name: "noheader".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, MarketDataError::MalformedHeader { .. }));
    }

    #[test]
    fn reads_standard_split_data_in_file_order() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "someticker-split.csv",
            "date,split\n20050609,2:1\n20020605,3:2\n",
        );
        let splits = reader(&dir)
            .read_split_data("someticker", DataSource::Standard)
            .unwrap();

        assert_eq!(splits.dates, vec![date(2005, 6, 9), date(2002, 6, 5)]);
        assert_eq!(splits.before_qty, vec![1, 2]);
        assert_eq!(splits.after_qty, vec![2, 3]);
    }

    #[test]
    fn reads_yahoo_split_and_dividend_data() {
        let dir = TempDir::new().unwrap();
        let contents = "someticker dividends and splits\n\
                        DIVIDEND, 20050620, 0.146000\n\
                        SPLIT,20050609,2:1\n\
                        DIVIDEND, 20050324, 0.274000\n\
                        SPLIT,20020605,3:2\n\
                        DIVIDEND, 20020308, 0.057500\n\
                        DIVIDEND, 20011214, 0.135000\n";
        write_file(&dir, "someticker-split.csv", contents);
        write_file(&dir, "someticker-dividend.csv", contents);
        let reader = reader(&dir);

        let splits = reader
            .read_split_data("someticker", DataSource::Yahoo)
            .unwrap();
        assert_eq!(splits.dates, vec![date(2005, 6, 9), date(2002, 6, 5)]);
        assert_eq!(splits.before_qty, vec![1, 2]);
        assert_eq!(splits.after_qty, vec![2, 3]);

        let dividends = reader
            .read_dividend_data("someticker", DataSource::Yahoo)
            .unwrap();
        assert_eq!(
            dividends.dates,
            vec![
                date(2005, 6, 20),
                date(2005, 3, 24),
                date(2002, 3, 8),
                date(2001, 12, 14)
            ]
        );
        assert_eq!(dividends.amounts, vec![0.146, 0.274, 0.0575, 0.135]);
    }
}
