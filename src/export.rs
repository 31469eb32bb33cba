//! CSV-backed writing of ticker data.
//!
//! Output files carry one row per bar in a fixed column order: `id`, the
//! higher-timeframe id columns in lexicographic order, then `date`,
//! `open`, `high`, `low`, `close`, `volume`, each omitted when its column
//! is absent. Appending skips the header and derives the first row to
//! write from the number of newlines already in the file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;
use tracing::info;

use crate::data::ticker_file_name;
use crate::error::{MarketDataError, Result};
use crate::types::{BarSeries, WriteConfig};

/// Write-side contract the pipeline consumes.
pub trait DataWriter {
    fn write_ticker_data(
        &self,
        symbol: &str,
        series: &BarSeries,
        config: &WriteConfig,
    ) -> Result<()>;
}

/// CSV file store writer.
#[derive(Debug, Clone, Default)]
pub struct CsvWriter {
    pub output_path: PathBuf,
    pub ticker_file_pattern: String,
    pub date_format: String,
}

impl DataWriter for CsvWriter {
    fn write_ticker_data(
        &self,
        symbol: &str,
        series: &BarSeries,
        config: &WriteConfig,
    ) -> Result<()> {
        let file_name = ticker_file_name(
            &self.ticker_file_pattern,
            symbol,
            config.timeframe.as_str(),
        );
        let path = self.output_path.join(&file_name);
        info!(symbol, timeframe = %config.timeframe, append = config.append, path = %path.display(), "writing ticker data");

        let (file, first_row) = if config.append {
            let existing = File::open(&path).map_err(MarketDataError::file_write)?;
            let next_id = count_lines(existing).map_err(MarketDataError::file_write)?;
            let file = OpenOptions::new()
                .append(true)
                .open(&path)
                .map_err(MarketDataError::file_write)?;
            (file, next_id)
        } else {
            (
                File::create(&path).map_err(MarketDataError::file_write)?,
                0,
            )
        };

        let mut writer = BufWriter::new(file);
        if !config.append {
            write_header(&mut writer, series).map_err(MarketDataError::file_write)?;
        }
        for index in first_row..series.len() {
            write_row(&mut writer, series, index, &self.date_format)
                .map_err(MarketDataError::file_write)?;
        }
        writer.flush().map_err(MarketDataError::file_write)?;
        Ok(())
    }
}

fn write_header(writer: &mut impl Write, series: &BarSeries) -> std::io::Result<()> {
    let mut fields: Vec<&str> = Vec::new();
    if series.id.is_some() {
        fields.push("id");
    }
    for key in series.higher_tf_ids.keys() {
        fields.push(key);
    }
    fields.push("date");
    if series.open.is_some() {
        fields.push("open");
    }
    if series.high.is_some() {
        fields.push("high");
    }
    if series.low.is_some() {
        fields.push("low");
    }
    if series.close.is_some() {
        fields.push("close");
    }
    if series.volume.is_some() {
        fields.push("volume");
    }
    writeln!(writer, "{}", fields.join(","))
}

fn write_row(
    writer: &mut impl Write,
    series: &BarSeries,
    index: usize,
    date_format: &str,
) -> std::io::Result<()> {
    let mut fields: Vec<String> = Vec::new();
    if let Some(ids) = series.id.as_ref() {
        fields.push(ids[index].to_string());
    }
    for column in series.higher_tf_ids.values() {
        fields.push(column[index].to_string());
    }
    fields.push(series.date[index].format(date_format).to_string());
    if let Some(col) = series.open.as_ref() {
        fields.push(col[index].to_string());
    }
    if let Some(col) = series.high.as_ref() {
        fields.push(col[index].to_string());
    }
    if let Some(col) = series.low.as_ref() {
        fields.push(col[index].to_string());
    }
    if let Some(col) = series.close.as_ref() {
        fields.push(col[index].to_string());
    }
    if let Some(col) = series.volume.as_ref() {
        fields.push(col[index].to_string());
    }
    writeln!(writer, "{}", fields.join(","))
}

/// Count newlines in 32 KiB chunks.
fn count_lines(mut reader: impl Read) -> std::io::Result<usize> {
    let mut buf = [0u8; 32 * 1024];
    let mut count = 0;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(count);
        }
        count += buf[..n].iter().filter(|&&b| b == b'\n').count();
    }
}
