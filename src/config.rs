//! Configuration file support for the CSV store.
//!
//! Allows loading store layout and processing defaults from TOML files so
//! pipeline runs are reproducible.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::data::CsvReader;
use crate::error::{MarketDataError, Result};
use crate::export::CsvWriter;
use crate::types::{DataSource, Timeframe};

/// Complete store configuration loaded from a file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreFileConfig {
    /// File locations and naming.
    #[serde(default)]
    pub store: StoreSettings,
    /// Processing defaults.
    #[serde(default)]
    pub process: ProcessSettings,
}

/// File locations and naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Directory holding ticker, split and dividend files.
    #[serde(default = "default_data_path")]
    pub ticker_data_path: PathBuf,
    /// Directory holding event files.
    #[serde(default = "default_data_path")]
    pub event_data_path: PathBuf,
    /// Directory processed files are written to.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default = "default_ticker_pattern")]
    pub ticker_file_pattern: String,
    #[serde(default = "default_event_pattern")]
    pub event_file_pattern: String,
    #[serde(default = "default_dividend_pattern")]
    pub dividend_file_pattern: String,
    #[serde(default = "default_split_pattern")]
    pub split_file_pattern: String,
    /// chrono format string shared by the reader and the writer.
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data")
}
fn default_output_path() -> PathBuf {
    PathBuf::from("processed")
}
fn default_ticker_pattern() -> String {
    "{ticker}-{timeframe}.csv".to_string()
}
fn default_event_pattern() -> String {
    "{eventname}.csv".to_string()
}
fn default_dividend_pattern() -> String {
    "{ticker}-dividend.csv".to_string()
}
fn default_split_pattern() -> String {
    "{ticker}-split.csv".to_string()
}
fn default_date_format() -> String {
    "%-m/%-d/%Y".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            ticker_data_path: default_data_path(),
            event_data_path: default_data_path(),
            output_path: default_output_path(),
            ticker_file_pattern: default_ticker_pattern(),
            event_file_pattern: default_event_pattern(),
            dividend_file_pattern: default_dividend_pattern(),
            split_file_pattern: default_split_pattern(),
            date_format: default_date_format(),
        }
    }
}

/// Processing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSettings {
    #[serde(default = "default_base_timeframe")]
    pub base_timeframe: Timeframe,
    /// Higher timeframes to label and write, in order.
    #[serde(default = "default_higher_timeframes")]
    pub higher_timeframes: Vec<Timeframe>,
    /// Extra columns the processed base series carries.
    #[serde(default = "default_additional_fields")]
    pub additional_fields: Vec<String>,
    /// Apply split adjustment before labeling.
    #[serde(default)]
    pub adjust_for_splits: bool,
    #[serde(default)]
    pub split_source: DataSource,
}

fn default_base_timeframe() -> Timeframe {
    Timeframe::Daily
}
fn default_higher_timeframes() -> Vec<Timeframe> {
    vec![Timeframe::Weekly, Timeframe::Monthly]
}
fn default_additional_fields() -> Vec<String> {
    vec![
        "id".to_string(),
        "weekly_id".to_string(),
        "monthly_id".to_string(),
    ]
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            base_timeframe: default_base_timeframe(),
            higher_timeframes: default_higher_timeframes(),
            additional_fields: default_additional_fields(),
            adjust_for_splits: false,
            split_source: DataSource::default(),
        }
    }
}

impl StoreFileConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading store configuration");
        let contents = fs::read_to_string(path).map_err(MarketDataError::file_open)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|err| MarketDataError::Config(err.to_string()))?;
        fs::write(path, contents).map_err(MarketDataError::file_write)
    }

    /// Reader over the configured store.
    pub fn reader(&self) -> CsvReader {
        CsvReader {
            ticker_data_path: self.store.ticker_data_path.clone(),
            event_data_path: self.store.event_data_path.clone(),
            ticker_file_pattern: self.store.ticker_file_pattern.clone(),
            event_file_pattern: self.store.event_file_pattern.clone(),
            dividend_file_pattern: self.store.dividend_file_pattern.clone(),
            split_file_pattern: self.store.split_file_pattern.clone(),
            date_format: self.store.date_format.clone(),
        }
    }

    /// Writer over the configured store.
    pub fn writer(&self) -> CsvWriter {
        CsvWriter {
            output_path: self.store.output_path.clone(),
            ticker_file_pattern: self.store.ticker_file_pattern.clone(),
            date_format: self.store.date_format.clone(),
        }
    }
}
