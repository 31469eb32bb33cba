//! Command-line interface for the market-data store.

use marketdata::config::StoreFileConfig;
use marketdata::data::{CsvReader, DataReader};
use marketdata::error::Result;
use marketdata::pipeline;
use marketdata::types::{DateRange, ReadConfig, TickerForWrite, Timeframe, WriteConfig};

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// Columnar transformation pipeline for equity market data.
#[derive(Parser)]
#[command(name = "marketdata")]
#[command(version)]
#[command(about = "Process per-symbol OHLCV data: sort, split-adjust, label and aggregate")]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate an example configuration file
    Init {
        /// Output path for the config file
        #[arg(short, long, default_value = "marketdata.toml")]
        output: PathBuf,
    },

    /// Validate a ticker CSV file and print a summary
    Validate {
        /// Path to the ticker CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Date format of the file's date column
        #[arg(long, default_value = "%-m/%-d/%Y")]
        date_format: String,
    },

    /// Run the full read, process, write pipeline for a symbol
    Process {
        /// Path to the TOML configuration file
        #[arg(short, long, default_value = "marketdata.toml")]
        config: PathBuf,

        /// Ticker symbol to process
        #[arg(short, long)]
        symbol: String,

        /// Append to existing output files instead of recreating them
        #[arg(long)]
        append: bool,
    },
}

pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Init { output } => init_config(output),
        Commands::Validate { data, date_format } => validate_data(data, date_format),
        Commands::Process {
            config,
            symbol,
            append,
        } => run_pipeline(config, symbol, *append),
    }
}

fn init_config(output: &Path) -> Result<()> {
    StoreFileConfig::default().save(output)?;
    println!("Wrote example configuration to {}", output.display());
    Ok(())
}

fn validate_data(data: &Path, date_format: &str) -> Result<()> {
    println!("Validating data file: {}", data.display());

    // Point a reader straight at the file so the usual loader runs on it.
    let reader = CsvReader {
        ticker_data_path: data.parent().unwrap_or(Path::new(".")).to_path_buf(),
        ticker_file_pattern: data
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        date_format: date_format.to_string(),
        ..Default::default()
    };
    let config = ReadConfig {
        timeframe: Timeframe::Daily,
        filter: vec![],
        range: DateRange::unrestricted(),
    };
    let series = reader.read_ticker_data("", &config)?;

    println!("\nData Summary:");
    println!("  Rows: {}", series.len());
    if !series.is_empty() {
        println!("  Start: {}", series.date[0].format(date_format));
        println!(
            "  End: {}",
            series.date[series.len() - 1].format(date_format)
        );
        if let Some(closes) = series.close.as_ref() {
            let min_price = closes.iter().fold(f64::INFINITY, |a, &b| a.min(b));
            let max_price = closes.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            println!("  Close Range: {:.2} - {:.2}", min_price, max_price);
        }
        if let Some(volumes) = series.volume.as_ref() {
            let avg_volume = volumes.iter().sum::<i64>() as f64 / volumes.len() as f64;
            println!("  Average Volume: {:.0}", avg_volume);
        }
    }

    println!("\nValidation: PASSED");
    Ok(())
}

fn run_pipeline(config_path: &Path, symbol: &str, append: bool) -> Result<()> {
    let config = StoreFileConfig::load(config_path)?;
    let reader = config.reader();
    let writer = config.writer();
    let base = config.process.base_timeframe;

    let raw = reader.read_ticker_data(
        symbol,
        &ReadConfig {
            timeframe: base,
            filter: vec![],
            range: DateRange::unrestricted(),
        },
    )?;
    info!(symbol, bars = raw.len(), "raw ticker data read");

    let splits = if config.process.adjust_for_splits {
        Some(pipeline::read_split_data(
            &reader,
            symbol,
            config.process.split_source,
        )?)
    } else {
        None
    };

    let additional: Vec<&str> = config
        .process
        .additional_fields
        .iter()
        .map(String::as_str)
        .collect();
    let processed = pipeline::process_raw_ticker_data(
        raw,
        splits.as_ref(),
        base,
        &additional,
        &config.process.higher_timeframes,
    );

    let mut write_configs = vec![WriteConfig {
        timeframe: base,
        append,
    }];
    for higher in &config.process.higher_timeframes {
        write_configs.push(WriteConfig {
            timeframe: *higher,
            append,
        });
    }
    let ticker = TickerForWrite {
        symbol: symbol.to_string(),
        base_timeframe: base,
        config: write_configs,
    };
    pipeline::write_ticker_data(&writer, &processed, &ticker)?;

    println!(
        "Processed {} bars of {} into {}",
        processed.len(),
        symbol,
        config.store.output_path.display()
    );
    Ok(())
}
